//! Client Registry
//!
//! Every managed client keyed by its content window, with a frame index so
//! either identifier finds the record. The registry also owns the
//! session-wide references to clients (focus, fullscreen, topmost) so that
//! removing a client clears them in the same step.

use std::collections::HashMap;

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;
use crate::wm::client::Client;

/// The fullscreen client and the rectangle it had before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullscreenState {
    pub window: Window,
    pub saved: Geometry,
}

#[derive(Debug, Default)]
pub struct Registry {
    clients: HashMap<Window, Client>,
    frames: HashMap<Window, Window>,
    /// Insertion order, used when cycling
    order: Vec<Window>,
    focused: Option<Window>,
    fullscreen: Option<FullscreenState>,
    topmost: Option<Window>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client: Client) {
        debug!("Registering client {:#x} (frame {:#x})", client.window, client.frame);
        self.frames.insert(client.frame, client.window);
        if !self.order.contains(&client.window) {
            self.order.push(client.window);
        }
        self.clients.insert(client.window, client);
    }

    /// Remove a client, clearing every reference to it
    pub fn remove(&mut self, window: Window) -> Option<Client> {
        let client = self.clients.remove(&window)?;
        self.frames.remove(&client.frame);
        self.order.retain(|&w| w != window);
        if self.focused == Some(window) {
            self.focused = None;
        }
        if self.fullscreen.is_some_and(|fs| fs.window == window) {
            self.fullscreen = None;
        }
        if self.topmost == Some(window) {
            self.topmost = None;
        }
        debug!("Unregistered client {:#x}", window);
        Some(client)
    }

    pub fn find_by_window(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn find_by_frame(&self, frame: Window) -> Option<&Client> {
        self.frames
            .get(&frame)
            .and_then(|window| self.clients.get(window))
    }

    /// Look up by content window, then by frame
    pub fn find_any(&self, id: Window) -> Option<&Client> {
        self.find_by_window(id).or_else(|| self.find_by_frame(id))
    }

    pub fn get_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    pub fn contains(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Content windows in insertion order
    pub fn windows(&self) -> Vec<Window> {
        self.order.clone()
    }

    /// The client `step` places away from `from` in insertion order, wrapping
    pub fn neighbour(&self, from: Option<Window>, step: isize) -> Option<Window> {
        let len = self.order.len() as isize;
        if len == 0 {
            return None;
        }
        let index = match from.and_then(|w| self.order.iter().position(|&o| o == w)) {
            Some(index) => (index as isize + step).rem_euclid(len),
            None if step < 0 => len - 1,
            None => 0,
        };
        self.order.get(index as usize).copied()
    }

    pub fn focused(&self) -> Option<Window> {
        self.focused
    }

    /// Set the focus reference; ignored for windows that are not managed
    pub fn set_focused(&mut self, window: Option<Window>) {
        self.focused = window.filter(|w| self.clients.contains_key(w));
    }

    pub fn fullscreen(&self) -> Option<FullscreenState> {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, state: Option<FullscreenState>) {
        self.fullscreen = state.filter(|fs| self.clients.contains_key(&fs.window));
    }

    pub fn topmost(&self) -> Option<Window> {
        self.topmost
    }

    pub fn set_topmost(&mut self, window: Option<Window>) {
        self.topmost = window.filter(|w| self.clients.contains_key(w));
    }
}
