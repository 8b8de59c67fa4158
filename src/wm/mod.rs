//! Window Manager Module
//!
//! The [`WindowManager`] session: client registry, decoration settings and
//! the outer event loop. Event handling, lifecycle, focus and interactive
//! move/resize are split across the submodules as `impl` blocks on the
//! session.

pub mod atoms;
pub mod client;
pub mod decorations;
pub mod display;
pub mod event_filter;
pub mod events;
pub mod focus;
pub mod geometry;
pub mod hints;
pub mod keyboard;
pub mod manage;
pub mod moveresize;
pub mod registry;
pub mod xconn;

#[cfg(test)]
pub mod testing;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info};
use x11rb::protocol::Event;

use crate::config::{CommandsConfig, Config};
use crate::wm::decorations::Decorations;
use crate::wm::event_filter::EventFilter;
use crate::wm::geometry::Limits;
use crate::wm::keyboard::KeyBindings;
use crate::wm::registry::Registry;
use crate::wm::xconn::XConn;

/// How long the event loop waits before checking for a pending shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Fatal conditions
#[derive(Debug, Error)]
pub enum WmError {
    #[error("can't open display! check your DISPLAY variable")]
    DisplayUnavailable,
    #[error("font '{0}' not found")]
    FontNotFound(String),
    #[error("root window unavailable (maybe another wm is running?)")]
    AnotherWmRunning,
}

pub struct WindowManager<X: XConn> {
    pub conn: X,
    pub registry: Registry,
    pub decor: Decorations,
    pub limits: Limits,
    pub commands: CommandsConfig,
    pub keys: KeyBindings,
    pub numlock_mask: u16,
    /// Cleared while a client is fullscreen
    pub showing_taskbar: bool,
    /// Events set aside by an interactive loop, handled before new ones
    deferred: VecDeque<Event>,
    shutdown: Arc<AtomicBool>,
}

impl<X: XConn> WindowManager<X> {
    pub fn new(conn: X, config: &Config, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let decor = Decorations::new(
            &config.decorations,
            &config.title_controls,
            conn.font_metrics(),
        );
        let (screen_width, screen_height) = conn.screen_size();
        let limits = Limits {
            screen_width,
            screen_height,
            floor_width: config.decorations.min_width.max(1),
            floor_height: config.decorations.min_height.max(1),
        };
        let numlock_mask = keyboard::discover_numlock(&conn)?;
        let keys = KeyBindings::resolve(&conn, &config.keys)?;

        info!(
            "Window manager ready: screen {}x{}, title bar {}px",
            screen_width, screen_height, decor.bar_height
        );

        Ok(Self {
            conn,
            registry: Registry::new(),
            decor,
            limits,
            commands: config.commands.clone(),
            keys,
            numlock_mask,
            showing_taskbar: true,
            deferred: VecDeque::new(),
            shutdown,
        })
    }

    /// Grab the key bindings and adopt the windows that are already mapped
    pub fn start(&mut self) -> Result<()> {
        self.keys.grab_all(&self.conn, self.numlock_mask)?;
        self.scan_windows()?;
        self.conn.flush()
    }

    fn scan_windows(&mut self) -> Result<()> {
        let root = self.conn.root();
        for window in self.conn.query_tree(root)? {
            let Some(attrs) = self.conn.window_attributes(window)? else {
                continue;
            };
            if !attrs.override_redirect && attrs.viewable {
                self.manage_window(window)?;
            }
        }
        info!("Managing {} existing windows", self.registry.len());
        Ok(())
    }

    /// Main event loop; returns after a clean shutdown
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                return self.shutdown();
            }
            crate::signals::reap_children();

            let event = match self.deferred.pop_front() {
                Some(event) => Some(event),
                None => self.conn.next_event(Some(POLL_INTERVAL))?,
            };
            if let Some(event) = event {
                self.handle_event(event)?;
            }
            self.conn.flush()?;
        }
    }

    /// Hand every client back to the root window, mapped, and restore
    /// the default colormap and focus
    pub fn shutdown(&mut self) -> Result<()> {
        let root = self.conn.root();
        for window in self.conn.query_tree(root)? {
            if let Some(client) = self.registry.find_by_frame(window).map(|c| c.window) {
                self.remap_client(client)?;
            }
        }
        // Frames the tree no longer reported
        for window in self.registry.windows() {
            self.remap_client(window)?;
        }

        self.conn.install_colormap(self.conn.default_colormap())?;
        self.conn.focus_pointer_root()?;
        self.conn.flush()?;
        info!("Released all clients");
        Ok(())
    }

    /// Block until an event `filter` accepts; others wait in the deferred
    /// queue until the outer loop resumes
    pub(crate) fn next_filtered(&mut self, filter: EventFilter) -> Result<Event> {
        loop {
            let Some(event) = self.conn.next_event(None)? else {
                continue;
            };
            if filter.accepts(&event) {
                return Ok(event);
            }
            debug!("Deferring event during interactive loop");
            self.deferred.push_back(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}
