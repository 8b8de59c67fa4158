//! Events Module
//!
//! Classifies protocol events and routes them to the lifecycle, focus and
//! interactive handlers. Events for windows the manager does not know are
//! dropped, except configure requests which are always honoured.

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::protocol::xproto::{
    AtomEnum, ButtonPressEvent, ClientMessageEvent, ConfigWindow, ConfigureRequestEvent,
    ConfigureWindowAux, PropertyNotifyEvent,
};
use x11rb::protocol::{ErrorKind, Event};
use x11rb::x11_utils::X11Error;

use crate::launcher;
use crate::shared::WmState;
use crate::wm::geometry::{apply_gravity, remove_gravity};
use crate::wm::hints::HintsManager;
use crate::wm::keyboard::KeyAction;
use crate::wm::xconn::XConn;
use crate::wm::{WindowManager, WmError};

impl<X: XConn> WindowManager<X> {
    /// Dispatch one event. Only fatal conditions are returned as errors.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::ButtonPress(e) => self.handle_button_press(e),
            Event::ConfigureRequest(e) => self.handle_configure_request(e),
            Event::MapRequest(e) => {
                debug!("MapRequest for {:#x}", e.window);
                self.handle_map_request(e.window)
            }
            Event::UnmapNotify(e) => {
                debug!("UnmapNotify for {:#x}", e.window);
                self.handle_unmap(e.window)
            }
            Event::DestroyNotify(e) => {
                debug!("DestroyNotify for {:#x}", e.window);
                self.withdraw_client(e.window)
            }
            Event::ClientMessage(e) => self.handle_client_message(e),
            Event::PropertyNotify(e) => self.handle_property_change(e),
            Event::EnterNotify(e) => {
                if self.registry.find_by_frame(e.event).is_some() {
                    self.conn.grab_buttons(e.event)?;
                }
                Ok(())
            }
            Event::ColormapNotify(e) => {
                if e.new {
                    self.adopt_colormap(e.window, e.colormap)?;
                }
                Ok(())
            }
            Event::Expose(e) => {
                if e.count == 0 {
                    if let Some(window) = self.registry.find_by_frame(e.window).map(|c| c.window) {
                        self.redraw_client(window)?;
                    }
                }
                Ok(())
            }
            Event::KeyPress(e) => {
                match self
                    .keys
                    .lookup(e.detail, u16::from(e.state), self.numlock_mask)
                {
                    Some(action) => self.handle_key_action(action),
                    None => Ok(()),
                }
            }
            Event::Error(e) => self.handle_error(e),
            _ => Ok(()),
        }
    }

    fn handle_button_press(&mut self, e: ButtonPressEvent) -> Result<()> {
        if e.event == self.conn.root() {
            debug!("Button {} on the root window", e.detail);
            if let Some(command) = self.commands.for_button(e.detail) {
                launcher::spawn(command);
            }
            return Ok(());
        }

        let Some(client) = self.registry.find_by_frame(e.event) else {
            return Ok(());
        };
        let window = client.window;
        let title = client.title_height(self.decor.bar_height);
        let width = client.geometry.width;

        self.focus_client(window)?;
        self.conn.replay_pointer()?;

        if i32::from(e.event_y) < title {
            match self.decor.hit_test(width - i32::from(e.event_x)) {
                Some(control) => self.track_title_click(window, control)?,
                None => self.move_client(window)?,
            }
        }
        Ok(())
    }

    fn handle_configure_request(&mut self, e: ConfigureRequestEvent) -> Result<()> {
        let mask = e.value_mask;
        debug!("ConfigureRequest for {:#x} ({:?})", e.window, mask);

        if self.registry.fullscreen().is_some_and(|fs| fs.window == e.window) {
            return self.send_config(e.window);
        }

        let bar_height = self.decor.bar_height;
        let Some(client) = self.registry.get_mut(e.window) else {
            let aux = ConfigureWindowAux::from_configure_request(&e);
            return self.conn.configure_window(e.window, &aux);
        };

        let gravity = client.size_hints.gravity();
        let title = client.title_height(bar_height);
        let mut geometry = remove_gravity(client.geometry, gravity, title);
        if mask.contains(ConfigWindow::X) {
            geometry.x = i32::from(e.x);
        }
        if mask.contains(ConfigWindow::Y) {
            geometry.y = i32::from(e.y);
        }
        if mask.contains(ConfigWindow::WIDTH) {
            geometry.width = i32::from(e.width);
        }
        if mask.contains(ConfigWindow::HEIGHT) {
            geometry.height = i32::from(e.height);
        }
        client.geometry = apply_gravity(geometry, gravity, title);

        let geometry = client.geometry;
        let frame = client.frame;
        let border_width = client.border_width.max(0) as u32;

        let mut frame_aux = ConfigureWindowAux::new();
        let mut content_aux = ConfigureWindowAux::new();
        if mask.contains(ConfigWindow::X) {
            frame_aux = frame_aux.x(geometry.x);
            content_aux = content_aux.x(0);
        }
        if mask.contains(ConfigWindow::Y) {
            frame_aux = frame_aux.y(geometry.y - title);
            content_aux = content_aux.y(title);
        }
        if mask.contains(ConfigWindow::WIDTH) {
            frame_aux = frame_aux.width(geometry.width.max(1) as u32);
            content_aux = content_aux.width(geometry.width.max(1) as u32);
        }
        if mask.contains(ConfigWindow::HEIGHT) {
            frame_aux = frame_aux.height((geometry.height + title).max(1) as u32);
            content_aux = content_aux.height(geometry.height.max(1) as u32);
        }
        if mask.contains(ConfigWindow::BORDER_WIDTH) {
            frame_aux = frame_aux.border_width(border_width);
            content_aux = content_aux.border_width(0);
        }
        if mask.contains(ConfigWindow::SIBLING) {
            frame_aux = frame_aux.sibling(e.sibling);
        }
        if mask.contains(ConfigWindow::STACK_MODE) {
            frame_aux = frame_aux.stack_mode(e.stack_mode);
        }

        self.conn.configure_window(frame, &frame_aux)?;
        self.send_config(e.window)?;
        self.conn.configure_window(e.window, &content_aux)
    }

    fn handle_map_request(&mut self, window: u32) -> Result<()> {
        let Some(client) = self.registry.get_mut(window) else {
            return self.manage_window(window);
        };
        client.iconic = false;
        let frame = client.frame;
        self.conn.map_window(window)?;
        self.conn.map_raised(frame)?;
        self.set_wm_state(window, WmState::Normal)
    }

    fn handle_unmap(&mut self, window: u32) -> Result<()> {
        let Some(client) = self.registry.get_mut(window) else {
            return Ok(());
        };
        if client.self_unmap_credits > 0 {
            client.self_unmap_credits -= 1;
            return Ok(());
        }
        self.withdraw_client(window)
    }

    fn handle_client_message(&mut self, e: ClientMessageEvent) -> Result<()> {
        let wm_change_state = self.conn.atoms().wm_change_state;
        if e.type_ == wm_change_state
            && e.format == 32
            && e.data.as_data32()[0] == WmState::Iconic.to_wire()
            && self.registry.contains(e.window)
        {
            debug!("Client {:#x} asked to be iconified", e.window);
            self.hide(e.window)?;
        }
        Ok(())
    }

    fn handle_property_change(&mut self, e: PropertyNotifyEvent) -> Result<()> {
        if !self.registry.contains(e.window) {
            return Ok(());
        }
        if e.atom == u32::from(AtomEnum::WM_NAME) {
            let name = HintsManager::read_name(&self.conn, e.window)?;
            if let Some(client) = self.registry.get_mut(e.window) {
                client.name = name;
            }
            self.redraw_client(e.window)?;
        } else if e.atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
            let hints = HintsManager::read_size_hints(&self.conn, e.window)?;
            if let Some(client) = self.registry.get_mut(e.window) {
                client.size_hints = hints;
            }
        }
        Ok(())
    }

    fn handle_key_action(&mut self, action: KeyAction) -> Result<()> {
        debug!("Key action {:?}", action);
        match action {
            KeyAction::CyclePrev => self.cycle_focus(-1),
            KeyAction::CycleNext => self.cycle_focus(1),
            KeyAction::ToggleFullscreen => match self.registry.focused() {
                Some(window) => self.toggle_fullscreen(window),
                None => Ok(()),
            },
            KeyAction::ToggleZ => match self.registry.focused() {
                Some(window) => self.raise_lower(window),
                None => Ok(()),
            },
        }
    }

    /// Protocol errors are fatal only when the root window is inaccessible;
    /// otherwise the named window is assumed gone
    fn handle_error(&mut self, e: X11Error) -> Result<()> {
        if e.error_kind == ErrorKind::Access && e.bad_value == self.conn.root() {
            return Err(WmError::AnotherWmRunning.into());
        }
        warn!(
            "X error {:?} on resource {:#x} (request {})",
            e.error_kind,
            e.bad_value,
            e.request_name.unwrap_or("unknown")
        );
        if let Some(window) = self.registry.find_any(e.bad_value).map(|c| c.window) {
            self.withdraw_client(window)?;
        }
        Ok(())
    }
}
