//! Focus Module
//!
//! Click-to-focus: the client under a frame button press receives input
//! focus and its colormap is installed. Keyboard cycling walks the registry.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{ConfigureWindowAux, StackMode, Window};

use crate::wm::xconn::XConn;
use crate::wm::WindowManager;

impl<X: XConn> WindowManager<X> {
    /// Give `window` the input focus and its colormap, repainting the
    /// title bars whose focus state changed
    pub fn focus_client(&mut self, window: Window) -> Result<()> {
        let Some(colormap) = self.registry.find_by_window(window).map(|c| c.colormap) else {
            return Ok(());
        };
        self.conn.set_input_focus(window)?;
        if colormap != x11rb::NONE {
            self.conn.install_colormap(colormap)?;
        }

        let previous = self.registry.focused();
        self.registry.set_focused(Some(window));
        if let Some(previous) = previous.filter(|&p| p != window) {
            debug!("Focus {:#x} -> {:#x}", previous, window);
            self.redraw_client(previous)?;
        }
        self.redraw_client(window)
    }

    /// Repaint one client's title band
    pub fn redraw_client(&self, window: Window) -> Result<()> {
        match self.registry.find_by_window(window) {
            Some(client) => {
                let focused = self.registry.focused() == Some(window);
                self.decor.redraw(&self.conn, client, focused)
            }
            None => Ok(()),
        }
    }

    /// Move focus `step` clients along the registry, bringing the new
    /// client into view
    pub fn cycle_focus(&mut self, step: isize) -> Result<()> {
        let Some(next) = self.registry.neighbour(self.registry.focused(), step) else {
            return Ok(());
        };
        let Some(client) = self.registry.find_by_window(next) else {
            return Ok(());
        };
        if client.iconic {
            self.unhide(next)?;
        } else {
            self.conn.configure_window(
                client.frame,
                &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
            )?;
        }
        self.focus_client(next)
    }

    /// Install the colormap a client just set on itself
    pub(crate) fn adopt_colormap(&mut self, window: Window, colormap: u32) -> Result<()> {
        let Some(client) = self.registry.get_mut(window) else {
            return Ok(());
        };
        client.colormap = colormap;
        debug!("Client {:#x} switched to colormap {:#x}", window, colormap);
        self.conn.install_colormap(colormap)
    }
}
