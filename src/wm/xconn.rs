//! XConn Module
//!
//! The windowing-protocol seam. Every component talks to the server through
//! this trait: [`crate::wm::display::X11Display`] implements it over x11rb,
//! and the unit tests implement it in memory.

use std::time::Duration;

use anyhow::Result;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{Colormap, ConfigureWindowAux, EventMask, Keycode, SetMode, Window};

use crate::shared::Geometry;
use crate::wm::atoms::Atoms;

/// Colors allocated at startup, referred to by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Paint {
    Border,
    Text,
    Active,
    Depressed,
    Inactive,
    Menu,
    Selected,
    Empty,
}

/// Cursors used while grabbing the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Move,
    ResizeStart,
    ResizeEnd,
}

/// Window class for [`WindowSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    InputOutput,
    InputOnly,
}

/// Parameters of a window the manager creates for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub parent: Window,
    pub geometry: Geometry,
    pub border_width: u16,
    pub kind: WindowKind,
    pub background: Option<Paint>,
    pub border: Option<Paint>,
    pub override_redirect: bool,
    pub event_mask: EventMask,
}

impl WindowSpec {
    /// An unmapped, invisible window used to confine the pointer
    pub fn input_only(parent: Window, geometry: Geometry) -> Self {
        Self {
            parent,
            geometry,
            border_width: 0,
            kind: WindowKind::InputOnly,
            background: None,
            border: None,
            override_redirect: true,
            event_mask: EventMask::NO_EVENT,
        }
    }
}

/// What the manager needs to know about a window it has not created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttrs {
    pub geometry: Geometry,
    pub override_redirect: bool,
    pub viewable: bool,
    pub colormap: Colormap,
}

/// Vertical metrics of the decoration font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
}

/// Requests and queries the window manager issues to the windowing server
pub trait XConn {
    fn root(&self) -> Window;

    /// Pixel size of the active screen
    fn screen_size(&self) -> (i32, i32);

    fn atoms(&self) -> &Atoms;

    fn default_colormap(&self) -> Colormap;

    fn font_metrics(&self) -> FontMetrics;

    /// Fetch the next event. `None` as timeout blocks until one arrives;
    /// otherwise `Ok(None)` is returned when the timeout expires first.
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<Event>>;

    fn flush(&self) -> Result<()>;

    /// Children of `window` in stacking order, bottom first
    fn query_tree(&self, window: Window) -> Result<Vec<Window>>;

    /// `None` when the window no longer exists
    fn window_attributes(&self, window: Window) -> Result<Option<WindowAttrs>>;

    /// Pointer position in root coordinates
    fn query_pointer(&self) -> Result<(i32, i32)>;

    fn get_property32(
        &self,
        window: Window,
        property: u32,
        type_: u32,
        length: u32,
    ) -> Result<Option<Vec<u32>>>;

    fn get_text_property(&self, window: Window, property: u32) -> Result<Option<String>>;

    fn keycode_for_keysym(&self, keysym: u32) -> Result<Option<Keycode>>;

    /// Eight rows (Shift, Lock, Control, Mod1..Mod5) of keycodes
    fn modifier_mapping(&self) -> Result<Vec<Vec<Keycode>>>;

    fn create_window(&self, spec: &WindowSpec) -> Result<Window>;
    fn destroy_window(&self, window: Window) -> Result<()>;
    fn map_window(&self, window: Window) -> Result<()>;
    /// Map and put on top of its siblings
    fn map_raised(&self, window: Window) -> Result<()>;
    fn unmap_window(&self, window: Window) -> Result<()>;
    fn reparent_window(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()>;
    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<()>;
    fn change_save_set(&self, window: Window, mode: SetMode) -> Result<()>;
    fn select_input(&self, window: Window, mask: EventMask) -> Result<()>;
    fn change_property32(&self, window: Window, property: u32, type_: u32, data: &[u32]) -> Result<()>;
    fn send_client_message(&self, window: Window, message_type: u32, data: [u32; 5]) -> Result<()>;
    /// Synthetic ConfigureNotify telling the client where its window really is
    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> Result<()>;
    fn kill_client(&self, window: Window) -> Result<()>;

    /// Grab the pointer on the root window, confined to `confine_to`.
    /// Returns `false` when the grab was refused.
    fn grab_pointer(&self, confine_to: Window, cursor: Option<CursorKind>) -> Result<bool>;
    fn ungrab_pointer(&self) -> Result<()>;
    fn grab_server(&self) -> Result<()>;
    fn ungrab_server(&self) -> Result<()>;
    /// Synchronous grab of every button with any modifier on `window`
    fn grab_buttons(&self, window: Window) -> Result<()>;
    /// Release a frozen pointer and let the event through to the client
    fn replay_pointer(&self) -> Result<()>;
    fn grab_key(&self, keycode: Keycode, modifiers: u16) -> Result<()>;
    fn set_input_focus(&self, window: Window) -> Result<()>;
    fn focus_pointer_root(&self) -> Result<()>;
    fn install_colormap(&self, colormap: Colormap) -> Result<()>;

    fn clear_window(&self, window: Window) -> Result<()>;
    fn fill_rectangle(&self, window: Window, paint: Paint, rect: Geometry) -> Result<()>;
    fn draw_line(&self, window: Window, paint: Paint, from: (i32, i32), to: (i32, i32)) -> Result<()>;
    fn draw_text(&self, window: Window, x: i32, y: i32, text: &str) -> Result<()>;
}
