//! In-memory [`XConn`] used by the unit tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use anyhow::{Result, bail};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    Colormap, ConfigureWindowAux, EventMask, Keycode, SetMode, Window,
};

use crate::shared::Geometry;
use crate::wm::atoms::Atoms;
use crate::wm::xconn::{CursorKind, FontMetrics, Paint, WindowAttrs, WindowSpec, XConn};

pub const ROOT: Window = 1;
pub const SCREEN: (i32, i32) = (1024, 768);
pub const DEFAULT_COLORMAP: Colormap = 0x20;

/// A request the manager issued
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateWindow(Window, WindowSpec),
    DestroyWindow(Window),
    Map(Window),
    MapRaised(Window),
    Unmap(Window),
    Reparent { window: Window, parent: Window, x: i32, y: i32 },
    Configure(Window, ConfigureWindowAux),
    SaveSet(Window, SetMode),
    SelectInput(Window, EventMask),
    ChangeProperty { window: Window, property: u32, data: Vec<u32> },
    ClientMessage { window: Window, message_type: u32, data: [u32; 5] },
    ConfigureNotify(Window, Geometry),
    KillClient(Window),
    GrabPointer(Window, Option<CursorKind>),
    UngrabPointer,
    GrabServer,
    UngrabServer,
    GrabButtons(Window),
    ReplayPointer,
    GrabKey(Keycode, u16),
    SetFocus(Window),
    FocusPointerRoot,
    InstallColormap(Colormap),
    Clear(Window),
    Fill(Window, Paint),
    Line(Window, Paint),
    Text(Window, String),
}

pub struct MockConn {
    atoms: Atoms,
    pub requests: RefCell<Vec<Request>>,
    pub events: VecDeque<Event>,
    pub properties: HashMap<(Window, u32), Vec<u32>>,
    pub text: HashMap<(Window, u32), String>,
    pub attrs: HashMap<Window, WindowAttrs>,
    pub tree: Vec<Window>,
    pub pointer: Cell<(i32, i32)>,
    /// Results of upcoming pointer grabs; empty means success
    pub grab_results: RefCell<VecDeque<bool>>,
    pub keycodes: HashMap<u32, Keycode>,
    pub modmap: Vec<Vec<Keycode>>,
    destroyed: RefCell<HashSet<Window>>,
    next_id: Cell<Window>,
}

impl MockConn {
    pub fn new() -> Self {
        Self {
            atoms: Atoms {
                wm_state: 300,
                wm_change_state: 301,
                wm_protocols: 302,
                wm_delete_window: 303,
                motif_wm_hints: 304,
            },
            requests: RefCell::new(Vec::new()),
            events: VecDeque::new(),
            properties: HashMap::new(),
            text: HashMap::new(),
            attrs: HashMap::new(),
            tree: Vec::new(),
            pointer: Cell::new((0, 0)),
            grab_results: RefCell::new(VecDeque::new()),
            keycodes: HashMap::new(),
            modmap: vec![Vec::new(); 8],
            destroyed: RefCell::new(HashSet::new()),
            next_id: Cell::new(0x1000),
        }
    }

    /// Register a client-owned window the manager can query
    pub fn add_window(&mut self, window: Window, geometry: Geometry) {
        self.attrs.insert(
            window,
            WindowAttrs {
                geometry,
                override_redirect: false,
                viewable: false,
                colormap: DEFAULT_COLORMAP,
            },
        );
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn take_requests(&self) -> Vec<Request> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }

    pub fn sent(&self, request: &Request) -> bool {
        self.requests.borrow().contains(request)
    }

    /// Last WM_STATE written for a window
    pub fn wm_state(&self, window: Window) -> Option<u32> {
        self.requests.borrow().iter().rev().find_map(|r| match r {
            Request::ChangeProperty { window: w, property, data }
                if *w == window && *property == self.atoms.wm_state =>
            {
                data.first().copied()
            }
            _ => None,
        })
    }

    fn record(&self, request: Request) -> Result<()> {
        self.requests.borrow_mut().push(request);
        Ok(())
    }
}

impl XConn for MockConn {
    fn root(&self) -> Window {
        ROOT
    }

    fn screen_size(&self) -> (i32, i32) {
        SCREEN
    }

    fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn default_colormap(&self) -> Colormap {
        DEFAULT_COLORMAP
    }

    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: 10,
            descent: 3,
        }
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<Event>> {
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if timeout.is_none() => bail!("no scripted event left"),
            None => Ok(None),
        }
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn query_tree(&self, _window: Window) -> Result<Vec<Window>> {
        Ok(self.tree.clone())
    }

    fn window_attributes(&self, window: Window) -> Result<Option<WindowAttrs>> {
        if self.destroyed.borrow().contains(&window) {
            return Ok(None);
        }
        Ok(self.attrs.get(&window).copied())
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        Ok(self.pointer.get())
    }

    fn get_property32(
        &self,
        window: Window,
        property: u32,
        _type: u32,
        _length: u32,
    ) -> Result<Option<Vec<u32>>> {
        Ok(self.properties.get(&(window, property)).cloned())
    }

    fn get_text_property(&self, window: Window, property: u32) -> Result<Option<String>> {
        Ok(self.text.get(&(window, property)).cloned())
    }

    fn keycode_for_keysym(&self, keysym: u32) -> Result<Option<Keycode>> {
        Ok(self.keycodes.get(&keysym).copied())
    }

    fn modifier_mapping(&self) -> Result<Vec<Vec<Keycode>>> {
        Ok(self.modmap.clone())
    }

    fn create_window(&self, spec: &WindowSpec) -> Result<Window> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.record(Request::CreateWindow(id, *spec))?;
        Ok(id)
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.destroyed.borrow_mut().insert(window);
        self.record(Request::DestroyWindow(window))
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.record(Request::Map(window))
    }

    fn map_raised(&self, window: Window) -> Result<()> {
        self.record(Request::MapRaised(window))
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.record(Request::Unmap(window))
    }

    fn reparent_window(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.record(Request::Reparent {
            window,
            parent,
            x,
            y,
        })
    }

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<()> {
        self.record(Request::Configure(window, *aux))
    }

    fn change_save_set(&self, window: Window, mode: SetMode) -> Result<()> {
        self.record(Request::SaveSet(window, mode))
    }

    fn select_input(&self, window: Window, mask: EventMask) -> Result<()> {
        self.record(Request::SelectInput(window, mask))
    }

    fn change_property32(&self, window: Window, property: u32, _type: u32, data: &[u32]) -> Result<()> {
        self.record(Request::ChangeProperty {
            window,
            property,
            data: data.to_vec(),
        })
    }

    fn send_client_message(&self, window: Window, message_type: u32, data: [u32; 5]) -> Result<()> {
        self.record(Request::ClientMessage {
            window,
            message_type,
            data,
        })
    }

    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> Result<()> {
        self.record(Request::ConfigureNotify(window, geometry))
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        self.record(Request::KillClient(window))
    }

    fn grab_pointer(&self, confine_to: Window, cursor: Option<CursorKind>) -> Result<bool> {
        self.record(Request::GrabPointer(confine_to, cursor))?;
        Ok(self.grab_results.borrow_mut().pop_front().unwrap_or(true))
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.record(Request::UngrabPointer)
    }

    fn grab_server(&self) -> Result<()> {
        self.record(Request::GrabServer)
    }

    fn ungrab_server(&self) -> Result<()> {
        self.record(Request::UngrabServer)
    }

    fn grab_buttons(&self, window: Window) -> Result<()> {
        self.record(Request::GrabButtons(window))
    }

    fn replay_pointer(&self) -> Result<()> {
        self.record(Request::ReplayPointer)
    }

    fn grab_key(&self, keycode: Keycode, modifiers: u16) -> Result<()> {
        self.record(Request::GrabKey(keycode, modifiers))
    }

    fn set_input_focus(&self, window: Window) -> Result<()> {
        self.record(Request::SetFocus(window))
    }

    fn focus_pointer_root(&self) -> Result<()> {
        self.record(Request::FocusPointerRoot)
    }

    fn install_colormap(&self, colormap: Colormap) -> Result<()> {
        self.record(Request::InstallColormap(colormap))
    }

    fn clear_window(&self, window: Window) -> Result<()> {
        self.record(Request::Clear(window))
    }

    fn fill_rectangle(&self, window: Window, paint: Paint, _rect: Geometry) -> Result<()> {
        self.record(Request::Fill(window, paint))
    }

    fn draw_line(&self, window: Window, paint: Paint, _from: (i32, i32), _to: (i32, i32)) -> Result<()> {
        self.record(Request::Line(window, paint))
    }

    fn draw_text(&self, window: Window, _x: i32, _y: i32, text: &str) -> Result<()> {
        self.record(Request::Text(window, text.to_string()))
    }
}

/// Event constructors for the scripted queue
pub mod ev {
    use x11rb::protocol::Event;
    use x11rb::protocol::xproto::*;

    pub fn map_request(window: Window) -> Event {
        Event::MapRequest(MapRequestEvent {
            response_type: MAP_REQUEST_EVENT,
            sequence: 0,
            parent: super::ROOT,
            window,
        })
    }

    pub fn unmap_notify(window: Window) -> Event {
        Event::UnmapNotify(UnmapNotifyEvent {
            response_type: UNMAP_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            from_configure: false,
        })
    }

    pub fn destroy_notify(window: Window) -> Event {
        Event::DestroyNotify(DestroyNotifyEvent {
            response_type: DESTROY_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
        })
    }

    pub fn button_press(window: Window, button: u8, root_pos: (i16, i16), pos: (i16, i16)) -> Event {
        Event::ButtonPress(ButtonPressEvent {
            response_type: BUTTON_PRESS_EVENT,
            detail: button,
            sequence: 0,
            time: 0,
            root: super::ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: root_pos.0,
            root_y: root_pos.1,
            event_x: pos.0,
            event_y: pos.1,
            state: KeyButMask::from(0u16),
            same_screen: true,
        })
    }

    pub fn button_release(root_pos: (i16, i16)) -> Event {
        Event::ButtonRelease(ButtonReleaseEvent {
            response_type: BUTTON_RELEASE_EVENT,
            detail: 1,
            sequence: 0,
            time: 0,
            root: super::ROOT,
            event: super::ROOT,
            child: x11rb::NONE,
            root_x: root_pos.0,
            root_y: root_pos.1,
            event_x: root_pos.0,
            event_y: root_pos.1,
            state: KeyButMask::from(0u16),
            same_screen: true,
        })
    }

    pub fn motion(root_pos: (i16, i16)) -> Event {
        Event::MotionNotify(MotionNotifyEvent {
            response_type: MOTION_NOTIFY_EVENT,
            detail: Motion::NORMAL,
            sequence: 0,
            time: 0,
            root: super::ROOT,
            event: super::ROOT,
            child: x11rb::NONE,
            root_x: root_pos.0,
            root_y: root_pos.1,
            event_x: root_pos.0,
            event_y: root_pos.1,
            state: KeyButMask::from(0u16),
            same_screen: true,
        })
    }

    pub fn expose(window: Window, count: u16) -> Event {
        Event::Expose(ExposeEvent {
            response_type: EXPOSE_EVENT,
            sequence: 0,
            window,
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            count,
        })
    }

    pub fn configure_request(window: Window, mask: ConfigWindow, rect: (i16, i16, u16, u16)) -> Event {
        Event::ConfigureRequest(ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: super::ROOT,
            window,
            sibling: x11rb::NONE,
            x: rect.0,
            y: rect.1,
            width: rect.2,
            height: rect.3,
            border_width: 0,
            value_mask: mask,
        })
    }

    pub fn enter(window: Window) -> Event {
        Event::EnterNotify(EnterNotifyEvent {
            response_type: ENTER_NOTIFY_EVENT,
            detail: NotifyDetail::ANCESTOR,
            sequence: 0,
            time: 0,
            root: super::ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: 0,
            root_y: 0,
            event_x: 0,
            event_y: 0,
            state: KeyButMask::from(0u16),
            mode: NotifyMode::NORMAL,
            same_screen_focus: 0,
        })
    }

    pub fn property(window: Window, atom: u32) -> Event {
        Event::PropertyNotify(PropertyNotifyEvent {
            response_type: PROPERTY_NOTIFY_EVENT,
            sequence: 0,
            window,
            atom,
            time: 0,
            state: Property::NEW_VALUE,
        })
    }

    pub fn colormap(window: Window, colormap: Colormap, new: bool) -> Event {
        Event::ColormapNotify(ColormapNotifyEvent {
            response_type: COLORMAP_NOTIFY_EVENT,
            sequence: 0,
            window,
            colormap,
            new,
            state: ColormapState::INSTALLED,
        })
    }

    pub fn client_message(window: Window, message_type: u32, data: [u32; 5]) -> Event {
        Event::ClientMessage(ClientMessageEvent::new(32, window, message_type, data))
    }

    pub fn key_press(keycode: u8, state: u16) -> Event {
        Event::KeyPress(KeyPressEvent {
            response_type: KEY_PRESS_EVENT,
            detail: keycode,
            sequence: 0,
            time: 0,
            root: super::ROOT,
            event: super::ROOT,
            child: x11rb::NONE,
            root_x: 0,
            root_y: 0,
            event_x: 0,
            event_y: 0,
            state: KeyButMask::from(state),
            same_screen: true,
        })
    }
}
