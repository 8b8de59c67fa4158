//! Display Module
//!
//! [`X11Display`]: the x11rb connection behind [`XConn`]. Owns the
//! decoration font, the allocated colors and their graphics contexts, the
//! grab cursors, and a mio poll on the connection's socket so the event
//! loop can wait with a timeout.

use std::collections::HashMap;
use std::io;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::*;
use x11rb::protocol::{ErrorKind, Event};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME, NONE};

use crate::config::AppearanceConfig;
use crate::shared::Geometry;
use crate::wm::WmError;
use crate::wm::atoms::Atoms;
use crate::wm::xconn::{CursorKind, FontMetrics, Paint, WindowAttrs, WindowKind, WindowSpec, XConn};

const X11_TOKEN: mio::Token = mio::Token(0);

/// Darkening applied to the active color for pressed controls
const ACTIVE_SHADOW: u16 = 0x2000;

// Glyphs of the standard cursor font
const XC_FLEUR: u16 = 52;
const XC_UL_ANGLE: u16 = 144;
const XC_LR_ANGLE: u16 = 78;

fn pointer_events() -> EventMask {
    EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION
}

/// Cursors shown during pointer grabs
#[derive(Debug, Clone, Copy)]
struct Cursors {
    move_cursor: Cursor,
    resize_start: Cursor,
    resize_end: Cursor,
}

impl Cursors {
    fn new(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;

        let create_cursor = |glyph: u16| -> Result<Cursor> {
            let cursor = conn.generate_id()?;
            conn.create_glyph_cursor(
                cursor,
                font,
                font,
                glyph,
                glyph + 1,
                0,
                0,
                0,
                0xffff,
                0xffff,
                0xffff,
            )?;
            Ok(cursor)
        };

        let cursors = Self {
            move_cursor: create_cursor(XC_FLEUR)?,
            resize_start: create_cursor(XC_UL_ANGLE)?,
            resize_end: create_cursor(XC_LR_ANGLE)?,
        };
        conn.close_font(font)?;
        Ok(cursors)
    }

    fn get(&self, kind: CursorKind) -> Cursor {
        match kind {
            CursorKind::Move => self.move_cursor,
            CursorKind::ResizeStart => self.resize_start,
            CursorKind::ResizeEnd => self.resize_end,
        }
    }
}

/// An allocated color
#[derive(Debug, Clone, Copy)]
struct Color {
    pixel: u32,
    rgb: (u16, u16, u16),
}

/// Connection to the X server and the resources the manager draws with
pub struct X11Display {
    conn: RustConnection,
    root: Window,
    screen_size: (i32, i32),
    default_colormap: Colormap,
    atoms: Atoms,
    font_metrics: FontMetrics,
    palette: HashMap<Paint, (Gcontext, u32)>,
    cursors: Cursors,
    poll: mio::Poll,
    events: mio::Events,
}

impl X11Display {
    /// Connect, take over the root window and allocate drawing resources
    pub fn connect(display_name: Option<&str>, appearance: &AppearanceConfig) -> Result<Self> {
        let (conn, screen_num) =
            RustConnection::connect(display_name).map_err(|_| WmError::DisplayUnavailable)?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .cloned()
            .context("X server reported no such screen")?;
        info!(
            "Connected to X server: screen {} ({}x{})",
            screen_num, screen.width_in_pixels, screen.height_in_pixels
        );

        Self::become_wm(&conn, screen.root)?;
        let atoms = Atoms::new(&conn)?;

        let font = conn.generate_id()?;
        conn.open_font(font, appearance.font.as_bytes())?
            .check()
            .map_err(|_| WmError::FontNotFound(appearance.font.clone()))?;
        let font_info = conn
            .query_font(font)?
            .reply()
            .map_err(|_| WmError::FontNotFound(appearance.font.clone()))?;
        let font_metrics = FontMetrics {
            ascent: i32::from(font_info.font_ascent),
            descent: i32::from(font_info.font_descent),
        };

        let palette = Self::allocate_palette(&conn, &screen, font, appearance)?;
        let cursors = Cursors::new(&conn)?;

        let poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let fd = conn.stream().as_raw_fd();
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 FD with mio")?;

        conn.flush()?;
        Ok(Self {
            conn,
            root: screen.root,
            screen_size: (
                i32::from(screen.width_in_pixels),
                i32::from(screen.height_in_pixels),
            ),
            default_colormap: screen.default_colormap,
            atoms,
            font_metrics,
            palette,
            cursors,
            poll,
            events: mio::Events::with_capacity(4),
        })
    }

    /// Select substructure redirection on the root. The server grants it to
    /// one client at a time.
    fn become_wm(conn: &RustConnection, root: Window) -> Result<()> {
        let aux = ChangeWindowAttributesAux::new().event_mask(
            EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::BUTTON_PRESS
                | EventMask::PROPERTY_CHANGE
                | EventMask::COLOR_MAP_CHANGE,
        );
        match conn.change_window_attributes(root, &aux)?.check() {
            Ok(()) => Ok(()),
            Err(ReplyError::X11Error(e)) if e.error_kind == ErrorKind::Access => {
                Err(WmError::AnotherWmRunning.into())
            }
            Err(e) => Err(e).context("Failed to select events on the root window"),
        }
    }

    fn allocate_palette(
        conn: &RustConnection,
        screen: &Screen,
        font: Font,
        appearance: &AppearanceConfig,
    ) -> Result<HashMap<Paint, (Gcontext, u32)>> {
        let cmap = screen.default_colormap;
        let black = Color { pixel: screen.black_pixel, rgb: (0, 0, 0) };
        let white = Color { pixel: screen.white_pixel, rgb: (0xffff, 0xffff, 0xffff) };

        let active = Self::alloc_color(conn, cmap, &appearance.active)?.unwrap_or(white);
        let (r, g, b) = active.rgb;
        let depressed = Self::alloc_rgb(
            conn,
            cmap,
            (
                r.saturating_sub(ACTIVE_SHADOW),
                g.saturating_sub(ACTIVE_SHADOW),
                b.saturating_sub(ACTIVE_SHADOW),
            ),
        )?;

        let mut colors = vec![(Paint::Active, active), (Paint::Depressed, depressed)];
        for (paint, spec, fallback) in [
            (Paint::Border, &appearance.border, black),
            (Paint::Text, &appearance.text, black),
            (Paint::Inactive, &appearance.inactive, white),
            (Paint::Menu, &appearance.menu, white),
            (Paint::Selected, &appearance.selected, white),
            (Paint::Empty, &appearance.empty, black),
        ] {
            let color = match Self::alloc_color(conn, cmap, spec)? {
                Some(color) => color,
                None => {
                    warn!("Could not allocate color {:?} for {:?}", spec, paint);
                    fallback
                }
            };
            colors.push((paint, color));
        }

        let mut palette = HashMap::new();
        for (paint, color) in colors {
            let gc = conn.generate_id()?;
            conn.create_gc(
                gc,
                screen.root,
                &CreateGCAux::new()
                    .foreground(color.pixel)
                    .font(font)
                    .graphics_exposures(0),
            )?;
            palette.insert(paint, (gc, color.pixel));
        }
        Ok(palette)
    }

    /// Allocate `#rrggbb` or a named color; `None` when the server refuses
    fn alloc_color(conn: &RustConnection, cmap: Colormap, spec: &str) -> Result<Option<Color>> {
        if let Some(rgb) = parse_hex_color(spec) {
            return match conn.alloc_color(cmap, rgb.0, rgb.1, rgb.2)?.reply() {
                Ok(reply) => Ok(Some(Color {
                    pixel: reply.pixel,
                    rgb: (reply.red, reply.green, reply.blue),
                })),
                Err(ReplyError::X11Error(_)) => Ok(None),
                Err(e) => Err(e.into()),
            };
        }
        match conn.alloc_named_color(cmap, spec.as_bytes())?.reply() {
            Ok(reply) => Ok(Some(Color {
                pixel: reply.pixel,
                rgb: (reply.visual_red, reply.visual_green, reply.visual_blue),
            })),
            Err(ReplyError::X11Error(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn alloc_rgb(conn: &RustConnection, cmap: Colormap, rgb: (u16, u16, u16)) -> Result<Color> {
        let reply = conn.alloc_color(cmap, rgb.0, rgb.1, rgb.2)?.reply()?;
        Ok(Color {
            pixel: reply.pixel,
            rgb: (reply.red, reply.green, reply.blue),
        })
    }

    fn gc(&self, paint: Paint) -> Gcontext {
        self.palette.get(&paint).map(|&(gc, _)| gc).unwrap_or(NONE)
    }

    fn pixel(&self, paint: Paint) -> u32 {
        self.palette.get(&paint).map(|&(_, pixel)| pixel).unwrap_or(0)
    }
}

/// `#rrggbb` to 16-bit channels
fn parse_hex_color(spec: &str) -> Option<(u16, u16, u16)> {
    let hex = spec.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u16::from_str_radix(&hex[i..i + 2], 16).ok().map(|c| c * 0x101);
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Ignore the error a request on a vanished window produces
fn tolerate_missing<T>(result: std::result::Result<T, ReplyError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ReplyError::X11Error(e)) => {
            debug!("Query failed: {:?} on {:#x}", e.error_kind, e.bad_value);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn dim(value: i32) -> u16 {
    value.clamp(1, i32::from(u16::MAX)) as u16
}

fn coord(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

impl XConn for X11Display {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_size(&self) -> (i32, i32) {
        self.screen_size
    }

    fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn default_colormap(&self) -> Colormap {
        self.default_colormap
    }

    fn font_metrics(&self) -> FontMetrics {
        self.font_metrics
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.conn.poll_for_event()? {
                return Ok(Some(event));
            }
            self.conn.flush()?;
            match self.poll.poll(&mut self.events, timeout) {
                Ok(()) => {}
                // A signal arrived; let the caller look at its flags
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    if timeout.is_some() {
                        return Ok(None);
                    }
                    continue;
                }
                Err(e) => return Err(e).context("Failed to poll the X connection"),
            }
            let readable = self.events.iter().any(|event| event.token() == X11_TOKEN);
            if !readable && timeout.is_some() {
                return Ok(None);
            }
        }
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn query_tree(&self, window: Window) -> Result<Vec<Window>> {
        Ok(tolerate_missing(self.conn.query_tree(window)?.reply())?
            .map(|reply| reply.children)
            .unwrap_or_default())
    }

    fn window_attributes(&self, window: Window) -> Result<Option<WindowAttrs>> {
        let attrs_cookie = self.conn.get_window_attributes(window)?;
        let geometry_cookie = self.conn.get_geometry(window)?;
        let Some(attrs) = tolerate_missing(attrs_cookie.reply())? else {
            return Ok(None);
        };
        let Some(geometry) = tolerate_missing(geometry_cookie.reply())? else {
            return Ok(None);
        };
        Ok(Some(WindowAttrs {
            geometry: Geometry::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                i32::from(geometry.width),
                i32::from(geometry.height),
            ),
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
            colormap: attrs.colormap,
        }))
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn get_property32(
        &self,
        window: Window,
        property: u32,
        type_: u32,
        length: u32,
    ) -> Result<Option<Vec<u32>>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, length)?
            .reply();
        Ok(tolerate_missing(reply)?
            .filter(|reply| reply.value_len > 0)
            .and_then(|reply| reply.value32().map(|values| values.collect())))
    }

    fn get_text_property(&self, window: Window, property: u32) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 1024)?
            .reply();
        Ok(tolerate_missing(reply)?
            .filter(|reply| reply.format == 8 && !reply.value.is_empty())
            .map(|reply| String::from_utf8_lossy(&reply.value).into_owned()))
    }

    fn keycode_for_keysym(&self, keysym: u32) -> Result<Option<Keycode>> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;
        let per_keycode = usize::from(reply.keysyms_per_keycode).max(1);
        Ok(reply
            .keysyms
            .chunks(per_keycode)
            .position(|syms| syms.contains(&keysym))
            .map(|index| min + index as u8))
    }

    fn modifier_mapping(&self) -> Result<Vec<Vec<Keycode>>> {
        let reply = self.conn.get_modifier_mapping()?.reply()?;
        let per_modifier = usize::from(reply.keycodes_per_modifier()).max(1);
        Ok(reply
            .keycodes
            .chunks(per_modifier)
            .map(|row| row.to_vec())
            .collect())
    }

    fn create_window(&self, spec: &WindowSpec) -> Result<Window> {
        let window = self.conn.generate_id()?;
        let mut aux = CreateWindowAux::new()
            .override_redirect(u32::from(spec.override_redirect))
            .event_mask(spec.event_mask);
        let (depth, class, border_width) = match spec.kind {
            WindowKind::InputOutput => {
                if let Some(paint) = spec.background {
                    aux = aux.background_pixel(self.pixel(paint));
                }
                if let Some(paint) = spec.border {
                    aux = aux.border_pixel(self.pixel(paint));
                }
                (COPY_DEPTH_FROM_PARENT, WindowClass::INPUT_OUTPUT, spec.border_width)
            }
            WindowKind::InputOnly => (0, WindowClass::INPUT_ONLY, 0),
        };
        self.conn.create_window(
            depth,
            window,
            spec.parent,
            coord(spec.geometry.x),
            coord(spec.geometry.y),
            dim(spec.geometry.width),
            dim(spec.geometry.height),
            border_width,
            class,
            COPY_FROM_PARENT,
            &aux,
        )?;
        Ok(window)
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn map_raised(&self, window: Window) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn reparent_window(&self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.conn.reparent_window(window, parent, coord(x), coord(y))?;
        Ok(())
    }

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<()> {
        self.conn.configure_window(window, aux)?;
        Ok(())
    }

    fn change_save_set(&self, window: Window, mode: SetMode) -> Result<()> {
        self.conn.change_save_set(mode, window)?;
        Ok(())
    }

    fn select_input(&self, window: Window, mask: EventMask) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(mask),
        )?;
        Ok(())
    }

    fn change_property32(&self, window: Window, property: u32, type_: u32, data: &[u32]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn send_client_message(&self, window: Window, message_type: u32, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        self.conn
            .send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_configure_notify(&self, window: Window, geometry: Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: coord(geometry.x),
            y: coord(geometry.y),
            width: dim(geometry.width),
            height: dim(geometry.height),
            border_width: 0,
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn grab_pointer(&self, confine_to: Window, cursor: Option<CursorKind>) -> Result<bool> {
        let cursor = cursor.map(|kind| self.cursors.get(kind)).unwrap_or(NONE);
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                pointer_events(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                confine_to,
                cursor,
                CURRENT_TIME,
            )?
            .reply()?;
        if reply.status != GrabStatus::SUCCESS {
            debug!("Pointer grab failed: {:?}", reply.status);
        }
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.conn.ungrab_server()?;
        Ok(())
    }

    fn grab_buttons(&self, window: Window) -> Result<()> {
        self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            NONE,
            NONE,
            ButtonIndex::ANY,
            ModMask::ANY,
        )?;
        Ok(())
    }

    fn replay_pointer(&self) -> Result<()> {
        self.conn.allow_events(Allow::REPLAY_POINTER, CURRENT_TIME)?;
        Ok(())
    }

    fn grab_key(&self, keycode: Keycode, modifiers: u16) -> Result<()> {
        self.conn.grab_key(
            true,
            self.root,
            ModMask::from(modifiers),
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        Ok(())
    }

    fn set_input_focus(&self, window: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
        Ok(())
    }

    fn focus_pointer_root(&self) -> Result<()> {
        self.conn.set_input_focus(
            InputFocus::POINTER_ROOT,
            u32::from(InputFocus::POINTER_ROOT),
            CURRENT_TIME,
        )?;
        Ok(())
    }

    fn install_colormap(&self, colormap: Colormap) -> Result<()> {
        self.conn.install_colormap(colormap)?;
        Ok(())
    }

    fn clear_window(&self, window: Window) -> Result<()> {
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        Ok(())
    }

    fn fill_rectangle(&self, window: Window, paint: Paint, rect: Geometry) -> Result<()> {
        if rect.width <= 0 || rect.height <= 0 {
            return Ok(());
        }
        self.conn.poly_fill_rectangle(
            window,
            self.gc(paint),
            &[Rectangle {
                x: coord(rect.x),
                y: coord(rect.y),
                width: dim(rect.width),
                height: dim(rect.height),
            }],
        )?;
        Ok(())
    }

    fn draw_line(&self, window: Window, paint: Paint, from: (i32, i32), to: (i32, i32)) -> Result<()> {
        self.conn.poly_line(
            CoordMode::ORIGIN,
            window,
            self.gc(paint),
            &[
                Point { x: coord(from.0), y: coord(from.1) },
                Point { x: coord(to.0), y: coord(to.1) },
            ],
        )?;
        Ok(())
    }

    fn draw_text(&self, window: Window, x: i32, y: i32, text: &str) -> Result<()> {
        // PolyText8 items: length, delta, then up to 254 bytes
        let mut items = Vec::with_capacity(text.len() + 2);
        for chunk in text.as_bytes().chunks(254) {
            items.push(chunk.len() as u8);
            items.push(0);
            items.extend_from_slice(chunk);
        }
        if items.is_empty() {
            return Ok(());
        }
        self.conn
            .poly_text8(window, self.gc(Paint::Text), coord(x), coord(y), &items)?;
        Ok(())
    }
}
