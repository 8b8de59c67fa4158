//! Lifecycle Module
//!
//! Creating and releasing clients, the Withdrawn/Normal/Iconic transitions,
//! fullscreen, stacking and close requests.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{ConfigureWindowAux, EventMask, SetMode, StackMode, Window};

use crate::shared::{Geometry, WmState};
use crate::wm::client::Client;
use crate::wm::geometry::{
    apply_gravity, clamp_to_screen, fullscreen_layout, initial_placement, remove_gravity,
};
use crate::wm::hints::HintsManager;
use crate::wm::registry::FullscreenState;
use crate::wm::xconn::{WindowAttrs, XConn};
use crate::wm::WindowManager;

/// What happens to the content window when its frame goes away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    /// The client withdrew or vanished
    Withdraw,
    /// The manager is exiting; leave the window mapped on the root
    Remap,
}

impl<X: XConn> WindowManager<X> {
    /// Wrap a window in a frame and start managing it
    pub fn manage_window(&mut self, window: Window) -> Result<()> {
        if self.registry.contains(window) {
            return Ok(());
        }
        let Some(attrs) = self.conn.window_attributes(window)? else {
            debug!("Window {:#x} vanished before it could be managed", window);
            return Ok(());
        };
        if attrs.override_redirect {
            return Ok(());
        }

        self.conn.grab_server()?;
        let result = self.frame_window(window, attrs);
        self.conn.ungrab_server()?;
        result
    }

    fn frame_window(&mut self, window: Window, attrs: WindowAttrs) -> Result<()> {
        let size_hints = HintsManager::read_size_hints(&self.conn, window)?;
        let wm_hints = HintsManager::read_wm_hints(&self.conn, window)?;
        let transient_for = HintsManager::read_transient_for(&self.conn, window)?;

        let mut client = Client::new(window, x11rb::NONE, attrs.geometry);
        client.size_hints = size_hints;
        client.is_transient = transient_for.is_some();
        client.has_title = HintsManager::read_has_title(&self.conn, window)?;
        client.name = HintsManager::read_name(&self.conn, window)?;
        client.colormap = attrs.colormap;
        client.border_width = self.decor.border_for(client.is_transient);
        let chrome = client.chrome(self.decor.bar_height);

        let mut start_iconic = false;
        if attrs.viewable {
            // Reparenting a mapped window unmaps it
            client.self_unmap_credits += 1;
        } else {
            if !size_hints.has_position() {
                let pointer = self.conn.query_pointer()?;
                client.geometry =
                    initial_placement(client.geometry, pointer, &chrome, &self.limits);
            }
            start_iconic = wm_hints.and_then(|h| h.initial_state) == Some(WmState::Iconic);
        }
        client.geometry = clamp_to_screen(
            apply_gravity(client.geometry, size_hints.gravity(), chrome.title_height),
            &chrome,
            &self.limits,
        );

        client.frame = self
            .conn
            .create_window(&self.decor.frame_spec(self.conn.root(), &client))?;
        let frame = client.frame;
        let geometry = client.geometry;

        self.conn.change_save_set(window, SetMode::INSERT)?;
        self.conn.select_input(
            window,
            EventMask::PROPERTY_CHANGE | EventMask::COLOR_MAP_CHANGE,
        )?;
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .border_width(0)
                .width(geometry.width.max(1) as u32)
                .height(geometry.height.max(1) as u32),
        )?;
        self.conn
            .reparent_window(window, frame, 0, chrome.title_height)?;

        info!(
            "Managing window {:#x} in frame {:#x} at {:?}{}",
            window,
            frame,
            geometry,
            if client.is_transient { " (transient)" } else { "" }
        );
        self.registry.insert(client);

        if start_iconic {
            // Never mapped, so no unmap notification will follow
            if let Some(client) = self.registry.get_mut(window) {
                client.iconic = true;
            }
            debug!("Client {:#x} starts iconic", window);
            self.set_wm_state(window, WmState::Iconic)?;
        } else {
            self.conn.map_window(window)?;
            self.conn.map_raised(frame)?;
            self.set_wm_state(window, WmState::Normal)?;
        }
        self.send_config(window)
    }

    /// Stop managing a client that withdrew or whose window is gone
    pub fn withdraw_client(&mut self, window: Window) -> Result<()> {
        self.release_client(window, Release::Withdraw)
    }

    /// Un-decorate a client so it survives the manager's exit
    pub fn remap_client(&mut self, window: Window) -> Result<()> {
        self.release_client(window, Release::Remap)
    }

    fn release_client(&mut self, window: Window, mode: Release) -> Result<()> {
        let was_fullscreen = self.registry.fullscreen().is_some_and(|fs| fs.window == window);
        let Some(client) = self.registry.remove(window) else {
            return Ok(());
        };
        if was_fullscreen {
            self.showing_taskbar = true;
        }
        debug!("Releasing client {:#x} ({:?})", window, mode);

        let position = remove_gravity(
            client.geometry,
            client.size_hints.gravity(),
            client.title_height(self.decor.bar_height),
        );

        self.conn.grab_server()?;
        if mode == Release::Withdraw {
            self.set_wm_state(window, WmState::Withdrawn)?;
        }
        self.conn
            .reparent_window(window, self.conn.root(), position.x, position.y)?;
        if mode == Release::Remap {
            self.conn.map_window(window)?;
        }
        self.conn.change_save_set(window, SetMode::DELETE)?;
        self.conn.destroy_window(client.frame)?;
        self.conn.ungrab_server()?;
        Ok(())
    }

    /// Iconify: unmap frame and window, expecting one unmap notification
    pub fn hide(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.registry.get_mut(window) else {
            return Ok(());
        };
        if client.iconic {
            return Ok(());
        }
        client.self_unmap_credits += 1;
        client.iconic = true;
        let frame = client.frame;
        debug!("Hiding client {:#x}", window);

        self.conn.unmap_window(frame)?;
        self.conn.unmap_window(window)?;
        self.set_wm_state(window, WmState::Iconic)
    }

    pub fn unhide(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.registry.get_mut(window) else {
            return Ok(());
        };
        client.self_unmap_credits = client.self_unmap_credits.saturating_sub(1);
        client.iconic = false;
        let frame = client.frame;
        debug!("Unhiding client {:#x}", window);

        self.conn.map_window(window)?;
        self.conn.map_raised(frame)?;
        self.set_wm_state(window, WmState::Normal)
    }

    /// Ask the client to close, or kill it when it cannot be asked
    pub fn send_wm_delete(&mut self, window: Window) -> Result<()> {
        if !self.registry.contains(window) {
            return Ok(());
        }
        if HintsManager::supports_delete(&self.conn, window)? {
            debug!("Sending WM_DELETE_WINDOW to {:#x}", window);
            let atoms = self.conn.atoms();
            let (protocols, delete) = (atoms.wm_protocols, atoms.wm_delete_window);
            self.conn
                .send_client_message(window, protocols, [delete, x11rb::CURRENT_TIME, 0, 0, 0])?;
        } else {
            info!("Killing client {:#x} (no WM_DELETE_WINDOW)", window);
            self.conn.kill_client(window)?;
        }
        if self.registry.focused() == Some(window) {
            self.registry.set_focused(None);
        }
        Ok(())
    }

    /// Raise a client unless it was the last one raised this way, in
    /// which case lower it
    pub fn raise_lower(&mut self, window: Window) -> Result<()> {
        let Some(frame) = self.registry.find_by_window(window).map(|c| c.frame) else {
            return Ok(());
        };
        if self.registry.topmost() != Some(window) {
            self.conn
                .configure_window(frame, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
            self.registry.set_topmost(Some(window));
        } else {
            self.conn
                .configure_window(frame, &ConfigureWindowAux::new().stack_mode(StackMode::BELOW))?;
            self.registry.set_topmost(None);
        }
        Ok(())
    }

    /// Enter or leave fullscreen. Transient clients are refused.
    pub fn toggle_fullscreen(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.registry.find_by_window(window) else {
            return Ok(());
        };
        if client.is_transient {
            debug!("Refusing fullscreen for transient {:#x}", window);
            return Ok(());
        }

        match self.registry.fullscreen() {
            Some(current) if current.window == window => {
                self.restore_fullscreen(current)?;
                self.registry.set_fullscreen(None);
                self.showing_taskbar = true;
                info!("Client {:#x} left fullscreen", window);
            }
            current => {
                if let Some(previous) = current {
                    self.restore_fullscreen(previous)?;
                    self.registry.set_fullscreen(None);
                }
                self.enter_fullscreen(window)?;
                self.showing_taskbar = false;
                info!("Client {:#x} is fullscreen", window);
            }
        }
        Ok(())
    }

    fn enter_fullscreen(&mut self, window: Window) -> Result<()> {
        let bar_height = self.decor.bar_height;
        let Some(client) = self.registry.get_mut(window) else {
            return Ok(());
        };
        let saved = client.geometry;
        let layout = fullscreen_layout(&client.size_hints, &client.chrome(bar_height), &self.limits);
        client.geometry = layout.client_geometry();
        let frame = client.frame;

        self.conn.configure_window(frame, &move_resize(layout.frame))?;
        self.conn.configure_window(window, &move_resize(layout.content))?;
        self.registry
            .set_fullscreen(Some(FullscreenState { window, saved }));
        self.send_config(window)
    }

    fn restore_fullscreen(&mut self, state: FullscreenState) -> Result<()> {
        if let Some(client) = self.registry.get_mut(state.window) {
            client.geometry = state.saved;
        }
        self.push_geometry(state.window)
    }

    /// Move and resize frame and content to the client's stored geometry
    pub(crate) fn push_geometry(&mut self, window: Window) -> Result<()> {
        let bar_height = self.decor.bar_height;
        let Some(client) = self.registry.find_by_window(window) else {
            return Ok(());
        };
        let title = client.title_height(bar_height);
        let content = Geometry::new(0, title, client.geometry.width, client.geometry.height);
        self.conn
            .configure_window(client.frame, &move_resize(client.frame_geometry(bar_height)))?;
        self.conn.configure_window(window, &move_resize(content))?;
        self.send_config(window)
    }

    pub(crate) fn set_wm_state(&self, window: Window, state: WmState) -> Result<()> {
        let wm_state = self.conn.atoms().wm_state;
        self.conn
            .change_property32(window, wm_state, wm_state, &[state.to_wire(), x11rb::NONE])
    }

    /// Tell the client where its window really is
    pub(crate) fn send_config(&self, window: Window) -> Result<()> {
        match self.registry.find_by_window(window) {
            Some(client) => self
                .conn
                .send_configure_notify(window, client.content_on_screen()),
            None => {
                warn!("No client for configure notify on {:#x}", window);
                Ok(())
            }
        }
    }
}

fn move_resize(rect: Geometry) -> ConfigureWindowAux {
    ConfigureWindowAux::new()
        .x(rect.x)
        .y(rect.y)
        .width(rect.width.max(1) as u32)
        .height(rect.height.max(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::hints::SizeHintsFlags;
    use crate::wm::test_support::{manager, manager_with};
    use crate::wm::testing::{MockConn, Request, ev};
    use x11rb::protocol::xproto::AtomEnum;

    #[test]
    fn test_map_request_creates_client_reachable_both_ways() {
        let mut conn = MockConn::new();
        conn.add_window(10, Geometry::new(0, 0, 300, 200));
        let mut wm = manager(conn);
        assert!(wm.registry.is_empty());

        wm.handle_event(ev::map_request(10)).unwrap();

        let frame = wm.registry.find_by_window(10).unwrap().frame;
        assert_ne!(frame, 10);
        assert_eq!(wm.registry.find_by_frame(frame).unwrap().window, 10);
        assert!(wm.conn.sent(&Request::SaveSet(10, SetMode::INSERT)));
        assert!(wm.conn.sent(&Request::Reparent {
            window: 10,
            parent: frame,
            x: 0,
            y: wm.decor.bar_height,
        }));
        assert!(wm.conn.sent(&Request::MapRaised(frame)));
        assert_eq!(wm.conn.wm_state(10), Some(1));
    }

    #[test]
    fn test_new_window_placement_and_clamp() {
        let mut conn = MockConn::new();
        conn.add_window(10, Geometry::new(0, 0, 5000, 10));
        conn.pointer.set((1023, 0));
        let mut wm = manager(conn);

        wm.manage_window(10).unwrap();

        let client = wm.registry.find_by_window(10).unwrap();
        let bar = wm.decor.bar_height;
        assert_eq!(client.geometry.width, 1024 - 4);
        assert_eq!(client.geometry.height, 80);
        assert_eq!(client.geometry.x, 0);
        assert_eq!(client.geometry.y, bar);
    }

    #[test]
    fn test_initial_iconic_state() {
        let mut conn = MockConn::new();
        conn.add_window(10, Geometry::new(10, 10, 300, 200));
        conn.properties
            .insert((10, AtomEnum::WM_HINTS.into()), vec![1 << 1, 0, 3]);
        let mut wm = manager(conn);

        wm.manage_window(10).unwrap();

        let client = wm.registry.find_by_window(10).unwrap();
        assert!(client.iconic);
        assert_eq!(client.self_unmap_credits, 0);
        assert_eq!(wm.conn.wm_state(10), Some(3));
        assert!(!wm.conn.sent(&Request::Map(10)));
        assert!(!wm.conn.sent(&Request::Unmap(10)));
    }

    #[test]
    fn test_transient_gets_thin_border_and_no_title() {
        let mut conn = MockConn::new();
        conn.add_window(10, Geometry::new(10, 10, 300, 200));
        conn.properties
            .insert((10, AtomEnum::WM_TRANSIENT_FOR.into()), vec![99]);
        let mut wm = manager(conn);

        wm.manage_window(10).unwrap();

        let client = wm.registry.find_by_window(10).unwrap().clone();
        assert!(client.is_transient);
        assert_eq!(client.border_width, 1);
        assert!(wm.conn.sent(&Request::Reparent {
            window: 10,
            parent: client.frame,
            x: 0,
            y: 0,
        }));

        let before = client.geometry;
        wm.toggle_fullscreen(10).unwrap();
        assert_eq!(wm.registry.fullscreen(), None);
        assert_eq!(wm.registry.find_by_window(10).unwrap().geometry, before);
    }

    #[test]
    fn test_self_unmap_suppression() {
        let mut wm = manager_with(&[10]);

        wm.hide(10).unwrap();
        assert_eq!(wm.registry.find_by_window(10).unwrap().self_unmap_credits, 1);
        assert_eq!(wm.conn.wm_state(10), Some(3));

        wm.handle_event(ev::unmap_notify(10)).unwrap();
        let client = wm.registry.find_by_window(10).unwrap();
        assert_eq!(client.self_unmap_credits, 0);

        wm.handle_event(ev::unmap_notify(10)).unwrap();
        assert!(wm.registry.find_by_window(10).is_none());
        assert_eq!(wm.conn.wm_state(10), Some(0));
    }

    #[test]
    fn test_unhide_restores_normal_state() {
        let mut wm = manager_with(&[10]);
        let frame = wm.registry.find_by_window(10).unwrap().frame;

        wm.hide(10).unwrap();
        wm.unhide(10).unwrap();

        let client = wm.registry.find_by_window(10).unwrap();
        assert!(!client.iconic);
        assert_eq!(client.self_unmap_credits, 0);
        assert!(wm.conn.sent(&Request::MapRaised(frame)));
        assert_eq!(wm.conn.wm_state(10), Some(1));
    }

    #[test]
    fn test_withdraw_reparents_at_gravity_position() {
        let mut wm = manager_with(&[10]);
        let client = wm.registry.find_by_window(10).unwrap().clone();

        wm.withdraw_client(10).unwrap();

        assert!(wm.conn.sent(&Request::Reparent {
            window: 10,
            parent: wm.conn.root(),
            x: client.geometry.x,
            y: client.geometry.y - wm.decor.bar_height,
        }));
        assert!(wm.conn.sent(&Request::SaveSet(10, SetMode::DELETE)));
        assert!(wm.conn.sent(&Request::DestroyWindow(client.frame)));
        assert!(wm.registry.find_by_frame(client.frame).is_none());
    }

    #[test]
    fn test_fullscreen_round_trip_is_exact() {
        let mut wm = manager_with(&[10]);
        let before = wm.registry.find_by_window(10).unwrap().geometry;

        wm.toggle_fullscreen(10).unwrap();
        let during = wm.registry.find_by_window(10).unwrap().geometry;
        assert_ne!(during, before);
        assert!(!wm.showing_taskbar);

        wm.toggle_fullscreen(10).unwrap();
        assert_eq!(wm.registry.find_by_window(10).unwrap().geometry, before);
        assert_eq!(wm.registry.fullscreen(), None);
        assert!(wm.showing_taskbar);
    }

    #[test]
    fn test_second_fullscreen_restores_first() {
        let mut wm = manager_with(&[10, 20]);
        let a = wm.registry.find_by_window(10).unwrap().clone();
        let b_frame = wm.registry.find_by_window(20).unwrap().frame;

        wm.toggle_fullscreen(10).unwrap();
        wm.conn.take_requests();
        wm.toggle_fullscreen(20).unwrap();

        assert_eq!(wm.registry.find_by_window(10).unwrap().geometry, a.geometry);
        assert_eq!(wm.registry.fullscreen().map(|fs| fs.window), Some(20));

        let requests = wm.conn.take_requests();
        let restore_a = requests
            .iter()
            .position(|r| *r == Request::Configure(a.frame, move_resize(a.frame_geometry(wm.decor.bar_height))))
            .unwrap();
        let grow_b = requests
            .iter()
            .position(|r| matches!(r, Request::Configure(w, aux) if *w == b_frame && aux.x == Some(-2)))
            .unwrap();
        assert!(restore_a < grow_b);
    }

    #[test]
    fn test_close_prefers_delete_protocol() {
        let mut wm = manager_with(&[10, 20]);
        let atoms = wm.conn.atoms().clone();
        wm.conn
            .properties
            .insert((10, atoms.wm_protocols), vec![atoms.wm_delete_window]);
        wm.registry.set_focused(Some(10));

        wm.send_wm_delete(10).unwrap();
        wm.send_wm_delete(20).unwrap();

        assert!(wm.conn.sent(&Request::ClientMessage {
            window: 10,
            message_type: atoms.wm_protocols,
            data: [atoms.wm_delete_window, 0, 0, 0, 0],
        }));
        assert!(wm.conn.sent(&Request::KillClient(20)));
        assert_eq!(wm.registry.focused(), None);
    }

    #[test]
    fn test_raise_lower_toggles() {
        let mut wm = manager_with(&[10]);
        let frame = wm.registry.find_by_window(10).unwrap().frame;

        wm.raise_lower(10).unwrap();
        assert_eq!(wm.registry.topmost(), Some(10));
        wm.raise_lower(10).unwrap();
        assert_eq!(wm.registry.topmost(), None);

        let requests = wm.conn.take_requests();
        assert_eq!(
            requests,
            vec![
                Request::Configure(frame, ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)),
                Request::Configure(frame, ConfigureWindowAux::new().stack_mode(StackMode::BELOW)),
            ]
        );
    }

    #[test]
    fn test_fullscreen_centers_capped_client() {
        let mut conn = MockConn::new();
        conn.add_window(10, Geometry::new(10, 10, 300, 200));
        conn.properties.insert(
            (10, AtomEnum::WM_NORMAL_HINTS.into()),
            vec![
                (SizeHintsFlags::P_POSITION | SizeHintsFlags::P_MAX_SIZE).bits(),
                0, 0, 0, 0, 0, 0, 640, 480,
            ],
        );
        let mut wm = manager(conn);
        wm.manage_window(10).unwrap();
        wm.conn.take_requests();

        wm.toggle_fullscreen(10).unwrap();

        let full_h = 768 - wm.decor.bar_height;
        assert!(wm.conn.sent(&Request::Configure(
            10,
            move_resize(Geometry::new((1024 - 640) / 2, (full_h - 480) / 2, 640, 480))
        )));
    }
}
