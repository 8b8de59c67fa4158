//! MoveResize Module
//!
//! Interactive move (drag) and resize (sweep), plus press/release tracking
//! on the title-bar controls. Each runs a short modal loop over
//! [`WindowManager::next_filtered`]; events it does not consume are
//! deferred to the outer loop.

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ConfigureWindowAux, Window};

use crate::config::TitleControl;
use crate::shared::Geometry;
use crate::wm::event_filter::EventFilter;
use crate::wm::geometry::{drag_range, sweep_anchor, sweep_to};
use crate::wm::xconn::{CursorKind, WindowSpec, XConn};
use crate::wm::WindowManager;

/// Progress of an interactive loop after one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
}

impl<X: XConn> WindowManager<X> {
    /// Follow a press on a title-bar control until release and act only
    /// if the release lands on the same control
    pub(crate) fn track_title_click(&mut self, window: Window, control: TitleControl) -> Result<()> {
        let root = self.conn.root();
        if !self.conn.grab_pointer(root, None)? {
            debug!("Pointer grab refused; ignoring title click");
            return Ok(());
        }
        self.conn.grab_server()?;
        let release_x = loop {
            if let Event::ButtonRelease(e) = self.next_filtered(EventFilter::Mouse)? {
                break i32::from(e.root_x);
            }
        };
        self.conn.ungrab_server()?;
        self.conn.ungrab_pointer()?;

        let Some(client) = self.registry.find_by_window(window) else {
            return Ok(());
        };
        let offset = client.geometry.x + client.border_width + client.geometry.width - release_x;
        if self.decor.hit_test(offset) != Some(control) {
            debug!("Title click on {:#x} released elsewhere", window);
            return Ok(());
        }

        debug!("Title control {:?} on {:#x}", control, window);
        match control {
            TitleControl::Close => self.send_wm_delete(window),
            TitleControl::RaiseLower => self.raise_lower(window),
            TitleControl::Resize => self.sweep_client(window),
        }
    }

    /// Drag a client by its title bar until the button is released
    pub fn move_client(&mut self, window: Window) -> Result<()> {
        if self.is_fullscreen(window) {
            return Ok(());
        }
        let bar_height = self.decor.bar_height;
        let Some(client) = self.registry.find_by_window(window) else {
            return Ok(());
        };
        let start = client.geometry;
        let title = client.title_height(bar_height);
        let frame = client.frame;
        let range = drag_range(start, &client.chrome(bar_height), &self.limits);

        let pointer = self.conn.query_pointer()?;
        let offset = (pointer.0 - start.x, pointer.1 - start.y);
        let confine = self.conn.create_window(&WindowSpec::input_only(
            self.conn.root(),
            range.pointer_region(offset),
        ))?;
        self.conn.map_window(confine)?;

        if !self.conn.grab_pointer(confine, Some(CursorKind::Move))? {
            debug!("Pointer grab refused; move of {:#x} aborted", window);
            return self.conn.destroy_window(confine);
        }

        loop {
            let step = match self.next_filtered(EventFilter::MouseAndExpose)? {
                Event::Expose(e) => {
                    self.redraw_frame(e.window)?;
                    Step::Continue
                }
                Event::MotionNotify(e) => {
                    let (x, y) = range.clamp(
                        start.x + i32::from(e.root_x) - pointer.0,
                        start.y + i32::from(e.root_y) - pointer.1,
                    );
                    self.set_position(window, x, y)?;
                    self.conn.configure_window(frame, &ConfigureWindowAux::new().x(x).y(y - title))?;
                    self.send_config(window)?;
                    Step::Continue
                }
                Event::ButtonRelease(_) => Step::Done,
                _ => Step::Continue,
            };
            if step == Step::Done {
                break;
            }
        }

        if let Some(end) = self.registry.find_by_window(window).map(|c| c.geometry) {
            self.conn.configure_window(
                frame,
                &ConfigureWindowAux::new().x(end.x).y(end.y - title),
            )?;
            debug!("Moved {:#x} to ({}, {})", window, end.x, end.y);
        }
        self.conn.ungrab_pointer()?;
        self.conn.destroy_window(confine)
    }

    /// Resize a client by sweeping out a new rectangle: a press fixes the
    /// top-left corner, the release fixes the opposite one
    pub fn sweep_client(&mut self, window: Window) -> Result<()> {
        if self.is_fullscreen(window) {
            return Ok(());
        }
        let bar_height = self.decor.bar_height;
        let Some(client) = self.registry.find_by_window(window).cloned() else {
            return Ok(());
        };
        let chrome = client.chrome(bar_height);
        let hints = client.size_hints;
        let (screen_width, screen_height) = (self.limits.screen_width, self.limits.screen_height);

        let confine = self.conn.create_window(&WindowSpec::input_only(
            self.conn.root(),
            Geometry::new(0, chrome.title_height, screen_width, screen_height - chrome.title_height),
        ))?;
        self.conn.map_window(confine)?;
        if !self.conn.grab_pointer(confine, Some(CursorKind::ResizeStart))? {
            debug!("Pointer grab refused; sweep of {:#x} aborted", window);
            return self.conn.destroy_window(confine);
        }

        let press = loop {
            if let Event::ButtonPress(e) = self.next_filtered(EventFilter::Mouse)? {
                break (i32::from(e.root_x), i32::from(e.root_y));
            }
        };
        let anchor = sweep_anchor(press, &hints, &chrome, &self.limits);

        // Nobody is drawn focused while the preview covers the client
        let saved_focus = self.registry.focused();
        self.registry.set_focused(None);
        if let Some(previous) = saved_focus {
            self.redraw_client(previous)?;
        }

        let corner = (
            anchor.x + anchor.width + 2 * chrome.border_width,
            anchor.y + anchor.height + 2 * chrome.border_width,
        );
        self.conn.configure_window(
            confine,
            &ConfigureWindowAux::new()
                .x(corner.0)
                .y(corner.1)
                .width((screen_width - corner.0).max(1) as u32)
                .height((screen_height - corner.1).max(1) as u32),
        )?;
        if !self.conn.grab_pointer(confine, Some(CursorKind::ResizeEnd))? {
            debug!("Second pointer grab refused; sweep of {:#x} aborted", window);
            self.conn.ungrab_pointer()?;
            self.registry.set_focused(saved_focus);
            return self.conn.destroy_window(confine);
        }

        let mut candidate = anchor;
        let preview = self.decor.create_preview(&self.conn, &client, candidate)?;
        loop {
            let step = match self.next_filtered(EventFilter::MouseAndExpose)? {
                Event::Expose(e) => {
                    self.redraw_frame(e.window)?;
                    Step::Continue
                }
                Event::MotionNotify(e) => {
                    let pointer = (i32::from(e.root_x), i32::from(e.root_y));
                    candidate = sweep_to(anchor, pointer, &hints, &chrome, &self.limits);
                    self.decor
                        .update_preview(&self.conn, &preview, &client, candidate)?;
                    Step::Continue
                }
                Event::ButtonRelease(_) => Step::Done,
                _ => Step::Continue,
            };
            if step == Step::Done {
                break;
            }
        }

        self.conn.ungrab_pointer()?;
        self.registry.set_focused(saved_focus);
        if let Some(client) = self.registry.get_mut(window) {
            client.geometry = candidate;
        }
        self.push_geometry(window)?;
        info!("Resized {:#x} to {}x{}", window, candidate.width, candidate.height);

        preview.destroy(&self.conn)?;
        self.conn.destroy_window(confine)
    }

    fn is_fullscreen(&self, window: Window) -> bool {
        self.registry.fullscreen().is_some_and(|fs| fs.window == window)
    }

    fn set_position(&mut self, window: Window, x: i32, y: i32) -> Result<()> {
        if let Some(client) = self.registry.get_mut(window) {
            client.geometry.x = x;
            client.geometry.y = y;
        }
        Ok(())
    }

    fn redraw_frame(&self, frame: Window) -> Result<()> {
        match self.registry.find_by_frame(frame).map(|c| c.window) {
            Some(window) => self.redraw_client(window),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::hints::SizeHintsFlags;
    use crate::wm::test_support::{manager, manager_with};
    use crate::wm::testing::{MockConn, Request, ev};
    use x11rb::protocol::xproto::AtomEnum;

    #[test]
    fn test_sweep_commits_snapped_size() {
        let mut conn = MockConn::new();
        conn.add_window(10, Geometry::new(100, 100, 300, 200));
        let mut wire = vec![0u32; 18];
        wire[0] = (SizeHintsFlags::P_POSITION
            | SizeHintsFlags::P_MIN_SIZE
            | SizeHintsFlags::P_RESIZE_INC
            | SizeHintsFlags::P_BASE_SIZE)
            .bits();
        wire[5] = 100;
        wire[6] = 50;
        wire[9] = 10;
        wire[10] = 10;
        wire[15] = 20;
        wire[16] = 10;
        conn.properties
            .insert((10, AtomEnum::WM_NORMAL_HINTS.into()), wire);
        let mut wm = manager(conn);
        wm.manage_window(10).unwrap();
        wm.focus_client(10).unwrap();
        let bar = wm.decor.bar_height;

        wm.conn.push_event(ev::motion((210, 110)));
        wm.conn.push_event(ev::button_press(1, 1, (200, 100), (200, 100)));
        let bottom = (100 + bar + 204) as i16;
        wm.conn.push_event(ev::motion((351, bottom)));
        wm.conn.push_event(ev::button_release((351, bottom)));
        wm.conn.take_requests();

        wm.sweep_client(10).unwrap();

        let client = wm.registry.find_by_window(10).unwrap();
        assert_eq!(client.geometry, Geometry::new(200, 100 + bar, 140, 200));
        assert_eq!(wm.registry.focused(), Some(10));
        assert!(wm.conn.sent(&Request::ConfigureNotify(
            10,
            Geometry::new(202, 102 + bar, 140, 200)
        )));
        assert!(wm.conn.sent(&Request::GrabPointer(
            0x1001,
            Some(CursorKind::ResizeEnd)
        )));
    }

    #[test]
    fn test_sweep_grab_failure_changes_nothing() {
        let mut wm = manager_with(&[10]);
        let before = wm.registry.find_by_window(10).unwrap().geometry;
        wm.conn.grab_results.borrow_mut().push_back(false);

        wm.sweep_client(10).unwrap();

        assert_eq!(wm.registry.find_by_window(10).unwrap().geometry, before);
        let requests = wm.conn.take_requests();
        let confine = match requests[0] {
            Request::CreateWindow(id, _) => id,
            ref other => panic!("unexpected request {:?}", other),
        };
        assert_eq!(requests.last(), Some(&Request::DestroyWindow(confine)));
        assert!(!requests.iter().any(|r| matches!(r, Request::Configure(10, _))));
    }

    #[test]
    fn test_second_grab_failure_restores_focus() {
        let mut wm = manager_with(&[10]);
        wm.focus_client(10).unwrap();
        let before = wm.registry.find_by_window(10).unwrap().geometry;
        wm.conn.grab_results.borrow_mut().extend([true, false]);
        wm.conn.push_event(ev::button_press(1, 1, (200, 200), (200, 200)));

        wm.sweep_client(10).unwrap();

        assert_eq!(wm.registry.focused(), Some(10));
        assert_eq!(wm.registry.find_by_window(10).unwrap().geometry, before);
    }

    #[test]
    fn test_move_follows_pointer_within_bounds() {
        let mut wm = manager_with(&[10]);
        let client = wm.registry.find_by_window(10).unwrap().clone();
        let bar = wm.decor.bar_height;
        wm.conn.pointer.set((150, 110));

        wm.conn.push_event(ev::motion((170, 130)));
        wm.conn.push_event(ev::expose(client.frame, 0));
        wm.conn.push_event(ev::motion((-500, -500)));
        wm.conn.push_event(ev::map_request(77));
        wm.conn.push_event(ev::button_release((-500, -500)));

        wm.move_client(10).unwrap();

        let geometry = wm.registry.find_by_window(10).unwrap().geometry;
        assert_eq!((geometry.x, geometry.y), (0, bar));
        assert_eq!((geometry.width, geometry.height), (300, 200));
        assert!(wm.conn.sent(&Request::Configure(
            client.frame,
            ConfigureWindowAux::new().x(120).y(120 + bar - bar)
        )));
        assert!(wm.conn.sent(&Request::UngrabPointer));
        assert_eq!(wm.deferred_len(), 1);
    }

    #[test]
    fn test_move_grab_failure_destroys_confine_window() {
        let mut wm = manager_with(&[10]);
        let before = wm.registry.find_by_window(10).unwrap().geometry;
        wm.conn.grab_results.borrow_mut().push_back(false);

        wm.move_client(10).unwrap();

        assert_eq!(wm.registry.find_by_window(10).unwrap().geometry, before);
        let requests = wm.conn.take_requests();
        assert!(matches!(requests.last(), Some(Request::DestroyWindow(_))));
        assert!(!requests.contains(&Request::UngrabPointer));
    }

    #[test]
    fn test_title_click_acts_only_on_same_control() {
        let mut wm = manager_with(&[10]);
        let client = wm.registry.find_by_window(10).unwrap().clone();
        let right_edge = client.geometry.x + client.border_width + client.geometry.width;
        wm.registry.set_topmost(None);

        // Released over the close box: no raise
        wm.conn.push_event(ev::button_release((right_edge as i16 - 2, 110)));
        wm.track_title_click(10, TitleControl::RaiseLower).unwrap();
        assert_eq!(wm.registry.topmost(), None);

        // Released over the raise/lower box
        let control = wm.decor.control_width;
        wm.conn
            .push_event(ev::button_release(((right_edge - control - 2) as i16, 110)));
        wm.track_title_click(10, TitleControl::RaiseLower).unwrap();
        assert_eq!(wm.registry.topmost(), Some(10));
    }

    #[test]
    fn test_move_ignores_fullscreen_client() {
        let mut wm = manager_with(&[10]);
        wm.toggle_fullscreen(10).unwrap();
        wm.conn.take_requests();
        wm.move_client(10).unwrap();
        assert!(wm.conn.take_requests().is_empty());
    }
}
