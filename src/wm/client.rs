use x11rb::protocol::xproto::{Colormap, Window};

use crate::shared::Geometry;
use crate::wm::geometry::Chrome;
use crate::wm::hints::SizeHints;

/// Window Manager client state
/// Represents a top-level window being managed by the WM
#[derive(Debug, Clone)]
pub struct Client {
    /// The application's own window
    pub window: Window,

    /// Decoration window the content is reparented into
    pub frame: Window,

    /// Content rectangle; see [`crate::wm::geometry`] for the convention
    pub geometry: Geometry,

    pub border_width: i32,

    /// Last advertised WM_NORMAL_HINTS
    pub size_hints: SizeHints,

    pub colormap: Colormap,

    /// Window title, `None` until first fetched
    pub name: Option<String>,

    pub is_transient: bool,
    pub has_title: bool,
    pub iconic: bool,

    /// Unmap notifications caused by the manager itself that must be swallowed
    pub self_unmap_credits: u32,
}

impl Client {
    pub fn new(window: Window, frame: Window, geometry: Geometry) -> Self {
        Self {
            window,
            frame,
            geometry,
            border_width: 0,
            size_hints: SizeHints::default(),
            colormap: x11rb::NONE,
            name: None,
            is_transient: false,
            has_title: true,
            iconic: false,
            self_unmap_credits: 0,
        }
    }

    /// Height of the title band; transients and undecorated clients have none
    pub fn title_height(&self, bar_height: i32) -> i32 {
        if self.is_transient || !self.has_title {
            0
        } else {
            bar_height
        }
    }

    pub fn chrome(&self, bar_height: i32) -> Chrome {
        Chrome {
            title_height: self.title_height(bar_height),
            border_width: self.border_width,
        }
    }

    /// Frame rectangle (outer position, inner size) derived from the content
    pub fn frame_geometry(&self, bar_height: i32) -> Geometry {
        let title = self.title_height(bar_height);
        Geometry {
            x: self.geometry.x,
            y: self.geometry.y - title,
            width: self.geometry.width,
            height: self.geometry.height + title,
        }
    }

    /// Where the content window really is on screen, for ConfigureNotify
    pub fn content_on_screen(&self) -> Geometry {
        Geometry {
            x: self.geometry.x + self.border_width,
            y: self.geometry.y + self.border_width,
            ..self.geometry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_geometry_adds_title_band() {
        let mut client = Client::new(1, 2, Geometry::new(10, 40, 300, 200));
        client.border_width = 2;
        assert_eq!(client.frame_geometry(20), Geometry::new(10, 20, 300, 220));
        assert_eq!(client.content_on_screen(), Geometry::new(12, 42, 300, 200));
    }

    #[test]
    fn test_transient_has_no_title_band() {
        let mut client = Client::new(1, 2, Geometry::new(10, 40, 300, 200));
        client.is_transient = true;
        assert_eq!(client.title_height(20), 0);
        assert_eq!(client.frame_geometry(20), client.geometry);
    }
}
