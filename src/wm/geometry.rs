//! Geometry Solver
//!
//! Pure functions computing legal client rectangles from size hints,
//! gravity and screen bounds. Nothing here talks to the server.
//!
//! A client's [`Geometry`] stores the frame's outer left edge in `x`, the
//! top of the content area (below the title band) in `y`, and the content
//! size in `width`/`height`. The frame window sits at `(x, y - title)` with
//! size `(width, height + title)` and an X border of `border_width` pixels.

use crate::shared::Geometry;
use crate::wm::hints::{Gravity, SizeHints};

/// Per-client decoration sizes the solver needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrome {
    pub title_height: i32,
    pub border_width: i32,
}

impl Chrome {
    fn borders(&self) -> i32 {
        2 * self.border_width
    }
}

/// Screen size and the built-in minimum window size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub screen_width: i32,
    pub screen_height: i32,
    pub floor_width: i32,
    pub floor_height: i32,
}

/// Vertical shift between the position a client asks for and the content
/// position the manager uses. Only the title band moves the window.
pub fn gravity_offset(gravity: Gravity, title_height: i32) -> i32 {
    match gravity {
        Gravity::NorthWest | Gravity::North | Gravity::NorthEast => title_height,
        Gravity::West | Gravity::Center | Gravity::East => title_height / 2,
        Gravity::SouthWest | Gravity::South | Gravity::SouthEast | Gravity::Static => 0,
    }
}

/// Client-requested position to manager position
pub fn apply_gravity(geometry: Geometry, gravity: Gravity, title_height: i32) -> Geometry {
    Geometry {
        y: geometry.y + gravity_offset(gravity, title_height),
        ..geometry
    }
}

/// Manager position back to the position the client expects
pub fn remove_gravity(geometry: Geometry, gravity: Gravity, title_height: i32) -> Geometry {
    Geometry {
        y: geometry.y - gravity_offset(gravity, title_height),
        ..geometry
    }
}

/// Largest value not above `requested` that is congruent to `base` modulo
/// `increment`. A non-positive increment disables snapping.
pub fn snap_increment(requested: i32, base: i32, increment: i32) -> i32 {
    if increment <= 0 {
        return requested;
    }
    requested - (requested - base).rem_euclid(increment)
}

/// Minimum size honoured while resizing.
///
/// A hinted minimum that is non-positive or does not fit on the screen is
/// replaced by the floor; otherwise it is raised to at least the floor.
pub fn effective_min(hints: &SizeHints, limits: &Limits) -> (i32, i32) {
    let pick = |hinted: Option<i32>, floor: i32, screen: i32| match hinted {
        Some(min) if min > 0 && min <= screen - 1 => min.max(floor),
        _ => floor,
    };
    let min = hints.min_size();
    (
        pick(min.map(|m| m.0), limits.floor_width, limits.screen_width),
        pick(min.map(|m| m.1), limits.floor_height, limits.screen_height),
    )
}

/// Hinted maximum size, per axis, when it is not below the effective minimum
pub fn effective_max(hints: &SizeHints, limits: &Limits) -> (Option<i32>, Option<i32>) {
    let (min_w, min_h) = effective_min(hints, limits);
    match hints.max_size() {
        Some((max_w, max_h)) => (
            (max_w >= min_w).then_some(max_w),
            (max_h >= min_h).then_some(max_h),
        ),
        None => (None, None),
    }
}

/// Largest content size that fits on the screen with the frame around it
pub fn screen_max(chrome: &Chrome, limits: &Limits) -> (i32, i32) {
    (
        (limits.screen_width - chrome.borders()).max(1),
        (limits.screen_height - chrome.title_height - chrome.borders()).max(1),
    )
}

/// Solve a raw content size against the hints: increment snapping, then
/// minimum, then maximum, then the screen.
pub fn solve_size(
    raw_width: i32,
    raw_height: i32,
    hints: &SizeHints,
    chrome: &Chrome,
    limits: &Limits,
) -> (i32, i32) {
    let (mut width, mut height) = (raw_width, raw_height);
    if let Some((inc_w, inc_h)) = hints.increments() {
        let (base_w, base_h) = hints.increment_base();
        width = snap_increment(width, base_w, inc_w);
        height = snap_increment(height, base_h, inc_h);
    }

    let (min_w, min_h) = effective_min(hints, limits);
    width = width.max(min_w);
    height = height.max(min_h);

    let (max_w, max_h) = effective_max(hints, limits);
    if let Some(max_w) = max_w {
        width = width.min(max_w);
    }
    if let Some(max_h) = max_h {
        height = height.min(max_h);
    }

    let (screen_w, screen_h) = screen_max(chrome, limits);
    (width.min(screen_w), height.min(screen_h))
}

/// Clamp a rectangle so the whole frame stays on the screen.
///
/// Sizes are kept between the floor and the screen; the position is then
/// moved so the frame's border and title band are inside the screen.
pub fn clamp_to_screen(geometry: Geometry, chrome: &Chrome, limits: &Limits) -> Geometry {
    let (max_w, max_h) = screen_max(chrome, limits);
    let width = geometry
        .width
        .clamp(limits.floor_width.min(max_w), max_w);
    let height = geometry
        .height
        .clamp(limits.floor_height.min(max_h), max_h);

    let max_x = (limits.screen_width - width - chrome.borders()).max(0);
    let min_y = chrome.title_height;
    let max_y = (limits.screen_height - height - chrome.borders()).max(min_y);

    Geometry {
        x: geometry.x.clamp(0, max_x),
        y: geometry.y.clamp(min_y, max_y),
        width,
        height,
    }
}

/// Proportional placement for a window that did not choose its position:
/// the pointer's fraction of the screen becomes the window's fraction of
/// the free space, so a pointer at the far edge puts the frame flush
/// against that edge.
pub fn initial_placement(
    geometry: Geometry,
    pointer: (i32, i32),
    chrome: &Chrome,
    limits: &Limits,
) -> Geometry {
    let spread = |pointer: i32, screen: i32, free: i32| {
        if screen <= 1 || free <= 0 {
            0
        } else {
            let pointer = i64::from(pointer.clamp(0, screen - 1));
            (pointer * i64::from(free) / i64::from(screen - 1)) as i32
        }
    };
    let free_x = limits.screen_width - geometry.width - chrome.borders();
    let free_y =
        limits.screen_height - geometry.height - chrome.title_height - chrome.borders();

    Geometry {
        x: spread(pointer.0, limits.screen_width, free_x),
        // Gravity is applied afterwards and adds the title band back
        y: spread(pointer.1, limits.screen_height, free_y),
        ..geometry
    }
}

/// Legal range of a client's position during a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragRange {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl DragRange {
    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }

    /// Rectangle the pointer is confined to when it grabs the client at
    /// `offset` from the client's origin
    pub fn pointer_region(&self, offset: (i32, i32)) -> Geometry {
        Geometry {
            x: self.min_x + offset.0,
            y: self.min_y + offset.1,
            width: (self.max_x - self.min_x + 1).max(1),
            height: (self.max_y - self.min_y + 1).max(1),
        }
    }
}

/// Horizontal positions keep the frame fully on screen; vertically the
/// title band may not leave the top and must stay reachable at the bottom.
pub fn drag_range(geometry: Geometry, chrome: &Chrome, limits: &Limits) -> DragRange {
    let min_y = chrome.title_height;
    DragRange {
        min_x: 0,
        max_x: (limits.screen_width - geometry.width - chrome.borders()).max(0),
        min_y,
        max_y: (limits.screen_height - chrome.borders()).max(min_y),
    }
}

/// Starting rectangle of a sweep: anchored at the pressed point with the
/// effective minimum size, re-anchored if that would leave the screen.
pub fn sweep_anchor(
    press: (i32, i32),
    hints: &SizeHints,
    chrome: &Chrome,
    limits: &Limits,
) -> Geometry {
    let (min_w, min_h) = effective_min(hints, limits);
    let (width, height) = solve_size(min_w, min_h, hints, chrome, limits);
    let mut x = press.0;
    let mut y = press.1 + chrome.title_height;

    if x + width + chrome.borders() > limits.screen_width {
        x = limits.screen_width - width - chrome.borders();
    }
    if y + height + chrome.borders() > limits.screen_height {
        y = limits.screen_height - height - chrome.borders();
    }

    Geometry {
        x: x.max(0),
        y: y.max(chrome.title_height),
        width,
        height,
    }
}

/// Candidate rectangle while the opposite corner follows the pointer
pub fn sweep_to(
    anchor: Geometry,
    pointer: (i32, i32),
    hints: &SizeHints,
    chrome: &Chrome,
    limits: &Limits,
) -> Geometry {
    let raw_width = pointer.0 - anchor.x - chrome.borders();
    let raw_height = pointer.1 - anchor.y - chrome.borders();
    let (width, height) = solve_size(raw_width, raw_height, hints, chrome, limits);
    Geometry {
        width,
        height,
        ..anchor
    }
}

/// Frame and content placement of a fullscreen client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullscreenLayout {
    /// Frame rectangle in screen coordinates (outer edge)
    pub frame: Geometry,
    /// Content rectangle relative to the frame
    pub content: Geometry,
}

impl FullscreenLayout {
    /// The client geometry recorded while fullscreen
    pub fn client_geometry(&self) -> Geometry {
        Geometry {
            x: self.frame.x + self.content.x,
            y: self.frame.y + self.content.y,
            width: self.content.width,
            height: self.content.height,
        }
    }
}

/// The frame covers the screen below the title band with its border pushed
/// off screen. Content capped by a maximum-size hint is centered.
pub fn fullscreen_layout(hints: &SizeHints, chrome: &Chrome, limits: &Limits) -> FullscreenLayout {
    let full_w = limits.screen_width;
    let full_h = limits.screen_height - chrome.title_height;
    let (mut width, mut height) = (full_w, full_h);
    let (mut x_offset, mut y_offset) = (0, 0);

    if let Some((max_w, max_h)) = hints.max_size() {
        if max_w > 0 && max_w < full_w {
            width = max_w;
            x_offset = (full_w - width) / 2;
        }
        if max_h > 0 && max_h < full_h {
            height = max_h;
            y_offset = (full_h - height) / 2;
        }
    }

    FullscreenLayout {
        frame: Geometry::new(
            -chrome.border_width,
            chrome.title_height - chrome.border_width,
            full_w,
            full_h,
        ),
        content: Geometry::new(x_offset, y_offset, width, height),
    }
}
