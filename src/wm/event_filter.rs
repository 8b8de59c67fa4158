//! Event Filter Module
//!
//! Which events an interactive loop consumes. Everything else is left for
//! the outer dispatch loop.

use x11rb::protocol::Event;

/// Event filter used by the interactive sub-loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Button presses, releases and pointer motion
    Mouse,
    /// Mouse events plus exposures, so other frames keep repainting
    MouseAndExpose,
}

impl EventFilter {
    pub fn accepts(self, event: &Event) -> bool {
        let mouse = matches!(
            event,
            Event::ButtonPress(_) | Event::ButtonRelease(_) | Event::MotionNotify(_)
        );
        match self {
            EventFilter::Mouse => mouse,
            EventFilter::MouseAndExpose => mouse || matches!(event, Event::Expose(_)),
        }
    }
}
