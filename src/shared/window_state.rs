//! Window state shared between the lifecycle code and the geometry solver
//!
//! Plain data only: no protocol access lives here.

/// Integer rectangle in screen coordinates.
///
/// Width and height are signed so intermediate solver arithmetic can go
/// negative; every rectangle handed to the server is clamped first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn,
    Normal,
    Iconic,
}

impl WmState {
    /// Value stored in the WM_STATE property
    pub fn to_wire(self) -> u32 {
        match self {
            WmState::Withdrawn => 0,
            WmState::Normal => 1,
            WmState::Iconic => 3,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(WmState::Withdrawn),
            1 => Some(WmState::Normal),
            3 => Some(WmState::Iconic),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wm_state_wire_values() {
        assert_eq!(WmState::Normal.to_wire(), 1);
        assert_eq!(WmState::from_wire(3), Some(WmState::Iconic));
        assert_eq!(WmState::from_wire(2), None);
    }
}
