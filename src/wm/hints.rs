//! Hints Module
//!
//! Reading of client-advertised hints: WM_NORMAL_HINTS, WM_HINTS,
//! _MOTIF_WM_HINTS, WM_TRANSIENT_FOR and WM_PROTOCOLS. Malformed values are
//! normalized here or ignored by the solver, never reported as errors.

use anyhow::Result;
use bitflags::bitflags;
use x11rb::protocol::xproto::{AtomEnum, Window};

use crate::shared::WmState;
use crate::wm::xconn::XConn;

bitflags! {
    /// WM_SIZE_HINTS flags field
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SizeHintsFlags: u32 {
        const US_POSITION = 1 << 0;
        const US_SIZE     = 1 << 1;
        const P_POSITION  = 1 << 2;
        const P_SIZE      = 1 << 3;
        const P_MIN_SIZE  = 1 << 4;
        const P_MAX_SIZE  = 1 << 5;
        const P_RESIZE_INC = 1 << 6;
        const P_ASPECT    = 1 << 7;
        const P_BASE_SIZE = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

/// Window gravity as advertised in WM_NORMAL_HINTS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    /// Unknown values and 0 (ForgetGravity/Unmap) fall back to NorthWest
    pub fn from_wire(value: u32) -> Self {
        match value {
            2 => Gravity::North,
            3 => Gravity::NorthEast,
            4 => Gravity::West,
            5 => Gravity::Center,
            6 => Gravity::East,
            7 => Gravity::SouthWest,
            8 => Gravity::South,
            9 => Gravity::SouthEast,
            10 => Gravity::Static,
            _ => Gravity::NorthWest,
        }
    }
}

/// Size hints (XSizeHints equivalent), cached per client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: SizeHintsFlags,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: u32,
}

impl SizeHints {
    /// Parse the 18 CARD32 values of a WM_SIZE_HINTS property.
    /// Short properties (old 15-value clients) leave the tail at zero.
    pub fn from_wire(values: &[u32]) -> Self {
        let at = |i: usize| values.get(i).copied().unwrap_or(0);
        // Values are signed on the wire; clamp to a sane range so that a
        // garbage CARD32 cannot overflow later arithmetic.
        let signed = |i: usize| (at(i) as i32).clamp(0, i32::from(i16::MAX));
        Self {
            flags: SizeHintsFlags::from_bits_truncate(at(0)),
            min_width: signed(5),
            min_height: signed(6),
            max_width: signed(7),
            max_height: signed(8),
            width_inc: signed(9),
            height_inc: signed(10),
            base_width: signed(15),
            base_height: signed(16),
            win_gravity: at(17),
        }
    }

    pub fn min_size(&self) -> Option<(i32, i32)> {
        self.flags
            .contains(SizeHintsFlags::P_MIN_SIZE)
            .then_some((self.min_width, self.min_height))
    }

    pub fn max_size(&self) -> Option<(i32, i32)> {
        self.flags
            .contains(SizeHintsFlags::P_MAX_SIZE)
            .then_some((self.max_width, self.max_height))
    }

    pub fn increments(&self) -> Option<(i32, i32)> {
        self.flags
            .contains(SizeHintsFlags::P_RESIZE_INC)
            .then_some((self.width_inc, self.height_inc))
    }

    /// Base for increment arithmetic: the base size, else the minimum size, else zero
    pub fn increment_base(&self) -> (i32, i32) {
        if self.flags.contains(SizeHintsFlags::P_BASE_SIZE) {
            (self.base_width, self.base_height)
        } else if let Some(min) = self.min_size() {
            min
        } else {
            (0, 0)
        }
    }

    pub fn gravity(&self) -> Gravity {
        if self.flags.contains(SizeHintsFlags::P_WIN_GRAVITY) {
            Gravity::from_wire(self.win_gravity)
        } else {
            Gravity::NorthWest
        }
    }

    /// Whether the client (or its user) chose where the window goes
    pub fn has_position(&self) -> bool {
        self.flags
            .intersects(SizeHintsFlags::US_POSITION | SizeHintsFlags::P_POSITION)
    }
}

/// The parts of WM_HINTS the manager acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmHints {
    pub initial_state: Option<WmState>,
}

impl WmHints {
    const STATE_HINT: u32 = 1 << 1;

    pub fn from_wire(values: &[u32]) -> Self {
        let flags = values.first().copied().unwrap_or(0);
        let initial_state = if flags & Self::STATE_HINT != 0 {
            values.get(2).copied().and_then(WmState::from_wire)
        } else {
            None
        };
        Self { initial_state }
    }
}

/// Motif decoration request (_MOTIF_WM_HINTS)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotifHints {
    pub flags: u32,
    pub decorations: u32,
}

impl MotifHints {
    const HINTS_DECORATIONS: u32 = 1 << 1;
    const DECOR_ALL: u32 = 1 << 0;
    const DECOR_TITLE: u32 = 1 << 3;

    pub fn from_wire(values: &[u32]) -> Option<Self> {
        (values.len() >= 3).then(|| Self {
            flags: values[0],
            decorations: values[2],
        })
    }

    pub fn wants_title(&self) -> bool {
        self.flags & Self::HINTS_DECORATIONS == 0
            || self.decorations & (Self::DECOR_ALL | Self::DECOR_TITLE) != 0
    }
}

/// Hints manager
pub struct HintsManager;

impl HintsManager {
    /// Read size hints for a window; absent property yields defaults
    pub fn read_size_hints<X: XConn>(conn: &X, window: Window) -> Result<SizeHints> {
        Ok(conn
            .get_property32(
                window,
                AtomEnum::WM_NORMAL_HINTS.into(),
                AtomEnum::WM_SIZE_HINTS.into(),
                18, // XSizeHints has 18 32-bit values
            )?
            .map(|values| SizeHints::from_wire(&values))
            .unwrap_or_default())
    }

    /// Read WM hints for a window
    pub fn read_wm_hints<X: XConn>(conn: &X, window: Window) -> Result<Option<WmHints>> {
        Ok(conn
            .get_property32(window, AtomEnum::WM_HINTS.into(), AtomEnum::WM_HINTS.into(), 9)?
            .map(|values| WmHints::from_wire(&values)))
    }

    /// Whether a title bar should be drawn, per _MOTIF_WM_HINTS
    pub fn read_has_title<X: XConn>(conn: &X, window: Window) -> Result<bool> {
        let atom = conn.atoms().motif_wm_hints;
        Ok(conn
            .get_property32(window, atom, atom, 5)?
            .and_then(|values| MotifHints::from_wire(&values))
            .is_none_or(|hints| hints.wants_title()))
    }

    pub fn read_transient_for<X: XConn>(conn: &X, window: Window) -> Result<Option<Window>> {
        Ok(conn
            .get_property32(
                window,
                AtomEnum::WM_TRANSIENT_FOR.into(),
                AtomEnum::WINDOW.into(),
                1,
            )?
            .and_then(|values| values.first().copied())
            .filter(|&owner| owner != 0))
    }

    /// Whether the client lists WM_DELETE_WINDOW in WM_PROTOCOLS
    pub fn supports_delete<X: XConn>(conn: &X, window: Window) -> Result<bool> {
        let atoms = conn.atoms();
        Ok(conn
            .get_property32(window, atoms.wm_protocols, AtomEnum::ATOM.into(), 32)?
            .is_some_and(|protocols| protocols.contains(&atoms.wm_delete_window)))
    }

    pub fn read_name<X: XConn>(conn: &X, window: Window) -> Result<Option<String>> {
        conn.get_text_property(window, AtomEnum::WM_NAME.into())
    }
}
