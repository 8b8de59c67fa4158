//! Keyboard Module
//!
//! Key bindings on the root window and NumLock modifier discovery.

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::protocol::xproto::Keycode;

use crate::config::KeysConfig;
use crate::wm::xconn::XConn;

const LOCK_MASK: u16 = 1 << 1;

pub const XK_NUM_LOCK: u32 = 0xff7f;

/// Keyboard shortcut action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    CyclePrev,
    CycleNext,
    ToggleFullscreen,
    ToggleZ,
}

/// Keysym for the subset of names a binding can use
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let named = match name {
        "Tab" => Some(0xff09),
        "Return" => Some(0xff0d),
        "Escape" => Some(0xff1b),
        "space" => Some(0x0020),
        "Home" => Some(0xff50),
        "Left" => Some(0xff51),
        "Up" => Some(0xff52),
        "Right" => Some(0xff53),
        "Down" => Some(0xff54),
        "Page_Up" | "Prior" => Some(0xff55),
        "Page_Down" | "Next" => Some(0xff56),
        "End" => Some(0xff57),
        "Num_Lock" => Some(XK_NUM_LOCK),
        _ => None,
    };
    if named.is_some() {
        return named;
    }
    if let Some(number) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=12).contains(&number).then(|| 0xffbe + number - 1);
    }
    match name.as_bytes() {
        [c] if c.is_ascii_alphanumeric() => Some(u32::from(c.to_ascii_lowercase())),
        _ => None,
    }
}

/// Modifier mask for a name such as `Mod1` or `Control`
pub fn modifier_from_name(name: &str) -> Option<u16> {
    match name {
        "None" => Some(0),
        "Shift" => Some(1 << 0),
        "Lock" => Some(LOCK_MASK),
        "Control" => Some(1 << 2),
        "Mod1" => Some(1 << 3),
        "Mod2" => Some(1 << 4),
        "Mod3" => Some(1 << 5),
        "Mod4" => Some(1 << 6),
        "Mod5" => Some(1 << 7),
        _ => None,
    }
}

/// The modifier bit whose row of the modifier mapping holds `numlock`
pub fn numlock_mask(modmap: &[Vec<Keycode>], numlock: Option<Keycode>) -> u16 {
    let Some(numlock) = numlock.filter(|&code| code != 0) else {
        return 0;
    };
    modmap
        .iter()
        .take(8)
        .position(|row| row.contains(&numlock))
        .map(|row| 1u16 << row)
        .unwrap_or(0)
}

/// Look up the NumLock keycode and its modifier bit
pub fn discover_numlock<X: XConn>(conn: &X) -> Result<u16> {
    let keycode = conn.keycode_for_keysym(XK_NUM_LOCK)?;
    let mask = numlock_mask(&conn.modifier_mapping()?, keycode);
    debug!("NumLock modifier mask: {:#x}", mask);
    Ok(mask)
}

/// Resolved key bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBindings {
    pub modifier: u16,
    pub bindings: Vec<(Keycode, KeyAction)>,
}

impl KeyBindings {
    /// Resolve configured names to keycodes; unknown names are skipped
    pub fn resolve<X: XConn>(conn: &X, config: &KeysConfig) -> Result<Self> {
        let modifier = modifier_from_name(&config.modifier).unwrap_or_else(|| {
            warn!("Unknown modifier {:?}, using Mod1", config.modifier);
            1 << 3
        });

        let mut bindings = Vec::new();
        for (name, action) in [
            (&config.cycle_prev, KeyAction::CyclePrev),
            (&config.cycle_next, KeyAction::CycleNext),
            (&config.fullscreen, KeyAction::ToggleFullscreen),
            (&config.toggle_z, KeyAction::ToggleZ),
        ] {
            let Some(keysym) = keysym_from_name(name) else {
                warn!("Unknown key name {:?} for {:?}", name, action);
                continue;
            };
            match conn.keycode_for_keysym(keysym)? {
                Some(keycode) => bindings.push((keycode, action)),
                None => warn!("No keycode for {:?} ({:?})", name, action),
            }
        }

        Ok(Self { modifier, bindings })
    }

    /// Grab every binding with each combination of CapsLock and NumLock
    pub fn grab_all<X: XConn>(&self, conn: &X, numlock: u16) -> Result<()> {
        for &(keycode, action) in &self.bindings {
            debug!("Grabbing keycode {} for {:?}", keycode, action);
            for extra in [0, LOCK_MASK, numlock, LOCK_MASK | numlock] {
                conn.grab_key(keycode, self.modifier | extra)?;
            }
        }
        Ok(())
    }

    /// Action for a key press, ignoring CapsLock and NumLock state
    pub fn lookup(&self, keycode: Keycode, state: u16, numlock: u16) -> Option<KeyAction> {
        let state = state & !(LOCK_MASK | numlock) & 0xff;
        if state != self.modifier {
            return None;
        }
        self.bindings
            .iter()
            .find(|(code, _)| *code == keycode)
            .map(|&(_, action)| action)
    }
}
