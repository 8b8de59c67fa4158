//! ICCCM and Motif atoms the manager reads or writes

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt as _};

/// Holds all interned atoms.
///
/// Predefined atoms (WM_NAME, WM_NORMAL_HINTS, WM_HINTS, WM_TRANSIENT_FOR)
/// come from `AtomEnum` and are not repeated here.
#[derive(Debug, Clone)]
pub struct Atoms {
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub motif_wm_hints: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        // Send every request before waiting on the first reply
        let names: [&[u8]; 5] = [
            b"WM_STATE",
            b"WM_CHANGE_STATE",
            b"WM_PROTOCOLS",
            b"WM_DELETE_WINDOW",
            b"_MOTIF_WM_HINTS",
        ];
        let cookies = names
            .iter()
            .map(|name| conn.intern_atom(false, name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut atoms = Vec::with_capacity(cookies.len());
        for (cookie, name) in cookies.into_iter().zip(names) {
            let atom = cookie
                .reply()
                .with_context(|| format!("Failed to intern {}", String::from_utf8_lossy(name)))?
                .atom;
            atoms.push(atom);
        }

        Ok(Self {
            wm_state: atoms[0],
            wm_change_state: atoms[1],
            wm_protocols: atoms[2],
            wm_delete_window: atoms[3],
            motif_wm_hints: atoms[4],
        })
    }
}
