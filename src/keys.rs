use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, Grab, GrabMode, Keycode, Keysym, ModMask, Window};
use x11rb::rust_connection::RustConnection;

use crate::constants::{keysym, modmask};

/// Actions a key binding can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Orderly shutdown: the event loop terminates and the display
    /// connection closes with the process.
    Quit,
    /// Advance the active workspace, wrapping at the end of the set.
    NextWorkspace,
}

/// One binding: a key symbol chorded with an exact modifier set.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub modifiers: u16,
    pub keysym: Keysym,
    pub action: Action,
}

/// The binding table. In-code and extensible; there is no config file
/// surface.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: Vec<Binding>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                Binding {
                    modifiers: modmask::SUPER,
                    keysym: keysym::Q,
                    action: Action::Quit,
                },
                Binding {
                    modifiers: modmask::SUPER,
                    keysym: keysym::SPACE,
                    action: Action::NextWorkspace,
                },
            ],
        }
    }
}

impl KeyBindings {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Match a key symbol plus raw modifier state against the table.
    ///
    /// CapsLock and NumLock are masked out of the state first; what remains
    /// must equal the binding's modifiers exactly, so a press without the
    /// chord modifier is unrecognized and resolves to `None`.
    pub fn resolve(&self, keysym: Keysym, state: u16) -> Option<Action> {
        let clean_state = state & !(modmask::CAPS_LOCK | modmask::NUM_LOCK);
        self.bindings
            .iter()
            .find(|b| b.keysym == keysym && b.modifiers == clean_state)
            .map(|b| b.action)
    }
}

/// Snapshot of the server's keycode-to-keysym table.
///
/// Rebuilt whenever a MappingNotify reports the keyboard mapping changed.
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    min_keycode: Keycode,
    keysyms_per_keycode: u8,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;

        let mapping = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)
            .context("Failed to request keyboard mapping")?
            .reply()
            .context("Failed to get reply for keyboard mapping")?;

        Ok(Self {
            min_keycode,
            keysyms_per_keycode: mapping.keysyms_per_keycode,
            keysyms: mapping.keysyms,
        })
    }

    /// Translate a keycode to the keysym at `index` in its mapping column
    /// (index 0 is the unshifted symbol). `None` for out-of-range keycodes
    /// and NoSymbol entries.
    pub fn keysym(&self, keycode: Keycode, index: usize) -> Option<Keysym> {
        let per = self.keysyms_per_keycode as usize;
        if index >= per {
            return None;
        }
        let offset = (keycode as usize).checked_sub(self.min_keycode as usize)? * per + index;
        self.keysyms.get(offset).copied().filter(|&ks| ks != 0)
    }

    /// All keycodes producing `keysym` in any column.
    fn keycodes_for(&self, keysym: Keysym) -> Vec<Keycode> {
        let per = self.keysyms_per_keycode as usize;
        self.keysyms
            .chunks(per)
            .enumerate()
            .filter(|(_, column)| column.contains(&keysym))
            .map(|(i, _)| self.min_keycode + i as u8)
            .collect()
    }
}

/// Grab every keycode that produces a bound keysym, in all four lock-state
/// variants (plain, CapsLock, NumLock, both), so bindings fire regardless
/// of lock state.
pub fn grab_bindings(
    conn: &RustConnection,
    root: Window,
    map: &KeyboardMap,
    bindings: &KeyBindings,
) -> Result<()> {
    conn.ungrab_key(Grab::ANY, root, ModMask::ANY)
        .context("Failed to release previous key grabs")?;

    // keycode -> modifiers, deduplicated (two bindings can share a keycode)
    let mut grabs: HashMap<(Keycode, u16), Action> = HashMap::new();
    for binding in bindings.bindings() {
        let keycodes = map.keycodes_for(binding.keysym);
        if keycodes.is_empty() {
            warn!(
                keysym = binding.keysym,
                action = ?binding.action,
                "no keycode produces bound keysym"
            );
        }
        for keycode in keycodes {
            grabs.insert((keycode, binding.modifiers), binding.action);
        }
    }

    for (&(keycode, modifiers), action) in &grabs {
        for extra in [
            0,
            modmask::CAPS_LOCK,
            modmask::NUM_LOCK,
            modmask::CAPS_LOCK | modmask::NUM_LOCK,
        ] {
            conn.grab_key(
                false,
                root,
                ModMask::from(modifiers | extra),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .context(format!("Failed to grab keycode {keycode}"))?;
        }
        info!(keycode = keycode, modifiers = modifiers, action = ?action, "grabbed key");
    }

    conn.flush().context("Failed to flush after grabbing keys")?;
    Ok(())
}
