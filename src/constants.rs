//! Application-wide constants
//!
//! Key symbol values and modifier masks used by the binding table, kept in
//! one place instead of scattered magic numbers.

/// X11 key symbol values (from keysymdef.h)
pub mod keysym {
    /// XK_space
    pub const SPACE: u32 = 0x0020;

    /// XK_q
    pub const Q: u32 = 0x0071;
}

/// Modifier mask values for binding matches
pub mod modmask {
    /// The chord modifier for the default bindings (Super, ModMask::M4)
    pub const SUPER: u16 = 0x0040;

    /// CapsLock (ModMask::LOCK), ignored when matching bindings
    pub const CAPS_LOCK: u16 = 0x0002;

    /// NumLock (usually ModMask::M2), ignored when matching bindings
    pub const NUM_LOCK: u16 = 0x0010;
}
