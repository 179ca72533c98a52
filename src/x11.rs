use anyhow::{Context, Result};
use tracing::info;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConnectionExt, EventMask, Screen, Window,
};
use x11rb::rust_connection::RustConnection;

use crate::workspace::Output;

/// Immutable connection context shared by every dispatch call.
pub struct WmContext<'a> {
    pub conn: &'a RustConnection,
    pub screen: &'a Screen,
}

impl<'a> WmContext<'a> {
    pub fn root(&self) -> Window {
        self.screen.root
    }

    /// The root screen's rectangle, used as the binding for the bootstrap
    /// workspace before the first reconciliation pass.
    pub fn root_output(&self) -> Output {
        Output {
            x: 0,
            y: 0,
            width: self.screen.width_in_pixels,
            height: self.screen.height_in_pixels,
        }
    }
}

/// Claim window management on the root window.
///
/// SubstructureRedirect is what makes us the window manager: map requests
/// get routed to us instead of being honored directly. Only one client may
/// hold it, so this fails if another window manager is running.
pub fn become_window_manager(conn: &RustConnection, root: Window) -> Result<()> {
    let cookie = conn
        .change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY),
        )
        .context("Failed to request root event mask")?;
    conn.flush().context("Failed to flush root event mask change")?;

    if let Err(err) = cookie.check() {
        anyhow::bail!("Another window manager is already running: {err}");
    }

    info!(root = root, "claimed window management on root");
    Ok(())
}
