use anyhow::{Context, Result};
use tracing::{debug, info};
use x11rb::protocol::randr::{ConnectionExt as RandrExt, NotifyMask};
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use crate::workspace::Output;

/// Ask the server to deliver screen-change notifications (monitor hotplug,
/// mode switches) for the root window.
pub fn watch_output_changes(conn: &RustConnection, root: Window) -> Result<()> {
    conn.randr_query_version(1, 2)
        .context("Failed to query RandR version")?
        .reply()
        .context("Failed to get reply for RandR version query")?;
    conn.randr_select_input(root, NotifyMask::SCREEN_CHANGE)
        .context("Failed to select RandR screen-change input")?;
    Ok(())
}

/// Query the live output rectangles via RandR.
///
/// Outputs without a bound crtc (disconnected or disabled) are skipped, as
/// is any output whose info or crtc query fails; a bad descriptor never
/// aborts the walk for the remaining outputs.
pub fn query_live_outputs(conn: &RustConnection, root: Window) -> Result<Vec<Output>> {
    let resources = conn
        .randr_get_screen_resources_current(root)
        .context("Failed to query RandR screen resources")?
        .reply()
        .context("Failed to get reply for RandR screen resources")?;

    let mut live = Vec::new();
    for &output in &resources.outputs {
        let info = match conn
            .randr_get_output_info(output, resources.config_timestamp)?
            .reply()
        {
            Ok(info) => info,
            Err(err) => {
                debug!(output = output, error = %err, "skipping output: info query failed");
                continue;
            }
        };
        if info.crtc == 0 {
            debug!(output = output, "skipping output: no bound crtc");
            continue;
        }
        let crtc = match conn
            .randr_get_crtc_info(info.crtc, resources.config_timestamp)?
            .reply()
        {
            Ok(crtc) => crtc,
            Err(err) => {
                debug!(output = output, crtc = info.crtc, error = %err, "skipping output: crtc query failed");
                continue;
            }
        };
        live.push(Output {
            x: crtc.x,
            y: crtc.y,
            width: crtc.width,
            height: crtc.height,
        });
    }

    info!(count = live.len(), "queried live outputs");
    Ok(live)
}
