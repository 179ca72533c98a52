use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ConnectionExt, KeyPressEvent, Mapping, Window};

use crate::keys::{self, Action, KeyboardMap};
use crate::outputs;
use crate::wm::{Phase, WmState};
use crate::x11::WmContext;

/// Dispatch one protocol event.
///
/// Runs synchronously on the loop thread; all mutation of `state` happens
/// here, one event at a time, in server-delivery order. Errors are
/// per-event: the caller logs and keeps pulling.
pub fn handle_event(ctx: &WmContext<'_>, state: &mut WmState, event: Event) -> Result<()> {
    match event {
        Event::MapRequest(event) => {
            handle_map_request(ctx, state, event.window)?;
        }
        Event::DestroyNotify(event) => {
            if state.workspaces.remove_window(event.window) {
                state.layout.workspaces_changed(&state.workspaces);
            }
            // a miss is normal: override-redirect windows are never tracked
        }
        Event::KeyPress(event) => {
            handle_key_press(state, event);
        }
        Event::RandrScreenChangeNotify(_) => {
            info!("screen configuration changed, reconciling outputs");
            let live = outputs::query_live_outputs(ctx.conn, ctx.root())?;
            state.workspaces.reconcile(&live);
            state.layout.workspaces_changed(&state.workspaces);
        }
        Event::MappingNotify(event) => {
            // Re-snapshot the keyboard table and re-grab when the mapping
            // changes (not for pointer button remaps)
            if event.request != Mapping::POINTER {
                info!("keyboard mapping changed, re-grabbing bindings");
                state.keymap = KeyboardMap::new(ctx.conn)?;
                keys::grab_bindings(ctx.conn, ctx.root(), &state.keymap, &state.bindings)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Route a window asking to become visible into the active workspace.
///
/// Membership is recorded before the map command goes out, so workspace
/// contents never show a visible-but-untracked window. A duplicate request
/// is honored by re-mapping without touching membership.
fn handle_map_request(ctx: &WmContext<'_>, state: &mut WmState, window: Window) -> Result<()> {
    let routed = match state.workspaces.add_window(window) {
        Ok(()) => {
            debug!(
                window = window,
                workspace = state.workspaces.active().id,
                "routed window to active workspace"
            );
            true
        }
        Err(err) => {
            warn!(error = %err, "map request for tracked window, re-mapping");
            false
        }
    };

    ctx.conn
        .map_window(window)
        .context(format!("Failed to map window 0x{window:x}"))?;
    ctx.conn.flush().context("Failed to flush map command")?;

    if routed {
        state.layout.workspaces_changed(&state.workspaces);
    }
    Ok(())
}

fn handle_key_press(state: &mut WmState, event: KeyPressEvent) {
    let Some(keysym) = state.keymap.keysym(event.detail, 0) else {
        return;
    };
    let Some(action) = state.bindings.resolve(keysym, u16::from(event.state)) else {
        // unbound keys are not ours to care about
        return;
    };

    match action {
        Action::Quit => {
            info!("quit binding pressed, shutting down");
            state.phase = Phase::Terminated;
        }
        Action::NextWorkspace => {
            state.workspaces.activate_next();
            state.layout.workspaces_changed(&state.workspaces);
        }
    }
}
