#![forbid(unsafe_code)]

mod constants;
mod event_handler;
mod keys;
mod layout;
mod outputs;
mod wm;
mod workspace;
mod x11;

use anyhow::{Context, Result};
use tracing::{Level as TraceLevel, error, info};
use tracing_subscriber::FmtSubscriber;
use x11rb::connection::Connection;

use event_handler::handle_event;
use keys::{KeyBindings, KeyboardMap};
use layout::NullLayout;
use wm::{Phase, WmState};
use workspace::WorkspaceSet;
use x11::WmContext;

fn run(ctx: &WmContext<'_>, state: &mut WmState) -> Result<()> {
    // Starting: claim the root, register for output changes, grab bindings,
    // settle the workspace set against live RandR state
    x11::become_window_manager(ctx.conn, ctx.root())?;
    outputs::watch_output_changes(ctx.conn, ctx.root())?;
    keys::grab_bindings(ctx.conn, ctx.root(), &state.keymap, &state.bindings)?;

    let live = outputs::query_live_outputs(ctx.conn, ctx.root())?;
    state.workspaces.reconcile(&live);
    state.layout.workspaces_changed(&state.workspaces);

    state.phase = Phase::Running;
    info!(workspaces = state.workspaces.len(), "entering event loop");

    // One blocking pull at a time, fully processed before the next; the
    // workspace set is only ever touched from here. Per-event errors are
    // contained, a failed pull is fatal.
    while state.phase == Phase::Running {
        let event = ctx
            .conn
            .wait_for_event()
            .context("display connection lost")?;
        let _ = handle_event(ctx, state, event)
            .inspect_err(|err| error!("encountered error in 'handle_event': err={err:#?}"));
    }

    info!("event loop terminated");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let (conn, screen_num) = x11rb::connect(None)?;
    let screen = &conn.setup().roots[screen_num];
    info!(
        "successfully connected to x11: screen={screen_num}, dimensions={}x{}",
        screen.width_in_pixels, screen.height_in_pixels
    );

    let ctx = WmContext {
        conn: &conn,
        screen,
    };

    let mut state = WmState::new(
        WorkspaceSet::new(ctx.root_output()),
        KeyboardMap::new(&conn)?,
        KeyBindings::default(),
        Box::new(NullLayout),
    );

    run(&ctx, &mut state)?;
    Ok(())
}
