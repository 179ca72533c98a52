use crate::keys::{KeyBindings, KeyboardMap};
use crate::layout::LayoutHook;
use crate::workspace::WorkspaceSet;

/// Event loop lifecycle. `Terminated` is only entered from the quit
/// binding; there is no recovery from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Terminated,
}

/// Everything the event loop mutates, owned by it and handed by `&mut`
/// into each dispatch call. No ambient or static state anywhere.
pub struct WmState {
    pub workspaces: WorkspaceSet,
    pub keymap: KeyboardMap,
    pub bindings: KeyBindings,
    pub layout: Box<dyn LayoutHook>,
    pub phase: Phase,
}

impl WmState {
    pub fn new(
        workspaces: WorkspaceSet,
        keymap: KeyboardMap,
        bindings: KeyBindings,
        layout: Box<dyn LayoutHook>,
    ) -> Self {
        Self {
            workspaces,
            keymap,
            bindings,
            layout,
            phase: Phase::Starting,
        }
    }
}
