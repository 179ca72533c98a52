//! Seam between workspace bookkeeping and whatever arranges windows on
//! screen.
//!
//! The core guarantees the hook is invoked after every workspace-set
//! mutation that changes what should be on screen; what the implementation
//! does with that is its own business. A tiling engine would read the set
//! and issue configure requests; the shipped implementation only logs.

use tracing::debug;

use crate::workspace::WorkspaceSet;

pub trait LayoutHook {
    /// Called with the freshly mutated set. Runs synchronously on the event
    /// loop's thread; the reference is not retained.
    fn workspaces_changed(&mut self, workspaces: &WorkspaceSet);
}

/// Placeholder until a real layout engine is wired in.
pub struct NullLayout;

impl LayoutHook for NullLayout {
    fn workspaces_changed(&mut self, workspaces: &WorkspaceSet) {
        debug!(
            active = workspaces.active_index(),
            count = workspaces.len(),
            "layout refresh requested"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Output;

    /// A test double that counts invocations.
    #[derive(Default)]
    struct RecordingLayout {
        calls: usize,
    }

    impl LayoutHook for RecordingLayout {
        fn workspaces_changed(&mut self, _workspaces: &WorkspaceSet) {
            self.calls += 1;
        }
    }

    #[test]
    fn recording_hook_counts_invocations() {
        let mut set = WorkspaceSet::new(Output { x: 0, y: 0, width: 800, height: 600 });
        let mut hook = RecordingLayout::default();

        set.add_window(0x42).unwrap();
        hook.workspaces_changed(&set);
        set.remove_window(0x42);
        hook.workspaces_changed(&set);

        assert_eq!(hook.calls, 2);
    }

    #[test]
    fn null_layout_is_usable_as_a_trait_object() {
        let set = WorkspaceSet::new(Output { x: 0, y: 0, width: 800, height: 600 });
        let mut hook: Box<dyn LayoutHook> = Box::new(NullLayout);
        hook.workspaces_changed(&set);
    }
}
