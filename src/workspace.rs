use tracing::{debug, info};
use x11rb::protocol::xproto::Window;

/// A monitor rectangle in the root coordinate space, as reported by RandR.
///
/// Outputs carry no identity beyond their geometry: matching a live output
/// against a workspace is exact `(x, y, width, height)` equality, so two
/// mirrored outputs with equal rectangles resolve to the same workspace.
/// Rebuilt from server state on every reconciliation pass, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// A map request arrived for a window some workspace already tracks.
///
/// The protocol should never deliver this for a live window; it guards
/// against malformed or replayed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("window 0x{0:x} is already tracked by a workspace")]
pub struct DuplicateWindow(pub Window);

/// A group of windows bound to one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Stable id, unique for the lifetime of the process.
    pub id: u32,
    /// The output this workspace was created for. A matching key for
    /// reconciliation, not ownership: it goes stale when the monitor is
    /// unplugged and stays as-is until a later pass matches it again.
    pub output: Output,
    /// Tracked windows, in arrival order. Handles are owned by the server.
    pub windows: Vec<Window>,
}

/// Ordered workspace collection with one active slot.
///
/// Invariants, upheld by every method: the set is never empty,
/// `active < workspaces.len()`, and a window handle appears in at most one
/// workspace.
#[derive(Debug)]
pub struct WorkspaceSet {
    workspaces: Vec<Workspace>,
    active: usize,
    next_id: u32,
}

impl WorkspaceSet {
    /// Create the set with a single active workspace bound to `output`
    /// (the root screen's rectangle at startup; the first reconciliation
    /// pass settles the set against real RandR state).
    pub fn new(output: Output) -> Self {
        Self {
            workspaces: vec![Workspace {
                id: 0,
                output,
                windows: Vec::new(),
            }],
            active: 0,
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Workspace {
        &self.workspaces[self.active]
    }

    /// Advance the active slot to the next workspace, wrapping at the end.
    /// No-op when only one workspace exists.
    pub fn activate_next(&mut self) {
        self.active = (self.active + 1) % self.workspaces.len();
        info!(
            workspace = self.workspaces[self.active].id,
            index = self.active,
            "activated workspace"
        );
    }

    /// Record `window` in the active workspace.
    ///
    /// Errs without touching anything if any workspace already tracks the
    /// handle.
    pub fn add_window(&mut self, window: Window) -> Result<(), DuplicateWindow> {
        if self.workspaces.iter().any(|ws| ws.windows.contains(&window)) {
            return Err(DuplicateWindow(window));
        }
        self.workspaces[self.active].windows.push(window);
        debug!(
            window = window,
            workspace = self.workspaces[self.active].id,
            "window added to active workspace"
        );
        Ok(())
    }

    /// Remove the first occurrence of `window`, scanning workspaces in
    /// order. Returns whether anything was removed; a miss is not an error
    /// (destroy notifications arrive for windows we never tracked, e.g.
    /// override-redirect popups).
    pub fn remove_window(&mut self, window: Window) -> bool {
        for ws in &mut self.workspaces {
            if let Some(pos) = ws.windows.iter().position(|&w| w == window) {
                ws.windows.remove(pos);
                debug!(window = window, workspace = ws.id, "window removed");
                return true;
            }
        }
        false
    }

    /// Reconcile the set against the live output list.
    ///
    /// Live outputs are matched by exact geometry against non-active
    /// workspaces; the active workspace is excluded from matching so it is
    /// never silently rebound. Every unmatched output gets a fresh
    /// workspace appended, then stale workspaces are pruned. The live list
    /// is sorted first so the result does not depend on the server's
    /// iteration order.
    pub fn reconcile(&mut self, live: &[Output]) {
        let mut live = live.to_vec();
        live.sort_unstable_by_key(|o| (o.x, o.y, o.width, o.height));

        for &output in &live {
            if self.find_bound(output).is_none() {
                let id = self.next_id;
                self.next_id += 1;
                info!(
                    workspace = id,
                    x = output.x,
                    y = output.y,
                    width = output.width,
                    height = output.height,
                    "new workspace for unmatched output"
                );
                self.workspaces.push(Workspace {
                    id,
                    output,
                    windows: Vec::new(),
                });
            }
        }

        self.prune(&live);
    }

    /// Find a non-active workspace bound to exactly this geometry.
    fn find_bound(&self, output: Output) -> Option<usize> {
        self.workspaces
            .iter()
            .enumerate()
            .filter(|&(idx, _)| idx != self.active)
            .find(|&(_, ws)| ws.output == output)
            .map(|(idx, _)| idx)
    }

    /// Drop empty workspaces that no longer earn their slot: bound to an
    /// output that is gone, or duplicating an output some other workspace
    /// already covers. The active workspace survives unconditionally, which
    /// is also what keeps the set non-empty.
    fn prune(&mut self, live: &[Output]) {
        let active_id = self.workspaces[self.active].id;
        let before = self.workspaces.len();
        let bound: Vec<(u32, Output)> = self
            .workspaces
            .iter()
            .map(|ws| (ws.id, ws.output))
            .collect();

        self.workspaces.retain(|ws| {
            if ws.id == active_id || !ws.windows.is_empty() {
                return true;
            }
            let gone = !live.contains(&ws.output);
            let redundant = bound
                .iter()
                .any(|&(id, output)| id != ws.id && output == ws.output);
            !(gone || redundant)
        });

        self.active = self
            .workspaces
            .iter()
            .position(|ws| ws.id == active_id)
            .unwrap_or(0);

        if self.workspaces.len() != before {
            debug!(
                pruned = before - self.workspaces.len(),
                remaining = self.workspaces.len(),
                "pruned workspaces"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: Output = Output { x: 0, y: 0, width: 1920, height: 1080 };
    const SIDE: Output = Output { x: 1920, y: 0, width: 1280, height: 1024 };

    fn check_invariants(set: &WorkspaceSet) {
        assert!(!set.workspaces().is_empty());
        assert!(set.active_index() < set.len());
        let mut seen = Vec::new();
        for ws in set.workspaces() {
            for &w in &ws.windows {
                assert!(!seen.contains(&w), "window 0x{w:x} tracked twice");
                seen.push(w);
            }
        }
    }

    #[test]
    fn startup_with_single_output_settles_on_one_workspace() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT]);

        assert_eq!(set.len(), 1);
        assert_eq!(set.active_index(), 0);
        assert_eq!(set.active().output, ROOT);
        check_invariants(&set);
    }

    #[test]
    fn reconcile_creates_workspace_for_new_output() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, SIDE]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.active().output, ROOT);
        assert_eq!(set.workspaces()[1].output, SIDE);
        check_invariants(&set);
    }

    #[test]
    fn reconcile_is_stable_under_repetition() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, SIDE]);
        let settled = set.workspaces().to_vec();

        set.reconcile(&[ROOT, SIDE]);
        assert_eq!(set.workspaces(), &settled[..]);
    }

    #[test]
    fn reconcile_result_is_independent_of_live_order() {
        let third = Output { x: 0, y: 1080, width: 1920, height: 1080 };

        let mut forward = WorkspaceSet::new(ROOT);
        forward.reconcile(&[ROOT, SIDE, third]);
        let mut backward = WorkspaceSet::new(ROOT);
        backward.reconcile(&[third, SIDE, ROOT]);

        let outputs = |set: &WorkspaceSet| -> Vec<Output> {
            set.workspaces().iter().map(|ws| ws.output).collect()
        };
        assert_eq!(outputs(&forward), outputs(&backward));
        assert_eq!(forward.active_index(), backward.active_index());
    }

    #[test]
    fn mirrored_outputs_share_one_workspace() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, ROOT]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unplugged_output_with_windows_is_retained() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, SIDE]);
        set.activate_next();
        set.add_window(0xe3).unwrap();
        set.activate_next();

        set.reconcile(&[ROOT]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.workspaces()[1].windows, vec![0xe3]);
        // binding stays stale until the output comes back
        assert_eq!(set.workspaces()[1].output, SIDE);

        set.reconcile(&[ROOT, SIDE]);
        assert_eq!(set.len(), 2);
        check_invariants(&set);
    }

    #[test]
    fn unplugged_empty_workspace_is_pruned() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, SIDE]);
        assert_eq!(set.len(), 2);

        set.reconcile(&[ROOT]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.active().output, ROOT);
        check_invariants(&set);
    }

    #[test]
    fn active_workspace_survives_pruning_even_when_empty() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, SIDE]);
        set.activate_next();
        assert_eq!(set.active().output, SIDE);
        assert!(set.active().windows.is_empty());

        // SIDE disappears while its (empty) workspace is active
        set.reconcile(&[ROOT]);
        assert_eq!(set.active().output, SIDE);
        assert_eq!(set.len(), 2);
        check_invariants(&set);
    }

    #[test]
    fn pruning_keeps_active_index_on_the_same_workspace() {
        let below = Output { x: 0, y: 1080, width: 1920, height: 1080 };
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, below, SIDE]);
        assert_eq!(set.len(), 3);
        set.activate_next();
        set.activate_next();
        let active_id = set.active().id;
        assert_eq!(set.active().output, SIDE);

        // `below` goes away; its empty workspace sits before the active one,
        // so the active index has to shift down with the removal
        set.reconcile(&[ROOT, SIDE]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.active().id, active_id);
        check_invariants(&set);
    }

    #[test]
    fn activate_next_wraps_and_round_trips() {
        let mut set = WorkspaceSet::new(ROOT);
        set.reconcile(&[ROOT, SIDE]);
        let len = set.len();
        assert!(len > 1);

        let start = set.active_index();
        for _ in 0..len {
            set.activate_next();
            check_invariants(&set);
        }
        assert_eq!(set.active_index(), start);
    }

    #[test]
    fn activate_next_is_noop_with_single_workspace() {
        let mut set = WorkspaceSet::new(ROOT);
        set.activate_next();
        assert_eq!(set.active_index(), 0);
    }

    #[test]
    fn add_window_appends_to_active_in_order() {
        let mut set = WorkspaceSet::new(ROOT);
        set.add_window(0xa1).unwrap();
        set.add_window(0xa2).unwrap();
        assert_eq!(set.active().windows, vec![0xa1, 0xa2]);
        check_invariants(&set);
    }

    #[test]
    fn add_window_rejects_duplicates_across_workspaces() {
        let mut set = WorkspaceSet::new(ROOT);
        set.add_window(0xa1).unwrap();
        set.reconcile(&[ROOT, SIDE]);
        set.activate_next();
        assert!(set.active().windows.is_empty());

        assert_eq!(set.add_window(0xa1), Err(DuplicateWindow(0xa1)));
        // membership unchanged
        assert!(set.active().windows.is_empty());
        check_invariants(&set);
    }

    #[test]
    fn remove_window_reports_lookup_result() {
        let mut set = WorkspaceSet::new(ROOT);
        set.add_window(0xb1).unwrap();

        assert!(set.remove_window(0xb1));
        assert!(!set.remove_window(0xb1));
        assert!(set.active().windows.is_empty());
        check_invariants(&set);
    }

    #[test]
    fn remove_untracked_window_leaves_set_unchanged() {
        let mut set = WorkspaceSet::new(ROOT);
        set.add_window(0xc1).unwrap();
        let before = set.workspaces().to_vec();

        assert!(!set.remove_window(0xdead));
        assert_eq!(set.workspaces(), &before[..]);
    }

    #[test]
    fn destroy_delivery_is_idempotent() {
        let mut set = WorkspaceSet::new(ROOT);
        set.add_window(0xd1).unwrap();
        set.add_window(0xd2).unwrap();

        set.remove_window(0xd1);
        let after_first = set.workspaces().to_vec();
        set.remove_window(0xd1);
        assert_eq!(set.workspaces(), &after_first[..]);
    }
}
