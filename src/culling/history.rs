//! Visibility hysteresis (spec §4.3 point 6, §8 invariant 9).
//!
//! Raw per-frame visibility (`SceneElement::visible`) is allowed to pop in and
//! out as occlusion/frustum results flicker at silhouette edges. `VisibilityHistory`
//! tracks, per `stable_id`, how many consecutive frames an element has reported
//! occluded or visible, and only flips a *confirmed* state after the configured
//! run length — the same debounce idea the teacher's transform-dirty flags use,
//! applied to visibility instead.

use rustc_hash::FxHashMap;

/// Consecutive-frame thresholds before a visibility transition is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub hide_confirm_frames: u32,
    pub show_confirm_frames: u32,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self { hide_confirm_frames: 3, show_confirm_frames: 2 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HistoryEntry {
    consecutive_occluded: u32,
    consecutive_visible: u32,
    confirmed_visible: bool,
}

/// Keyed by `stable_id`. Entries are created lazily on first report and
/// purged explicitly when the parent element set is cleared (spec §3
/// lifecycle: "Visibility-history entries ... are purged when their parent
/// element set is cleared").
#[derive(Debug, Clone, Default)]
pub struct VisibilityHistory {
    policy: VisibilityPolicy,
    entries: FxHashMap<u64, HistoryEntry>,
}

impl VisibilityHistory {
    #[must_use]
    pub fn new(policy: VisibilityPolicy) -> Self {
        Self { policy, entries: FxHashMap::default() }
    }

    /// Reports this frame's raw occlusion signal for `stable_id` and returns
    /// the confirmed visibility to use in its place (spec §8 invariant 9:
    /// toggles false only after `hide_confirm_frames` consecutive occluded
    /// reports, true only after `show_confirm_frames` consecutive visible
    /// reports thereafter).
    pub fn report(&mut self, stable_id: u64, raw_occluded: bool) -> bool {
        let policy = self.policy;
        // A newly tracked id starts confirmed-visible: an element entering
        // view should draw immediately, not wait out a hide-confirm window
        // before its first appearance.
        let entry = self.entries.entry(stable_id).or_insert(HistoryEntry { confirmed_visible: true, ..Default::default() });

        if raw_occluded {
            entry.consecutive_occluded += 1;
            entry.consecutive_visible = 0;
            if entry.consecutive_occluded >= policy.hide_confirm_frames.max(1) {
                entry.confirmed_visible = false;
            }
        } else {
            entry.consecutive_visible += 1;
            entry.consecutive_occluded = 0;
            if entry.consecutive_visible >= policy.show_confirm_frames.max(1) {
                entry.confirmed_visible = true;
            }
        }
        entry.confirmed_visible
    }

    /// Drops the history for a single `stable_id` (used when an element stops
    /// being frustum-visible at all, so its next reappearance starts fresh).
    pub fn reset(&mut self, stable_id: u64) {
        self.entries.remove(&stable_id);
    }

    /// Drops every entry — called on a camera jump/teleport, since the last
    /// several frames' occlusion signal is no longer predictive.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_only_after_consecutive_occluded_reports() {
        let mut hist = VisibilityHistory::new(VisibilityPolicy { hide_confirm_frames: 3, show_confirm_frames: 2 });
        assert!(hist.report(1, true));
        assert!(hist.report(1, true));
        assert!(!hist.report(1, true));
    }

    #[test]
    fn shows_only_after_consecutive_visible_reports_thereafter() {
        let mut hist = VisibilityHistory::new(VisibilityPolicy { hide_confirm_frames: 1, show_confirm_frames: 2 });
        assert!(!hist.report(1, true));
        assert!(!hist.report(1, false));
        assert!(hist.report(1, false));
    }

    #[test]
    fn reset_forgets_prior_streaks() {
        let mut hist = VisibilityHistory::new(VisibilityPolicy::default());
        hist.report(1, true);
        hist.report(1, true);
        hist.report(1, true);
        hist.reset(1);
        assert_eq!(hist.len(), 0);
    }

    #[test]
    fn clear_drops_every_entry() {
        let mut hist = VisibilityHistory::new(VisibilityPolicy::default());
        hist.report(1, false);
        hist.report(2, false);
        hist.clear();
        assert!(hist.is_empty());
    }
}
