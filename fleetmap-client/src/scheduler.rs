use crate::reconciler::ReconciledSet;
use std::time::{Duration, Instant};

/// Leading-edge throttle with trailing coalesce between the reconciler and
/// the drawing layer.
///
/// The first set in a window goes out immediately; anything else arriving
/// inside the window replaces the pending set and goes out at the window
/// boundary. At most one emission per window, and the first set after an idle
/// stretch is never delayed. The driving loop asks `next_deadline` when to
/// wake and calls `take_due` at that point.
pub struct RenderScheduler {
    window: Duration,
    window_start: Option<Instant>,
    pending: Option<ReconciledSet>,
}

impl RenderScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offers a freshly reconciled set. Returns it back when it should be
    /// forwarded right now (leading edge), otherwise keeps it as the pending
    /// set for the window boundary.
    pub fn offer(&mut self, set: ReconciledSet, now: Instant) -> Option<ReconciledSet> {
        match self.window_start {
            Some(start) if now < start + self.window => {
                self.pending = Some(set);
                None
            }
            _ => {
                // a still-pending set is superseded by this newer one
                self.pending = None;
                self.window_start = Some(now);
                Some(set)
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending set becomes due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.pending.is_none() {
            return None;
        }
        self.window_start.map(|start| start + self.window)
    }

    /// Releases the pending set once the window boundary has passed; the
    /// emission starts the next window.
    pub fn take_due(&mut self, now: Instant) -> Option<ReconciledSet> {
        let start = self.window_start?;
        if now < start + self.window {
            return None;
        }
        let set = self.pending.take()?;
        self.window_start = Some(now);
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::ReconciledTrack;
    use shared::VehicleStatus;

    fn set(tag: &str) -> ReconciledSet {
        ReconciledSet {
            tracks: vec![ReconciledTrack {
                vehicle_id: tag.to_string(),
                track_index: 0,
                path: Vec::new(),
                status: VehicleStatus::Unknown,
                reset: false,
            }],
        }
    }

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn first_set_is_forwarded_immediately() {
        let mut scheduler = RenderScheduler::new(WINDOW);
        let now = Instant::now();
        assert_eq!(scheduler.offer(set("a"), now), Some(set("a")));
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn sets_within_the_window_coalesce_to_the_latest() {
        let mut scheduler = RenderScheduler::new(WINDOW);
        let now = Instant::now();
        scheduler.offer(set("a"), now);
        for (i, tag) in ["b", "c", "d", "e"].iter().enumerate() {
            let at = now + Duration::from_millis(100 * (i as u64 + 1));
            assert_eq!(scheduler.offer(set(tag), at), None);
        }
        // nothing due before the boundary
        assert_eq!(scheduler.take_due(now + Duration::from_millis(999)), None);
        // only the last survives
        assert_eq!(scheduler.take_due(now + WINDOW), Some(set("e")));
        assert_eq!(scheduler.take_due(now + WINDOW), None);
    }

    #[test]
    fn trailing_emission_starts_the_next_window() {
        let mut scheduler = RenderScheduler::new(WINDOW);
        let now = Instant::now();
        scheduler.offer(set("a"), now);
        scheduler.offer(set("b"), now + Duration::from_millis(500));
        assert!(scheduler.take_due(now + WINDOW).is_some());
        // right after the boundary flush we are inside a fresh window
        assert_eq!(
            scheduler.offer(set("c"), now + WINDOW + Duration::from_millis(10)),
            None
        );
    }

    #[test]
    fn first_set_after_idle_is_not_delayed() {
        let mut scheduler = RenderScheduler::new(WINDOW);
        let now = Instant::now();
        scheduler.offer(set("a"), now);
        let later = now + Duration::from_secs(30);
        assert_eq!(scheduler.offer(set("b"), later), Some(set("b")));
    }

    #[test]
    fn no_deadline_without_a_pending_set() {
        let mut scheduler = RenderScheduler::new(WINDOW);
        let now = Instant::now();
        assert_eq!(scheduler.next_deadline(), None);
        scheduler.offer(set("a"), now);
        assert_eq!(scheduler.next_deadline(), None);
        scheduler.offer(set("b"), now + Duration::from_millis(1));
        assert_eq!(scheduler.next_deadline(), Some(now + WINDOW));
    }
}
