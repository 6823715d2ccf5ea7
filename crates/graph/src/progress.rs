//! Build progress reporting.
//!
//! Progress flows through a bounded channel that never applies backpressure
//! to the pipeline: when the consumer lags, events are dropped rather than
//! queued. Totals are estimates that get revised as each stage learns real
//! sizes, under two invariants: `completed` never decreases, and the final
//! event snaps `completed` to `total` at 100 percent.

use serde::Serialize;
use tokio::sync::mpsc;

/// Capacity of a progress channel. Depth only smooths bursts; overflow is
/// dropped by design.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    pub percent: u8,
    pub completed: u64,
    pub total: u64,
}

/// Sending half of a progress channel. Sends never block and never fail the
/// build; a full or closed channel silently drops the event.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.try_send(event);
    }
}

pub fn channel() -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    (ProgressSender { tx }, rx)
}

/// Stage-aware progress accountant owned by one build.
///
/// `completed` counts remote calls already made; `total` is the running
/// estimate of all calls the build will make. Revisions replace only the
/// remaining portion, so the completed count stays monotonic.
#[derive(Debug)]
pub struct ProgressReporter {
    sender: Option<ProgressSender>,
    completed: u64,
    total: u64,
}

impl ProgressReporter {
    pub fn new(sender: Option<ProgressSender>) -> Self {
        Self {
            sender,
            completed: 0,
            total: 1,
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Replace the estimate of work still ahead, keeping completed work
    /// intact.
    pub fn revise_remaining(&mut self, remaining: u64) {
        self.total = (self.completed + remaining).max(1);
    }

    /// Record `calls` completed remote calls. Overshoot extends the total
    /// rather than letting completed pass it.
    pub fn record(&mut self, calls: u64, message: &str) {
        self.completed += calls;
        if self.completed > self.total {
            self.total = self.completed;
        }
        self.emit(message);
    }

    /// Emit a stage announcement without advancing the counters.
    pub fn stage(&mut self, message: &str) {
        self.emit(message);
    }

    /// Terminal event: snap completed to total and report 100 percent.
    pub fn finish(&mut self, message: &str) {
        self.completed = self.total;
        self.emit(message);
    }

    fn emit(&self, message: &str) {
        if let Some(sender) = &self.sender {
            sender.send(ProgressEvent {
                message: message.to_string(),
                percent: ((self.completed * 100) / self.total) as u8,
                completed: self.completed,
                total: self.total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_completed_is_monotonic_across_revisions() {
        let (tx, mut rx) = channel();
        let mut reporter = ProgressReporter::new(Some(tx));

        reporter.revise_remaining(10);
        reporter.record(3, "stage one");
        reporter.revise_remaining(2); // estimate shrinks mid-flight
        reporter.record(2, "stage two");
        reporter.finish("done");

        let events = drain(&mut rx);
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[1].completed >= pair[0].completed);
        }
    }

    #[test]
    fn test_final_event_snaps_to_total() {
        let (tx, mut rx) = channel();
        let mut reporter = ProgressReporter::new(Some(tx));

        reporter.revise_remaining(7);
        reporter.record(2, "working");
        reporter.finish("done");

        let last = drain(&mut rx).pop().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.completed, last.total);
    }

    #[test]
    fn test_overshoot_extends_total() {
        let mut reporter = ProgressReporter::new(None);
        reporter.revise_remaining(2);
        reporter.record(5, "more than estimated");
        assert_eq!(reporter.completed(), 5);
        assert_eq!(reporter.total(), 5);
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (tx, mut rx) = channel();
        let mut reporter = ProgressReporter::new(Some(tx));
        reporter.revise_remaining(1000);
        for _ in 0..PROGRESS_CHANNEL_CAPACITY + 50 {
            reporter.record(1, "flood");
        }

        let events = drain(&mut rx);
        assert_eq!(events.len(), PROGRESS_CHANNEL_CAPACITY);
        // completed kept counting even while events were dropped
        assert_eq!(reporter.completed(), (PROGRESS_CHANNEL_CAPACITY + 50) as u64);
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let (tx, rx) = channel();
        drop(rx);
        let mut reporter = ProgressReporter::new(Some(tx));
        reporter.revise_remaining(3);
        reporter.record(3, "nobody listening");
        reporter.finish("done");
        assert_eq!(reporter.completed(), 3);
    }

    #[test]
    fn test_percent_never_exceeds_100() {
        let mut reporter = ProgressReporter::new(None);
        reporter.revise_remaining(3);
        reporter.record(10, "overshoot");
        assert!(reporter.completed() <= reporter.total());
    }
}
