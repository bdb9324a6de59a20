use std::time::Instant;

use crate::core::event::{FetchTrigger, PollUpdate};
use crate::core::job::JobRecord;
use crate::core::notify::{notify_new_jobs, Notifier};
use crate::core::poller::FeedPoller;
use crate::core::store::KeyValueStore;
use crate::core::tracker::SeenTracker;

/// Feed poller, seen tracker and notifier wired together: every job list the
/// poller publishes is run through the tracker, and newly-arrived jobs are
/// handed to the notifier.
pub struct Dashboard<S, N> {
    poller: FeedPoller,
    tracker: SeenTracker<S>,
    notifier: N,
    observed_generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Refreshed { count: usize, new_jobs: usize },
    Failed(String),
    Notified { new_jobs: usize },
}

impl<S: KeyValueStore, N: Notifier> Dashboard<S, N> {
    pub fn new(poller: FeedPoller, tracker: SeenTracker<S>, notifier: N) -> Self {
        Self {
            poller,
            tracker,
            notifier,
            observed_generation: 0,
        }
    }

    pub fn poller(&self) -> &FeedPoller {
        &self.poller
    }

    pub fn jobs(&self) -> &[JobRecord] {
        self.poller.jobs()
    }

    pub fn is_new(&self, job: &JobRecord) -> bool {
        self.tracker.is_new(job)
    }

    pub fn unseen_count(&self) -> usize {
        self.tracker.unseen_count()
    }

    pub fn start(&mut self) -> bool {
        self.poller.request_refresh(FetchTrigger::Startup)
    }

    pub fn refresh(&mut self) -> bool {
        self.poller.request_refresh(FetchTrigger::Manual)
    }

    pub fn mark_all_seen(&mut self) {
        self.tracker.mark_all_seen();
    }

    /// Drives the poll timer and folds finished fetches into tracker state.
    pub fn tick(&mut self, now: Instant) -> Vec<DashboardEvent> {
        self.poller.tick(now);
        let updates = self.poller.poll_updates();
        self.handle_updates(updates)
    }

    /// Waits for the in-flight fetch instead of ticking.
    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Vec<DashboardEvent> {
        let updates: Vec<PollUpdate> = self.poller.wait_for_update(timeout).into_iter().collect();
        self.handle_updates(updates)
    }

    fn handle_updates(&mut self, updates: Vec<PollUpdate>) -> Vec<DashboardEvent> {
        let mut events = Vec::new();
        for update in updates {
            match update {
                PollUpdate::Jobs { count, .. } => {
                    let (new_jobs, notified) = self.sync_tracker();
                    events.push(DashboardEvent::Refreshed { count, new_jobs });
                    if notified {
                        events.push(DashboardEvent::Notified { new_jobs });
                    }
                }
                PollUpdate::Failed { message, .. } => events.push(DashboardEvent::Failed(message)),
            }
        }
        events
    }

    /// Runs the tracker over a job list it has not seen yet. Returns how many
    /// jobs arrived since the last list and whether a notification went out.
    fn sync_tracker(&mut self) -> (usize, bool) {
        if self.poller.generation() == self.observed_generation {
            return (0, false);
        }
        self.observed_generation = self.poller.generation();

        let Some(new_jobs) = self.tracker.observe(self.poller.jobs()) else {
            return (0, false);
        };
        let notified = notify_new_jobs(&mut self.notifier, &new_jobs.jobs);
        (new_jobs.jobs.len(), notified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::job;
    use crate::core::notify::tests::RecordingNotifier;
    use crate::core::poller::tests::ScriptedFeed;
    use crate::core::poller::DEFAULT_POLL_INTERVAL;
    use crate::core::store::MemoryStore;
    use crate::core::tracker::TrackingMode;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn dashboard(
        responses: Vec<Result<Vec<JobRecord>, u16>>,
    ) -> Dashboard<MemoryStore, RecordingNotifier> {
        let poller = FeedPoller::new(Arc::new(ScriptedFeed::new(responses)), DEFAULT_POLL_INTERVAL);
        let tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        Dashboard::new(poller, tracker, RecordingNotifier::granted())
    }

    #[test]
    fn first_load_never_notifies() {
        let jobs: Vec<JobRecord> = (0..5).map(|i| job(&format!("l{i}"), "Designer", "Acme")).collect();
        let mut dash = dashboard(vec![Ok(jobs)]);

        assert!(dash.start());
        let events = dash.wait(WAIT);

        assert_eq!(events, vec![DashboardEvent::Refreshed { count: 5, new_jobs: 0 }]);
        assert!(dash.notifier.sent.is_empty());
        assert_eq!(dash.unseen_count(), 5);
    }

    #[test]
    fn additional_job_on_second_poll_notifies_once() {
        let first = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];
        let mut second = first.clone();
        second.push(job("c", "Service Designer", "Gamma"));
        let mut dash = dashboard(vec![Ok(first), Ok(second)]);

        dash.start();
        dash.wait(WAIT);
        dash.refresh();
        let events = dash.wait(WAIT);

        assert_eq!(
            events,
            vec![
                DashboardEvent::Refreshed { count: 3, new_jobs: 1 },
                DashboardEvent::Notified { new_jobs: 1 },
            ]
        );
        let sent = &dash.notifier.sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "New Job Posted!");
        assert_eq!(sent[0].body, "Service Designer at Gamma");
    }

    #[test]
    fn failed_poll_keeps_jobs_and_tracker_state() {
        let mut dash = dashboard(vec![Ok(vec![job("a", "A", "Acme")]), Err(500)]);

        dash.start();
        dash.wait(WAIT);
        dash.refresh();
        let events = dash.wait(WAIT);

        assert_eq!(
            events,
            vec![DashboardEvent::Failed("Failed to fetch jobs (HTTP 500)".to_string())]
        );
        assert_eq!(dash.jobs().len(), 1);
        assert!(dash.is_new(&dash.jobs()[0]));
    }

    #[test]
    fn mark_all_seen_persists_current_jobs() {
        let mut dash = dashboard(vec![Ok(vec![job("a", "A", "Acme"), job("b", "B", "Beta")])]);

        dash.start();
        dash.wait(WAIT);
        dash.mark_all_seen();

        assert_eq!(dash.unseen_count(), 0);
        let mut store = dash.tracker.store().clone();
        let stored = store.get(crate::core::tracker::SEEN_JOBS_KEY).unwrap().unwrap();
        assert_eq!(stored, serde_json::json!(["a", "b"]));
    }
}
