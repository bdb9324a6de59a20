use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::core::error::FeedError;
use crate::core::event::{FetchOutcome, FetchTrigger, PollUpdate};
use crate::core::feed::{dedupe_by_link, FeedSource};
use crate::core::job::JobRecord;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Periodic fetcher for the job feed. Owned by the UI thread; fetches run on a
/// worker thread and at most one is in flight at a time.
pub struct FeedPoller {
    source: Arc<dyn FeedSource>,
    interval: Duration,
    jobs: Vec<JobRecord>,
    loading: bool,
    error: Option<String>,
    last_updated: Option<DateTime<Local>>,
    has_loaded: bool,
    generation: u64,
    in_flight: bool,
    next_due: Instant,
    outcome_tx: Sender<FetchOutcome>,
    outcome_rx: Receiver<FetchOutcome>,
}

impl FeedPoller {
    pub fn new(source: Arc<dyn FeedSource>, interval: Duration) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            source,
            interval,
            jobs: Vec::new(),
            loading: false,
            error: None,
            last_updated: None,
            has_loaded: false,
            generation: 0,
            in_flight: false,
            next_due: Instant::now(),
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn has_loaded(&self) -> bool {
        self.has_loaded
    }

    /// Bumped every time the job list is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Starts a background fetch. Returns `false` when one is already running.
    pub fn request_refresh(&mut self, trigger: FetchTrigger) -> bool {
        if self.in_flight {
            tracing::debug!(?trigger, "Fetch already in flight, skipping refresh");
            return false;
        }

        self.in_flight = true;
        self.loading = true;
        self.next_due = Instant::now() + self.interval;

        let source = Arc::clone(&self.source);
        let tx = self.outcome_tx.clone();
        tracing::info!(?trigger, "Fetching job feed");
        thread::spawn(move || {
            let result = source.fetch().map_err(|err| err.to_string());
            // The poller may be gone by now; its receiver going away discards the result.
            let _ = tx.send(FetchOutcome { trigger, result });
        });
        true
    }

    /// Issues a scheduled refresh once the poll interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        if self.in_flight {
            self.next_due = now + self.interval;
            return false;
        }
        self.request_refresh(FetchTrigger::Scheduled)
    }

    /// Applies every finished fetch without blocking.
    pub fn poll_updates(&mut self) -> Vec<PollUpdate> {
        let mut updates = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            updates.push(self.apply(outcome));
        }
        updates
    }

    /// Blocks until the in-flight fetch reports, or the timeout elapses.
    pub fn wait_for_update(&mut self, timeout: Duration) -> Option<PollUpdate> {
        if !self.in_flight {
            return None;
        }
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(self.apply(outcome)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Fetches on the calling thread. Used by the one-shot commands.
    pub fn refresh_blocking(&mut self) -> Result<usize, FeedError> {
        if self.in_flight {
            return match self.wait_for_update(self.interval) {
                Some(PollUpdate::Jobs { count, .. }) => Ok(count),
                Some(PollUpdate::Failed { message, .. }) => Err(FeedError::Background { message }),
                None => Err(FeedError::WorkerGone),
            };
        }

        self.loading = true;
        match self.source.fetch() {
            Ok(jobs) => Ok(self.apply_jobs(jobs, FetchTrigger::Manual)),
            Err(err) => {
                self.apply_failure(err.to_string(), FetchTrigger::Manual);
                Err(err)
            }
        }
    }

    fn apply(&mut self, outcome: FetchOutcome) -> PollUpdate {
        let trigger = outcome.trigger;
        match outcome.result {
            Ok(jobs) => PollUpdate::Jobs {
                count: self.apply_jobs(jobs, trigger),
                trigger,
            },
            Err(message) => {
                self.apply_failure(message.clone(), trigger);
                PollUpdate::Failed { message, trigger }
            }
        }
    }

    fn apply_jobs(&mut self, jobs: Vec<JobRecord>, trigger: FetchTrigger) -> usize {
        self.in_flight = false;
        self.loading = false;

        let fetched = jobs.len();
        self.jobs = dedupe_by_link(jobs);
        self.error = None;
        self.last_updated = Some(Local::now());
        self.has_loaded = true;
        self.generation = self.generation.wrapping_add(1);
        tracing::info!(fetched, unique = self.jobs.len(), ?trigger, "Job list updated");
        self.jobs.len()
    }

    fn apply_failure(&mut self, message: String, trigger: FetchTrigger) {
        self.in_flight = false;
        self.loading = false;

        tracing::warn!(error = %message, ?trigger, "Job feed fetch failed");
        self.error = Some(message);
    }
}
