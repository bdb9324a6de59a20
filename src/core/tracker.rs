use std::collections::HashSet;

use serde_json::Value;

use crate::core::job::JobRecord;
use crate::core::store::KeyValueStore;

pub const SEEN_JOBS_KEY: &str = "seenJobLinks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// Jobs stay new until the user marks them seen.
    #[default]
    Highlight,
    /// Every observed job is recorded as seen right away; only the batch that
    /// just arrived counts as new.
    AutoMark,
}

/// Jobs that arrived since the previous observation, in feed order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobs {
    pub jobs: Vec<JobRecord>,
}

/// Tracks which feed links the user has already been shown.
///
/// The seen set is read from the store on first use and cached for the
/// lifetime of the tracker. Store failures never escape: a failed read
/// degrades to an empty set and a failed write is only logged.
pub struct SeenTracker<S> {
    store: S,
    mode: TrackingMode,
    seen: Option<HashSet<String>>,
    unseen: HashSet<String>,
    current_links: Vec<String>,
    initialized: bool,
}

impl<S: KeyValueStore> SeenTracker<S> {
    pub fn new(store: S, mode: TrackingMode) -> Self {
        Self {
            store,
            mode,
            seen: None,
            unseen: HashSet::new(),
            current_links: Vec::new(),
            initialized: false,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recomputes the unseen set for a fresh job list. The first call after
    /// construction never reports new jobs.
    pub fn observe(&mut self, jobs: &[JobRecord]) -> Option<NewJobs> {
        match self.mode {
            TrackingMode::Highlight => self.observe_highlight(jobs),
            TrackingMode::AutoMark => self.observe_auto_mark(jobs),
        }
    }

    fn observe_highlight(&mut self, jobs: &[JobRecord]) -> Option<NewJobs> {
        let links: Vec<String> = linked(jobs).map(|job| job.link.clone()).collect();

        let seen = self.seen_set();
        let unseen: HashSet<String> = links
            .iter()
            .filter(|link| !seen.contains(link.as_str()))
            .cloned()
            .collect();
        self.current_links = links;

        let grew = unseen.len() > self.unseen.len();
        let arrived: Vec<JobRecord> = linked(jobs)
            .filter(|job| unseen.contains(&job.link) && !self.unseen.contains(&job.link))
            .cloned()
            .collect();

        let first = !self.initialized;
        self.initialized = true;
        self.unseen = unseen;

        tracing::debug!(unseen = self.unseen.len(), first, "Recomputed unseen jobs");

        if first || !grew || arrived.is_empty() {
            return None;
        }
        Some(NewJobs { jobs: arrived })
    }

    fn observe_auto_mark(&mut self, jobs: &[JobRecord]) -> Option<NewJobs> {
        if jobs.is_empty() {
            return None;
        }
        self.current_links = linked(jobs).map(|job| job.link.clone()).collect();

        let seen = self.seen_set();
        let mut arrived = Vec::new();
        for job in linked(jobs) {
            if seen.insert(job.link.clone()) {
                arrived.push(job.clone());
            }
        }
        self.persist();

        let first = !self.initialized;
        self.initialized = true;
        self.unseen = arrived.iter().map(|job| job.link.clone()).collect();

        tracing::debug!(new = arrived.len(), first, "Recorded observed jobs as seen");

        if first || arrived.is_empty() {
            return None;
        }
        Some(NewJobs { jobs: arrived })
    }

    pub fn is_new(&self, job: &JobRecord) -> bool {
        job.has_link() && self.unseen.contains(&job.link)
    }

    pub fn unseen_count(&self) -> usize {
        self.unseen.len()
    }

    pub fn seen_count(&mut self) -> usize {
        self.seen_set().len()
    }

    pub fn mark_all_seen(&mut self) {
        let links = std::mem::take(&mut self.current_links);
        let seen = self.seen_set();
        seen.extend(links.iter().cloned());
        self.current_links = links;
        self.persist();
        self.unseen.clear();
        tracing::info!(seen = self.seen_set().len(), "Marked all jobs as seen");
    }

    fn seen_set(&mut self) -> &mut HashSet<String> {
        if self.seen.is_none() {
            let loaded = self.load_seen();
            self.seen = Some(loaded);
        }
        self.seen.get_or_insert_with(HashSet::new)
    }

    fn load_seen(&mut self) -> HashSet<String> {
        match self.store.get(SEEN_JOBS_KEY) {
            Ok(Some(Value::Array(items))) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(link) => Some(link),
                    _ => None,
                })
                .collect(),
            Ok(Some(other)) => {
                tracing::warn!(found = %other, "Seen jobs entry is not an array, starting empty");
                HashSet::new()
            }
            Ok(None) => HashSet::new(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load seen jobs, starting empty");
                HashSet::new()
            }
        }
    }

    fn persist(&mut self) {
        let mut links: Vec<String> = match &self.seen {
            Some(seen) => seen.iter().cloned().collect(),
            None => return,
        };
        links.sort();
        let value = Value::Array(links.into_iter().map(Value::String).collect());
        if let Err(err) = self.store.set(SEEN_JOBS_KEY, value) {
            tracing::error!(error = %err, "Failed to save seen jobs");
        }
    }
}

fn linked(jobs: &[JobRecord]) -> impl Iterator<Item = &JobRecord> {
    jobs.iter().filter(|job| job.has_link())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use crate::core::job::job;
    use crate::core::store::{temp_store_path, JsonFileStore, MemoryStore};
    use serde_json::json;
    use std::fs;

    struct FailingStore {
        writes: usize,
    }

    impl KeyValueStore for FailingStore {
        fn get(&mut self, _key: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable {
                message: "disk on fire".to_string(),
            })
        }

        fn set(&mut self, _key: &str, _value: Value) -> Result<(), StoreError> {
            self.writes += 1;
            Err(StoreError::Unavailable {
                message: "disk on fire".to_string(),
            })
        }
    }

    fn store_with_seen(links: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set(SEEN_JOBS_KEY, json!(links)).unwrap();
        store
    }

    fn stored_links(store: &mut MemoryStore) -> Vec<String> {
        serde_json::from_value(store.get(SEEN_JOBS_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn is_new_reflects_seen_set() {
        let mut tracker = SeenTracker::new(store_with_seen(&["a"]), TrackingMode::Highlight);
        let jobs = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];

        assert_eq!(tracker.observe(&jobs), None);
        assert!(!tracker.is_new(&jobs[0]));
        assert!(tracker.is_new(&jobs[1]));
        assert_eq!(tracker.unseen_count(), 1);
    }

    #[test]
    fn seen_set_loads_lazily() {
        let mut tracker = SeenTracker::new(store_with_seen(&["a", "b"]), TrackingMode::Highlight);
        assert!(tracker.seen.is_none());
        assert_eq!(tracker.seen_count(), 2);
        assert!(tracker.seen.is_some());
    }

    #[test]
    fn job_without_link_is_never_new() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        let jobs = vec![job("", "Ghost", "Nowhere")];

        tracker.observe(&jobs);
        assert!(!tracker.is_new(&jobs[0]));
        assert_eq!(tracker.unseen_count(), 0);
    }

    #[test]
    fn first_observation_is_silent() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        let jobs: Vec<JobRecord> = (0..10)
            .map(|i| job(&format!("link-{i}"), "Designer", "Acme"))
            .collect();

        assert_eq!(tracker.observe(&jobs), None);
        assert_eq!(tracker.unseen_count(), 10);
    }

    #[test]
    fn second_poll_reports_only_the_added_job() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        let first = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];
        let mut second = first.clone();
        second.insert(0, job("c", "UX Lead", "Gamma"));

        assert_eq!(tracker.observe(&first), None);
        let new_jobs = tracker.observe(&second).unwrap();

        assert_eq!(new_jobs.jobs.len(), 1);
        assert_eq!(new_jobs.jobs[0].link, "c");
        assert_eq!(tracker.unseen_count(), 3);
    }

    #[test]
    fn unchanged_poll_does_not_report() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        let jobs = vec![job("a", "A", "Acme")];

        tracker.observe(&jobs);
        assert_eq!(tracker.observe(&jobs), None);
    }

    #[test]
    fn mark_all_seen_clears_unseen_and_persists() {
        let mut tracker = SeenTracker::new(store_with_seen(&["old"]), TrackingMode::Highlight);
        let jobs = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];

        tracker.observe(&jobs);
        tracker.mark_all_seen();

        assert_eq!(tracker.unseen_count(), 0);
        assert!(jobs.iter().all(|j| !tracker.is_new(j)));

        let mut store = tracker.store.clone();
        let stored = stored_links(&mut store);
        assert_eq!(stored, vec!["a", "b", "old"]);
    }

    #[test]
    fn seen_jobs_stay_seen_on_next_poll() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        let jobs = vec![job("a", "A", "Acme")];

        tracker.observe(&jobs);
        tracker.mark_all_seen();
        let mut next = jobs.clone();
        next.push(job("b", "B", "Beta"));

        let new_jobs = tracker.observe(&next).unwrap();
        assert_eq!(new_jobs.jobs[0].link, "b");
        assert!(!tracker.is_new(&next[0]));
        assert_eq!(tracker.unseen_count(), 1);
    }

    #[test]
    fn store_read_failure_degrades_to_empty() {
        let mut tracker = SeenTracker::new(FailingStore { writes: 0 }, TrackingMode::Highlight);
        let jobs = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];

        assert_eq!(tracker.observe(&jobs), None);
        assert_eq!(tracker.unseen_count(), 2);

        tracker.mark_all_seen();
        assert_eq!(tracker.unseen_count(), 0);
        assert_eq!(tracker.store.writes, 1);
    }

    #[test]
    fn mark_all_seen_repairs_corrupt_store_file() {
        let path = temp_store_path("tracker-corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{truncated").unwrap();
        let jobs = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];

        let mut tracker = SeenTracker::new(JsonFileStore::new(&path), TrackingMode::Highlight);
        tracker.observe(&jobs);
        assert_eq!(tracker.unseen_count(), 2);
        tracker.mark_all_seen();

        let mut restarted = SeenTracker::new(JsonFileStore::new(&path), TrackingMode::Highlight);
        restarted.observe(&jobs);
        assert_eq!(restarted.unseen_count(), 0);

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn auto_mark_records_jobs_and_reports_later_arrivals() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::AutoMark);
        let first = vec![job("a", "A", "Acme")];
        let second = vec![job("a", "A", "Acme"), job("b", "B", "Beta")];

        assert_eq!(tracker.observe(&first), None);
        assert_eq!(stored_links(&mut tracker.store.clone()), vec!["a"]);

        let new_jobs = tracker.observe(&second).unwrap();
        assert_eq!(new_jobs.jobs.len(), 1);
        assert_eq!(new_jobs.jobs[0].link, "b");
        assert!(tracker.is_new(&second[1]));
        assert!(!tracker.is_new(&second[0]));
        assert_eq!(stored_links(&mut tracker.store.clone()), vec!["a", "b"]);
    }

    #[test]
    fn auto_mark_ignores_empty_list() {
        let mut tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::AutoMark);

        assert_eq!(tracker.observe(&[]), None);
        // An empty list does not count as the first observation.
        assert_eq!(tracker.observe(&[job("a", "A", "Acme")]), None);
        assert!(tracker.observe(&[job("a", "A", "Acme"), job("b", "B", "Beta")]).is_some());
    }
}
