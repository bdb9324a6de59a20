use std::io::{self, Write};

use crate::cli::ListArgs;
use crate::core::config::Settings;
use crate::core::error::AppError;
use crate::core::filter::{visible_jobs, FilterState, TitleFilter};
use crate::core::formatter::{format_card, format_showing_line};
use crate::core::job::JobRecord;
use crate::core::store::KeyValueStore;
use crate::core::tracker::SeenTracker;
use crate::core::{build_poller, open_store};

/// Fetches the feed once and prints the job cards to stdout.
pub fn list(settings: &Settings, args: &ListArgs) -> Result<(), AppError> {
    let mut poller = build_poller(settings)?;
    let count = poller.refresh_blocking()?;
    tracing::info!(count, "Fetched job feed");

    let mut tracker = SeenTracker::new(open_store(settings), settings.tracking);
    tracker.observe(poller.jobs());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_listing(&mut out, poller.jobs(), &tracker, settings, args)?;
    out.flush()?;
    Ok(())
}

/// Fetches the feed once and records every job in it as seen.
pub fn mark_seen(settings: &Settings) -> Result<(), AppError> {
    let mut poller = build_poller(settings)?;
    poller.refresh_blocking()?;

    let mut tracker = SeenTracker::new(open_store(settings), settings.tracking);
    let marked = mark_current_seen(&mut tracker, poller.jobs());

    let mut out = io::stdout().lock();
    writeln!(
        out,
        "Marked {marked} new job(s) as seen ({} in feed, {} seen in total)",
        poller.jobs().len(),
        tracker.seen_count()
    )?;
    Ok(())
}

fn mark_current_seen<S: KeyValueStore>(tracker: &mut SeenTracker<S>, jobs: &[JobRecord]) -> usize {
    tracker.observe(jobs);
    let unseen = tracker.unseen_count();
    tracker.mark_all_seen();
    unseen
}

fn write_listing<W: Write, S: KeyValueStore>(
    out: &mut W,
    jobs: &[JobRecord],
    tracker: &SeenTracker<S>,
    settings: &Settings,
    args: &ListArgs,
) -> io::Result<()> {
    let (filters, titles) = if args.all {
        (FilterState::all(), None)
    } else {
        (FilterState::default(), settings.title_filter.then(TitleFilter::design_roles))
    };

    let mut visible = visible_jobs(jobs, &filters, titles);
    if args.only_new {
        visible.retain(|job| tracker.is_new(job));
    }

    for job in &visible {
        for line in format_card(job, tracker.is_new(job)) {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }
    writeln!(
        out,
        "{} | {} new",
        format_showing_line(visible.len(), jobs.len()),
        tracker.unseen_count()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::{job, Evaluation};
    use crate::core::store::MemoryStore;
    use crate::core::tracker::TrackingMode;
    use serde_json::json;

    fn feed() -> Vec<JobRecord> {
        let mut skipped = job("c", "Barista", "Cafe");
        skipped.evaluation = Evaluation::Skip;
        vec![job("a", "Product Designer", "Acme"), job("b", "UX Researcher", "Beta"), skipped]
    }

    fn render(tracker: &SeenTracker<MemoryStore>, jobs: &[JobRecord], args: ListArgs) -> String {
        let mut out = Vec::new();
        write_listing(&mut out, jobs, tracker, &Settings::default(), &args).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn seeded_tracker(seen: &[&str]) -> SeenTracker<MemoryStore> {
        let mut store = MemoryStore::new();
        store
            .set(crate::core::tracker::SEEN_JOBS_KEY, json!(seen))
            .unwrap();
        SeenTracker::new(store, TrackingMode::Highlight)
    }

    #[test]
    fn listing_hides_skipped_jobs_by_default() {
        let jobs = feed();
        let mut tracker = seeded_tracker(&["a"]);
        tracker.observe(&jobs);

        let text = render(&tracker, &jobs, ListArgs { all: false, only_new: false });

        assert!(text.contains("Product Designer"));
        assert!(text.contains("NEW [unrated] Beta"));
        assert!(!text.contains("NEW [unrated] Acme"));
        assert!(!text.contains("Barista"));
        assert!(text.trim_end().ends_with("| 2 new"));
    }

    #[test]
    fn listing_all_shows_every_job() {
        let jobs = feed();
        let mut tracker = seeded_tracker(&[]);
        tracker.observe(&jobs);

        let text = render(&tracker, &jobs, ListArgs { all: true, only_new: false });

        assert!(text.contains("Barista"));
        assert!(text.contains(&format_showing_line(3, 3)));
    }

    #[test]
    fn listing_new_only_drops_seen_jobs() {
        let jobs = feed();
        let mut tracker = seeded_tracker(&["a"]);
        tracker.observe(&jobs);

        let text = render(&tracker, &jobs, ListArgs { all: false, only_new: true });

        assert!(!text.contains("Product Designer"));
        assert!(text.contains("UX Researcher"));
    }

    #[test]
    fn mark_current_seen_reports_previously_unseen() {
        let jobs = feed();
        let mut tracker = seeded_tracker(&["a"]);

        assert_eq!(mark_current_seen(&mut tracker, &jobs), 2);
        assert_eq!(tracker.unseen_count(), 0);
        assert_eq!(tracker.seen_count(), 3);
    }
}
