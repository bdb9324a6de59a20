use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::core::job::{Evaluation, JobRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationFilter {
    None,
    Perfect,
    Good,
    Maybe,
    Skip,
}

impl EvaluationFilter {
    pub const ALL: [EvaluationFilter; 5] = [
        EvaluationFilter::None,
        EvaluationFilter::Perfect,
        EvaluationFilter::Good,
        EvaluationFilter::Maybe,
        EvaluationFilter::Skip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EvaluationFilter::None => "No Evaluation",
            EvaluationFilter::Perfect => "Perfect",
            EvaluationFilter::Good => "Good",
            EvaluationFilter::Maybe => "Maybe",
            EvaluationFilter::Skip => "Skip",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" | "unrated" | "no-evaluation" => Some(EvaluationFilter::None),
            "perfect" => Some(EvaluationFilter::Perfect),
            "good" => Some(EvaluationFilter::Good),
            "maybe" => Some(EvaluationFilter::Maybe),
            "skip" => Some(EvaluationFilter::Skip),
            _ => None,
        }
    }

    /// `None` for labels no filter covers; such jobs are never shown.
    pub fn for_evaluation(evaluation: &Evaluation) -> Option<Self> {
        match evaluation {
            Evaluation::Unrated => Some(EvaluationFilter::None),
            Evaluation::Perfect => Some(EvaluationFilter::Perfect),
            Evaluation::Good => Some(EvaluationFilter::Good),
            Evaluation::Maybe => Some(EvaluationFilter::Maybe),
            Evaluation::Skip => Some(EvaluationFilter::Skip),
            Evaluation::Unknown(_) => None,
        }
    }

    fn index(self) -> usize {
        match self {
            EvaluationFilter::None => 0,
            EvaluationFilter::Perfect => 1,
            EvaluationFilter::Good => 2,
            EvaluationFilter::Maybe => 3,
            EvaluationFilter::Skip => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    enabled: [bool; 5],
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            enabled: [true, true, true, true, false],
        }
    }
}

impl FilterState {
    pub fn all() -> Self {
        Self { enabled: [true; 5] }
    }

    pub fn is_enabled(&self, key: EvaluationFilter) -> bool {
        self.enabled[key.index()]
    }

    pub fn toggle(&mut self, key: EvaluationFilter) -> bool {
        let slot = &mut self.enabled[key.index()];
        *slot = !*slot;
        *slot
    }

    pub fn allows(&self, job: &JobRecord) -> bool {
        EvaluationFilter::for_evaluation(&job.evaluation)
            .map(|key| self.is_enabled(key))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    counts: [usize; 5],
}

impl FilterCounts {
    pub fn from_jobs(jobs: &[JobRecord]) -> Self {
        let mut counts = [0; 5];
        for key in jobs
            .iter()
            .filter_map(|job| EvaluationFilter::for_evaluation(&job.evaluation))
        {
            counts[key.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, key: EvaluationFilter) -> usize {
        self.counts[key.index()]
    }
}

pub const KEEPWORDS: &[&str] = &[
    "UI",
    "UX",
    "User Interface",
    "User Experience",
    "Designer",
    "Design",
    "Product Designer",
    "UI/UX",
    "UX/UI",
    "IxD",
    "Service Designer",
    "Web Designer",
    "Visual Designer",
    "Interaction Designer",
    "UX Researcher",
    "UX Architect",
    "UX Strategist",
];

pub const STOPWORDS: &[&str] = &[
    "Frontend",
    "Developer",
    "Entwickler",
    "Tech Lead",
    "Technical Lead",
    "Full Stack",
    "Fullstack",
];

static DEFAULT_TITLE_FILTER: Lazy<TitleFilter> =
    Lazy::new(|| TitleFilter::new(KEEPWORDS, STOPWORDS).unwrap());

/// Title keyword filter: keeps a title that contains any keepword and no
/// stopword, compared case-insensitively as plain substrings.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    keep: Option<Regex>,
    stop: Option<Regex>,
}

impl TitleFilter {
    pub fn new(keepwords: &[&str], stopwords: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            keep: substring_set(keepwords)?,
            stop: substring_set(stopwords)?,
        })
    }

    pub fn design_roles() -> &'static TitleFilter {
        &DEFAULT_TITLE_FILTER
    }

    pub fn matches(&self, title: &str) -> bool {
        let kept = self.keep.as_ref().is_some_and(|keep| keep.is_match(title));
        kept && !self.stop.as_ref().is_some_and(|stop| stop.is_match(title))
    }
}

fn substring_set(words: &[&str]) -> Result<Option<Regex>, regex::Error> {
    if words.is_empty() {
        return Ok(None);
    }
    let alternation = words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .map(Some)
}

pub fn visible_jobs<'a>(
    jobs: &'a [JobRecord],
    filters: &FilterState,
    titles: Option<&TitleFilter>,
) -> Vec<&'a JobRecord> {
    jobs.iter()
        .filter(|job| filters.allows(job))
        .filter(|job| titles.map_or(true, |t| t.matches(&job.title)))
        .collect()
}
