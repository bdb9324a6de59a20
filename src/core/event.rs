use crate::core::job::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Startup,
    Scheduled,
    Manual,
}

/// Outcome of a finished fetch, after it has been applied to the poller state.
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    Jobs { count: usize, trigger: FetchTrigger },
    Failed { message: String, trigger: FetchTrigger },
}

/// What a fetch worker sends back to the UI thread.
#[derive(Debug)]
pub(crate) struct FetchOutcome {
    pub trigger: FetchTrigger,
    pub result: Result<Vec<JobRecord>, String>,
}
