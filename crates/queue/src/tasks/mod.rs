//! Task definitions.
//!
//! Each pipeline stage consumes one payload type from its own queue. Payloads
//! are serialized once as JSON when enqueued and never change afterwards.

use scrapjobs_common::config::QueueWeights;
use serde::Serialize;
use serde::de::DeserializeOwned;

mod analyze;
mod notify;
mod results;
mod scrape;

pub use analyze::AnalyzeUserJobPayload;
pub use notify::NotifyUserPayload;
pub use results::ProcessResultsPayload;
pub use scrape::ScrapeSitePayload;

/// Pipeline task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Scrape one site.
    ScrapeSite,
    /// Match freshly scraped jobs against subscribers.
    ProcessResults,
    /// Analyze one curriculum against one job.
    AnalyzeResume,
    /// Email one analysis.
    NotifyUser,
}

/// Priority tier of a task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Critical,
    Default,
    Low,
}

impl Tier {
    /// Configured weight of the tier.
    #[must_use]
    pub const fn weight(self, weights: &QueueWeights) -> u32 {
        match self {
            Self::Critical => weights.critical,
            Self::Default => weights.default,
            Self::Low => weights.low,
        }
    }
}

impl TaskKind {
    /// Every task type.
    pub const ALL: [Self; 4] = [
        Self::ScrapeSite,
        Self::ProcessResults,
        Self::AnalyzeResume,
        Self::NotifyUser,
    ];

    /// Queue name of the task type.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::ScrapeSite => "scrape:site",
            Self::ProcessResults => "process:results",
            Self::AnalyzeResume => "analyze:resume",
            Self::NotifyUser => "notify:user",
        }
    }

    /// Look a task type up by queue name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    /// Priority tier of the task type.
    #[must_use]
    pub const fn tier(self) -> Tier {
        match self {
            Self::ProcessResults | Self::NotifyUser => Tier::Critical,
            Self::ScrapeSite => Tier::Default,
            Self::AnalyzeResume => Tier::Low,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A payload that travels through a task queue.
pub trait Task: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Task type carried by this payload.
    const KIND: TaskKind;
}

impl Task for ScrapeSitePayload {
    const KIND: TaskKind = TaskKind::ScrapeSite;
}

impl Task for ProcessResultsPayload {
    const KIND: TaskKind = TaskKind::ProcessResults;
}

impl Task for AnalyzeUserJobPayload {
    const KIND: TaskKind = TaskKind::AnalyzeResume;
}

impl Task for NotifyUserPayload {
    const KIND: TaskKind = TaskKind::NotifyUser;
}
