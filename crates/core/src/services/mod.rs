//! Pipeline services.

pub mod analysis;
pub mod email;
pub mod gemini;
pub mod jobs;
pub mod matching;
pub mod notification;
pub mod rate_limit;
pub mod sites;

pub use analysis::{AiResumeAnalyzer, ResumeAnalyzer, TextGenerator, build_prompt, extract_json};
pub use email::{EmailMessage, EmailSender, SmtpMailer, escape_html, render_analysis_email};
pub use gemini::GeminiClient;
pub use jobs::{IngestOutcome, JobIngestService, JobStore};
pub use matching::{
    MatchFinder, NotificationStore, PlanStore, SubscriptionStore, UserJobMatch, matches_filters,
};
pub use notification::{NotificationService, NotifyOutcome};
pub use rate_limit::RateLimitedAnalyzer;
pub use sites::SiteConfigStore;
