//! Core domain logic for scrapjobs.
//!
//! Holds the domain models shared by every pipeline stage and the services
//! behind them:
//!
//! - job ingest with per-site de-duplication ([`services::JobIngestService`])
//! - match finding and quota enforcement ([`services::MatchFinder`])
//! - rate-limited AI resume analysis ([`services::RateLimitedAnalyzer`])
//! - guarded user notification ([`services::NotificationService`])
//!
//! Storage and delivery are reached through the collaborator traits in
//! [`services`]; the `scrapjobs-db` repositories implement the store traits.

pub mod models;
pub mod services;

pub use models::*;
pub use services::*;
