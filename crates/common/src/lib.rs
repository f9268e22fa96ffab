//! Common utilities and shared types for scrapjobs.
//!
//! This crate provides foundational components used across all scrapjobs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Metrics**: Pipeline counters and gauges via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use scrapjobs_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("crawling every {}s", config.scheduler.crawl_interval_secs);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use metrics::{Metrics, MetricsSnapshot, Timer};
