//! Database repositories.

#![allow(missing_docs)]

pub mod job;
pub mod job_notification;
pub mod plan;
pub mod site_config;
pub mod subscription;

pub use job::{JobRepository, NewJob};
pub use job_notification::JobNotificationRepository;
pub use plan::PlanRepository;
pub use site_config::SiteConfigRepository;
pub use subscription::{SubscriberRow, SubscriptionRepository};
