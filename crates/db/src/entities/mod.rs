//! Database entities.

#![allow(missing_docs)]

pub mod curriculum;
pub mod job;
pub mod job_notification;
pub mod plan;
pub mod site_scraping_config;
pub mod user;
pub mod user_site;

pub use curriculum::Entity as Curriculum;
pub use job::Entity as Job;
pub use job_notification::Entity as JobNotification;
pub use plan::Entity as Plan;
pub use site_scraping_config::Entity as SiteScrapingConfig;
pub use user::Entity as User;
pub use user_site::Entity as UserSite;
