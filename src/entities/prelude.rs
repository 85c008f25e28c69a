pub use super::manual_jobs::Entity as ManualJobs;
pub use super::scrape_jobs::Entity as ScrapeJobs;
