pub mod audit;
pub mod delivery_jobs;
pub mod templates;
