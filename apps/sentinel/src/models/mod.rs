pub mod job;
pub mod sent_job;
