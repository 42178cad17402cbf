pub mod application;
pub mod job;
pub mod profile;

pub use application::{Application, ApplicationLogEntry, NewApplication};
pub use job::{IntakeItem, Job, JobFilter, JobStatus, NewJob};
pub use profile::UserProfile;
