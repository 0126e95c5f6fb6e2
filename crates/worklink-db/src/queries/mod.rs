mod applications;
mod follows;
mod jobs;
mod media;
mod otps;
mod posts;
mod users;

pub use jobs::{JobChanges, JobFilter, JobSort};
pub use posts::PostChanges;
pub use users::ProfileChanges;
