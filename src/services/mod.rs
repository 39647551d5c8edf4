pub mod assignments;
pub mod calendar;
pub mod directory;
pub mod export;
pub mod identity;
pub mod identity_mirror;
pub mod reporting;
pub mod routes;
pub mod scheduler;
pub mod security;
pub mod seed;
pub mod task_generator;
pub mod tasks;
pub mod uploads;
pub mod views;

pub use identity::{HttpIdentityProvider, IdentityProvider};
pub use uploads::UploadStore;
