//! FeedbackATM backend: cleaning tasks for ATMs and bus stops, with
//! cleaner, manager and admin APIs.

pub mod application;
pub mod endpoints;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schemas;
pub mod services;

pub use application::bootstrapper;
pub use application::config;
pub use application::database as db;
pub use application::error;
pub use application::state;
