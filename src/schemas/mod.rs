pub mod common;
pub mod dashboard;
pub mod directory;
pub mod route;
pub mod task;

pub use common::*;
pub use dashboard::*;
pub use directory::*;
pub use route::*;
pub use task::*;
