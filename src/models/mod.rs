pub mod cleaner_assignment;
pub mod cleaning_task;
pub mod company;
pub mod route;
pub mod route_point;
pub mod service_point;
pub mod user;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::cleaner_assignment::{self, Entity as CleanerAssignment};
    pub use super::cleaning_task::{self, Entity as CleaningTask, TaskStatus};
    pub use super::company::{self, Entity as Company};
    pub use super::route::{self, Entity as Route};
    pub use super::route_point::{self, Entity as RoutePoint};
    pub use super::service_point::{self, Entity as ServicePoint, ServicePointType};
    pub use super::user::{self, Entity as User, UserRole};
}
