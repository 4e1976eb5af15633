pub mod actor_service;
pub mod user_service;

pub use actor_service::ActorService;
pub use user_service::{NewUser, UserError, UserService};
