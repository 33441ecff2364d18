mod auth;
mod health_check;
mod users;

pub use auth::{login, refresh, register};
pub use health_check::health_check;
pub use users::{get_current_user, get_user, UserResponse};
