/// Middleware module
///
/// Request authentication, the admin role gate, and request logging.

mod admin_middleware;
mod jwt_middleware;
mod request_logger;

pub use admin_middleware::{authorize_admin, AdminMiddleware};
pub use jwt_middleware::{authenticate, AuthenticatedUser, JwtMiddleware};
pub use request_logger::RequestLogger;
