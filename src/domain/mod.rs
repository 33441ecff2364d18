/// Domain models
///
/// Users and their single-use refresh tokens. Access tokens are never
/// persisted, so they live next to the issuer in `auth`.

mod refresh_token;
mod user;

pub use refresh_token::RefreshToken;
pub use user::{NewUser, Role, User};
