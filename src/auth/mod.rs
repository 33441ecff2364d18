/// Authentication module
///
/// Password hashing, access token issuance/verification, refresh token
/// generation and the session flows (register, login, refresh rotation).

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::Claims;
pub use jwt::TokenIssuer;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::IssuedRefreshToken;
pub use session::{AuthService, LoginOutcome, TokenPair};
