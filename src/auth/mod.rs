mod middleware;
mod signin;
mod token;

pub use middleware::{AuthError, RequireUser};
pub use signin::{email_allowed, select_school_email};
pub use token::{IssuedToken, TokenGenerator, parse_token};
