mod crypto;
mod extractor;
mod session;

pub use crypto::{hash_password, verify_password};
pub use extractor::{AuthError, AuthUser};
pub use session::{create_session, issue_token, resolve_token};
