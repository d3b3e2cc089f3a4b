//! Authentication service models

pub mod audit;
pub mod refresh_token;
pub mod user;

// Re-export for convenience
pub use audit::Audit;
pub use refresh_token::RefreshToken;
pub use user::{NewUser, User, UserResponse};
