pub mod client;
pub mod error;
pub mod session;

pub use client::{ApiClient, RequestContext};
pub use error::ApiError;
pub use session::{Session, SessionError};
