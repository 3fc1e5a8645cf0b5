pub mod auth;
pub mod error;

pub use auth::{Actor, Role, User};
pub use error::{AppError, ErrorKind};
