pub mod config;
pub mod error;
pub mod types;

pub use error::{SealdropError, SealdropResult};
pub use types::{FileId, ShareLink};
