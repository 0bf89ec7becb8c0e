pub mod catalog;
pub mod config;
pub mod error;
pub mod record;

pub use catalog::*;
pub use config::Config;
pub use error::*;
pub use record::*;
