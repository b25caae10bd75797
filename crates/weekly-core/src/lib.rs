pub mod config;
pub mod error;
pub mod extract;
pub mod io;
pub mod kv;
pub mod lifecycle;
pub mod paths;
pub mod report;
pub mod resolver;
pub mod sources;
pub mod store;
pub mod types;
pub mod urgent;
pub mod warehouse;
pub mod week;

pub use error::{Result, WeeklyError};
