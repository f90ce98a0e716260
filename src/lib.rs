pub mod audit;
pub mod baseline;
pub mod budget;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod integrity;
pub mod repository;
pub mod schedule;

pub use baseline::BaselineOrchestrator;
pub use error::{BaselineError, ErrorKind};
