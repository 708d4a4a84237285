pub mod cli;
pub mod config;
pub mod error;
pub mod legacy;
pub mod log;
pub mod migration;
pub mod profile;
pub mod services;
pub mod store;

pub use error::MigrationError;
pub use migration::{
    AnalysisResult, CancellationToken, MigrationOptions, MigrationProgress, MigrationResult,
    Migrator, ValidationResult,
};
pub use services::{MigrationServices, TransferMode};
