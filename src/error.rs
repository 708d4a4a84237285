use std::{io, path::PathBuf};
use thiserror::Error;

// Item-level problems are warnings on the run, never one of these.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("source path does not exist: {0:?}")]
    SourceMissing(PathBuf),
    #[error("source is not a legacy installation: {0}")]
    InvalidSource(String),
    #[error("invalid destination profile: {0}")]
    InvalidProfile(String),
    #[error("destination is not writable: {path:?} ({source})")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{stage} stage failed: {source:#}")]
    Stage {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("migration cancelled")]
    Cancelled,
}

impl MigrationError {
    pub fn stage(stage: &'static str, source: anyhow::Error) -> Self {
        MigrationError::Stage { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_names_the_stage() {
        let err = MigrationError::stage("Archives", anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "Archives stage failed: disk full");
        assert_eq!(MigrationError::Cancelled.to_string(), "migration cancelled");
    }
}
