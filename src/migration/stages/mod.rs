mod analyze;
mod archives;
mod classification;
mod configuration;
mod metadata;
mod previews;

use super::{context::MigrationContext, progress::StageKind};
use crate::error::MigrationError;

pub(crate) trait Stage {
    fn kind(&self) -> StageKind;
    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError>;
}

/// Stages in execution order. Later stages look up identities created by
/// earlier ones, so the order is fixed.
pub(crate) fn pipeline() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(analyze::AnalyzeStage),
        Box::new(metadata::MetadataStage),
        Box::new(archives::ArchiveStage),
        Box::new(classification::ClassificationStage),
        Box::new(previews::PreviewStage),
        Box::new(configuration::ConfigurationStage),
    ]
}

fn fatal(stage: StageKind, err: anyhow::Error) -> MigrationError {
    MigrationError::stage(stage.label(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_follows_stage_order() {
        let kinds: Vec<StageKind> = pipeline().iter().map(|stage| stage.kind()).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
    }
}
