use super::progress::StageKind;
use crate::services::TransferMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAX_REPORTED_WARNINGS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    pub source: PathBuf,
    pub profile_id: String,
    #[serde(default)]
    pub mode: TransferMode,
    pub migrate_previews: bool,
    pub migrate_classifications: bool,
    pub migrate_configuration: bool,
}

impl MigrationOptions {
    pub fn new(source: &Path, profile_id: &str) -> Self {
        Self {
            source: source.to_path_buf(),
            profile_id: profile_id.to_string(),
            mode: TransferMode::Copy,
            migrate_previews: true,
            migrate_classifications: true,
            migrate_configuration: true,
        }
    }

    pub fn with_mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_previews(mut self, enabled: bool) -> Self {
        self.migrate_previews = enabled;
        self
    }

    pub fn with_classifications(mut self, enabled: bool) -> Self {
        self.migrate_classifications = enabled;
        self
    }

    pub fn with_configuration(mut self, enabled: bool) -> Self {
        self.migrate_configuration = enabled;
        self
    }

    pub fn stage_enabled(&self, stage: StageKind) -> bool {
        match stage {
            StageKind::Analyze | StageKind::Metadata | StageKind::Archives => true,
            StageKind::Classifications => self.migrate_classifications,
            StageKind::Previews => self.migrate_previews,
            StageKind::Configuration => self.migrate_configuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotRun,
    Running,
    Completed,
    Skipped,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: StageKind,
    pub status: StageStatus,
    pub created: usize,
    pub copied: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub elapsed_ms: u64,
}

impl StageSummary {
    fn new(stage: StageKind) -> Self {
        Self {
            stage,
            status: StageStatus::NotRun,
            created: 0,
            copied: 0,
            skipped: 0,
            warnings: 0,
            elapsed_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTotals {
    pub mods_created: usize,
    pub mods_existing: usize,
    pub archives_copied: usize,
    pub archives_linked: usize,
    pub archives_skipped: usize,
    pub archives_missing: usize,
    pub categories_created: usize,
    pub objects_created: usize,
    pub nodes_skipped: usize,
    pub rules_registered: usize,
    pub previews_copied: usize,
    pub previews_skipped: usize,
    pub thumbnails_copied: usize,
    pub thumbnails_associated: usize,
    pub settings_written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub profile_id: String,
    pub source: PathBuf,
    pub mode: TransferMode,
    pub success: bool,
    pub cancelled: bool,
    pub fatal_error: Option<String>,
    pub stages: Vec<StageSummary>,
    pub totals: MigrationTotals,
    /// First [`MAX_REPORTED_WARNINGS`] warnings; `warning_count` is the total.
    pub warnings: Vec<String>,
    pub warning_count: usize,
    pub started_at: i64,
    pub finished_at: i64,
    pub log_path: Option<PathBuf>,
}

impl MigrationResult {
    pub(crate) fn start(options: &MigrationOptions, started_at: i64) -> Self {
        Self {
            profile_id: options.profile_id.clone(),
            source: options.source.clone(),
            mode: options.mode,
            success: false,
            cancelled: false,
            fatal_error: None,
            stages: StageKind::ALL.iter().copied().map(StageSummary::new).collect(),
            totals: MigrationTotals::default(),
            warnings: Vec::new(),
            warning_count: 0,
            started_at,
            finished_at: started_at,
            log_path: None,
        }
    }

    pub(crate) fn push_warning(&mut self, message: String) {
        self.warning_count += 1;
        if self.warnings.len() < MAX_REPORTED_WARNINGS {
            self.warnings.push(message);
        }
    }

    pub fn stage(&self, stage: StageKind) -> &StageSummary {
        &self.stages[stage.index()]
    }

    pub(crate) fn stage_mut(&mut self, stage: StageKind) -> &mut StageSummary {
        &mut self.stages[stage.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_bounded_but_counted() {
        let options = MigrationOptions::new(Path::new("/legacy"), "Imported");
        let mut result = MigrationResult::start(&options, 0);
        for index in 0..(MAX_REPORTED_WARNINGS + 5) {
            result.push_warning(format!("w{index}"));
        }
        assert_eq!(result.warnings.len(), MAX_REPORTED_WARNINGS);
        assert_eq!(result.warning_count, MAX_REPORTED_WARNINGS + 5);
    }

    #[test]
    fn optional_stages_follow_toggles() {
        let options = MigrationOptions::new(Path::new("/legacy"), "Imported")
            .with_previews(false)
            .with_configuration(false);
        assert!(options.stage_enabled(StageKind::Archives));
        assert!(options.stage_enabled(StageKind::Classifications));
        assert!(!options.stage_enabled(StageKind::Previews));
        assert!(!options.stage_enabled(StageKind::Configuration));
    }
}
