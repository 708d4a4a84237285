use super::{
    analyzer::AnalysisResult,
    progress::{CancellationToken, ProgressReporter, StageKind},
    result::{MigrationOptions, MigrationResult, MigrationTotals, StageStatus},
};
use crate::{
    error::MigrationError,
    legacy::{LegacyClassification, LegacyLayout},
    log::MigrationLog,
    profile::ProfileLayout,
    services::MigrationServices,
};
use std::{collections::BTreeSet, sync::Arc, time::Instant};

#[derive(Debug, Clone)]
pub struct MigratedMod {
    pub hash: String,
    pub name: String,
    pub archive_type: String,
    pub file: Option<String>,
}

pub struct MigrationContext<'a> {
    options: &'a MigrationOptions,
    services: &'a MigrationServices,
    profile: &'a ProfileLayout,
    cancel: Option<&'a CancellationToken>,
    legacy: LegacyLayout,
    image_extensions: BTreeSet<String>,
    progress: ProgressReporter,
    log: MigrationLog,
    analysis: Option<AnalysisResult>,
    mods: Vec<MigratedMod>,
    classification: Option<Arc<LegacyClassification>>,
    result: MigrationResult,
    current: Option<(StageKind, Instant)>,
}

impl<'a> MigrationContext<'a> {
    pub(crate) fn new(
        options: &'a MigrationOptions,
        services: &'a MigrationServices,
        profile: &'a ProfileLayout,
        cancel: Option<&'a CancellationToken>,
        progress: ProgressReporter,
        log: MigrationLog,
        mut result: MigrationResult,
    ) -> Self {
        result.log_path = Some(log.path().to_path_buf());
        Self {
            options,
            services,
            profile,
            cancel,
            legacy: LegacyLayout::new(&options.source),
            image_extensions: services.images.supported_extensions(),
            progress,
            log,
            analysis: None,
            mods: Vec::new(),
            classification: None,
            result,
            current: None,
        }
    }

    pub fn options(&self) -> &'a MigrationOptions {
        self.options
    }

    pub fn services(&self) -> &'a MigrationServices {
        self.services
    }

    pub fn profile(&self) -> &'a ProfileLayout {
        self.profile
    }

    pub fn legacy(&self) -> &LegacyLayout {
        &self.legacy
    }

    pub fn image_extensions(&self) -> &BTreeSet<String> {
        &self.image_extensions
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub(crate) fn set_analysis(&mut self, analysis: AnalysisResult) {
        if self.analysis.is_none() {
            self.analysis = Some(analysis);
        }
    }

    pub fn mods(&self) -> &[MigratedMod] {
        &self.mods
    }

    pub fn push_mod(&mut self, migrated: MigratedMod) {
        self.mods.push(migrated);
    }

    pub fn totals(&mut self) -> &mut MigrationTotals {
        &mut self.result.totals
    }

    pub fn legacy_classification(&mut self) -> Arc<LegacyClassification> {
        if let Some(parsed) = &self.classification {
            return Arc::clone(parsed);
        }
        let outcome = LegacyClassification::parse(&self.legacy, &self.image_extensions);
        for warning in outcome.warnings {
            self.warn(format!("classification: {warning}"));
        }
        let parsed = Arc::new(outcome.value);
        self.classification = Some(Arc::clone(&parsed));
        parsed
    }

    pub fn check_cancelled(&self) -> Result<(), MigrationError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(MigrationError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log.info(message);
    }

    /// Item-level problem: logged, counted, and the stage carries on.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log.warn(message.clone());
        if let Some((stage, _)) = self.current {
            self.result.stage_mut(stage).warnings += 1;
        }
        self.result.push_warning(message);
    }

    pub fn created(&mut self) {
        if let Some((stage, _)) = self.current {
            self.result.stage_mut(stage).created += 1;
        }
    }

    pub fn copied(&mut self) {
        if let Some((stage, _)) = self.current {
            self.result.stage_mut(stage).copied += 1;
        }
    }

    pub fn skipped(&mut self) {
        if let Some((stage, _)) = self.current {
            self.result.stage_mut(stage).skipped += 1;
        }
    }

    pub fn report(&self, current: usize, total: usize, item: Option<String>) {
        if let Some((stage, _)) = self.current {
            self.progress.report(stage, current, total, item);
        }
    }

    pub(crate) fn begin_stage(&mut self, stage: StageKind) {
        self.current = Some((stage, Instant::now()));
        self.result.stage_mut(stage).status = StageStatus::Running;
        self.log.info(format!("Stage {} started", stage.label()));
        self.progress.report(stage, 0, 1, None);
    }

    pub(crate) fn end_stage(&mut self, status: StageStatus) {
        let Some((stage, started)) = self.current.take() else {
            return;
        };
        let summary = self.result.stage_mut(stage);
        summary.status = status;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        let line = format!(
            "Stage {} {} in {} ms: created {}, copied {}, skipped {}, warnings {}",
            stage.label(),
            status_label(status),
            summary.elapsed_ms,
            summary.created,
            summary.copied,
            summary.skipped,
            summary.warnings
        );
        match status {
            StageStatus::Failed => self.log.error(line),
            _ => self.log.info(line),
        }
    }

    pub(crate) fn skip_stage(&mut self, stage: StageKind) {
        self.result.stage_mut(stage).status = StageStatus::Skipped;
        self.log
            .info(format!("Stage {} skipped (disabled)", stage.label()));
    }

    pub(crate) fn fail(&mut self, error: &MigrationError) {
        self.log.error(format!("Migration aborted: {error}"));
        if self.result.fatal_error.is_none() {
            self.result.fatal_error = Some(error.to_string());
        }
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.log.warn("Migration cancelled; completed work is kept");
        self.result.cancelled = true;
    }

    pub(crate) fn finish(mut self, finished_at: i64) -> (MigrationResult, Option<AnalysisResult>) {
        self.result.finished_at = finished_at;
        self.result.success = !self.result.cancelled && self.result.fatal_error.is_none();
        let outcome = if self.result.success {
            "completed"
        } else if self.result.cancelled {
            "cancelled"
        } else {
            "failed"
        };
        self.log.info(format!(
            "Migration {outcome} with {} warning(s)",
            self.result.warning_count
        ));
        (self.result, self.analysis)
    }
}

fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::NotRun => "not run",
        StageStatus::Running => "running",
        StageStatus::Completed => "completed",
        StageStatus::Skipped => "skipped",
        StageStatus::Cancelled => "cancelled",
        StageStatus::Failed => "failed",
    }
}
