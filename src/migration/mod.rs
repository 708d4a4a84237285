pub mod analyzer;
pub mod context;
pub mod progress;
pub mod result;
mod stages;

pub use analyzer::{AnalysisResult, ResourceCounts};
pub use context::{MigratedMod, MigrationContext};
pub use progress::{CancellationToken, MigrationProgress, ProgressCallback, StageKind};
pub use result::{
    MigrationOptions, MigrationResult, MigrationTotals, StageStatus, StageSummary,
    MAX_REPORTED_WARNINGS,
};

use crate::{
    error::MigrationError,
    legacy::{has_extension_in, is_ignored_path},
    log::{run_log_name, MigrationLog},
    profile::ProfileLayout,
    services::MigrationServices,
};
use anyhow::{bail, Context, Result};
use progress::ProgressReporter;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};
use time::OffsetDateTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub options: MigrationOptions,
    pub analysis: Option<AnalysisResult>,
    pub result: MigrationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub resource: String,
    pub expected: usize,
    pub found: usize,
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub profile_id: String,
    pub is_valid: bool,
    pub checks: Vec<ValidationCheck>,
    pub issues: Vec<String>,
}

pub struct Migrator {
    profiles_root: PathBuf,
    services: MigrationServices,
    reports: HashMap<String, MigrationReport>,
}

impl Migrator {
    pub fn new(profiles_root: &Path, services: MigrationServices) -> Self {
        Self {
            profiles_root: profiles_root.to_path_buf(),
            services,
            reports: HashMap::new(),
        }
    }

    pub fn analyze(&self, source: &Path) -> AnalysisResult {
        analyzer::analyze(source, &self.services.images.supported_extensions())
    }

    pub fn migrate(
        &mut self,
        options: &MigrationOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> MigrationResult {
        let mut result = MigrationResult::start(options, unix_now());
        let profile = match ProfileLayout::new(&self.profiles_root, &options.profile_id) {
            Ok(profile) => profile,
            Err(err) => {
                let err = MigrationError::InvalidProfile(format!("{err:#}"));
                result.fatal_error = Some(err.to_string());
                result.finished_at = unix_now();
                return result;
            }
        };
        let log = match prepare_profile(&profile) {
            Ok(log) => log,
            Err(err) => {
                result.fatal_error = Some(err.to_string());
                result.finished_at = unix_now();
                return result;
            }
        };

        let mut ctx = MigrationContext::new(
            options,
            &self.services,
            &profile,
            cancel,
            ProgressReporter::new(progress),
            log,
            result,
        );
        ctx.info(format!(
            "Migrating {} into profile {} ({} mode)",
            options.source.display(),
            profile.id,
            options.mode
        ));

        for stage in stages::pipeline() {
            let kind = stage.kind();
            if !options.stage_enabled(kind) {
                ctx.skip_stage(kind);
                continue;
            }
            if ctx.check_cancelled().is_err() {
                ctx.mark_cancelled();
                break;
            }
            ctx.begin_stage(kind);
            match stage.execute(&mut ctx) {
                Ok(()) => ctx.end_stage(StageStatus::Completed),
                Err(MigrationError::Cancelled) => {
                    ctx.end_stage(StageStatus::Cancelled);
                    ctx.mark_cancelled();
                    break;
                }
                Err(err) => {
                    ctx.end_stage(StageStatus::Failed);
                    ctx.fail(&err);
                    break;
                }
            }
        }

        let (mut result, analysis) = ctx.finish(unix_now());
        let report = MigrationReport {
            options: options.clone(),
            analysis,
            result: result.clone(),
        };
        if let Err(err) = save_report(&profile.report_path(), &report) {
            result.push_warning(format!("migration report not saved: {err:#}"));
        }
        self.reports.insert(profile.id.clone(), report);
        result
    }

    pub fn validate(&self, profile_id: &str) -> Result<ValidationResult> {
        let profile = ProfileLayout::new(&self.profiles_root, profile_id)?;
        let report = match self.reports.get(&profile.id) {
            Some(report) => report.clone(),
            None => load_report(&profile.report_path())?,
        };
        let Some(analysis) = report.analysis.as_ref() else {
            bail!("no analysis recorded for profile {}", profile.id);
        };
        let counts = &analysis.counts;
        let options = &report.options;

        let mut checks = vec![
            check(
                "archives",
                counts.archives,
                count_files(&profile.archives_dir(), None),
            ),
            check(
                "mod records",
                counts.catalog_entries,
                self.services.catalog.count()?,
            ),
        ];
        if options.migrate_previews {
            let extensions = self.services.images.supported_extensions();
            checks.push(check(
                "previews",
                counts.previews,
                count_files(&profile.previews_dir(), Some(&extensions)),
            ));
        }
        if options.migrate_classifications {
            checks.push(check(
                "categories",
                counts.categories,
                self.services.classification.top_level_count()?,
            ));
        }

        let mut issues: Vec<String> = checks
            .iter()
            .filter(|check| !check.ok)
            .map(|check| {
                format!(
                    "expected at least {} {}, found {}",
                    check.expected, check.resource, check.found
                )
            })
            .collect();
        if report.result.cancelled {
            issues.push("last migration was cancelled".to_string());
        }
        if let Some(error) = &report.result.fatal_error {
            issues.push(format!("last migration failed: {error}"));
        }

        Ok(ValidationResult {
            profile_id: profile.id,
            is_valid: issues.is_empty(),
            checks,
            issues,
        })
    }
}

fn prepare_profile(profile: &ProfileLayout) -> std::result::Result<MigrationLog, MigrationError> {
    for dir in [
        profile.root.clone(),
        profile.archives_dir(),
        profile.previews_dir(),
        profile.logs_dir(),
    ] {
        fs::create_dir_all(&dir)
            .map_err(|source| MigrationError::DestinationUnwritable { path: dir, source })?;
    }
    let log_path = profile.logs_dir().join(run_log_name());
    MigrationLog::to_file(&log_path)
        .map_err(|source| MigrationError::DestinationUnwritable { path: log_path, source })
}

fn check(resource: &str, expected: usize, found: usize) -> ValidationCheck {
    ValidationCheck {
        resource: resource.to_string(),
        expected,
        found,
        ok: found >= expected,
    }
}

// Skips the redirected-thumbnail folder.
fn count_files(root: &Path, extensions: Option<&BTreeSet<String>>) -> usize {
    if !root.is_dir() {
        return 0;
    }
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            !is_ignored_path(entry.path()) && entry.file_name() != "_redirected"
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| extensions.map_or(true, |exts| has_extension_in(entry.path(), exts)))
        .count()
}

fn save_report(path: &Path, report: &MigrationReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create logs dir")?;
    }
    let raw = serde_json::to_string_pretty(report).context("serialize migration report")?;
    fs::write(path, raw).with_context(|| format!("write {path:?}"))?;
    Ok(())
}

fn load_report(path: &Path) -> Result<MigrationReport> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("no migration report at {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parse migration report {path:?}"))
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
