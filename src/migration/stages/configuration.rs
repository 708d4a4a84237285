use super::{fatal, Stage};
use crate::{
    error::MigrationError,
    legacy::LegacyConfig,
    migration::{context::MigrationContext, progress::StageKind},
};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub(crate) struct ConfigurationStage;

impl Stage for ConfigurationStage {
    fn kind(&self) -> StageKind {
        StageKind::Configuration
    }

    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let migrated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| fatal(StageKind::Configuration, err.into()))?;
        let mut values = vec![
            (
                "migration.migrated_from".to_string(),
                json!(ctx.options().source.display().to_string()),
            ),
            ("migration.migrated_at".to_string(), json!(migrated_at)),
        ];

        let (environment, legacy_config) = match ctx.analysis() {
            Some(analysis) => (
                analysis.active_environment.clone(),
                analysis.legacy_config.clone(),
            ),
            None => (None, None),
        };
        if let Some(environment) = environment {
            values.push(("migration.environment".to_string(), json!(environment)));
        }
        match legacy_config {
            Some(config) => values.extend(settings_from(&config)),
            None => ctx.info("No legacy configuration found; writing provenance only"),
        }

        let store = &ctx.services().configuration;
        let total = values.len();
        let mut outcome = Ok(());
        for (index, (key, value)) in values.into_iter().enumerate() {
            if let Err(err) = ctx.check_cancelled() {
                outcome = Err(err);
                break;
            }
            ctx.report(index, total, Some(key.clone()));
            match store.set_value(&key, value) {
                Ok(()) => {
                    ctx.created();
                    ctx.totals().settings_written += 1;
                }
                Err(err) => ctx.warn(format!("setting {key}: {err:#}")),
            }
        }

        // Keys set before a cancel are still flushed.
        store
            .save()
            .map_err(|err| fatal(StageKind::Configuration, err.context("save configuration")))?;
        ctx.report(total, total, None);
        outcome
    }
}

fn settings_from(config: &LegacyConfig) -> Vec<(String, Value)> {
    let mut values = Vec::new();
    let mut push = |key: &str, value: Value| values.push((key.to_string(), value));

    if let Some(style) = &config.style {
        push("ui.style", json!(style));
    }
    if let Some(install_id) = &config.install_id {
        push("app.install_id", json!(install_id));
    }
    let window = &config.window;
    if let Some(width) = window.width {
        push("window.width", json!(width));
    }
    if let Some(height) = window.height {
        push("window.height", json!(height));
    }
    if let Some(x) = window.x {
        push("window.x", json!(x));
    }
    if let Some(y) = window.y {
        push("window.y", json!(y));
    }
    if let Some(maximized) = window.maximized {
        push("window.maximized", json!(maximized));
    }

    let mut environments = config.environments.clone();
    if !config.launch.is_empty() {
        environments
            .entry(config.environment.clone())
            .or_insert_with(|| config.launch.clone());
    }
    for (env, launch) in &environments {
        if let Some(game_path) = &launch.game_path {
            push(&format!("environments.{env}.game_path"), json!(game_path));
        }
        if let Some(launch_args) = &launch.launch_args {
            push(&format!("environments.{env}.launch_args"), json!(launch_args));
        }
    }
    values
}
