use crate::{
    config::AppConfig,
    migration::{
        analyzer, AnalysisResult, MigrationOptions, MigrationProgress, MigrationResult,
        Migrator, ProgressCallback, StageStatus, ValidationResult,
    },
    profile::ProfileLayout,
    services::{ImageFormats, TransferMode},
    store::{self, StandardImageFormats},
};
use anyhow::{bail, Context, Result};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct GlobalOptions {
    format: OutputFormat,
    profile: Option<String>,
    profiles_root: Option<PathBuf>,
    quiet: bool,
}

#[derive(Debug)]
enum CliCommand {
    Analyze(PathBuf),
    Migrate(MigrateArgs),
    Validate,
    Help,
    Version,
}

#[derive(Debug)]
struct MigrateArgs {
    source: PathBuf,
    mode: Option<TransferMode>,
    previews: bool,
    classifications: bool,
    configuration: bool,
}

pub fn run() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, command) = parse_args(&args)?;
    match command {
        CliCommand::Help => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Version => {
            println!("modvault v{}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Analyze(source) => run_analyze(&global, &source),
        CliCommand::Migrate(migrate) => run_migrate(&global, migrate),
        CliCommand::Validate => run_validate(&global),
    }
}

fn parse_args(args: &[String]) -> Result<(GlobalOptions, CliCommand)> {
    let (global, tokens) = parse_global_options(args)?;
    let Some(head) = tokens.first() else {
        return Ok((global, CliCommand::Help));
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    let command = match head.as_str() {
        "--help" | "-h" | "help" => CliCommand::Help,
        "--version" | "-V" | "version" => CliCommand::Version,
        "analyze" => {
            let Some(source) = rest.first() else {
                bail!("analyze requires a source path");
            };
            CliCommand::Analyze(PathBuf::from(source))
        }
        "migrate" => CliCommand::Migrate(parse_migrate(rest)?),
        "validate" => CliCommand::Validate,
        other => bail!("unknown command: {other} (see --help)"),
    };
    Ok((global, command))
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut global = GlobalOptions {
        format: OutputFormat::Text,
        profile: None,
        profiles_root: None,
        quiet: false,
    };
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            global.format = parse_format(value)?;
            continue;
        }
        if arg == "--format" {
            let value = iter.next().context("--format requires a value")?;
            global.format = parse_format(value)?;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--profile=") {
            global.profile = Some(value.to_string());
            continue;
        }
        if arg == "--profile" {
            let value = iter.next().context("--profile requires a value")?;
            global.profile = Some(value.to_string());
            continue;
        }
        if let Some(value) = arg.strip_prefix("--profiles-root=") {
            global.profiles_root = Some(PathBuf::from(value));
            continue;
        }
        if arg == "--profiles-root" {
            let value = iter.next().context("--profiles-root requires a value")?;
            global.profiles_root = Some(PathBuf::from(value));
            continue;
        }
        if arg == "-q" || arg == "--quiet" {
            global.quiet = true;
            continue;
        }
        tokens.push(arg.to_string());
    }
    Ok((global, tokens))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    match OutputFormat::parse(value) {
        Some(format) => Ok(format),
        None => bail!("unknown format {value:?} (expected text or json)"),
    }
}

fn parse_migrate(tokens: &[String]) -> Result<MigrateArgs> {
    let mut source = None;
    let mut mode = None;
    let mut previews = true;
    let mut classifications = true;
    let mut configuration = true;
    let mut iter = tokens.iter();
    while let Some(arg) = iter.next() {
        let mode_value = if let Some(value) = arg.strip_prefix("--mode=") {
            Some(value.to_string())
        } else if arg == "--mode" {
            Some(iter.next().context("--mode requires a value")?.to_string())
        } else {
            None
        };
        if let Some(value) = mode_value {
            match TransferMode::parse(&value) {
                Some(parsed) => mode = Some(parsed),
                None => bail!("unknown mode {value:?} (expected copy, move or link)"),
            }
            continue;
        }
        match arg.as_str() {
            "--no-previews" => previews = false,
            "--no-classifications" => classifications = false,
            "--no-config" => configuration = false,
            flag if flag.starts_with('-') => bail!("unknown migrate option: {flag}"),
            path => {
                if source.is_some() {
                    bail!("migrate takes exactly one source path");
                }
                source = Some(PathBuf::from(path));
            }
        }
    }
    let Some(source) = source else {
        bail!("migrate requires a source path");
    };
    Ok(MigrateArgs {
        source,
        mode,
        previews,
        classifications,
        configuration,
    })
}

fn require_profile(global: &GlobalOptions) -> Result<String> {
    match &global.profile {
        Some(profile) => Ok(profile.clone()),
        None => bail!("--profile <id> is required"),
    }
}

fn open_migrator(global: &GlobalOptions, profile_id: &str) -> Result<(AppConfig, Migrator)> {
    let config = AppConfig::load_or_create()?;
    let profiles_root = global
        .profiles_root
        .clone()
        .unwrap_or_else(|| config.profiles_root.clone());
    let layout = ProfileLayout::new(&profiles_root, profile_id)?;
    let services = store::open_local_services(&layout)
        .with_context(|| format!("open profile {}", layout.id))?;
    Ok((config, Migrator::new(&profiles_root, services)))
}

fn run_analyze(global: &GlobalOptions, source: &Path) -> Result<ExitCode> {
    let images = StandardImageFormats::default();
    let analysis = analyzer::analyze(source, &images.supported_extensions());
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Text => print_analysis(&analysis),
    }
    Ok(if analysis.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_migrate(global: &GlobalOptions, args: MigrateArgs) -> Result<ExitCode> {
    let profile_id = require_profile(global)?;
    let (config, mut migrator) = open_migrator(global, &profile_id)?;

    let analysis = migrator.analyze(&args.source);
    if !analysis.is_valid {
        match global.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
            OutputFormat::Text => print_analysis(&analysis),
        }
        return Ok(ExitCode::FAILURE);
    }

    let options = MigrationOptions::new(&args.source, &profile_id)
        .with_mode(args.mode.unwrap_or(config.default_mode))
        .with_previews(args.previews)
        .with_classifications(args.classifications)
        .with_configuration(args.configuration);
    let progress = if global.quiet {
        None
    } else {
        Some(Arc::new(print_progress) as ProgressCallback)
    };
    let result = migrator.migrate(&options, progress, None);
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_result(&result),
    }
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_validate(global: &GlobalOptions) -> Result<ExitCode> {
    let profile_id = require_profile(global)?;
    let (_, migrator) = open_migrator(global, &profile_id)?;
    let validation = migrator.validate(&profile_id)?;
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&validation)?),
        OutputFormat::Text => print_validation(&validation),
    }
    Ok(if validation.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_progress(event: MigrationProgress) {
    match event.item {
        Some(item) => eprintln!(
            "[{:>3.0}%] {} {}/{} {}",
            event.percent,
            event.stage.label(),
            event.stage_current,
            event.stage_total,
            item
        ),
        None => eprintln!(
            "[{:>3.0}%] {} ({}/{})",
            event.percent,
            event.stage.label(),
            event.stage_index,
            event.stage_count
        ),
    }
}

fn print_analysis(analysis: &AnalysisResult) {
    println!("Source: {}", analysis.source.display());
    println!("Valid: {}", if analysis.is_valid { "yes" } else { "no" });
    for error in &analysis.errors {
        println!("  error: {error}");
    }
    if !analysis.is_valid {
        return;
    }
    let counts = &analysis.counts;
    println!("Archive files:   {}", counts.mods);
    println!("Catalog entries: {}", counts.catalog_entries);
    println!("Located:         {}", counts.archives);
    println!("Previews:        {}", counts.previews);
    println!("Categories:      {}", counts.categories);
    println!("Environments:    {}", analysis.environments.join(", "));
    println!(
        "Active:          {}",
        analysis.active_environment.as_deref().unwrap_or("-")
    );
    for warning in &analysis.warnings {
        println!("  warning: {warning}");
    }
}

fn print_result(result: &MigrationResult) {
    let outcome = if result.success {
        "completed"
    } else if result.cancelled {
        "cancelled"
    } else {
        "failed"
    };
    println!("Migration {outcome} for profile {}", result.profile_id);
    for stage in &result.stages {
        let status = match stage.status {
            StageStatus::NotRun => "not run",
            StageStatus::Running => "running",
            StageStatus::Completed => "ok",
            StageStatus::Skipped => "skipped",
            StageStatus::Cancelled => "cancelled",
            StageStatus::Failed => "failed",
        };
        println!(
            "  {:<16} {:<9} created {:>5}  copied {:>5}  skipped {:>5}  warnings {:>4}",
            stage.stage.label(),
            status,
            stage.created,
            stage.copied,
            stage.skipped,
            stage.warnings
        );
    }
    if let Some(error) = &result.fatal_error {
        println!("Error: {error}");
    }
    if result.warning_count > 0 {
        println!("Warnings ({}):", result.warning_count);
        for warning in &result.warnings {
            println!("  {warning}");
        }
        if result.warning_count > result.warnings.len() {
            println!("  ... see the run log for the rest");
        }
    }
    if let Some(path) = &result.log_path {
        println!("Log: {}", path.display());
    }
}

fn print_validation(validation: &ValidationResult) {
    println!(
        "Profile {}: {}",
        validation.profile_id,
        if validation.is_valid { "valid" } else { "INVALID" }
    );
    for check in &validation.checks {
        let mark = if check.ok { "x" } else { " " };
        println!(
            "  [{mark}] {:<12} expected {:>5}  found {:>5}",
            check.resource, check.expected, check.found
        );
    }
    for issue in &validation.issues {
        println!("  issue: {issue}");
    }
}

fn print_help() {
    println!("modvault v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  modvault analyze <source>                 Inspect a legacy installation");
    println!("  modvault migrate <source> --profile <id>  Migrate it into a profile");
    println!("  modvault validate --profile <id>          Check a migrated profile");
    println!();
    println!("Global options:");
    println!("  --format <json|text>            Output format");
    println!("  --profile <id>                  Destination profile");
    println!("  --profiles-root <dir>           Override the profiles directory");
    println!("  -q, --quiet                     No progress output");
    println!("  -h, --help                      Show help");
    println!("  -V, --version                   Show version");
    println!();
    println!("Migrate options:");
    println!("  --mode <copy|move|link>         Archive handling (default from config)");
    println!("  --no-previews                   Skip preview images and thumbnails");
    println!("  --no-classifications            Skip the category tree and rules");
    println!("  --no-config                     Skip legacy settings");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_migrate_with_globals_anywhere() {
        let (global, command) = parse_args(&args(&[
            "migrate",
            "/legacy",
            "--profile",
            "Imported",
            "--mode=move",
            "--no-previews",
            "--format",
            "json",
        ]))
        .unwrap();
        assert_eq!(global.format, OutputFormat::Json);
        assert_eq!(global.profile.as_deref(), Some("Imported"));
        let CliCommand::Migrate(migrate) = command else {
            panic!("expected migrate");
        };
        assert_eq!(migrate.source, PathBuf::from("/legacy"));
        assert_eq!(migrate.mode, Some(TransferMode::Move));
        assert!(!migrate.previews);
        assert!(migrate.classifications);
        assert!(migrate.configuration);
    }

    #[test]
    fn rejects_unknown_mode_and_missing_source() {
        assert!(parse_args(&args(&["migrate", "/legacy", "--mode", "rsync"])).is_err());
        assert!(parse_args(&args(&["migrate", "--no-config"])).is_err());
        assert!(parse_args(&args(&["analyze"])).is_err());
    }

    #[test]
    fn empty_args_show_help() {
        let (_, command) = parse_args(&[]).unwrap();
        assert!(matches!(command, CliCommand::Help));
    }
}
