use super::{is_comment, strip_bom, ParseOutcome};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::Path, str::FromStr};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub maximized: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentLaunch {
    pub game_path: Option<String>,
    pub launch_args: Option<String>,
}

impl EnvironmentLaunch {
    pub fn is_empty(&self) -> bool {
        self.game_path.is_none() && self.launch_args.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyConfig {
    pub environment: String,
    pub active: bool,
    pub style: Option<String>,
    pub install_id: Option<String>,
    pub window: WindowGeometry,
    pub launch: EnvironmentLaunch,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentLaunch>,
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

/// Reads `path` as the settings of `env`. A missing file or one without a
/// single usable `key = value` line yields `None` plus a warning; only a
/// read failure on an existing file is an error.
pub fn parse(path: &Path, env: &str) -> Result<ParseOutcome<Option<LegacyConfig>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(ParseOutcome::new(
                None,
                vec![format!("no legacy settings for environment {env} at {}", path.display())],
            ));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read legacy settings {path:?}"));
        }
    };
    Ok(parse_str(&String::from_utf8_lossy(&bytes), env))
}

pub fn parse_str(raw: &str, env: &str) -> ParseOutcome<Option<LegacyConfig>> {
    let mut warnings = Vec::new();
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut section: Option<String> = None;

    for (index, line) in strip_bom(raw).lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            let name = line[1..line.len() - 1].trim().to_ascii_lowercase();
            section = (!name.is_empty()).then_some(name);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warnings.push(format!("settings line {}: expected `key = value`", index + 1));
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            warnings.push(format!("settings line {}: empty key", index + 1));
            continue;
        }
        let key = match &section {
            Some(section) => format!("{section}.{key}"),
            None => key,
        };
        pairs.push((key, unquote(value.trim()).to_string()));
    }

    if pairs.is_empty() {
        warnings.push(format!("legacy settings for environment {env} contain no values"));
        return ParseOutcome::new(None, warnings);
    }

    let mut config = LegacyConfig {
        environment: env.to_string(),
        ..LegacyConfig::default()
    };
    for (key, value) in pairs {
        match key.as_str() {
            "active" | "environment.active" => match parse_bool(&value) {
                Some(flag) => config.active = flag,
                None => warnings.push(format!("settings {key}: not a boolean: {value:?}")),
            },
            "style" | "theme" | "ui.style" | "ui.theme" => config.style = non_empty(value),
            "install_id" | "uuid" | "app.install_id" | "app.uuid" => {
                config.install_id = non_empty(value)
            }
            "window.width" => config.window.width = parse_number(&key, &value, &mut warnings),
            "window.height" => config.window.height = parse_number(&key, &value, &mut warnings),
            "window.x" => config.window.x = parse_number(&key, &value, &mut warnings),
            "window.y" => config.window.y = parse_number(&key, &value, &mut warnings),
            "window.maximized" => match parse_bool(&value) {
                Some(flag) => config.window.maximized = Some(flag),
                None => warnings.push(format!("settings {key}: not a boolean: {value:?}")),
            },
            "game.path" | "game_path" => config.launch.game_path = non_empty(value),
            "game.launch_args" | "launch_args" | "game.args" => {
                config.launch.launch_args = non_empty(value)
            }
            _ => {
                config.extras.insert(key, value);
            }
        }
    }

    ParseOutcome::new(Some(config), warnings)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str, warnings: &mut Vec<String>) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(number) => Some(number),
        Err(_) => {
            warnings.push(format!("settings {key}: not a number: {value:?}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_and_sectioned_keys() {
        let raw = r#"
# legacy settings
active = yes
theme = "Midnight"
uuid = 4f1c-22
[window]
width = 1280
height = 720
x = -8
maximized = false
[game]
path = "C:\Games\Thing\game.exe"
launch_args = -windowed -nolog
custom = kept
"#;
        let outcome = parse_str(raw, "Main");
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        let config = outcome.value.unwrap();
        assert_eq!(config.environment, "Main");
        assert!(config.active);
        assert_eq!(config.style.as_deref(), Some("Midnight"));
        assert_eq!(config.install_id.as_deref(), Some("4f1c-22"));
        assert_eq!(config.window.width, Some(1280));
        assert_eq!(config.window.height, Some(720));
        assert_eq!(config.window.x, Some(-8));
        assert_eq!(config.window.y, None);
        assert_eq!(config.window.maximized, Some(false));
        assert_eq!(config.launch.game_path.as_deref(), Some(r"C:\Games\Thing\game.exe"));
        assert_eq!(config.launch.launch_args.as_deref(), Some("-windowed -nolog"));
        assert_eq!(config.extras.get("game.custom").map(String::as_str), Some("kept"));
    }

    #[test]
    fn malformed_lines_are_warnings() {
        let outcome = parse_str("style = Light\nwindow.width = wide\njunk line\n", "Alt");
        let config = outcome.value.unwrap();
        assert_eq!(config.style.as_deref(), Some("Light"));
        assert_eq!(config.window.width, None);
        assert!(!config.active);
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn nothing_usable_yields_none() {
        let outcome = parse_str("just words\n# and a comment\n", "Alt");
        assert!(outcome.value.is_none());
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = parse(&dir.path().join("settings.ini"), "Main").unwrap();
        assert!(outcome.value.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }
}
