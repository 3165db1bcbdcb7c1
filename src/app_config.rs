//! Configuration file loading and merging with CLI flags.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use webarchiver::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use webarchiver::{ArchiveFormat, UserAgent};

use crate::cli::{Args, MAX_DELAY_SECS, is_valid_delay};

const APP_DIR: &str = "webarchiver";
const CONFIG_FILE: &str = "config.toml";

/// Defaults read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Parent directory for staging directories and archives.
    pub output_dir: Option<PathBuf>,
    pub format: Option<ArchiveFormat>,
    /// Remove the staging directory after archiving.
    pub cleanup: Option<bool>,
    /// Seconds between two fetches, fractions allowed.
    pub delay_secs: Option<f64>,
    pub user_agent: Option<UserAgent>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// Proxy URL used for every request.
    pub proxy: Option<String>,
}

impl FileConfig {
    /// Validates values against the ranges the CLI accepts.
    pub fn validate(&self) -> Result<()> {
        if let Some(delay) = self.delay_secs.filter(|delay| !is_valid_delay(*delay)) {
            bail!(
                "Invalid config value for `delay_secs`: {delay}. Expected range: 0..={MAX_DELAY_SECS}"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/webarchiver/config.toml`
/// 2. `$HOME/.config/webarchiver/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    config_path_from(env_var_non_empty_os("XDG_CONFIG_HOME"), env_var_non_empty_os("HOME"))
}

fn config_path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(xdg) = xdg_config_home {
        return Some(PathBuf::from(xdg).join(APP_DIR).join(CONFIG_FILE));
    }
    let home = home?;
    Some(PathBuf::from(home).join(".config").join(APP_DIR).join(CONFIG_FILE))
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at the default path. A missing file yields `None`.
pub fn load_default_file_config() -> Result<Option<FileConfig>> {
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "format" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.format = Some(parsed.parse::<ArchiveFormat>().with_context(context)?);
            }
            "cleanup" => cfg.cleanup = Some(parse_boolean(value).with_context(context)?),
            "delay_secs" => cfg.delay_secs = Some(parse_float(value).with_context(context)?),
            "user_agent" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.user_agent = Some(parsed.parse::<UserAgent>().with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "proxy" => cfg.proxy = Some(parse_string_literal(value).with_context(context)?),
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_float(raw_value: &str) -> Result<f64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected numeric value");
    }
    let value = token.parse::<f64>()?;
    if !value.is_finite() {
        bail!("Expected a finite number");
    }
    Ok(value)
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Effective settings for one run: CLI flags over file values over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub format: ArchiveFormat,
    pub cleanup: bool,
    pub delay: Duration,
    pub user_agent: UserAgent,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub proxy: Option<String>,
}

impl RunSettings {
    #[must_use]
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        Self {
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            format: args.format.or(file.format).unwrap_or_default(),
            cleanup: !args.keep_staging && file.cleanup.unwrap_or(true),
            delay: args
                .delay
                .or(file.delay_secs)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or_default(),
            user_agent: args.user_agent.or(file.user_agent).unwrap_or_default(),
            connect_timeout_secs: args
                .connect_timeout
                .or(file.connect_timeout_secs)
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: args
                .read_timeout
                .or(file.read_timeout_secs)
                .unwrap_or(READ_TIMEOUT_SECS),
            proxy: args.proxy.clone().or(file.proxy),
        }
    }
}
