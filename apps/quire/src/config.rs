use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::latex::compiler::{Engine, DEFAULT_PASSES, DEFAULT_TIMEOUT, MAX_PASSES};
use crate::layout::A4_PAGE_HEIGHT_PX;

/// Application configuration loaded from environment variables.
/// Startup fails with a descriptive error if a value is present but invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Extra `*.tex` templates; built-ins are always available.
    pub templates_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Parent of per-job working directories; the system temp dir when unset.
    pub work_dir: Option<PathBuf>,
    pub latex_engine: Engine,
    pub latex_program: Option<PathBuf>,
    pub latex_passes: u8,
    pub compile_timeout: Duration,
    pub max_concurrent_compiles: usize,
    pub page_height_px: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let latex_passes = parse_or(&get, "QUIRE_LATEX_PASSES", DEFAULT_PASSES)?;
        if !(1..=MAX_PASSES).contains(&latex_passes) {
            bail!("QUIRE_LATEX_PASSES must be between 1 and {MAX_PASSES}, got {latex_passes}");
        }

        let timeout_ms = parse_or(
            &get,
            "QUIRE_COMPILE_TIMEOUT_MS",
            DEFAULT_TIMEOUT.as_millis() as u64,
        )?;
        if timeout_ms == 0 {
            bail!("QUIRE_COMPILE_TIMEOUT_MS must be greater than zero");
        }

        let max_concurrent_compiles = parse_or(&get, "QUIRE_MAX_CONCURRENT_COMPILES", 4usize)?;
        if max_concurrent_compiles == 0 {
            bail!("QUIRE_MAX_CONCURRENT_COMPILES must be greater than zero");
        }

        let page_height_px = parse_or(&get, "QUIRE_PAGE_HEIGHT_PX", A4_PAGE_HEIGHT_PX)?;
        if page_height_px == 0 {
            bail!("QUIRE_PAGE_HEIGHT_PX must be greater than zero");
        }

        let latex_engine = match get("QUIRE_LATEX_ENGINE") {
            Some(raw) => raw
                .parse::<Engine>()
                .map_err(anyhow::Error::msg)
                .context("QUIRE_LATEX_ENGINE is invalid")?,
            None => Engine::default(),
        };

        Ok(Config {
            port: parse_or(&get, "PORT", 8080u16)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            templates_dir: get("QUIRE_TEMPLATES_DIR").map(PathBuf::from),
            output_dir: get("QUIRE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./artifacts")),
            work_dir: get("QUIRE_WORK_DIR").map(PathBuf::from),
            latex_engine,
            latex_program: get("QUIRE_LATEX_PROGRAM").map(PathBuf::from),
            latex_passes,
            compile_timeout: Duration::from_millis(timeout_ms),
            max_concurrent_compiles,
            page_height_px,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.latex_engine, Engine::Pdflatex);
        assert_eq!(config.latex_passes, 2);
        assert_eq!(config.compile_timeout, Duration::from_millis(30_000));
        assert_eq!(config.page_height_px, 1123);
        assert_eq!(config.output_dir, PathBuf::from("./artifacts"));
        assert!(config.templates_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "9000"),
            ("QUIRE_LATEX_ENGINE", "xelatex"),
            ("QUIRE_LATEX_PASSES", "3"),
            ("QUIRE_COMPILE_TIMEOUT_MS", "5000"),
            ("QUIRE_PAGE_HEIGHT_PX", "1056"),
            ("QUIRE_OUTPUT_DIR", "/var/lib/quire"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.latex_engine, Engine::Xelatex);
        assert_eq!(config.latex_passes, 3);
        assert_eq!(config.compile_timeout, Duration::from_secs(5));
        assert_eq!(config.page_height_px, 1056);
        assert_eq!(config.output_dir, PathBuf::from("/var/lib/quire"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config(&[("PORT", "  "), ("QUIRE_LATEX_ENGINE", "")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.latex_engine, Engine::Pdflatex);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("QUIRE_LATEX_ENGINE", "word")]).is_err());
        assert!(config(&[("QUIRE_LATEX_PASSES", "0")]).is_err());
        assert!(config(&[("QUIRE_LATEX_PASSES", "9")]).is_err());
        assert!(config(&[("QUIRE_COMPILE_TIMEOUT_MS", "0")]).is_err());
        assert!(config(&[("QUIRE_PAGE_HEIGHT_PX", "-5")]).is_err());
        assert!(config(&[("QUIRE_MAX_CONCURRENT_COMPILES", "0")]).is_err());
    }
}
