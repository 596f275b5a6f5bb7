use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::site::throttle::MIN_FETCH_DELAY;

/// Application configuration loaded from environment variables once at
/// startup. Fails fast if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Root for the file-backed posting cache.
    pub data_dir: PathBuf,
    /// When set, posting sets are cached in Redis instead of `data_dir`.
    pub redis_url: Option<String>,
    /// Directory that request `path`s are resolved in. Path input is refused
    /// when unset.
    pub resume_dir: Option<PathBuf>,
    pub providers: ProviderSettings,
    pub site: SiteSettings,
    pub workflow: WorkflowConfig,
}

/// Each provider is enabled when its key (or base URL) is present.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub site_id: String,
    pub base_url: String,
    /// Listing path template, see `BoardConfig::list_path`.
    pub list_path: String,
    pub max_pages: usize,
}

/// Per-run workflow knobs. Built once and passed by reference.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Judge providers, tried in this order.
    pub provider_order: Vec<String>,
    pub site_id: String,
    /// Allowed category codes; empty means every registered category.
    pub category_filters: Vec<String>,
    pub years_min: u32,
    pub years_max: u32,
    pub max_postings: usize,
    pub concurrency_limit: usize,
    pub force_rescrape: bool,
    pub force_regenerate_prompt: bool,
    pub headless: bool,
    pub judge_timeout: Duration,
    pub fetch_delay: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            provider_order: vec!["anthropic".into(), "gemini".into(), "ollama".into()],
            site_id: "board".into(),
            category_filters: Vec::new(),
            years_min: 0,
            years_max: 10,
            max_postings: 15,
            concurrency_limit: 5,
            force_rescrape: false,
            force_regenerate_prompt: false,
            headless: true,
            judge_timeout: Duration::from_secs(120),
            fetch_delay: MIN_FETCH_DELAY,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let site_id = std::env::var("SITE_ID").unwrap_or_else(|_| "board".to_string());
        let defaults = WorkflowConfig::default();

        let years_min = parse_env("YEARS_MIN", defaults.years_min)?;
        let years_max = parse_env("YEARS_MAX", defaults.years_max)?;
        if years_min > years_max {
            anyhow::bail!("YEARS_MIN ({years_min}) must not exceed YEARS_MAX ({years_max})");
        }

        let fetch_delay_ms: u64 = parse_env("FETCH_DELAY_MS", MIN_FETCH_DELAY.as_millis() as u64)?;

        let workflow = WorkflowConfig {
            provider_order: std::env::var("JUDGE_PROVIDERS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.provider_order),
            site_id: site_id.clone(),
            category_filters: std::env::var("CATEGORY_FILTERS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            years_min,
            years_max,
            max_postings: parse_env("MAX_POSTINGS", defaults.max_postings)?,
            concurrency_limit: parse_env("CONCURRENCY_LIMIT", defaults.concurrency_limit)?.max(1),
            force_rescrape: parse_flag("FORCE_RESCRAPE")?,
            force_regenerate_prompt: parse_flag("FORCE_REGENERATE_PROMPT")?,
            headless: std::env::var("HEADLESS").is_err() || parse_flag("HEADLESS")?,
            judge_timeout: Duration::from_secs(parse_env("JUDGE_TIMEOUT_SECS", 120u64)?),
            fetch_delay: Duration::from_millis(fetch_delay_ms).max(MIN_FETCH_DELAY),
        };

        Ok(Config {
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "data/resume_evaluator".to_string())
                .into(),
            redis_url: optional_env("REDIS_URL"),
            resume_dir: optional_env("RESUME_DIR").map(PathBuf::from),
            providers: ProviderSettings {
                anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
                gemini_api_key: optional_env("GEMINI_API_KEY"),
                gemini_model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| crate::llm_client::gemini::DEFAULT_MODEL.to_string()),
                // OLLAMA_MODEL alone enables ollama on its default local port
                ollama_base_url: optional_env("OLLAMA_BASE_URL").or_else(|| {
                    optional_env("OLLAMA_MODEL")
                        .map(|_| crate::llm_client::ollama::DEFAULT_BASE_URL.to_string())
                }),
                ollama_model: std::env::var("OLLAMA_MODEL")
                    .unwrap_or_else(|_| crate::llm_client::ollama::DEFAULT_MODEL.to_string()),
            },
            site: SiteSettings {
                site_id,
                base_url: require_env("SITE_BASE_URL")?,
                list_path: std::env::var("SITE_LIST_PATH").unwrap_or_else(|_| {
                    "/jobs?category={category}&years={years_min}-{years_max}&page={page}".to_string()
                }),
                max_pages: parse_env("SITE_MAX_PAGES", 5usize)?,
            },
            workflow,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &str) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw)
            .with_context(|| format!("Environment variable '{key}' must be true/false, got '{raw}'")),
        Err(_) => Ok(false),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_and_lowercases() {
        assert_eq!(split_list(" Anthropic, ,ollama "), vec!["anthropic", "ollama"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_workflow_defaults() {
        let w = WorkflowConfig::default();
        assert_eq!(w.max_postings, 15);
        assert_eq!(w.concurrency_limit, 5);
        assert_eq!(w.judge_timeout, Duration::from_secs(120));
        assert!(w.fetch_delay >= MIN_FETCH_DELAY);
    }
}
