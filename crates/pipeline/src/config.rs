use crate::error::ConfigError;
use anyhow::Context;
use codedoc_cache::CacheBackend;
use codedoc_chunker::{ChunkerConfig, SizeMetric};
use codedoc_generation::{GenerationOptions, RetryPolicy, SchedulerSettings, MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_BUDGET: u64 = 1_000_000;
const MAX_INTERVAL_MS: u64 = 600_000;
const MAX_TIMEOUT_MS: u64 = 3_600_000;
const MAX_RETRY_BUDGET: u64 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub dir: PathBuf,
    /// Entry limit of the memory backend
    pub capacity: usize,
    /// Serve cached failures instead of retrying them
    pub reuse_failed_results: bool,
    /// Prune the file backend to this many bytes after a run; 0 keeps everything
    pub max_bytes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            dir: PathBuf::from(".codedoc_cache"),
            capacity: 4096,
            reuse_failed_results: false,
            max_bytes: 0,
        }
    }
}

/// Passes that run after unit explanations, feeding them back through the
/// backend under their own template versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// One summary per file built from its unit explanations
    pub file_summaries: bool,
    /// One overview for the run built from the file summaries
    pub project_overview: bool,
    pub file_template_version: String,
    pub overview_template_version: String,
    /// Files quoted in the overview prompt, in provider order
    pub overview_max_files: usize,
    /// Characters quoted per file in the overview prompt
    pub overview_excerpt_chars: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            file_summaries: false,
            project_overview: false,
            file_template_version: "file-v1".to_string(),
            overview_template_version: "overview-v1".to_string(),
            overview_max_files: 20,
            overview_excerpt_chars: 300,
        }
    }
}

/// Every tunable of a documentation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_chunk_budget: usize,
    pub size_metric: SizeMetric,
    pub use_syntax_tree: bool,
    pub concurrency_ceiling: usize,
    pub rate_limit_interval_ms: u64,
    pub per_attempt_timeout_ms: u64,
    /// Total attempts per chunk, first call included
    pub retry_budget: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub prompt_template_version: String,
    pub generation: GenerationOptions,
    pub cache: CacheSettings,
    pub summaries: SummarySettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_budget: 1000,
            size_metric: SizeMetric::Chars,
            use_syntax_tree: true,
            concurrency_ceiling: 4,
            rate_limit_interval_ms: 0,
            per_attempt_timeout_ms: 60_000,
            retry_budget: 3,
            backoff_base_ms: 500,
            backoff_cap_ms: 30_000,
            prompt_template_version: "v1".to_string(),
            generation: GenerationOptions::default(),
            cache: CacheSettings::default(),
            summaries: SummarySettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Local model servers: no rate limit, more parallelism, patient timeouts
    #[must_use]
    pub fn for_local_backend() -> Self {
        Self {
            concurrency_ceiling: 8,
            rate_limit_interval_ms: 0,
            per_attempt_timeout_ms: 120_000,
            retry_budget: 2,
            ..Self::default()
        }
    }

    /// Metered hosted APIs: few parallel calls, spaced out, generous retries
    #[must_use]
    pub fn for_hosted_api() -> Self {
        Self {
            concurrency_ceiling: 2,
            rate_limit_interval_ms: 1_000,
            per_attempt_timeout_ms: 60_000,
            retry_budget: 5,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 60_000,
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply `CODEDOC_*` environment overrides
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&raw)
            .with_context(|| format!("Config {} is not valid TOML", path.display()))?;
        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("Config {} failed validation", path.display()))?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparsable values keep the
    /// current setting; numbers are clamped to their supported range.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.max_chunk_budget = to_usize(parse_clamped(
            lookup("CODEDOC_MAX_CHUNK_BUDGET").as_deref(),
            self.max_chunk_budget as u64,
            1,
            MAX_BUDGET,
        ));
        self.concurrency_ceiling = to_usize(parse_clamped(
            lookup("CODEDOC_CONCURRENCY").as_deref(),
            self.concurrency_ceiling as u64,
            1,
            MAX_CONCURRENCY as u64,
        ));
        self.rate_limit_interval_ms = parse_clamped(
            lookup("CODEDOC_RATE_LIMIT_MS").as_deref(),
            self.rate_limit_interval_ms,
            0,
            MAX_INTERVAL_MS,
        );
        self.per_attempt_timeout_ms = parse_clamped(
            lookup("CODEDOC_ATTEMPT_TIMEOUT_MS").as_deref(),
            self.per_attempt_timeout_ms,
            1,
            MAX_TIMEOUT_MS,
        );
        self.retry_budget = u32::try_from(parse_clamped(
            lookup("CODEDOC_RETRY_BUDGET").as_deref(),
            u64::from(self.retry_budget),
            1,
            MAX_RETRY_BUDGET,
        ))
        .unwrap_or(self.retry_budget);
        self.backoff_base_ms = parse_clamped(
            lookup("CODEDOC_BACKOFF_BASE_MS").as_deref(),
            self.backoff_base_ms,
            1,
            MAX_INTERVAL_MS,
        );
        self.backoff_cap_ms = parse_clamped(
            lookup("CODEDOC_BACKOFF_CAP_MS").as_deref(),
            self.backoff_cap_ms,
            1,
            MAX_INTERVAL_MS,
        );
        if let Some(version) = lookup("CODEDOC_TEMPLATE_VERSION").filter(|v| !v.trim().is_empty()) {
            self.prompt_template_version = version.trim().to_string();
        }
        if let Some(on) = parse_flag(lookup("CODEDOC_FILE_SUMMARIES").as_deref()) {
            self.summaries.file_summaries = on;
        }
        if let Some(on) = parse_flag(lookup("CODEDOC_PROJECT_OVERVIEW").as_deref()) {
            self.summaries.project_overview = on;
        }
        if let Some(dir) = lookup("CODEDOC_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
            self.cache.dir = PathBuf::from(dir.trim());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_budget == 0 {
            return Err(ConfigError::Invalid(
                "max_chunk_budget must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency_ceiling) {
            return Err(ConfigError::Invalid(format!(
                "concurrency_ceiling must be within 1..={MAX_CONCURRENCY}"
            )));
        }
        if self.per_attempt_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "per_attempt_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry_budget == 0 {
            return Err(ConfigError::Invalid(
                "retry_budget must allow at least one attempt".to_string(),
            ));
        }
        if self.backoff_base_ms > self.backoff_cap_ms {
            return Err(ConfigError::Invalid(format!(
                "backoff_base_ms ({}) exceeds backoff_cap_ms ({})",
                self.backoff_base_ms, self.backoff_cap_ms
            )));
        }
        if self.prompt_template_version.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "prompt_template_version must not be empty".to_string(),
            ));
        }
        self.validate_summaries()
    }

    fn validate_summaries(&self) -> Result<(), ConfigError> {
        let summaries = &self.summaries;
        let mut versions = vec![self.prompt_template_version.trim()];
        if summaries.file_summaries {
            versions.push(summaries.file_template_version.trim());
        }
        if summaries.project_overview {
            versions.push(summaries.overview_template_version.trim());
            if summaries.overview_max_files == 0 || summaries.overview_excerpt_chars == 0 {
                return Err(ConfigError::Invalid(
                    "overview_max_files and overview_excerpt_chars must be greater than zero"
                        .to_string(),
                ));
            }
        }
        for (i, version) in versions.iter().enumerate() {
            if version.is_empty() {
                return Err(ConfigError::Invalid(
                    "summary template versions must not be empty".to_string(),
                ));
            }
            // shared versions would let a summary fingerprint collide with a unit one
            if versions[..i].contains(version) {
                return Err(ConfigError::Invalid(format!(
                    "template version {version:?} is used by more than one pass"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_budget: self.max_chunk_budget,
            size_metric: self.size_metric,
            use_syntax_tree: self.use_syntax_tree,
        }
    }

    #[must_use]
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            concurrency_ceiling: self.concurrency_ceiling,
            rate_limit_interval: Duration::from_millis(self.rate_limit_interval_ms),
            per_attempt_timeout: Duration::from_millis(self.per_attempt_timeout_ms),
            retry: RetryPolicy {
                max_attempts: self.retry_budget,
                base_delay: Duration::from_millis(self.backoff_base_ms),
                max_delay: Duration::from_millis(self.backoff_cap_ms),
            },
            options: self.generation.clone(),
        }
    }
}

fn parse_clamped(raw: Option<&str>, current: u64, min: u64, max: u64) -> u64 {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(current, |v| v.clamp(min, max))
}

fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => Some(true),
        Some("0" | "false" | "no" | "off") => Some(false),
        _ => None,
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
