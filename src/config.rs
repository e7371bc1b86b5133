//! Configuration System
//!
//! Layered configuration: built-in defaults, the global user file, workspace
//! files, then `DEVLOG__*` environment variables. Every section has serde
//! defaults so a partial file is always valid input. Tests included.

use crate::aggregate::parse_utc_offset;
use crate::logging::LoggingConfig;
use crate::overrides::{
    default_label_overrides, default_stack_overrides, LabelOverrides, StackOverrides,
};
use crate::prompt::{GenerationParams, PromptRules, DEFAULT_COMMIT_LIST_CAP};
use crate::provider::{CredentialsConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen/qwen3-235b-a22b-2507";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevlogConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub recap: RecapConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Authoritative stack descriptions, keyed by project label
    #[serde(default = "default_stack_entries")]
    pub stack_overrides: Vec<StackOverrideEntry>,

    /// Historical label renames applied to the repository registry
    #[serde(default = "default_label_entries")]
    pub label_overrides: Vec<LabelOverrideEntry>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Sent as `HTTP-Referer` when set
    #[serde(default)]
    pub referer: Option<String>,

    /// Per-attempt bound
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.45
}

fn default_request_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            referer: None,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    6
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Relative paths resolve against the workspace root
    #[serde(default = "default_blog_dir")]
    pub blog_dir: PathBuf,

    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_author")]
    pub author: String,
}

fn default_blog_dir() -> PathBuf {
    PathBuf::from("content/blog")
}

fn default_extension() -> String {
    "mdx".to_string()
}

fn default_author() -> String {
    "Ryan Dashwood".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            blog_dir: default_blog_dir(),
            extension: default_extension(),
            author: default_author(),
        }
    }
}

/// Batch flow: documents from the pre-built ideas feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub ideas_file: Option<PathBuf>,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_batch_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_batch_word_band")]
    pub word_band: String,

    #[serde(default = "default_batch_tags")]
    pub fallback_tags: Vec<String>,

    /// argv run before loading the feed when a refresh is requested
    #[serde(default)]
    pub refresh_command: Vec<String>,

    #[serde(default)]
    pub refresh_cwd: Option<PathBuf>,
}

fn default_workers() -> usize {
    20
}

fn default_batch_max_tokens() -> u32 {
    2600
}

fn default_batch_word_band() -> String {
    "500-1100".to_string()
}

fn default_batch_tags() -> Vec<String> {
    vec!["engineering".into(), "software".into(), "build-in-public".into()]
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            ideas_file: None,
            workers: default_workers(),
            max_tokens: default_batch_max_tokens(),
            word_band: default_batch_word_band(),
            fallback_tags: default_batch_tags(),
            refresh_command: Vec::new(),
            refresh_cwd: None,
        }
    }
}

/// Recap flow: one git-derived day, published after writing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecapConfig {
    /// JSON list of `[path, label, description]`
    #[serde(default)]
    pub registry_file: Option<PathBuf>,

    /// Fixed UTC offset used for the day window and for "yesterday"
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: String,

    #[serde(default = "default_recap_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_recap_word_band")]
    pub word_band: String,

    #[serde(default = "default_recap_tags")]
    pub fallback_tags: Vec<String>,

    #[serde(default = "default_commit_message_prefix")]
    pub commit_message_prefix: String,

    #[serde(default = "default_commit_list_cap")]
    pub commit_list_cap: usize,
}

fn default_timezone_offset() -> String {
    "-06:00".to_string()
}

fn default_recap_max_tokens() -> u32 {
    2400
}

fn default_recap_word_band() -> String {
    "600-1200".to_string()
}

fn default_recap_tags() -> Vec<String> {
    vec!["engineering".into(), "git".into(), "build-in-public".into()]
}

fn default_commit_message_prefix() -> String {
    "blog: daily git recap".to_string()
}

fn default_commit_list_cap() -> usize {
    DEFAULT_COMMIT_LIST_CAP
}

impl Default for RecapConfig {
    fn default() -> Self {
        Self {
            registry_file: None,
            timezone_offset: default_timezone_offset(),
            max_tokens: default_recap_max_tokens(),
            word_band: default_recap_word_band(),
            fallback_tags: default_recap_tags(),
            commit_message_prefix: default_commit_message_prefix(),
            commit_list_cap: default_commit_list_cap(),
        }
    }
}

/// Tagging convention and extra stack notes passed to the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Overrides the built-in reserved tag when set
    #[serde(default)]
    pub reserved_tag: Option<String>,

    #[serde(default)]
    pub host_project: Option<String>,

    #[serde(default)]
    pub substitute_tags: Option<Vec<String>>,

    #[serde(default)]
    pub stack_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOverrideEntry {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOverrideEntry {
    pub from: String,
    pub to: String,
}

fn default_stack_entries() -> Vec<StackOverrideEntry> {
    default_stack_overrides()
        .into_iter()
        .map(|(label, description)| StackOverrideEntry { label, description })
        .collect()
}

fn default_label_entries() -> Vec<LabelOverrideEntry> {
    default_label_overrides()
        .into_iter()
        .map(|(from, to)| LabelOverrideEntry { from, to })
        .collect()
}

/// Parse `"<min>-<max>"` into an ordered word band.
pub fn parse_word_band(raw: &str) -> Result<(u32, u32), String> {
    let (min, max) = raw
        .split_once('-')
        .ok_or_else(|| format!("word band '{}' must look like 500-1100", raw))?;
    let min: u32 = min
        .trim()
        .parse()
        .map_err(|_| format!("word band '{}' has a non-numeric minimum", raw))?;
    let max: u32 = max
        .trim()
        .parse()
        .map_err(|_| format!("word band '{}' has a non-numeric maximum", raw))?;
    if min == 0 || min > max {
        return Err(format!("word band '{}' must satisfy 0 < min <= max", raw));
    }
    Ok((min, max))
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Section(&'static str, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Section(section, msg) => write!(f, "[{}] {}", section, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DevlogConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut push = |section: &'static str, msg: String| {
            errors.push(ValidationError::Section(section, msg));
        };

        if self.generation.model.trim().is_empty() {
            push("generation", "model cannot be empty".to_string());
        }
        if !self.generation.endpoint.starts_with("http://")
            && !self.generation.endpoint.starts_with("https://")
        {
            push(
                "generation",
                format!("endpoint '{}' must be an http(s) URL", self.generation.endpoint),
            );
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            push("generation", "temperature must be within 0.0..=2.0".to_string());
        }
        if self.generation.request_timeout_secs == 0 {
            push("generation", "request_timeout_secs must be positive".to_string());
        }

        if self.retry.max_attempts == 0 {
            push("retry", "max_attempts must be at least 1".to_string());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            push("retry", "base_delay_ms cannot exceed max_delay_ms".to_string());
        }

        if self.output.extension.trim().is_empty() {
            push("output", "extension cannot be empty".to_string());
        }
        if self.output.blog_dir.as_os_str().is_empty() {
            push("output", "blog_dir cannot be empty".to_string());
        }

        if self.batch.workers == 0 {
            push("batch", "workers must be at least 1".to_string());
        }
        if let Err(e) = parse_word_band(&self.batch.word_band) {
            push("batch", e);
        }
        if let Err(e) = parse_word_band(&self.recap.word_band) {
            push("recap", e);
        }
        if let Err(e) = parse_utc_offset(&self.recap.timezone_offset) {
            push("recap", e.to_string());
        }
        if self.recap.commit_message_prefix.trim().is_empty() {
            push("recap", "commit_message_prefix cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Output directory resolved against `workspace_root`.
    pub fn blog_dir(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.output.blog_dir)
    }

    pub fn stack_overrides(&self) -> StackOverrides {
        StackOverrides::new(
            self.stack_overrides
                .iter()
                .map(|e| (e.label.clone(), e.description.clone()))
                .collect(),
        )
    }

    pub fn label_overrides(&self) -> LabelOverrides {
        LabelOverrides::new(
            self.label_overrides
                .iter()
                .map(|e| (e.from.clone(), e.to.clone()))
                .collect(),
        )
    }

    /// Prompt rules for a flow's word band and author.
    pub fn prompt_rules(&self, word_band: &str, author: &str) -> Result<PromptRules, String> {
        let (min_words, max_words) = parse_word_band(word_band)?;
        let mut rules = PromptRules::new(author, min_words, max_words);
        if let Some(tag) = &self.prompt.reserved_tag {
            rules.reserved_tag = tag.clone();
        }
        if let Some(host) = &self.prompt.host_project {
            rules.host_project = host.clone();
        }
        if let Some(tags) = &self.prompt.substitute_tags {
            rules.substitute_tags = tags.clone();
        }
        rules.stack_notes = self.prompt.stack_notes.clone();
        rules.commit_list_cap = self.recap.commit_list_cap;
        Ok(rules)
    }

    pub fn generation_params(&self, max_tokens: u32) -> GenerationParams {
        GenerationParams {
            model: self.generation.model.clone(),
            temperature: self.generation.temperature,
            max_tokens,
        }
    }
}

/// `path` as-is when absolute, otherwise joined onto `root`.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
