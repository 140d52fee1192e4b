//! Configuration tree.
//!
//! The timeout, batching and cadence constants in this pipeline are
//! empirically tuned, not law; everything here is overridable via YAML or
//! `DELPHI_*` environment variables (see `infrastructure::config`).

use serde::{Deserialize, Serialize};

use super::task::CallWeight;

/// Main configuration structure for delphi.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Collaborator endpoints.
    #[serde(default)]
    pub services: ServicesConfig,

    /// Resilient invoker tuning.
    #[serde(default)]
    pub invoker: InvokerConfig,

    /// Stage scheduling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Session polling and snapshot cadence.
    #[serde(default)]
    pub continuity: ContinuityConfig,

    /// Debate rounds and fallback thresholds.
    #[serde(default)]
    pub debate: DebateConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base URLs for the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServicesConfig {
    #[serde(default = "default_analysis_url")]
    pub analysis_url: String,

    #[serde(default = "default_debate_url")]
    pub debate_url: String,

    #[serde(default = "default_session_url")]
    pub session_url: String,

    #[serde(default = "default_market_url")]
    pub market_url: String,
}

fn default_analysis_url() -> String {
    "http://localhost:8710/api".to_string()
}

fn default_debate_url() -> String {
    "http://localhost:8710/api".to_string()
}

fn default_session_url() -> String {
    "http://localhost:8710/api".to_string()
}

fn default_market_url() -> String {
    "http://localhost:8710/api".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            analysis_url: default_analysis_url(),
            debate_url: default_debate_url(),
            session_url: default_session_url(),
            market_url: default_market_url(),
        }
    }
}

/// Segmented timeout and retry budget for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InvokerConfig {
    /// Segment timeout for light data pulls, seconds.
    #[serde(default = "default_light_segment_secs")]
    pub light_segment_secs: u64,

    /// Segment timeout for standard analysis calls, seconds.
    #[serde(default = "default_standard_segment_secs")]
    pub standard_segment_secs: u64,

    /// Segment timeout for heavy synthesis calls, seconds.
    #[serde(default = "default_heavy_segment_secs")]
    pub heavy_segment_secs: u64,

    /// Segment timeout for debate calls, seconds.
    #[serde(default = "default_debate_segment_secs")]
    pub debate_segment_secs: u64,

    /// How many segments to wait before declaring a timeout.
    #[serde(default = "default_max_segments")]
    pub max_segments: u32,

    /// Retry budget for transport faults (0..=2). Debate calls always run
    /// with zero retries regardless of this value.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed backoff between retry attempts, milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

const fn default_light_segment_secs() -> u64 {
    30
}

const fn default_standard_segment_secs() -> u64 {
    60
}

const fn default_heavy_segment_secs() -> u64 {
    90
}

const fn default_debate_segment_secs() -> u64 {
    120
}

const fn default_max_segments() -> u32 {
    3
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_backoff_ms() -> u64 {
    2000
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            light_segment_secs: default_light_segment_secs(),
            standard_segment_secs: default_standard_segment_secs(),
            heavy_segment_secs: default_heavy_segment_secs(),
            debate_segment_secs: default_debate_segment_secs(),
            max_segments: default_max_segments(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl InvokerConfig {
    /// Segment timeout in seconds for a call weight.
    pub fn segment_secs(&self, weight: CallWeight) -> u64 {
        match weight {
            CallWeight::Light => self.light_segment_secs,
            CallWeight::Standard => self.standard_segment_secs,
            CallWeight::Heavy => self.heavy_segment_secs,
            CallWeight::Debate => self.debate_segment_secs,
        }
    }

    /// Retry budget for a call weight. Debates are never retried: they are
    /// expensive, and the fallback heuristic is a better use of the budget.
    pub fn retries(&self, weight: CallWeight) -> u32 {
        match weight {
            CallWeight::Debate => 0,
            _ => self.max_retries,
        }
    }
}

/// Stage scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Batch size for batched stages.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

const fn default_batch_size() -> usize {
    2
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Session polling and snapshot cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContinuityConfig {
    /// Remote status polling interval, seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Local snapshot interval, seconds.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Directory holding local snapshots and the current-session pointer.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_snapshot_interval_secs() -> u64 {
    1
}

fn default_snapshot_dir() -> String {
    ".delphi".to_string()
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

/// Debate rounds and fallback thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DebateConfig {
    /// Rounds requested from the debate service.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Minimum character count for a line to count as substantive when
    /// extracting a side's core view.
    #[serde(default = "default_substantive_line_len")]
    pub substantive_line_len: usize,

    /// Truncation length when no substantive line is found.
    #[serde(default = "default_core_view_max_len")]
    pub core_view_max_len: usize,

    /// Score gap above which the fallback picks a decisive label.
    #[serde(default = "default_decisive_gap")]
    pub decisive_gap: i32,
}

const fn default_rounds() -> u32 {
    2
}

const fn default_substantive_line_len() -> usize {
    20
}

const fn default_core_view_max_len() -> usize {
    160
}

const fn default_decisive_gap() -> i32 {
    15
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            substantive_line_len: default_substantive_line_len(),
            core_view_max_len: default_core_view_max_len(),
            decisive_gap: default_decisive_gap(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for a rolling json log file.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_secs_by_weight() {
        let config = InvokerConfig::default();
        assert_eq!(config.segment_secs(CallWeight::Light), 30);
        assert_eq!(config.segment_secs(CallWeight::Debate), 120);
    }

    #[test]
    fn test_debates_never_retry() {
        let config = InvokerConfig::default();
        assert_eq!(config.retries(CallWeight::Debate), 0);
        assert_eq!(config.retries(CallWeight::Heavy), 2);
    }

    #[test]
    fn test_defaults_deserialize_from_empty() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.scheduler.batch_size, 2);
        assert_eq!(config.continuity.poll_interval_secs, 5);
        assert_eq!(config.continuity.snapshot_interval_secs, 1);
        assert_eq!(config.debate.rounds, 2);
    }
}
