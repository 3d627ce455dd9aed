use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use adpilot_core::PlatformId;

/// Root configuration, mapping to `adpilot.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub engine: EngineConfig,
    pub guardrails: GuardrailsConfig,
    pub analyst: AnalystConfig,
    pub platforms: HashMap<String, PlatformConfig>,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

// ── Engine ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target tick cadence in seconds. Ticks aim at wall-clock boundaries
    /// (e.g. :00/:15/:30/:45 for the 900s default), not offsets from the
    /// previous tick.
    pub tick_interval_secs: u64,
    /// Fraction of the interval a tick may use before it is aborted.
    pub tick_deadline_fraction: f64,
    /// IANA timezone for daily counter rollover (e.g. "America/New_York").
    pub timezone: String,
    /// Maximum concurrent executions per platform.
    pub per_platform_concurrency: usize,
    /// Days of trailing samples included in each analysis request.
    pub trailing_window_days: i64,
    /// Tick lease time-to-live in seconds.
    pub lease_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 900,
            tick_deadline_fraction: 0.8,
            timezone: "UTC".into(),
            per_platform_concurrency: 4,
            trailing_window_days: 7,
            lease_ttl_secs: 1800,
        }
    }
}

impl EngineConfig {
    pub fn tz(&self) -> chrono_tz::Tz {
        chrono_tz::Tz::from_str(&self.timezone).unwrap_or(chrono_tz::UTC)
    }
}

// ── Guardrails ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailsConfig {
    /// Proposals below this confidence are rejected. Strict less-than: a
    /// proposal exactly at the threshold passes.
    pub confidence_threshold: f64,
    /// Cap on auto-executed adjustments per calendar day.
    pub max_daily_adjustments: u32,
    /// Cap on total absolute budget moved per day, as a fraction of the sum
    /// of enabled daily budgets at start of day.
    pub max_budget_reallocation_fraction_per_day: f64,
    /// Cap on the cumulative per-campaign budget delta per day, as a fraction
    /// of the campaign's budget at start of day.
    pub max_single_budget_increase_fraction: f64,
    /// Campaigns younger than this are never auto-paused.
    pub min_campaign_runtime_hours_before_pause: i64,
    /// Budget changes above this fraction require human approval.
    pub major_change_fraction: f64,
    /// How long a queued approval stays valid before auto-expiring.
    pub approval_ttl_secs: u64,
    /// "advisory", "semi", or "full".
    pub automation_level: String,
    /// Optional per-platform ceilings on the sum of enabled daily budgets,
    /// in canonical major units (dollars).
    pub platform_ceilings: HashMap<String, f64>,
    /// Per-campaign threshold overrides, keyed by "platform:external_id".
    pub per_campaign: HashMap<String, PerCampaignGuardrails>,
}

/// Thresholds a single campaign may override. Unset fields fall through to
/// the global values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerCampaignGuardrails {
    pub confidence_threshold: Option<f64>,
    pub major_change_fraction: Option<f64>,
    pub max_single_budget_increase_fraction: Option<f64>,
    pub min_campaign_runtime_hours_before_pause: Option<i64>,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            max_daily_adjustments: 20,
            max_budget_reallocation_fraction_per_day: 0.5,
            max_single_budget_increase_fraction: 0.3,
            min_campaign_runtime_hours_before_pause: 72,
            major_change_fraction: 0.20,
            approval_ttl_secs: 4 * 3600,
            automation_level: "semi".into(),
            platform_ceilings: HashMap::new(),
            per_campaign: HashMap::new(),
        }
    }
}

// ── Analyst ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    /// Model identifier, e.g. "claude-sonnet-4-20250514".
    pub model: String,
    /// Anthropic API key. Can also come from ANTHROPIC_API_KEY; the config
    /// file takes priority over the environment.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Hard deadline for one analysis round-trip.
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            api_key: None,
            base_url: "https://api.anthropic.com/v1".into(),
            timeout_secs: 60,
            max_tokens: 4096,
            temperature: 0.2,
        }
    }
}

// ── Platforms ──────────────────────────────────────────────────

/// Per-platform adapter settings. A platform with no API key runs in mock
/// mode, serving deterministic fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub enabled: bool,
    /// Gateway endpoint for this platform's API sidecar.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub refresh_token: Option<String>,
    /// Token-bucket burst size.
    pub rate_burst: u32,
    /// Token-bucket refill per second.
    pub rate_refill_per_sec: f64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:3001".into(),
            api_key: None,
            refresh_token: None,
            rate_burst: 10,
            rate_refill_per_sec: 2.0,
        }
    }
}

// ── Ledger ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("adpilot.db"),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
    /// Log file path (None = stdout only).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            file: None,
        }
    }
}

// ── Default for root ───────────────────────────────────────────

impl Default for PilotConfig {
    fn default() -> Self {
        let mut platforms = HashMap::new();
        for (platform, port) in [
            (PlatformId::GoogleAds, 3001),
            (PlatformId::MetaAds, 3002),
            (PlatformId::TiktokAds, 3003),
            (PlatformId::LinkedinAds, 3004),
        ] {
            platforms.insert(
                platform.as_str().to_string(),
                PlatformConfig {
                    endpoint: format!("http://localhost:{port}"),
                    ..PlatformConfig::default()
                },
            );
        }
        Self {
            engine: EngineConfig::default(),
            guardrails: GuardrailsConfig::default(),
            analyst: AnalystConfig::default(),
            platforms,
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({h})")?;
        }
        Ok(())
    }
}

impl PilotConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Tick cadence ───
        if self.engine.tick_interval_secs < 60 {
            warnings.push(ConfigWarning {
                field: "engine.tick_interval_secs".into(),
                message: format!("{}s is below the 60s minimum", self.engine.tick_interval_secs),
                severity: WarningSeverity::Error,
                hint: Some("The loop targets a 15-minute cadence; use 900".into()),
            });
        }
        if self.engine.tick_deadline_fraction <= 0.0 || self.engine.tick_deadline_fraction > 1.0 {
            warnings.push(ConfigWarning {
                field: "engine.tick_deadline_fraction".into(),
                message: format!("{} is out of (0, 1]", self.engine.tick_deadline_fraction),
                severity: WarningSeverity::Error,
                hint: Some("0.8 leaves 20% headroom before the next boundary".into()),
            });
        }

        // ── Timezone ───
        if chrono_tz::Tz::from_str(&self.engine.timezone).is_err() {
            warnings.push(ConfigWarning {
                field: "engine.timezone".into(),
                message: format!("unknown timezone '{}'", self.engine.timezone),
                severity: WarningSeverity::Error,
                hint: Some("Use an IANA name like 'UTC' or 'America/New_York'".into()),
            });
        }

        // ── Guardrail thresholds ───
        if !(0.0..=1.0).contains(&self.guardrails.confidence_threshold) {
            warnings.push(ConfigWarning {
                field: "guardrails.confidence_threshold".into(),
                message: format!("{} is out of [0, 1]", self.guardrails.confidence_threshold),
                severity: WarningSeverity::Error,
                hint: Some("0.85 is the usual setting".into()),
            });
        }
        if self.guardrails.major_change_fraction < 0.0 {
            warnings.push(ConfigWarning {
                field: "guardrails.major_change_fraction".into(),
                message: "negative fraction".into(),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }
        if self.guardrails.max_daily_adjustments == 0 {
            warnings.push(ConfigWarning {
                field: "guardrails.max_daily_adjustments".into(),
                message: "0 disables all auto-execution".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Use automation_level = \"advisory\" if that is the intent".into()),
            });
        }

        // ── Automation level ───
        let valid_levels = ["advisory", "semi", "full"];
        if !valid_levels.contains(&self.guardrails.automation_level.as_str()) {
            warnings.push(ConfigWarning {
                field: "guardrails.automation_level".into(),
                message: format!("unknown level '{}'", self.guardrails.automation_level),
                severity: WarningSeverity::Error,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        } else if self.guardrails.automation_level == "full" {
            warnings.push(ConfigWarning {
                field: "guardrails.automation_level".into(),
                message: "full automation: budget changes execute without approval".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Consider \"semi\" while tuning guardrails".into()),
            });
        }

        // ── Platform keys and ceilings ───
        for key in self.platforms.keys() {
            if PlatformId::from_str(key).is_err() {
                warnings.push(ConfigWarning {
                    field: format!("platforms.{key}"),
                    message: format!("unknown platform '{key}'"),
                    severity: WarningSeverity::Error,
                    hint: Some("Supported: google_ads, meta_ads, tiktok_ads, linkedin_ads".into()),
                });
            }
        }
        for (key, ceiling) in &self.guardrails.platform_ceilings {
            if PlatformId::from_str(key).is_err() {
                warnings.push(ConfigWarning {
                    field: format!("guardrails.platform_ceilings.{key}"),
                    message: format!("unknown platform '{key}'"),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            } else if *ceiling <= 0.0 {
                warnings.push(ConfigWarning {
                    field: format!("guardrails.platform_ceilings.{key}"),
                    message: "ceiling must be positive".into(),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            }
        }

        // ── Analyst ───
        if self.analyst.api_key.is_none() {
            warnings.push(ConfigWarning {
                field: "analyst.api_key".into(),
                message: "no API key; analysis will fail unless a mock analyst is wired".into(),
                severity: WarningSeverity::Info,
                hint: Some("Set analyst.api_key or ANTHROPIC_API_KEY".into()),
            });
        }
        if self.analyst.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "analyst.timeout_secs".into(),
                message: "timeout of 0 would fail every analysis".into(),
                severity: WarningSeverity::Error,
                hint: Some("60 is the usual setting".into()),
            });
        }

        // ── Logging ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_log_levels.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  - {}", errors.join("\n  - ")));
        }

        Ok(warnings)
    }

    /// Enabled platforms parsed to their ids, with their settings.
    pub fn enabled_platforms(&self) -> Vec<(PlatformId, &PlatformConfig)> {
        let mut out: Vec<_> = self
            .platforms
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .filter_map(|(key, cfg)| PlatformId::from_str(key).ok().map(|p| (p, cfg)))
            .collect();
        out.sort_by_key(|(p, _)| *p);
        out
    }
}
