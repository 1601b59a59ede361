//! Analyzer configuration
//!
//! Every tunable the engine uses lives here so the same binary can be
//! retuned without rebuilding. All sections deserialize with defaults, so a
//! partial file (or none at all) is valid.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::SchemaName;

/// Default per-endpoint sample cap
pub const DEFAULT_SAMPLE_CAP: usize = 5000;

/// Default cap on drill-down events kept per hour
pub const DEFAULT_HOURLY_EVENT_CAP: usize = 2500;

/// Top-level configuration for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub parser: ParserConfig,
    pub normalizer: NormalizerConfig,
    pub aggregator: AggregatorConfig,
    pub detector: DetectorConfig,
    pub predictor: PredictorConfig,
}

impl AnalyzerConfig {
    /// Check every section, failing on the first invalid tunable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalizer.validate()?;
        self.aggregator.validate()?;
        self.detector.validate()?;
        self.predictor.validate()?;
        Ok(())
    }
}

/// What to do with a line that carries no `YYYY-MM-DD HH:MM:SS` timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Keep the record, stamped with the time the parser was created
    #[default]
    AcceptWithNow,
    /// Drop the record and count it as malformed
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Set of field labels the lenient scanner recognises
    pub schema: SchemaName,
    pub timestamp_policy: TimestampPolicy,
}

/// Path prefix mapped wholesale to a fixed label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelPrefix {
    pub prefix: String,
    pub label: String,
}

/// Route-specific collapse rule, applied before the generic numeric rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Regular expression matched against the path
    pub pattern: String,
    /// Replacement text for every match
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub sentinel_prefixes: Vec<SentinelPrefix>,
    pub route_rules: Vec<RouteRule>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            sentinel_prefixes: vec![SentinelPrefix {
                prefix: "/.well-known".to_string(),
                label: "System: Well-Known".to_string(),
            }],
            route_rules: vec![
                RouteRule {
                    pattern: r"/details/\d+/".to_string(),
                    replacement: "/details/{id}/".to_string(),
                },
                RouteRule {
                    pattern: r"/api/products/\d+/".to_string(),
                    replacement: "/api/products/{id}/".to_string(),
                },
            ],
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.route_rules {
            Regex::new(&rule.pattern).map_err(|e| ConfigError::InvalidRouteRule {
                pattern: rule.pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Maximum samples kept per endpoint and metric; later samples are dropped
    pub sample_cap: usize,
    /// Maximum drill-down events kept per (date, hour)
    pub hourly_event_cap: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            hourly_event_cap: DEFAULT_HOURLY_EVENT_CAP,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_cap == 0 {
            return Err(ConfigError::ZeroCapacity { name: "sample_cap" });
        }
        if self.hourly_event_cap == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "hourly_event_cap",
            });
        }
        Ok(())
    }
}

/// Anomaly thresholds
///
/// Comparisons are strict: a value equal to a threshold does not trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Per-request SQL query ceiling
    pub max_request_queries: f64,
    /// Per-request row ceiling
    pub max_request_rows: f64,
    /// Per-request egress ceiling in KB
    pub max_request_size_kb: f64,
    /// Mean queries per hit above which an endpoint is a critical N+1 suspect
    pub critical_mean_queries: f64,
    /// Mean queries per hit above which an endpoint needs SQL work
    pub warning_mean_queries: f64,
    /// Percentile used for the latency check
    pub latency_percentile: f64,
    /// Latency percentile ceiling in seconds
    pub critical_latency_sec: f64,
    /// Mean rows per hit above which pagination is recommended
    pub critical_mean_rows: f64,
    /// Peak memory per endpoint above which streaming iteration is recommended
    pub warning_peak_mem_mb: f64,
    /// Share of total traffic (percent) above which an IP is flagged
    pub ip_share_percent: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_request_queries: 30.0,
            max_request_rows: 100.0,
            max_request_size_kb: 512.0,
            critical_mean_queries: 50.0,
            warning_mean_queries: 15.0,
            latency_percentile: 95.0,
            critical_latency_sec: 5.0,
            critical_mean_rows: 2000.0,
            warning_peak_mem_mb: 150.0,
            ip_share_percent: 20.0,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("max_request_queries", self.max_request_queries),
            ("max_request_rows", self.max_request_rows),
            ("max_request_size_kb", self.max_request_size_kb),
            ("critical_mean_queries", self.critical_mean_queries),
            ("warning_mean_queries", self.warning_mean_queries),
            ("critical_latency_sec", self.critical_latency_sec),
            ("critical_mean_rows", self.critical_mean_rows),
            ("warning_peak_mem_mb", self.warning_peak_mem_mb),
        ] {
            non_negative(name, value)?;
        }
        percent("latency_percentile", self.latency_percentile)?;
        percent("ip_share_percent", self.ip_share_percent)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Hours with this many requests or fewer are treated as noise
    pub noise_floor_requests: u64,
    /// Qualifying hours needed before a fit is attempted
    pub min_hours: usize,
    /// Default hypothetical traffic level (requests per hour)
    pub target_load: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            noise_floor_requests: 5,
            min_hours: 5,
            target_load: 1000,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_hours < 2 {
            return Err(ConfigError::TooFewHours(self.min_hours));
        }
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::NegativeThreshold { name, value });
    }
    Ok(())
}

fn percent(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > 100.0 {
        return Err(ConfigError::PercentOutOfRange { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = AnalyzerConfig::default();
        config.detector.critical_mean_rows = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativeThreshold {
                name: "critical_mean_rows",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_percentile_bounds() {
        let mut config = DetectorConfig::default();
        config.latency_percentile = 0.0;
        assert!(config.validate().is_err());
        config.latency_percentile = 100.0;
        assert!(config.validate().is_ok());
        config.ip_share_percent = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sample_cap_rejected() {
        let config = AggregatorConfig {
            sample_cap: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCapacity { name: "sample_cap" })
        );
    }

    #[test]
    fn test_min_hours_floor() {
        let config = PredictorConfig {
            min_hours: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TooFewHours(1)));
    }

    #[test]
    fn test_bad_route_rule_rejected() {
        let config = NormalizerConfig {
            sentinel_prefixes: Vec::new(),
            route_rules: vec![RouteRule {
                pattern: "/details/(".to_string(),
                replacement: "x".to_string(),
            }],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRouteRule { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"detector": {"ip_share_percent": 30.0}}"#).unwrap();
        assert_eq!(config.detector.ip_share_percent, 30.0);
        assert_eq!(config.detector.critical_mean_queries, 50.0);
        assert_eq!(config.aggregator.sample_cap, DEFAULT_SAMPLE_CAP);
        assert_eq!(config.parser.timestamp_policy, TimestampPolicy::AcceptWithNow);
    }
}
