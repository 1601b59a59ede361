//! Request path normalization
//!
//! Collapses identifier segments so that statistically similar requests
//! share one endpoint key:
//! `/details/3598/blue-shirt?ref=x` -> `/details/{id}/blue-shirt`.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::{NormalizerConfig, SentinelPrefix};
use crate::error::ConfigError;
use crate::models::{PathGroup, SourceTag};

pub const ID_PLACEHOLDER: &str = "{id}";
pub const UUID_PLACEHOLDER: &str = "{uuid}";

fn uuid_re() -> &'static Regex {
    static UUID_RE: OnceLock<Regex> = OnceLock::new();
    UUID_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )
        .expect("valid uuid regex")
    })
}

struct CompiledRule {
    pattern: Regex,
    replacement: String,
}

/// Maps raw paths to [`PathGroup`]s. Pure and deterministic.
pub struct PathNormalizer {
    sentinels: Vec<SentinelPrefix>,
    rules: Vec<CompiledRule>,
}

impl PathNormalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        let rules = config
            .route_rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledRule {
                        pattern,
                        replacement: rule.replacement.clone(),
                    })
                    .map_err(|e| ConfigError::InvalidRouteRule {
                        pattern: rule.pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sentinels: config.sentinel_prefixes.clone(),
            rules,
        })
    }

    /// Normalize a path from a stream tagged `source`
    ///
    /// Command entries keep their literal name: the command is the grouping key.
    pub fn normalize(&self, raw_path: &str, source: SourceTag) -> PathGroup {
        let raw_path = raw_path.trim();
        if source == SourceTag::Cmd {
            return PathGroup::command(raw_path);
        }

        let path = match raw_path.find('?') {
            Some(idx) => &raw_path[..idx],
            None => raw_path,
        };
        if path.is_empty() {
            return PathGroup::route("/");
        }

        if let Some(sentinel) = self.sentinels.iter().find(|s| path.starts_with(&s.prefix)) {
            return PathGroup::sentinel(sentinel.label.clone());
        }

        let mut template = collapse_uuid_segments(path);
        for rule in &self.rules {
            template = rule
                .pattern
                .replace_all(&template, rule.replacement.as_str())
                .into_owned();
        }
        PathGroup::route(collapse_numeric_segments(&template))
    }
}

/// Replace every segment that is exactly one UUID with `{uuid}`
pub fn collapse_uuid_segments(path: &str) -> String {
    let uuid = uuid_re();
    path.split('/')
        .map(|segment| if uuid.is_match(segment) { UUID_PLACEHOLDER } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace every all-digit segment between slashes (or at the end) with `{id}`
pub fn collapse_numeric_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                ID_PLACEHOLDER
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
