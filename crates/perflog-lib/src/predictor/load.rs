//! Request-count to cost extrapolation over hourly buckets

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::regression::{self, LinearFit};
use crate::aggregator::{HourlyBucket, Snapshot};
use crate::config::PredictorConfig;
use crate::error::ConfigError;

/// Hourly quantity the model explains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Summed SQL queries
    #[default]
    Queries,
    /// Summed CPU time in milliseconds
    CpuMs,
}

impl Response {
    fn value(self, bucket: &HourlyBucket) -> f64 {
        match self {
            Response::Queries => bucket.totals.queries as f64,
            Response::CpuMs => bucket.totals.cpu_ms,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Queries => write!(f, "queries"),
            Response::CpuMs => write!(f, "cpu_ms"),
        }
    }
}

/// Fitted forecast at one target load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadForecast {
    pub response: Response,
    pub target_load: u64,
    /// Extrapolated response, never negative
    pub predicted: f64,
    /// Fitted slope: response units per request
    pub cost_per_request: f64,
    pub intercept: f64,
    /// R² as a percentage
    pub confidence_r2: f64,
    pub hours_used: usize,
}

/// Outcome of a prediction; too little data is a normal result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionResult {
    InsufficientData {
        qualifying_hours: usize,
        required: usize,
    },
    Fitted(LoadForecast),
}

impl PredictionResult {
    pub fn forecast(&self) -> Option<&LoadForecast> {
        match self {
            PredictionResult::Fitted(forecast) => Some(forecast),
            PredictionResult::InsufficientData { .. } => None,
        }
    }
}

pub struct LoadPredictor {
    config: PredictorConfig,
}

impl LoadPredictor {
    pub fn new(config: PredictorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn predict(&self, snapshot: &Snapshot, target_load: u64, response: Response) -> PredictionResult {
        self.predict_hours(&snapshot.hourly, target_load, response)
    }

    /// Fit over hours above the noise floor and extrapolate to `target_load`
    pub fn predict_hours(
        &self,
        hours: &[HourlyBucket],
        target_load: u64,
        response: Response,
    ) -> PredictionResult {
        let points: Vec<(f64, f64)> = hours
            .iter()
            .filter(|h| h.totals.requests > self.config.noise_floor_requests)
            .map(|h| (h.totals.requests as f64, response.value(h)))
            .collect();

        if points.len() < self.config.min_hours {
            debug!(
                qualifying_hours = points.len(),
                required = self.config.min_hours,
                "Not enough hourly data for a load fit"
            );
            return PredictionResult::InsufficientData {
                qualifying_hours: points.len(),
                required: self.config.min_hours,
            };
        }

        let Some(LinearFit {
            slope,
            intercept,
            r_squared,
        }) = regression::fit(&points)
        else {
            return PredictionResult::InsufficientData {
                qualifying_hours: points.len(),
                required: self.config.min_hours,
            };
        };

        let predicted = (intercept + slope * target_load as f64).max(0.0);
        PredictionResult::Fitted(LoadForecast {
            response,
            target_load,
            predicted,
            cost_per_request: slope,
            intercept,
            confidence_r2: r_squared * 100.0,
            hours_used: points.len(),
        })
    }
}
