//! Linear load prediction from hourly aggregates

mod load;
mod regression;

pub use load::{LoadForecast, LoadPredictor, PredictionResult, Response};
pub use regression::{fit, LinearFit};
