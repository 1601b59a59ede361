//! Load prediction command

use anyhow::Result;
use colored::Colorize;
use perflog_lib::predictor::LoadForecast;
use perflog_lib::{Analysis, PredictionResult, Response};

use crate::output::{color_confidence, format_count, print_heading, print_json, print_warning, OutputFormat};

fn unit(response: Response) -> &'static str {
    match response {
        Response::Queries => "SQL queries",
        Response::CpuMs => "CPU ms",
    }
}

/// Print the forecast block, shared with the full report
pub fn print_prediction(prediction: &PredictionResult) {
    match prediction {
        PredictionResult::Fitted(forecast) => print_forecast(forecast),
        PredictionResult::InsufficientData {
            qualifying_hours,
            required,
        } => print_warning(&format!(
            "Not enough data for a prediction: {} busy hours, {} required",
            qualifying_hours, required
        )),
    }
}

fn print_forecast(forecast: &LoadForecast) {
    println!(
        "Target load:            {} requests/hour",
        format_count(forecast.target_load)
    );
    println!(
        "{} {} {}/hour",
        "Predicted load:        ".bold(),
        format!("{:.0}", forecast.predicted).cyan().bold(),
        unit(forecast.response)
    );
    println!(
        "Cost per request:       {:.3} {}",
        forecast.cost_per_request,
        unit(forecast.response)
    );
    println!("Intercept:              {:.1}", forecast.intercept);
    println!(
        "Confidence (R²):        {}",
        color_confidence(forecast.confidence_r2)
    );
    println!("Hours used:             {}", forecast.hours_used);
}

pub fn show_prediction(analysis: &Analysis, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&analysis.prediction)?,
        OutputFormat::Table => {
            print_heading("Load Prediction");
            print_prediction(&analysis.prediction);
        }
    }
    Ok(())
}
