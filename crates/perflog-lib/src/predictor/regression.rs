//! Single-variable ordinary least squares

use serde::Serialize;

/// Fitted line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination in [0, 1]
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit `points` as (x, y) pairs
///
/// Returns `None` for fewer than two points. When every x is identical the
/// slope is 0 and the line passes through the mean of y. When y has no
/// variance, R² is 1 for an exact fit and 0 otherwise.
pub fn fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;

    // Centre x so large request counts don't lose precision
    let x0 = points[0].0;

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (x, y) in points {
        let x = x - x0;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let mean_x = sum_x / n;
    let mean_y = sum_y / n;
    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let centred_intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in points {
        let predicted = centred_intercept + slope * (x - x0);
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = if ss_tot < f64::EPSILON {
        if ss_res < f64::EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Some(LinearFit {
        slope,
        intercept: centred_intercept - slope * x0,
        r_squared,
    })
}
