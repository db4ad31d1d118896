use chrono::NaiveDateTime;

use crate::data::model::CleanedTable;

/// Smoothed values aligned 1:1 with the rows of a [`CleanedTable`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl SmoothedSeries {
    pub fn from_cleaned(cleaned: &CleanedTable, window: usize) -> Self {
        SmoothedSeries {
            timestamps: cleaned.timestamps(),
            values: centered_moving_average(&cleaned.values(), window),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Centered moving average with shrinking edges.
///
/// Sample `i` averages `values[i - window/2 ..= i + (window-1)/2]` clipped to
/// the series, so odd windows are symmetric and even windows lean one sample
/// to the past. At least the sample itself is always included. A window of
/// 0 is treated as 1.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let before = window / 2;
    let after = (window - 1) / 2;
    let n = values.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(n - 1);
            let span = &values[lo..=hi];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}
