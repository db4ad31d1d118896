use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::CleanedTable;

use super::smooth::SmoothedSeries;

// ---------------------------------------------------------------------------
// Per-category means
// ---------------------------------------------------------------------------

/// Mean smoothed value per category label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    /// Label → mean, sorted by label.
    pub means: BTreeMap<String, f64>,
    /// Labels in order of first appearance along the time axis.
    #[serde(skip)]
    pub first_seen: Vec<String>,
}

impl CategorySummary {
    /// Group samples by label (rows without a label are skipped) and
    /// average the smoothed value joined by row position.
    pub fn compute<'a>(
        labels: impl IntoIterator<Item = Option<&'a str>>,
        smoothed: &[f64],
    ) -> Self {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut first_seen = Vec::new();

        for (label, &value) in labels.into_iter().zip(smoothed) {
            let Some(label) = label else {
                continue;
            };
            let entry = sums.entry(label.to_string()).or_insert_with(|| {
                first_seen.push(label.to_string());
                (0.0, 0)
            });
            entry.0 += value;
            entry.1 += 1;
        }

        let means = sums
            .into_iter()
            .map(|(label, (sum, count))| (label, sum / count as f64))
            .collect();
        CategorySummary { means, first_seen }
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scalar summary
// ---------------------------------------------------------------------------

/// The four headline metrics plus optional per-category means.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Mean of the smoothed series; `None` means "no data".
    pub mean: Option<f64>,
    /// Max of the smoothed series; `None` means "no data".
    pub max: Option<f64>,
    pub duration_secs: f64,
    pub peak_count: usize,
    pub categories: Option<CategorySummary>,
}

impl Summary {
    pub fn compute(
        cleaned: &CleanedTable,
        smoothed: &SmoothedSeries,
        peak_count: usize,
        with_categories: bool,
    ) -> Self {
        let values = &smoothed.values;
        let categories = with_categories.then(|| {
            CategorySummary::compute(
                cleaned.samples.iter().map(|s| s.category.as_deref()),
                values,
            )
        });

        Summary {
            mean: mean(values),
            max: max(values),
            duration_secs: duration_secs(cleaned),
            peak_count,
            categories,
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Span between the first and last timestamp; 0 for fewer than two rows.
pub fn duration_secs(cleaned: &CleanedTable) -> f64 {
    match (cleaned.samples.first(), cleaned.samples.last()) {
        (Some(first), Some(last)) => {
            let span = last.timestamp - first.timestamp;
            span.num_microseconds()
                .map(|us| us as f64 / 1e6)
                .unwrap_or_else(|| span.num_milliseconds() as f64 / 1e3)
        }
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

pub const NO_DATA: &str = "no data";

/// `12.34 mV`, or the no-data sentinel.
pub fn format_millivolts(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2} mV"),
        None => NO_DATA.to_string(),
    }
}

/// Whole seconds.
pub fn format_duration(secs: f64) -> String {
    format!("{secs:.0} s")
}
