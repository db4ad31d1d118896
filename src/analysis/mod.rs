/// Analysis layer: the pure pipeline from a loaded table to display-ready
/// series and metrics.
///
/// ```text
///   RawTable
///      │  data::clean      retype time/value columns, drop, sort
///      ▼
///   CleanedTable
///      │  smooth           centered moving average
///      ▼
///   SmoothedSeries ──────► peaks    threshold + rising edges
///      │                     │
///      ▼                     ▼
///   summary           mean / max / duration / peaks / per-category means
/// ```
///
/// Every call recomputes from scratch; nothing is cached here.

pub mod peaks;
pub mod smooth;
pub mod summary;

use serde::Serialize;

use crate::data::clean::{self, CleaningIssue};
use crate::data::model::{CleanedTable, ColumnSelection, RawTable};

use self::smooth::SmoothedSeries;
use self::summary::Summary;

pub const DEFAULT_WINDOW: usize = 7;
pub const MIN_WINDOW: usize = 1;
pub const MAX_WINDOW: usize = 60;

/// Everything the pipeline output depends on besides the table itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineParams {
    pub selection: ColumnSelection,
    pub window: usize,
    /// User threshold; `None` uses the percentile default.
    pub threshold: Option<f64>,
}

impl PipelineParams {
    pub fn new(selection: ColumnSelection) -> Self {
        PipelineParams {
            selection,
            window: DEFAULT_WINDOW,
            threshold: None,
        }
    }
}

/// One full pipeline run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub cleaned: CleanedTable,
    pub smoothed: SmoothedSeries,
    /// 85th percentile of the smoothed values; `None` when empty.
    pub default_threshold: Option<f64>,
    /// Threshold actually used for peak counting.
    pub threshold: Option<f64>,
    pub summary: Summary,
    /// Set when cleaning left no rows.
    pub issue: Option<CleaningIssue>,
}

/// Run the whole pipeline over `table`.
pub fn run(table: &RawTable, params: &PipelineParams) -> Analysis {
    let cleaned = clean::clean(table, &params.selection);
    let issue = clean::check_not_empty(&cleaned, &params.selection).err();
    if let Some(issue) = &issue {
        log::warn!("{issue}");
    }

    let window = params.window.clamp(MIN_WINDOW, MAX_WINDOW);
    let smoothed = SmoothedSeries::from_cleaned(&cleaned, window);

    let default_threshold = peaks::default_threshold(&smoothed.values);
    let threshold = if smoothed.is_empty() {
        None
    } else {
        params.threshold.or(default_threshold)
    };
    let peak_count = threshold
        .map(|t| peaks::count_rising_edges(&smoothed.values, t))
        .unwrap_or(0);

    let summary = Summary::compute(
        &cleaned,
        &smoothed,
        peak_count,
        params.selection.category.is_some(),
    );

    log::info!(
        "Pipeline: {} rows kept, {} dropped, window {window}, {peak_count} peaks",
        cleaned.len(),
        cleaned.dropped
    );

    Analysis {
        cleaned,
        smoothed,
        default_threshold,
        threshold,
        summary,
        issue,
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Serializable snapshot of a run, written by "Export summary…".
#[derive(Debug, Serialize)]
pub struct SummaryReport<'a> {
    pub source: &'a str,
    pub params: &'a PipelineParams,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub threshold: Option<f64>,
    pub summary: &'a Summary,
}

impl Analysis {
    pub fn report<'a>(&'a self, source: &'a str, params: &'a PipelineParams) -> SummaryReport<'a> {
        SummaryReport {
            source,
            params,
            rows_used: self.cleaned.len(),
            rows_dropped: self.cleaned.dropped,
            threshold: self.threshold,
            summary: &self.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    const RECORDING: &str = "time,emg,activity\n\
        2024-05-01 10:00:00,1,rest\n\
        2024-05-01 10:00:01,1,rest\n\
        2024-05-01 10:00:02,1,rest\n\
        2024-05-01 10:00:03,10,grip\n\
        2024-05-01 10:00:04,10,grip\n\
        2024-05-01 10:00:05,10,grip\n\
        2024-05-01 10:00:06,1,release\n\
        2024-05-01 10:00:07,1,release\n\
        2024-05-01 10:00:08,1,release\n";

    fn params(window: usize, threshold: Option<f64>, category: Option<&str>) -> PipelineParams {
        PipelineParams {
            selection: ColumnSelection {
                timestamp: "time".into(),
                value: "emg".into(),
                category: category.map(Into::into),
            },
            window,
            threshold,
        }
    }

    #[test]
    fn burst_with_explicit_threshold() {
        let table = load_bytes(RECORDING.as_bytes()).unwrap().table;
        let analysis = run(&table, &params(1, Some(5.0), Some("activity")));

        assert!(analysis.issue.is_none());
        assert_eq!(analysis.smoothed.len(), 9);
        assert_eq!(analysis.summary.peak_count, 1);
        assert_eq!(analysis.summary.max, Some(10.0));
        assert_eq!(analysis.summary.mean, Some(4.0));
        assert_eq!(analysis.summary.duration_secs, 8.0);

        let cats = analysis.summary.categories.unwrap();
        assert_eq!(cats.means["grip"], 10.0);
        assert_eq!(cats.means["rest"], 1.0);
        assert_eq!(cats.first_seen, ["rest", "grip", "release"]);
    }

    #[test]
    fn default_threshold_is_85th_percentile() {
        let table = load_bytes(RECORDING.as_bytes()).unwrap().table;
        let analysis = run(&table, &params(3, None, None));

        // smoothed [1, 1, 4, 7, 10, 7, 4, 1, 1] sorts to [1, 1, 1, 1, 4, 4, 7, 7, 10];
        // position 0.85 * 8 = 6.8 sits between the two 7s
        let used = analysis.threshold.unwrap();
        assert!((used - 7.0).abs() < 1e-9);
        assert_eq!(analysis.default_threshold, analysis.threshold);
        assert_eq!(analysis.summary.peak_count, 1);
        assert!(analysis.summary.categories.is_none());
    }

    #[test]
    fn plateau_at_the_percentile_is_not_a_peak() {
        let table = load_bytes(RECORDING.as_bytes()).unwrap().table;
        let analysis = run(&table, &params(1, None, None));

        // six 1s and three 10s: the 85th percentile lands on 10
        assert_eq!(analysis.threshold, Some(10.0));
        assert_eq!(analysis.summary.peak_count, 0);
    }

    #[test]
    fn window_is_clamped_to_slider_range() {
        let table = load_bytes(RECORDING.as_bytes()).unwrap().table;
        let wide = run(&table, &params(500, None, None));
        let sixty = run(&table, &params(60, None, None));
        assert_eq!(wide.smoothed, sixty.smoothed);
    }

    #[test]
    fn empty_after_cleaning_is_well_defined() {
        let table = load_bytes(b"time,emg\nlater,abc\nsoon,def\n").unwrap().table;
        let analysis = run(&table, &params(7, None, Some("emg")));

        assert!(matches!(
            analysis.issue,
            Some(CleaningIssue::EmptyAfterCleaning { rows_in: 2, .. })
        ));
        assert!(analysis.smoothed.is_empty());
        assert_eq!(analysis.threshold, None);
        assert_eq!(analysis.summary.peak_count, 0);
        assert_eq!(analysis.summary.mean, None);
        assert_eq!(analysis.summary.duration_secs, 0.0);
    }

    #[test]
    fn report_serializes_to_json() {
        let table = load_bytes(RECORDING.as_bytes()).unwrap().table;
        let p = params(3, Some(5.0), Some("activity"));
        let analysis = run(&table, &p);

        let json = serde_json::to_value(analysis.report("recording.csv", &p)).unwrap();
        assert_eq!(json["source"], "recording.csv");
        assert_eq!(json["params"]["window"], 3);
        assert_eq!(json["rows_used"], 9);
        assert_eq!(json["summary"]["peak_count"], 1);
        assert!(json["summary"]["categories"]["means"]["grip"].is_number());
    }
}
