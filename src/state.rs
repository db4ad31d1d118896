use std::path::Path;

use anyhow::{Context, Result};

use crate::analysis::{self, Analysis, PipelineParams};
use crate::data::clean::default_selection;
use crate::data::loader::{LoadError, LoadedTable, TextEncoding};
use crate::data::model::RawTable;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Parsed upload (None until a file loads). Kept across parameter
    /// changes so only the pipeline reruns.
    pub table: Option<RawTable>,

    /// File name shown in the top bar and written to exports.
    pub source_name: String,

    /// Encoding that decoded the current upload.
    pub encoding: Option<TextEncoding>,

    /// Column choices, window and threshold override.
    pub params: Option<PipelineParams>,

    /// Result of the last pipeline run.
    pub analysis: Option<Analysis>,

    /// Value bound to the threshold input widget.
    pub threshold_input: f64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Handle the outcome of an upload.
    pub fn handle_load(&mut self, result: Result<LoadedTable, LoadError>, source: &str) {
        match result {
            Ok(loaded) => self.set_table(loaded, source),
            Err(e) => {
                log::error!("Failed to load {source}: {e}");
                self.table = None;
                self.params = None;
                self.analysis = None;
                self.encoding = None;
                self.source_name.clear();
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded table, pick default columns and run.
    pub fn set_table(&mut self, loaded: LoadedTable, source: &str) {
        let LoadedTable { table, encoding } = loaded;
        log::info!(
            "Loaded {source}: {} rows, columns {:?} ({encoding})",
            table.len(),
            table.column_names()
        );

        self.params = Some(PipelineParams::new(default_selection(&table)));
        self.table = Some(table);
        self.encoding = Some(encoding);
        self.source_name = source.to_string();
        self.analysis = None;
        self.status_message = None;
        self.recompute();
    }

    /// Rerun the pipeline from the cached table.
    ///
    /// When the percentile default moves (new columns or window), a manual
    /// threshold is discarded and the input snaps to the new default.
    pub fn recompute(&mut self) {
        let (Some(table), Some(params)) = (&self.table, &mut self.params) else {
            return;
        };
        let previous_default = self.analysis.as_ref().and_then(|a| a.default_threshold);

        let mut result = analysis::run(table, params);
        if params.threshold.is_some() && result.default_threshold != previous_default {
            params.threshold = None;
            result = analysis::run(table, params);
        }

        self.threshold_input = result.threshold.unwrap_or(0.0);
        self.analysis = Some(result);
    }

    pub fn set_timestamp_column(&mut self, column: String) {
        self.update_params(|p| p.selection.timestamp = column);
    }

    pub fn set_value_column(&mut self, column: String) {
        self.update_params(|p| p.selection.value = column);
    }

    /// `None` selects "no category".
    pub fn set_category_column(&mut self, column: Option<String>) {
        self.update_params(|p| p.selection.category = column);
    }

    pub fn set_window(&mut self, window: usize) {
        self.update_params(|p| p.window = window);
    }

    /// Manual threshold from the input widget.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold.is_finite() {
            self.update_params(|p| p.threshold = Some(threshold));
        }
    }

    /// Go back to the percentile default.
    pub fn reset_threshold(&mut self) {
        self.update_params(|p| p.threshold = None);
    }

    fn update_params(&mut self, change: impl FnOnce(&mut PipelineParams)) {
        let Some(params) = &mut self.params else {
            return;
        };
        let before = params.clone();
        change(params);
        if *params != before {
            self.recompute();
        }
    }

    /// Write the current summary as pretty JSON.
    pub fn export_summary(&self, path: &Path) -> Result<()> {
        let (Some(analysis), Some(params)) = (&self.analysis, &self.params) else {
            anyhow::bail!("nothing to export: no file loaded");
        };
        let report = analysis.report(&self.source_name, params);
        let json = serde_json::to_string_pretty(&report).context("serializing summary")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported summary to {}", path.display());
        Ok(())
    }
}
