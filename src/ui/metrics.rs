use eframe::egui::{RichText, Ui};

use crate::analysis::summary::{Summary, format_duration, format_millivolts};

/// The four headline metrics side by side.
pub fn metric_row(ui: &mut Ui, summary: &Summary) {
    ui.columns(4, |cols: &mut [Ui]| {
        metric(&mut cols[0], "Mean (smoothed)", format_millivolts(summary.mean));
        metric(&mut cols[1], "Max (smoothed)", format_millivolts(summary.max));
        metric(&mut cols[2], "Duration", format_duration(summary.duration_secs));
        metric(&mut cols[3], "Peaks", summary.peak_count.to_string());
    });
}

fn metric(ui: &mut Ui, label: &str, value: String) {
    ui.label(RichText::new(label).weak());
    ui.label(RichText::new(value).size(26.0).strong());
}
