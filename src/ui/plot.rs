use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDateTime};
use eframe::egui::{self, Color32, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use crate::analysis::Analysis;
use crate::analysis::summary::CategorySummary;
use crate::color::{RAW_TRACE, activity_color, smooth_color};
use crate::state::AppState;
use crate::ui::{metrics, preview};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render metrics, charts and the raw preview in the central panel.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let (Some(table), Some(analysis), Some(params)) = (&state.table, &state.analysis, &state.params)
    else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Upload an EMG CSV from the sidebar  (File → Open CSV…)");
        });
        return;
    };

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(issue) = &analysis.issue {
                ui.colored_label(Color32::from_rgb(0xD9, 0x77, 0x06), issue.to_string());
                ui.add_space(4.0);
            }

            metrics::metric_row(ui, &analysis.summary);
            ui.separator();

            ui.heading("Time series (smoothed, colored by activity)");
            time_series_plot(ui, analysis);

            if let (Some(categories), Some(column)) =
                (&analysis.summary.categories, &params.selection.category)
            {
                ui.separator();
                ui.heading("Mean by activity");
                if categories.is_empty() {
                    ui.label(format!("No rows carry a label in '{column}'."));
                } else {
                    category_bar_chart(ui, categories, column);
                }
            }

            ui.separator();
            preview::raw_preview(ui, table);
        });
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// Plot x coordinate: seconds since the Unix epoch.
fn plot_x(ts: &NaiveDateTime) -> f64 {
    ts.and_utc().timestamp_micros() as f64 / 1e6
}

fn format_time_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    let secs = mark.value.floor();
    let nanos = ((mark.value - secs) * 1e9).min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Raw trace plus one smoothed trace, or one per activity label.
fn time_series_plot(ui: &mut Ui, analysis: &Analysis) {
    let samples = &analysis.cleaned.samples;
    let smoothed = &analysis.smoothed.values;

    Plot::new("emg_time_series")
        .legend(Legend::default())
        .height(360.0)
        .x_axis_label("Time")
        .y_axis_label("mV")
        .x_axis_formatter(format_time_axis)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let raw: PlotPoints = samples
                .iter()
                .map(|s| [plot_x(&s.timestamp), s.value])
                .collect();
            plot_ui.line(Line::new(raw).name("raw").color(RAW_TRACE).width(1.0));

            match &analysis.summary.categories {
                Some(categories) => {
                    for label in &categories.first_seen {
                        let points: PlotPoints = samples
                            .iter()
                            .zip(smoothed)
                            .filter(|(s, _)| s.category.as_deref() == Some(label.as_str()))
                            .map(|(s, &v)| [plot_x(&s.timestamp), v])
                            .collect();
                        let line = Line::new(points)
                            .name(format!("smooth ({label})"))
                            .color(activity_color(label))
                            .width(3.0);
                        plot_ui.line(line);
                    }
                }
                None => {
                    let points: PlotPoints = analysis
                        .smoothed
                        .timestamps
                        .iter()
                        .zip(smoothed)
                        .map(|(ts, &v)| [plot_x(ts), v])
                        .collect();
                    plot_ui.line(Line::new(points).name("smooth").color(smooth_color()).width(3.0));
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Per-activity bar chart
// ---------------------------------------------------------------------------

fn category_bar_chart(ui: &mut Ui, categories: &CategorySummary, column: &str) {
    let labels: Vec<String> = categories.means.keys().cloned().collect();
    let bars: Vec<Bar> = categories
        .means
        .iter()
        .enumerate()
        .map(|(i, (label, &mean))| {
            Bar::new(i as f64, mean)
                .name(label)
                .fill(activity_color(label))
                .width(0.6)
        })
        .collect();

    Plot::new("activity_means")
        .legend(Legend::default())
        .height(240.0)
        .x_axis_label(column)
        .y_axis_label("mV")
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            let i = mark.value.round();
            if (mark.value - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            labels.get(i as usize).cloned().unwrap_or_default()
        })
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("mean smoothed"));
        });
}
