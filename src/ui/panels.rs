use std::path::Path;

use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Slider, Ui};

use crate::analysis::{MAX_WINDOW, MIN_WINDOW};
use crate::color::activity_color;
use crate::data::loader;
use crate::state::AppState;

const NO_CATEGORY: &str = "(none)";

// ---------------------------------------------------------------------------
// Left side panel – pipeline controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("EMG Dashboard");
    ui.separator();

    if ui.button("Upload CSV…").clicked() {
        open_file_dialog(state);
    }
    ui.small("or drop a .csv file onto the window");
    ui.separator();

    let (Some(table), Some(params)) = (&state.table, &state.params) else {
        ui.label("No file loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the closures.
    let columns = table.column_names().to_vec();
    let params = params.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Column selectors ----
            ui.strong("Timestamp column");
            if let Some(col) = column_combo(ui, "timestamp_col", &params.selection.timestamp, &columns) {
                state.set_timestamp_column(col);
            }
            ui.add_space(4.0);

            ui.strong("EMG column (numeric)");
            if let Some(col) = column_combo(ui, "value_col", &params.selection.value, &columns) {
                state.set_value_column(col);
            }
            ui.add_space(4.0);

            ui.strong("Activity label (optional)");
            let current = params.selection.category.as_deref();
            egui::ComboBox::from_id_salt("category_col")
                .selected_text(current.unwrap_or(NO_CATEGORY))
                .width(ui.available_width())
                .show_ui(ui, |ui: &mut Ui| {
                    if ui.selectable_label(current.is_none(), NO_CATEGORY).clicked() {
                        state.set_category_column(None);
                    }
                    for col in &columns {
                        if ui
                            .selectable_label(current == Some(col.as_str()), col)
                            .clicked()
                        {
                            state.set_category_column(Some(col.clone()));
                        }
                    }
                });
            ui.separator();

            // ---- Smoothing ----
            ui.strong("Smoothing window (moving average)");
            let mut window = params.window;
            if ui
                .add(Slider::new(&mut window, MIN_WINDOW..=MAX_WINDOW).text("samples"))
                .changed()
            {
                state.set_window(window);
            }
            ui.add_space(4.0);

            // ---- Peak threshold ----
            ui.strong("Peak threshold");
            let has_data = state
                .analysis
                .as_ref()
                .is_some_and(|a| a.threshold.is_some());
            ui.horizontal(|ui: &mut Ui| {
                let mut threshold = state.threshold_input;
                if ui
                    .add_enabled(has_data, DragValue::new(&mut threshold).speed(0.01).max_decimals(4))
                    .changed()
                {
                    state.set_threshold(threshold);
                }
                if ui
                    .add_enabled(params.threshold.is_some(), egui::Button::new("Reset"))
                    .clicked()
                {
                    state.reset_threshold();
                }
            });
            if let Some(default) = state.analysis.as_ref().and_then(|a| a.default_threshold) {
                ui.small(format!("default (85th percentile): {default:.4}"));
            }

            // ---- Activity legend ----
            let categories = state
                .analysis
                .as_ref()
                .and_then(|a| a.summary.categories.as_ref());
            if let Some(categories) = categories {
                ui.separator();
                ui.strong("Activities");
                for label in &categories.first_seen {
                    ui.label(RichText::new(format!("■ {label}")).color(activity_color(label)));
                }
            }
        });
}

/// Column picker; returns the newly chosen column, if any.
fn column_combo(ui: &mut Ui, id: &str, current: &str, columns: &[String]) -> Option<String> {
    let mut picked = None;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                if ui.selectable_label(current == col.as_str(), col).clicked() {
                    picked = Some(col.clone());
                }
            }
        });
    picked
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open CSV…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.analysis.is_some(), egui::Button::new("Export summary…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(table), Some(encoding)) = (&state.table, state.encoding) {
            ui.label(format!(
                "{}: {} rows ({encoding})",
                state.source_name,
                table.len()
            ));
        }
        if let Some(analysis) = &state.analysis {
            ui.separator();
            ui.label(format!(
                "{} used, {} dropped",
                analysis.cleaned.len(),
                analysis.cleaned.dropped
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open EMG recording")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        load_path(state, &path);
    }
}

/// Load a file from disk into the state (dialog or dropped path).
pub fn load_path(state: &mut AppState, path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    state.handle_load(loader::load_file(path), &name);
}

fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export summary")
        .set_file_name("emg_summary.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        match state.export_summary(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to export summary: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
