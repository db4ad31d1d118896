use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::RawTable;

/// Rows shown in the raw data preview.
pub const PREVIEW_ROWS: usize = 200;

/// Collapsible table with the head of the uploaded file.
pub fn raw_preview(ui: &mut Ui, table: &RawTable) {
    egui::CollapsingHeader::new(format!("Raw data ({} rows)", table.len()))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            let shown = table.len().min(PREVIEW_ROWS);

            egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .resizable(true)
                    .max_scroll_height(300.0)
                    .columns(Column::auto().at_least(60.0), table.column_names().len())
                    .header(20.0, |mut header| {
                        for name in table.column_names() {
                            header.col(|ui: &mut Ui| {
                                ui.strong(name);
                            });
                        }
                    })
                    .body(|body| {
                        body.rows(18.0, shown, |mut row| {
                            let cells = &table.rows()[row.index()];
                            for cell in cells {
                                row.col(|ui: &mut Ui| {
                                    if cell.is_null() {
                                        ui.weak("NA");
                                    } else {
                                        ui.label(cell.to_string());
                                    }
                                });
                            }
                        });
                    });
            });

            if table.len() > shown {
                ui.small(format!("showing the first {shown} of {} rows", table.len()));
            }
        });
}
