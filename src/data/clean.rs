use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use super::model::{CellValue, CleanedTable, ColumnSelection, RawTable, Sample};

// ---------------------------------------------------------------------------
// Best-effort coercion: failed cells become `None`
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Interpret a cell as a calendar date-time.
///
/// Text is tried against RFC 3339 (offsets folded to UTC), then the common
/// date-time, date-only and time-only layouts. Time-only values land on
/// 1970-01-01. Numeric cells count seconds since the Unix epoch.
pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::String(s) => parse_timestamp_text(s.trim()),
        CellValue::Integer(i) => DateTime::from_timestamp(*i, 0).map(|dt| dt.naive_utc()),
        CellValue::Float(f) => epoch_seconds(*f),
        CellValue::Bool(_) | CellValue::Null => None,
    }
}

fn parse_timestamp_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())?;
    NaiveDate::from_ymd_opt(1970, 1, 1).map(|epoch| epoch.and_time(time))
}

fn epoch_seconds(secs: f64) -> Option<NaiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

/// Interpret a cell as a finite number.
pub fn parse_value(cell: &CellValue) -> Option<f64> {
    let v = match cell {
        CellValue::Float(f) => *f,
        CellValue::Integer(i) => *i as f64,
        CellValue::Bool(b) => f64::from(u8::from(*b)),
        CellValue::String(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Null => return None,
    };
    v.is_finite().then_some(v)
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Raised (as a notice, not a failure) when no row survives typing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CleaningIssue {
    #[error(
        "no usable rows: none of the {rows_in} rows has both a date-time in '{timestamp_column}' \
         and a number in '{value_column}'"
    )]
    EmptyAfterCleaning {
        timestamp_column: String,
        value_column: String,
        rows_in: usize,
    },
}

/// Retype the selected columns, drop rows where either parse failed and
/// sort the rest by timestamp. Ties keep their file order.
pub fn clean(table: &RawTable, selection: &ColumnSelection) -> CleanedTable {
    let (Some(ts_idx), Some(val_idx)) = (
        table.column_index(&selection.timestamp),
        table.column_index(&selection.value),
    ) else {
        log::warn!(
            "Selected columns {:?}/{:?} are not in the table",
            selection.timestamp,
            selection.value
        );
        return CleanedTable {
            samples: Vec::new(),
            dropped: table.len(),
        };
    };
    let cat_idx = selection
        .category
        .as_deref()
        .and_then(|c| table.column_index(c));

    let mut samples: Vec<Sample> = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(row, cells)| {
            let timestamp = parse_timestamp(&cells[ts_idx])?;
            let value = parse_value(&cells[val_idx])?;
            let category = cat_idx.and_then(|c| cells[c].label());
            Some(Sample {
                timestamp,
                value,
                category,
                source_row: row,
            })
        })
        .collect();

    samples.sort_by_key(|s| s.timestamp);

    let dropped = table.len() - samples.len();
    if dropped > 0 {
        log::info!("Dropped {dropped} of {} rows during typing", table.len());
    }
    CleanedTable { samples, dropped }
}

/// The notice to show when cleaning left nothing.
pub fn check_not_empty(
    cleaned: &CleanedTable,
    selection: &ColumnSelection,
) -> Result<(), CleaningIssue> {
    if cleaned.is_empty() {
        return Err(CleaningIssue::EmptyAfterCleaning {
            timestamp_column: selection.timestamp.clone(),
            value_column: selection.value.clone(),
            rows_in: cleaned.dropped,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Column discovery
// ---------------------------------------------------------------------------

/// Initial selector values for a freshly loaded table.
///
/// Timestamp: first column whose first present cell reads as a date-time.
/// Value: first other column whose first present cell is numeric.
/// Both fall back to the first column.
pub fn default_selection(table: &RawTable) -> ColumnSelection {
    let first = table.column_names().first().cloned().unwrap_or_default();
    let width = table.column_names().len();

    let ts_idx = (0..width).find(|&i| {
        matches!(first_present(table, i), Some(c @ CellValue::String(_)) if parse_timestamp(c).is_some())
    });
    let val_idx = (0..width).filter(|&i| Some(i) != ts_idx).find(|&i| {
        matches!(
            first_present(table, i),
            Some(CellValue::Float(_) | CellValue::Integer(_))
        )
    });

    let name_of = |idx: Option<usize>| {
        idx.map(|i| table.column_names()[i].clone())
            .unwrap_or_else(|| first.clone())
    };
    ColumnSelection {
        timestamp: name_of(ts_idx),
        value: name_of(val_idx),
        category: None,
    }
}

fn first_present(table: &RawTable, idx: usize) -> Option<&CellValue> {
    table.column(idx).find(|c| !c.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    fn selection(ts: &str, val: &str, cat: Option<&str>) -> ColumnSelection {
        ColumnSelection {
            timestamp: ts.into(),
            value: val.into(),
            category: cat.map(Into::into),
        }
    }

    fn table(csv: &str) -> RawTable {
        load_bytes(csv.as_bytes()).unwrap().table
    }

    #[test]
    fn timestamp_layouts() {
        let cases = [
            "2024-05-01 10:00:00",
            "2024-05-01T10:00:00.250",
            "2024-05-01T19:00:00+09:00",
            "2024/05/01 10:00",
            "05/01/2024 10:00:00",
            "2024-05-01",
        ];
        for text in cases {
            assert!(
                parse_timestamp(&CellValue::String(text.into())).is_some(),
                "{text}"
            );
        }
        let with_offset = parse_timestamp(&CellValue::String("2024-05-01T19:00:00+09:00".into()));
        let utc = parse_timestamp(&CellValue::String("2024-05-01 10:00:00".into()));
        assert_eq!(with_offset, utc);
    }

    #[test]
    fn time_only_and_epoch_seconds() {
        let t = parse_timestamp(&CellValue::String("00:00:01.5".into())).unwrap();
        assert_eq!(t.and_utc().timestamp_millis(), 1500);

        let e = parse_timestamp(&CellValue::Float(2.25)).unwrap();
        assert_eq!(e.and_utc().timestamp_millis(), 2250);

        assert_eq!(parse_timestamp(&CellValue::String("soon".into())), None);
        assert_eq!(parse_timestamp(&CellValue::Null), None);
    }

    #[test]
    fn value_coercion_rejects_non_finite() {
        assert_eq!(parse_value(&CellValue::Integer(3)), Some(3.0));
        assert_eq!(parse_value(&CellValue::String(" 0.5".into())), Some(0.5));
        assert_eq!(parse_value(&CellValue::Float(f64::INFINITY)), None);
        assert_eq!(parse_value(&CellValue::String("high".into())), None);
        assert_eq!(parse_value(&CellValue::Null), None);
    }

    #[test]
    fn drops_unparseable_rows_and_sorts_by_time() {
        let t = table(
            "time,emg\n\
             2024-01-01 00:00:03,3\n\
             not a date,9\n\
             2024-01-01 00:00:01,1\n\
             2024-01-01 00:00:02,oops\n\
             2024-01-01 00:00:02,2\n",
        );
        let cleaned = clean(&t, &selection("time", "emg", None));

        assert_eq!(cleaned.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(cleaned.dropped, 2);
        assert!(cleaned.timestamps().windows(2).all(|w| w[0] <= w[1]));
        assert!(cleaned.samples.iter().all(|s| s.value.is_finite()));
    }

    #[test]
    fn equal_timestamps_keep_file_order() {
        let t = table(
            "time,emg\n\
             2024-01-01 00:00:01,5\n\
             2024-01-01 00:00:00,1\n\
             2024-01-01 00:00:01,6\n\
             2024-01-01 00:00:01,7\n",
        );
        let cleaned = clean(&t, &selection("time", "emg", None));
        assert_eq!(cleaned.values(), vec![1.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn carries_category_labels() {
        let t = table(
            "time,emg,act\n\
             2024-01-01 00:00:00,1,rest\n\
             2024-01-01 00:00:01,2,\n\
             2024-01-01 00:00:02,3,grip\n",
        );
        let cleaned = clean(&t, &selection("time", "emg", Some("act")));
        let labels: Vec<_> = cleaned.samples.iter().map(|s| s.category.clone()).collect();
        assert_eq!(
            labels,
            vec![Some("rest".to_string()), None, Some("grip".to_string())]
        );
    }

    #[test]
    fn empty_after_cleaning_is_reported() {
        let t = table("time,emg\nx,1\ny,2\n");
        let sel = selection("time", "emg", None);
        let cleaned = clean(&t, &sel);

        assert!(cleaned.is_empty());
        let issue = check_not_empty(&cleaned, &sel).unwrap_err();
        assert_eq!(
            issue,
            CleaningIssue::EmptyAfterCleaning {
                timestamp_column: "time".into(),
                value_column: "emg".into(),
                rows_in: 2,
            }
        );
    }

    #[test]
    fn unknown_column_yields_empty_table() {
        let t = table("time,emg\n2024-01-01,1\n");
        let cleaned = clean(&t, &selection("time", "nope", None));
        assert!(cleaned.is_empty());
        assert_eq!(cleaned.dropped, 1);
    }

    #[test]
    fn discovers_time_and_value_columns() {
        let t = table(
            "label,recorded_at,emg_mv,gain\n\
             rest,2024-01-01 00:00:00,0.25,1000\n",
        );
        let sel = default_selection(&t);
        assert_eq!(sel.timestamp, "recorded_at");
        assert_eq!(sel.value, "emg_mv");
        assert_eq!(sel.category, None);
    }

    #[test]
    fn discovery_falls_back_to_first_column() {
        let t = table("a,b
x,y
");
        let sel = default_selection(&t);
        assert_eq!(sel.timestamp, "a");
        assert_eq!(sel.value, "a");
    }
}
