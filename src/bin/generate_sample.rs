use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Samples per second.
const SAMPLE_RATE: u32 = 100;

/// Activity phases of one cycle: (label, seconds, mean amplitude in mV).
const CYCLE: [(&str, u32, f64); 3] = [("rest", 4, 0.05), ("grip", 2, 0.9), ("release", 2, 0.25)];

const CYCLES: u32 = 8;

struct Row {
    timestamp: String,
    emg_mv: f64,
    activity: &'static str,
}

/// Rectified surface EMG: amplitude envelope times Gaussian carrier plus
/// baseline noise, with the odd motion-artifact spike.
fn generate(rng: &mut StdRng) -> Result<Vec<Row>> {
    let carrier = Normal::new(0.0, 1.0).context("carrier distribution")?;
    let baseline = Normal::<f64>::new(0.0, 0.02).context("baseline distribution")?;

    let start = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .context("start timestamp")?;
    let step = TimeDelta::milliseconds(1000 / i64::from(SAMPLE_RATE));

    let mut rows = Vec::new();
    let mut t = start;
    for _ in 0..CYCLES {
        for &(activity, seconds, amplitude) in &CYCLE {
            for _ in 0..seconds * SAMPLE_RATE {
                let mut emg = (amplitude * carrier.sample(rng)).abs() + baseline.sample(rng).abs();
                if rng.gen_bool(0.002) {
                    emg += rng.gen_range(0.5..1.5);
                }
                rows.push(Row {
                    timestamp: t.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                    emg_mv: emg,
                    activity,
                });
                t += step;
            }
        }
    }
    Ok(rows)
}

fn to_csv(headers: [&str; 3], rows: &[Row]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        let emg = format!("{:.4}", row.emg_mv);
        writer.write_record([row.timestamp.as_str(), emg.as_str(), row.activity])?;
    }
    let bytes = writer.into_inner().context("flushing CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let rows = generate(&mut rng)?;

    let utf8_path = "sample_emg.csv";
    std::fs::write(utf8_path, to_csv(["timestamp", "emg_mv", "activity"], &rows)?)
        .with_context(|| format!("writing {utf8_path}"))?;

    // Same recording with Japanese headers in cp932, for the encoding fallback.
    let sjis_path = "sample_emg_cp932.csv";
    let text = to_csv(["日時", "筋電", "活動"], &rows)?;
    let (encoded, _, had_errors) = encoding_rs::SHIFT_JIS.encode(&text);
    anyhow::ensure!(!had_errors, "text not representable in cp932");
    std::fs::write(sjis_path, &encoded).with_context(|| format!("writing {sjis_path}"))?;

    println!(
        "Wrote {} samples ({} s at {SAMPLE_RATE} Hz) to {utf8_path} and {sjis_path}",
        rows.len(),
        rows.len() as u32 / SAMPLE_RATE
    );
    Ok(())
}
