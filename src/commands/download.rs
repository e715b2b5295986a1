//! Download command - fetch historical candlestick data to CSV

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use cryptocom_client::data::{candle_filename, save_candles_csv};
use cryptocom_client::{Config, Interval};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

pub fn run(
    instruments: String,
    timeframes: String,
    days: u32,
    output: String,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let client = config.public_client();

    let rt = tokio::runtime::Runtime::new()?;

    let instruments: Vec<&str> = instruments.split(',').map(|s| s.trim()).collect();
    let intervals: Vec<Interval> = timeframes
        .split(',')
        .map(|s| s.trim().parse())
        .collect::<cryptocom_client::Result<_>>()
        .context("invalid timeframe list")?;

    let start = if days == 0 {
        None
    } else {
        Some(Utc::now() - Duration::days(days as i64))
    };

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING CANDLESTICK DATA");
    println!("{}", "=".repeat(60));
    println!("  Instruments: {:?}", instruments);
    println!("  Timeframes:  {:?}", intervals.iter().map(|i| i.as_str()).collect::<Vec<_>>());
    match days {
        0 => println!("  Days:        all available history"),
        n => println!("  Days:        {}", n),
    }
    println!("  Output:      {}", output);
    println!("{}\n", "=".repeat(60));

    let total = instruments.len() * intervals.len();
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );

    let mut total_candles = 0;
    let mut success_count = 0;

    for instrument in &instruments {
        for interval in &intervals {
            progress.set_message(format!("{} {}", instrument, interval));

            match rt.block_on(client.get_all_candlesticks(instrument, *interval, start, None)) {
                Ok(candles) => {
                    let path = save_path(&output, instrument, interval.as_str());
                    save_candles_csv(&path, &candles)?;
                    total_candles += candles.len();
                    success_count += 1;
                }
                Err(walk_err) => {
                    let (error, partial) = walk_err.into_parts();
                    warn!("download of {} {} failed: {}", instrument, interval, error);
                    if !partial.is_empty() {
                        // keep what arrived so a re-run can resume from it
                        let path = save_path(&output, instrument, interval.as_str());
                        save_candles_csv(&path, &partial)?;
                        info!("kept {} candles downloaded before the failure", partial.len());
                        total_candles += partial.len();
                    }
                }
            }
            progress.inc(1);
        }
    }
    progress.finish_and_clear();

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOAD COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Successful:    {}/{}", success_count, total);
    println!("  Total candles: {}", total_candles);
    println!("{}", "=".repeat(60));

    Ok(())
}

fn save_path(output: &str, instrument: &str, interval: &str) -> PathBuf {
    Path::new(output).join(candle_filename(instrument, interval))
}
