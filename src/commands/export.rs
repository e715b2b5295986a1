//! Export-orders command - download order history into a deduplicated CSV

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use cryptocom_client::data::export_order_history;
use cryptocom_client::Config;
use tracing::{info, warn};

pub fn run(
    days: u32,
    instrument: Option<String>,
    output: PathBuf,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let client = config
        .client()
        .context("order history export requires API credentials")?;

    let end = Utc::now();
    let start = end - Duration::days(days.max(1) as i64);

    info!(
        "exporting order history from {} to {}",
        start.format("%Y-%m-%d %H:%M"),
        end.format("%Y-%m-%d %H:%M")
    );

    let rt = tokio::runtime::Runtime::new()?;
    let walk =
        rt.block_on(client.get_all_order_history(instrument.as_deref(), start, end));

    match walk {
        Ok(orders) => {
            let downloaded = orders.len();
            let total = export_order_history(&output, orders)?;
            println!(
                "Exported {} orders ({} in file) to {}",
                downloaded,
                total,
                output.display()
            );
            Ok(())
        }
        Err(walk_err) => {
            let (error, partial) = walk_err.into_parts();
            if partial.is_empty() {
                return Err(error).context("order history download failed");
            }
            // persist the completed part so the next run only fills the gap
            warn!(
                "download failed after {} orders; writing partial result",
                partial.len()
            );
            let total = export_order_history(&output, partial)?;
            Err(anyhow!(error)).context(format!(
                "order history download failed; {} rows preserved in {}",
                total,
                output.display()
            ))
        }
    }
}
