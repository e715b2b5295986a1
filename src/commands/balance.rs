//! Balance command - print the current portfolio summary

use std::path::Path;

use anyhow::{Context, Result};
use cryptocom_client::Config;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let client = config
        .client()
        .context("balance lookup requires API credentials")?;

    let rt = tokio::runtime::Runtime::new()?;
    let portfolio = rt.block_on(client.get_portfolio())?;

    if portfolio.is_empty() {
        println!("No positions held.");
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("PORTFOLIO SUMMARY");
    println!("{}", "=".repeat(60));
    println!(
        "  {:<10} {:>16} {:>16} {:>8}",
        "Currency", "Quantity", "Market Value", "Share"
    );

    let mut total = 0.0;
    for item in &portfolio {
        println!(
            "  {:<10} {:>16.8} {:>16.2} {:>7.1}%",
            item.currency,
            item.quantity,
            item.market_value,
            item.portfolio_percentage * 100.0
        );
        total += item.market_value;
    }

    println!("{}", "-".repeat(60));
    println!("  {:<10} {:>33.2}", "Total", total);
    println!("{}", "=".repeat(60));

    Ok(())
}
