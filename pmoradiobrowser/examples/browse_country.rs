//! Example: List the best stations of a country
//!
//! Run with: cargo run -p pmoradiobrowser --example browse_country
//! Or with a country code: cargo run -p pmoradiobrowser --example browse_country -- DE
//! Or search by name: cargo run -p pmoradiobrowser --example browse_country -- --search jazz

use pmoconfig::get_config;
use pmoradiobrowser::{country_by_code, flag_emoji, DataOrigin, RadioBrowserClient};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = get_config();

    // Initialize logging, RUST_LOG wins over the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.get_log_min_level().unwrap_or_else(|_| "info".into());
        tracing_subscriber::EnvFilter::new(level.to_lowercase())
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let client = RadioBrowserClient::from_config(&config)?;
    let args: Vec<String> = env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--search") {
        let query = args.get(1).cloned().unwrap_or_else(|| "jazz".to_string());
        println!("Searching stations matching '{}'...\n", query);

        let stations = client.search(&query).await?;
        for station in stations.iter().take(20) {
            println!(
                "  {} {} ({} kbps)",
                flag_emoji(&station.country_code).unwrap_or_default(),
                station.name,
                station.bitrate
            );
        }
        println!("\n{} results", stations.len());
        return Ok(());
    }

    let code = args.first().cloned().unwrap_or_else(|| "TR".to_string());
    let label = country_by_code(&code)
        .map(|c| format!("{} {}", c.flag(), c.name))
        .unwrap_or_else(|| code.to_uppercase());

    println!("Fetching stations for {}...\n", label);

    let lookup = client.fetch_stations_detailed(&code).await?;
    match &lookup.origin {
        DataOrigin::Network { mirror } => println!("Answered by {}\n", mirror),
        DataOrigin::Cache => println!("Served from cache\n"),
        DataOrigin::Stale => println!("Directory unreachable, showing cached stations\n"),
    }

    for (i, station) in lookup.stations.iter().enumerate() {
        println!(
            "{:>3}. {} [{} {} kbps, {} votes]",
            i + 1,
            station.name,
            station.codec,
            station.bitrate,
            station.votes
        );
        println!("     {}", station.stream_url());
    }

    Ok(())
}
