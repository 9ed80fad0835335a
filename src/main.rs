// src/main.rs
//! Pack-it-now: 3D Order Packing Service
//!
//! A Rust service for packing warehouse orders into cartons. Chooses the
//! smallest suitable carton per order and computes the exact position and
//! orientation of every item:
//! - Layer-based placement with free-space fragmentation
//! - Six axis-aligned rotations per item
//! - Weight and fill-ratio constraints per carton type

mod api;
mod batch;
mod config;
mod geometry;
mod loader;
mod model;
mod optimizer;
mod rotation;
pub mod types;

use config::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app_config = AppConfig::from_env();

    if app_config.batch.is_configured() {
        run_batch_mode(&app_config);
        return;
    }

    println!("🚀 Packing service starting...");
    api::start_api_server(app_config.api).await;
}

/// Packs the configured batch files and exits.
fn run_batch_mode(app_config: &AppConfig) {
    let batch = &app_config.batch;
    println!("📦 Batch mode: packing orders...");

    let outcome = batch::run_batch(
        batch.orderline_file().expect("batch mode requires order file"),
        batch.product_file().expect("batch mode requires product file"),
        batch.box_file().expect("batch mode requires box file"),
        batch.output_file(),
    );

    match outcome {
        Ok(summary) => {
            println!(
                "✅ {} orders processed in {:.2}s: {} items packed, {} rejected",
                summary.orders, summary.elapsed_seconds, summary.packed_items, summary.rejected_items
            );
            if !summary.failed_orders.is_empty() {
                eprintln!(
                    "⚠️ {} orders could not be packed: {}",
                    summary.failed_orders.len(),
                    summary.failed_orders.join(", ")
                );
            }
            println!("💾 Results written to {}", batch.output_file().display());
        }
        Err(err) => {
            eprintln!("❌ Batch run failed: {}", err);
            std::process::exit(1);
        }
    }
}
