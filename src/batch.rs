//! Offline batch driver.
//!
//! Loads the three input files, groups order lines into orders, packs
//! independent orders in parallel and exports one CSV row per placed item.
//! Orders share no mutable state, so the fan-out is a plain data-parallel
//! map over the order list; the container catalogue is shared by reference.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info};

use crate::loader::{self, LoadError};
use crate::optimizer::{OrderResult, PackError, Packer};

/// Column order of the result file.
pub const RESULT_HEADER: [&str; 13] = [
    "Order ID",
    "Box ID",
    "Box Type",
    "Box Width",
    "Box Height",
    "Box Depth",
    "Item Name",
    "Item Width",
    "Item Height",
    "Item Depth",
    "Item Position X",
    "Item Position Y",
    "Item Position Z",
];

/// Error raised by the batch driver.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("could not write result file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not write result file: {0}")]
    Csv(#[from] csv::Error),
}

/// Counters of one batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub orders: usize,
    pub packed_items: usize,
    pub rejected_items: usize,
    pub failed_orders: Vec<String>,
    pub elapsed_seconds: f64,
}

/// Runs one batch: load, pack, export.
///
/// A `NoFittingContainer` failure is fatal for its order only; the order is
/// recorded in the summary and the remaining orders continue.
pub fn run_batch(
    orderline_path: &Path,
    product_path: &Path,
    box_path: &Path,
    output_path: &Path,
) -> Result<BatchSummary, BatchError> {
    let boxes = loader::load_boxes(box_path)?;
    let catalog = loader::load_product_catalog(product_path)?;
    let lines = loader::load_order_lines(orderline_path)?;
    let mut orders = loader::build_orders(&lines, &catalog);

    // Busiest orders first.
    orders.sort_by(|a, b| b.items().len().cmp(&a.items().len()));

    info!(
        orders = orders.len(),
        order_lines = lines.len(),
        boxes = boxes.len(),
        "batch loaded"
    );
    let started = Instant::now();

    let outcomes: Vec<(String, Result<OrderResult, PackError>)> = orders
        .par_iter_mut()
        .map(|order| {
            let order_number = order.order_number().to_string();
            let mut packer = Packer::new();
            (order_number, packer.pack_order(order, &boxes))
        })
        .collect();

    let elapsed_seconds = started.elapsed().as_secs_f64();

    let file = std::fs::File::create(output_path)?;
    write_results(
        file,
        outcomes.iter().filter_map(|(_, outcome)| outcome.as_ref().ok()),
    )?;

    let mut summary = BatchSummary {
        orders: outcomes.len(),
        packed_items: 0,
        rejected_items: 0,
        failed_orders: Vec::new(),
        elapsed_seconds,
    };
    for (order_number, outcome) in &outcomes {
        match outcome {
            Ok(result) => {
                summary.packed_items += result.packed_count();
                summary.rejected_items += result.rejected_count();
            }
            Err(err) => {
                error!(order = %order_number, %err, "order could not be packed");
                summary.failed_orders.push(order_number.clone());
            }
        }
    }

    info!(
        packed = summary.packed_items,
        rejected = summary.rejected_items,
        failed = summary.failed_orders.len(),
        elapsed_seconds,
        "batch finished"
    );
    Ok(summary)
}

/// Writes the result rows for the given order results.
///
/// One row per placed item, headed by [`RESULT_HEADER`]. Box dimensions are
/// the carton's normalised `(width, height, length)`; item dimensions are the
/// rotated ones.
pub fn write_results<'a, W: Write>(
    writer: W,
    results: impl Iterator<Item = &'a OrderResult>,
) -> Result<(), BatchError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(RESULT_HEADER)?;

    for result in results {
        for box_result in result.boxes() {
            let bx = box_result.box_definition();
            let (box_w, box_h, box_l) = bx.dimensions();
            for placement in box_result.positions() {
                let (item_w, item_h, item_l) = placement.dimensions();
                let (x, y, z) = placement.coordinates();
                csv_writer.write_record([
                    result.order_number().to_string(),
                    box_result.box_id().to_string(),
                    bx.container_type.clone(),
                    box_w.to_string(),
                    box_h.to_string(),
                    box_l.to_string(),
                    placement.product().item.clone(),
                    item_w.to_string(),
                    item_h.to_string(),
                    item_l.to_string(),
                    x.to_string(),
                    y.to_string(),
                    z.to_string(),
                ])?;
            }
        }
    }

    csv_writer.flush()?;
    Ok(())
}
