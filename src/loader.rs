//! Input readers for the packing service.
//!
//! Three inputs feed the engine: order lines (CSV), the item catalogue (CSV)
//! and the container catalogue (JSON). Order lines join the item catalogue on
//! the `ID` column; lines referencing unknown items are dropped with a
//! warning and processing continues.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::model::{BoxDefinition, Order, Product, ValidationError};

/// Error raised while reading or interpreting an input file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid container record: {0}")]
    Validation(#[from] ValidationError),
}

fn default_max_fill() -> f64 {
    80.0
}

fn default_min_fill() -> f64 {
    5.0
}

/// One record of the container catalogue.
///
/// Dimension order in the file does not matter; the `BoxDefinition`
/// constructor normalises it.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxRecord {
    pub length: f64,
    pub height: f64,
    pub width: f64,
    pub weight: f64,
    pub max_weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub container_type: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default = "default_max_fill")]
    pub max_fill_percentage: f64,
    #[serde(default = "default_min_fill")]
    pub min_fill_percentage: f64,
}

impl BoxRecord {
    pub fn into_definition(self) -> Result<BoxDefinition, ValidationError> {
        Ok(BoxDefinition::new(
            self.width,
            self.height,
            self.length,
            self.weight,
            self.max_weight,
            (self.min_fill_percentage, self.max_fill_percentage),
        )?
        .with_labels(self.description, self.container_type, self.remark))
    }
}

/// One order line of the order file. Unknown columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRecord {
    #[serde(rename = "Ordernr")]
    pub order_number: String,
    #[serde(rename = "Date")]
    pub date_time: String,
    #[serde(rename = "ID")]
    pub item_id: String,
    #[serde(rename = "Picked")]
    pub picked: u32,
    #[serde(rename = "Location")]
    pub location: String,
}

/// One record of the item catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Width")]
    pub width: f64,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Length")]
    pub length: f64,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "Fit ratio")]
    pub fit_ratio: f64,
}

/// Loads the container catalogue from a JSON file.
pub fn load_boxes(path: &Path) -> Result<Vec<BoxDefinition>, LoadError> {
    read_boxes(File::open(path)?)
}

/// Parses the container catalogue from any reader.
pub fn read_boxes(reader: impl Read) -> Result<Vec<BoxDefinition>, LoadError> {
    let records: Vec<BoxRecord> = serde_json::from_reader(reader)?;
    records
        .into_iter()
        .map(|record| record.into_definition().map_err(LoadError::from))
        .collect()
}

/// Loads order lines from a CSV file (UTF-8, optional BOM, header row).
pub fn load_order_lines(path: &Path) -> Result<Vec<OrderLineRecord>, LoadError> {
    read_order_lines(File::open(path)?)
}

/// Parses order lines from any reader.
pub fn read_order_lines(reader: impl Read) -> Result<Vec<OrderLineRecord>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut lines = Vec::new();
    for record in csv_reader.deserialize() {
        lines.push(record?);
    }
    Ok(lines)
}

/// Loads the item catalogue from a CSV file, keyed by item identifier.
pub fn load_product_catalog(path: &Path) -> Result<HashMap<String, ProductRecord>, LoadError> {
    read_product_catalog(File::open(path)?)
}

/// Parses the item catalogue from any reader.
pub fn read_product_catalog(
    reader: impl Read,
) -> Result<HashMap<String, ProductRecord>, LoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut catalog = HashMap::new();
    for record in csv_reader.deserialize() {
        let record: ProductRecord = record?;
        catalog.insert(record.id.clone(), record);
    }
    Ok(catalog)
}

/// Groups order lines into orders and joins them with the item catalogue.
///
/// Lines with the same `Ordernr` form one order, in first-seen order. Each
/// line is replicated `Picked` times. Lines referencing an unknown item or an
/// invalid catalogue record are dropped with a warning.
pub fn build_orders(
    lines: &[OrderLineRecord],
    catalog: &HashMap<String, ProductRecord>,
) -> Vec<Order> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut orders: Vec<Order> = Vec::new();

    for line in lines {
        let order_index = *index.entry(line.order_number.clone()).or_insert_with(|| {
            orders.push(Order::new(
                line.order_number.clone(),
                line.date_time.clone(),
            ));
            orders.len() - 1
        });

        let Some(record) = catalog.get(&line.item_id) else {
            warn!(
                item = %line.item_id,
                order = %line.order_number,
                "order line references an unknown item; line dropped"
            );
            continue;
        };

        if line.picked == 0 {
            warn!(
                item = %line.item_id,
                order = %line.order_number,
                "order line with zero picked quantity; line dropped"
            );
            continue;
        }

        for _ in 0..line.picked {
            match Product::new(
                record.width,
                record.height,
                record.length,
                record.weight,
                record.fit_ratio,
                line.item_id.clone(),
                line.location.clone(),
            ) {
                Ok(product) => orders[order_index].add_item(product),
                Err(err) => {
                    warn!(item = %line.item_id, %err, "invalid catalogue record; line dropped");
                    break;
                }
            }
        }
    }

    for order in &mut orders {
        order.order_items();
    }
    orders
}
