//! Data models for the order-packing engine.
//!
//! This module defines the domain structures the engine operates on:
//! - `Product`: an immutable item with dimensions, weight and fit ratio
//! - `BoxDefinition`: a carton type with normalised dimensions and fill bounds
//! - `Placement`: a product bound to coordinates and an orientation
//! - `Fragment`: an empty cuboid inside a packing layer
//! - `Order`: the pending/taken/rejected/packed item state machine

use std::cmp::Ordering;

use thiserror::Error;

use crate::rotation::RotationType;
use crate::types::{BoundingBox, Vec3};

/// Validation error for domain data.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid fit ratio: {0}")]
    InvalidFitRatio(String),
    #[error("Invalid fill bounds: {0}")]
    InvalidFillBounds(String),
}

/// Helper function to validate a single dimension.
fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_dimensions(dims: (f64, f64, f64)) -> Result<(), ValidationError> {
    validate_dimension(dims.0, "Width")?;
    validate_dimension(dims.1, "Height")?;
    validate_dimension(dims.2, "Length")?;
    Ok(())
}

/// Weights are grams and may be zero (an empty carton, a voucher item).
fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be non-negative, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// A physical product to be packed.
///
/// Dimensions are stored exactly as catalogued; the rotation model permutes
/// them on demand. Two products are considered the same product iff their
/// item identifiers match.
///
/// # Fields
/// * `width`, `height`, `length` - Original dimensions in cm
/// * `weight` - Weight in grams
/// * `fit_ratio` - Volume utilisation factor in percent, `(0, 100]`
/// * `item` - Opaque product identifier
/// * `location` - Opaque picking location
#[derive(Clone, Debug)]
pub struct Product {
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
    pub fit_ratio: f64,
    pub item: String,
    pub location: String,
}

impl Product {
    /// Creates a new product with validation.
    pub fn new(
        width: f64,
        height: f64,
        length: f64,
        weight: f64,
        fit_ratio: f64,
        item: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        validate_dimensions((width, height, length))?;
        validate_weight_value(weight, "Weight")?;
        if !(fit_ratio > 0.0 && fit_ratio <= 100.0) {
            return Err(ValidationError::InvalidFitRatio(format!(
                "Fit ratio must be in (0, 100], got: {}",
                fit_ratio
            )));
        }
        Ok(Self {
            width,
            height,
            length,
            weight,
            fit_ratio,
            item: item.into(),
            location: location.into(),
        })
    }

    /// Effective volume in cm³, shrunk by the fit ratio.
    pub fn volume(&self) -> f64 {
        self.width * self.height * self.length * (self.fit_ratio / 100.0)
    }

    /// Original dimensions as `(width, height, length)`.
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (self.width, self.height, self.length)
    }

    /// Smallest of the three original dimensions.
    pub fn min_dimension(&self) -> f64 {
        self.width.min(self.height).min(self.length)
    }

    /// Packing order comparator: sum of dimensions, then effective volume,
    /// then weight. Products with the same identifier compare equal.
    pub fn packing_cmp(&self, other: &Product) -> Ordering {
        if self.item == other.item {
            return Ordering::Equal;
        }

        let self_sum = self.width + self.height + self.length;
        let other_sum = other.width + other.height + other.length;

        self_sum
            .partial_cmp(&other_sum)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                self.volume()
                    .partial_cmp(&other.volume())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                self.weight
                    .partial_cmp(&other.weight)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}

/// A carton type available for packing.
///
/// The constructor permutes the dimensions so that `height ≥ width ≥ length`.
/// This normalisation keeps rotation and fit calculations consistent across
/// however the catalogue lists its measurements.
///
/// # Fields
/// * `width`, `height`, `length` - Inner dimensions in cm, normalised
/// * `weight` - Empty weight of the carton in grams
/// * `max_weight` - Maximum gross weight in grams, carton included
/// * `description` - Human-readable description
/// * `container_type` - Short type tag, e.g. `XXS`, `S`, `M`, `L`
/// * `remark` - Free-form remark
/// * `max_fill_percentage` / `min_fill_percentage` - Fill-ratio bounds
#[derive(Clone, Debug)]
pub struct BoxDefinition {
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub weight: f64,
    pub max_weight: f64,
    pub description: String,
    pub container_type: String,
    pub remark: String,
    pub max_fill_percentage: f64,
    pub min_fill_percentage: f64,
}

impl BoxDefinition {
    /// Creates a carton type, normalising the dimensions.
    ///
    /// `fill` carries `(min_fill_percentage, max_fill_percentage)`.
    pub fn new(
        width: f64,
        height: f64,
        length: f64,
        weight: f64,
        max_weight: f64,
        fill: (f64, f64),
    ) -> Result<Self, ValidationError> {
        validate_dimensions((width, height, length))?;
        validate_weight_value(weight, "Weight")?;
        validate_weight_value(max_weight, "Maximum weight")?;

        let (min_fill, max_fill) = fill;
        if !(0.0..=100.0).contains(&min_fill) || !(0.0..=100.0).contains(&max_fill) {
            return Err(ValidationError::InvalidFillBounds(format!(
                "Fill percentages must lie in [0, 100], got: {} / {}",
                min_fill, max_fill
            )));
        }
        if min_fill > max_fill {
            return Err(ValidationError::InvalidFillBounds(format!(
                "Minimum fill {} exceeds maximum fill {}",
                min_fill, max_fill
            )));
        }

        let mut sorted = [width, height, length];
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        Ok(Self {
            width: sorted[1],
            height: sorted[0],
            length: sorted[2],
            weight,
            max_weight,
            description: String::new(),
            container_type: String::new(),
            remark: String::new(),
            max_fill_percentage: max_fill,
            min_fill_percentage: min_fill,
        })
    }

    /// Attaches the descriptive fields of the catalogue record.
    pub fn with_labels(
        mut self,
        description: impl Into<String>,
        container_type: impl Into<String>,
        remark: impl Into<String>,
    ) -> Self {
        self.description = description.into();
        self.container_type = container_type.into();
        self.remark = remark.into();
        self
    }

    /// Normalised dimensions as `(width, height, length)`.
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (self.width, self.height, self.length)
    }

    /// Smallest contents volume this carton accepts.
    pub fn min_volume(&self) -> f64 {
        self.width * self.height * self.length * self.min_fill_percentage / 100.0
    }

    /// Largest contents volume this carton accepts.
    pub fn max_volume(&self) -> f64 {
        self.width * self.height * self.length * self.max_fill_percentage / 100.0
    }

    /// Net weight capacity available for contents.
    pub fn net_weight_capacity(&self) -> f64 {
        self.max_weight - self.weight
    }

    /// Checks volume and weight constraints for a whole order.
    ///
    /// The contents volume must lie between the fill bounds and the contents
    /// weight must not push the gross weight past `max_weight`.
    pub fn fits_within(&self, contents_volume: f64, contents_weight: f64) -> bool {
        self.min_volume() <= contents_volume
            && contents_volume <= self.max_volume()
            && contents_weight <= self.net_weight_capacity()
    }

    /// Checks whether dimensions fit in this carton in some orientation.
    ///
    /// Both triples are sorted descending and compared pairwise, so the
    /// largest extent is matched against the largest inner dimension.
    pub fn fits_with_dimensions(&self, dims: (f64, f64, f64)) -> bool {
        let mut product = [dims.0, dims.1, dims.2];
        let mut carton = [self.width, self.height, self.length];
        product.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        carton.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        product.iter().zip(carton.iter()).all(|(p, c)| p <= c)
    }
}

/// A product bound to coordinates and an orientation inside one carton.
///
/// Coordinates address the bottom-left-front corner of the product in carton
/// space. The rotated dimensions are cached and refreshed whenever the
/// orientation changes.
#[derive(Clone, Debug)]
pub struct Placement {
    product: Product,
    rotation: RotationType,
    position: (f64, f64, f64),
    rotated: (f64, f64, f64),
}

impl Placement {
    /// Creates a placement proposal for a product.
    pub fn new(product: Product, x: f64, y: f64, z: f64, rotation: RotationType) -> Self {
        let rotated = rotation.adjust_dimensions(product.width, product.height, product.length);
        Self {
            product,
            rotation,
            position: (x, y, z),
            rotated,
        }
    }

    /// The product being placed.
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Current orientation.
    pub fn rotation(&self) -> RotationType {
        self.rotation
    }

    /// Bottom-left-front corner in carton coordinates.
    pub fn coordinates(&self) -> (f64, f64, f64) {
        self.position
    }

    /// Dimensions after applying the current orientation.
    pub fn dimensions(&self) -> (f64, f64, f64) {
        self.rotated
    }

    /// Far corner of the bounding box, `position + rotated dimensions`.
    pub fn extending_point(&self) -> (f64, f64, f64) {
        (
            self.position.0 + self.rotated.0,
            self.position.1 + self.rotated.1,
            self.position.2 + self.rotated.2,
        )
    }

    /// Axis-aligned bounding box of the placement.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(
            Vec3::from_tuple(self.position),
            Vec3::from_tuple(self.rotated),
        )
    }

    /// Applies a new orientation and refreshes the cached dimensions.
    pub fn set_orientation(&mut self, rotation: RotationType) {
        self.rotation = rotation;
        self.rotated = rotation.adjust_dimensions(
            self.product.width,
            self.product.height,
            self.product.length,
        );
    }

    /// Moves the placement to new coordinates.
    pub fn set_coordinates(&mut self, x: f64, y: f64, z: f64) {
        self.position = (x, y, z);
    }

    /// A placement handed to the layer engine must carry defined coordinates.
    pub fn has_valid_coordinates(&self) -> bool {
        Vec3::from_tuple(self.position).is_finite()
    }
}

/// An empty cuboid inside a packing layer.
///
/// Fragments are created when a placement splits the surrounding space. The
/// `fresh` flag marks fragments produced by the most recent split; the layer
/// engine clears it on first inspection.
#[derive(Clone, Debug)]
pub struct Fragment {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub width: f64,
    pub height: f64,
    pub length: f64,
    pub fresh: bool,
}

impl Fragment {
    pub fn new(x: f64, y: f64, z: f64, width: f64, height: f64, length: f64) -> Self {
        Self {
            x,
            y,
            z,
            width,
            height,
            length,
            fresh: true,
        }
    }

    pub fn volume(&self) -> f64 {
        self.width * self.height * self.length
    }
}

impl PartialEq for Fragment {
    /// Fragments are equal when position and dimensions match; the `fresh`
    /// status does not participate.
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.z == other.z
            && self.width == other.width
            && self.height == other.height
            && self.length == other.length
    }
}

/// A customer order and the state of its items during packing.
///
/// Every item is in exactly one of four lists at any time:
/// - *pending*: waiting to be attempted
/// - *taken*: currently being attempted in a carton
/// - *rejected*: pushed back by the container engine
/// - *packed*: committed to a carton
#[derive(Clone, Debug)]
pub struct Order {
    order_number: String,
    date_time: String,
    items: Vec<Product>,
    taken_items: Vec<Product>,
    rejected_items: Vec<Product>,
    packed_items: Vec<Product>,
}

impl Order {
    pub fn new(order_number: impl Into<String>, date_time: impl Into<String>) -> Self {
        Self {
            order_number: order_number.into(),
            date_time: date_time.into(),
            items: Vec::new(),
            taken_items: Vec::new(),
            rejected_items: Vec::new(),
            packed_items: Vec::new(),
        }
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    #[allow(dead_code)]
    pub fn date_time(&self) -> &str {
        &self.date_time
    }

    /// Adds a single product to the pending list without re-sorting.
    pub fn add_item(&mut self, item: Product) {
        self.items.push(item);
    }

    /// Adds several products and re-sorts the pending list.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = Product>) {
        self.items.extend(items);
        self.order_items();
    }

    /// Sorts pending items descending by the packing comparator.
    ///
    /// The sort is stable, so items with equal keys keep their input order.
    pub fn order_items(&mut self) {
        self.items.sort_by(|a, b| b.packing_cmp(a));
    }

    /// Pending items in packing order.
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    /// Items currently being attempted.
    #[allow(dead_code)]
    pub fn taken_items(&self) -> &[Product] {
        &self.taken_items
    }

    /// Items pushed back by the container engine.
    #[allow(dead_code)]
    pub fn rejected_items(&self) -> &[Product] {
        &self.rejected_items
    }

    /// Items committed to a carton.
    #[allow(dead_code)]
    pub fn packed_items(&self) -> &[Product] {
        &self.packed_items
    }

    /// Moves the next pending item to the taken list and returns it.
    pub fn take_item(&mut self) -> Option<Product> {
        if self.items.is_empty() {
            return None;
        }
        let item = self.items.remove(0);
        self.taken_items.push(item.clone());
        Some(item)
    }

    /// Marks a product as rejected, removing it from taken or pending.
    pub fn add_rejected_item(&mut self, product: &Product) {
        let removed = if let Some(pos) = self
            .taken_items
            .iter()
            .position(|p| p.item == product.item)
        {
            self.taken_items.remove(pos)
        } else if let Some(pos) = self.items.iter().position(|p| p.item == product.item) {
            self.items.remove(pos)
        } else {
            product.clone()
        };
        self.rejected_items.push(removed);
    }

    /// Returns rejected items to pending and re-sorts.
    pub fn reset_rejected_items(&mut self) {
        self.items.append(&mut self.rejected_items);
        self.order_items();
    }

    /// Returns rejected and taken items to pending and re-sorts.
    pub fn reset_all_items(&mut self) {
        self.items.append(&mut self.rejected_items);
        self.items.append(&mut self.taken_items);
        self.order_items();
    }

    /// Finalises the current attempt: taken items become packed.
    pub fn secure_packed_items(&mut self) {
        self.packed_items.append(&mut self.taken_items);
    }

    /// Total effective volume of the pending items.
    pub fn total_volume(&self) -> f64 {
        self.items.iter().map(Product::volume).sum()
    }

    /// Total weight of the pending items in grams.
    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(|p| p.weight).sum()
    }

    /// Component-wise maximum dimensions across the pending items.
    pub fn max_dimensions(&self) -> (f64, f64, f64) {
        self.items.iter().fold((0.0, 0.0, 0.0), |acc, p| {
            (
                acc.0.max(p.width),
                acc.1.max(p.height),
                acc.2.max(p.length),
            )
        })
    }
}
