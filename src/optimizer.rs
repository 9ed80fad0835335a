//! Kernalgorithmus für das schichtbasierte Packen von Bestellungen.
//!
//! Dieses Modul implementiert die drei Ebenen des Packers:
//! - `LayerResult`: Best-Fit-Platzierung einzelner Produkte in einer Schicht
//!   unter sechs Rotationen, mit Fragmentverwaltung des freien Raums
//! - `BoxResult`: Schichtstapelung innerhalb eines Kartons samt Buchführung
//!   über zu große und übrig gebliebene Produkte
//! - `Packer`: Kartonauswahl je Bestellung, kleinster Karton zuerst, mit
//!   Eskalation auf den nächstgrößeren Karton bei Platzmangel

use std::cmp::Ordering;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::geometry::{OccupiedSpace, check_collision};
use crate::model::{BoxDefinition, Fragment, Order, Placement, Product};
use crate::rotation::RotationType;
use crate::types::BoundingBox;

/// Fehler, die eine Bestellung endgültig abbrechen.
///
/// Alle anderen Zustände (zu großes Produkt, kein passendes Fragment) sind
/// Buchführung auf dem jeweiligen `BoxResult` und lösen höchstens eine
/// Eskalation auf einen größeren Karton aus.
#[derive(Debug, Error)]
pub enum PackError {
    /// Selbst der größte Karton des Katalogs kann mindestens ein Produkt der
    /// Bestellung in keiner Ausrichtung aufnehmen.
    #[error("no catalogue container can hold every item of order {order}")]
    NoFittingContainer { order: String },
    /// Eine Platzierung wurde mit undefinierten Koordinaten an die
    /// Schicht-Engine übergeben. Programmierfehler.
    #[error("placement for item {item} carries undefined coordinates")]
    InvalidPlacementCoordinates { item: String },
}

/// Grund, aus dem ein Produkt von einem Karton abgewiesen wurde.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Das Produkt passt in keiner Ausrichtung in den Karton.
    Oversized,
    /// Das Produkt passt grundsätzlich, aber kein Fragment bietet Platz.
    NoSpace,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::Oversized => "oversized",
            RejectReason::NoSpace => "no_space",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Oversized => {
                write!(f, "Produkt passt in keiner Ausrichtung in den Karton")
            }
            RejectReason::NoSpace => {
                write!(f, "Kein freies Fragment bietet Platz für das Produkt")
            }
        }
    }
}

/// Ereignisse während des Packens, geeignet für Live-Visualisierung per SSE.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Eine Bestellung wird begonnen.
    OrderStarted {
        order_number: String,
        pending_items: usize,
    },
    /// Ein Karton wurde für die Bestellung festgeschrieben.
    ContainerStarted {
        order_number: String,
        box_id: u64,
        container_type: String,
        description: String,
        dims: (f64, f64, f64),
        max_weight: f64,
    },
    /// Ein Produkt wurde platziert.
    ItemPlaced {
        order_number: String,
        box_id: u64,
        item: String,
        rotation: &'static str,
        dims: (f64, f64, f64),
        position: (f64, f64, f64),
    },
    /// Ein Produkt wurde endgültig abgewiesen.
    ItemRejected {
        order_number: String,
        item: String,
        reason_code: &'static str,
        reason_text: String,
    },
    /// Eine Bestellung ist abgeschlossen.
    OrderFinished {
        order_number: String,
        containers: usize,
        packed: usize,
        rejected: usize,
    },
    /// Alle Bestellungen eines Auftrags sind abgeschlossen.
    Finished { orders: usize, failed: usize },
}

/// Prüft, ob das Innere eines Fragments die Hüllbox einer Platzierung schneidet.
///
/// Die Intervalle sind offen; bloßes Berühren von Flächen zählt nicht.
fn fragment_intersects(space: &Fragment, bounds: &BoundingBox) -> bool {
    bounds.min.x < space.x + space.width
        && bounds.max.x > space.x
        && bounds.min.y < space.y + space.height
        && bounds.max.y > space.y
        && bounds.min.z < space.z + space.length
        && bounds.max.z > space.z
}

/// Zerteilt ein Fragment in bis zu sechs Platten um eine Platzierung herum.
///
/// Je Halbraum (`-x`, `+x`, `-y`, `+y`, `-z`, `+z`) entsteht eine Platte mit
/// der vollen Ausdehnung des Fragments auf den übrigen Achsen. Die Platten
/// überlappen sich dadurch; das ist gewollt, weil sie ausschließlich leeren
/// Raum beschreiben und die Kollisionsprüfung die endgültige Instanz bleibt.
/// Platten mit nicht-positiver Ausdehnung werden verworfen.
fn split_space_around_product(space: &Fragment, bounds: &BoundingBox) -> Vec<Fragment> {
    let slabs = [
        Fragment::new(
            space.x,
            space.y,
            space.z,
            bounds.min.x - space.x,
            space.height,
            space.length,
        ),
        Fragment::new(
            bounds.max.x,
            space.y,
            space.z,
            space.x + space.width - bounds.max.x,
            space.height,
            space.length,
        ),
        Fragment::new(
            space.x,
            space.y,
            space.z,
            space.width,
            bounds.min.y - space.y,
            space.length,
        ),
        Fragment::new(
            space.x,
            bounds.max.y,
            space.z,
            space.width,
            space.y + space.height - bounds.max.y,
            space.length,
        ),
        Fragment::new(
            space.x,
            space.y,
            space.z,
            space.width,
            space.height,
            bounds.min.z - space.z,
        ),
        Fragment::new(
            space.x,
            space.y,
            bounds.max.z,
            space.width,
            space.height,
            space.z + space.length - bounds.max.z,
        ),
    ];

    slabs
        .into_iter()
        .filter(|slab| slab.width > 0.0 && slab.height > 0.0 && slab.length > 0.0)
        .collect()
}

/// Eine horizontale Packschicht innerhalb eines Kartons.
///
/// Die Schicht verwaltet ihre freien Fragmente selbst: Sie beginnt mit einem
/// einzigen Fragment über den gesamten verbleibenden Kartonraum und zerteilt
/// bei jeder Platzierung alle geschnittenen Fragmente.
#[derive(Clone, Debug)]
pub struct LayerResult {
    base_height: f64,
    positions: Vec<Placement>,
    remaining_spaces: Vec<Fragment>,
    /// Fragment der letzten Platzierung. Wird bei einem Produktwechsel aus der
    /// Kandidatenliste ausgeschlossen: Es war die engste Stelle für das
    /// vorherige Produkt und taugt selten für ein anderes.
    last_space: Option<Fragment>,
    /// Artikelkennung der letzten Platzierung.
    last_product: Option<String>,
}

impl LayerResult {
    /// Erzeugt eine neue Schicht ab `base_height` im Karton.
    pub fn new(bx: &BoxDefinition, base_height: f64) -> Self {
        Self {
            base_height,
            positions: Vec::new(),
            remaining_spaces: vec![Fragment::new(
                0.0,
                base_height,
                0.0,
                bx.width,
                bx.height - base_height,
                bx.length,
            )],
            last_space: None,
            last_product: None,
        }
    }

    /// Basis der Schicht auf der y-Achse.
    #[allow(dead_code)]
    pub fn base_height(&self) -> f64 {
        self.base_height
    }

    /// Festgeschriebene Platzierungen der Schicht.
    pub fn positions(&self) -> &[Placement] {
        &self.positions
    }

    /// Aktuelle Liste der freien Fragmente.
    #[allow(dead_code)]
    pub fn remaining_spaces(&self) -> &[Fragment] {
        &self.remaining_spaces
    }

    /// Wirksame Höhe der Schicht: die enge Hülle ihrer Platzierungen.
    ///
    /// Neue Schichten werden oberhalb dieser Hülle angesetzt, nicht oberhalb
    /// des bei Erzeugung reservierten Resthöhenbereichs.
    pub fn layer_height(&self) -> f64 {
        self.positions
            .iter()
            .map(|p| p.coordinates().1 + p.dimensions().1 - self.base_height)
            .fold(0.0, f64::max)
    }

    /// Versucht, ein Produkt in dieser Schicht zu platzieren.
    ///
    /// Ablauf je Kandidatenfragment (sortiert nach `y`, dann `(z, x)`):
    /// sechs Rotationen ab der Anfangsrotation durchprobieren, Kandidaten
    /// an der Fragmentecke verankern, Karton- und Kollisionsprüfung, dann
    /// Bewertung über den planaren Verschnitt
    /// `(fragment.width − w′) · (fragment.length − l′)`. Innerhalb des ersten
    /// Fragments, das überhaupt eine gültige Rotation zulässt, gewinnt der
    /// kleinste Verschnitt; bei Gleichstand die zuerst besuchte Rotation.
    ///
    /// # Parameter
    /// * `bx` - Der Karton, dem die Schicht gehört
    /// * `candidate` - Produkt mit vorgeschlagener Position und Rotation
    /// * `existing` - Hüllboxen aller bereits festgeschriebenen Platzierungen
    /// * `reverse_y` - Fragmente von oben nach unten durchlaufen
    ///
    /// # Rückgabewert
    /// `true`, wenn das Produkt platziert wurde; bei `false` bleibt die
    /// Schicht unverändert.
    pub fn add_product(
        &mut self,
        bx: &BoxDefinition,
        candidate: &Placement,
        existing: &[OccupiedSpace],
        reverse_y: bool,
    ) -> bool {
        // Winzige Einzelstück-Kartons: Geometrie ist trivial erfüllt, der
        // Kandidat wird unverändert übernommen.
        if bx.container_type == "XXS" {
            self.positions.push(candidate.clone());
            return true;
        }

        let product = candidate.product();
        let (pw, ph, pl) = product.dimensions();
        let min_dim = product.min_dimension();

        // Frische Fragmente zuerst besuchen, Flag dabei löschen, zu kleine
        // Fragmente über das Volumen aussortieren.
        let mut visit: Vec<usize> = (0..self.remaining_spaces.len()).collect();
        visit.sort_by_key(|&i| !self.remaining_spaces[i].fresh);

        let mut kept: Vec<usize> = Vec::new();
        for i in visit {
            let fragment = &mut self.remaining_spaces[i];
            fragment.fresh = false;
            if fragment.volume() >= product.volume() {
                kept.push(i);
            }
        }

        kept.sort_by(|&a, &b| {
            let fa = &self.remaining_spaces[a];
            let fb = &self.remaining_spaces[b];
            fa.z
                .partial_cmp(&fb.z)
                .unwrap_or(Ordering::Equal)
                .then_with(|| fa.x.partial_cmp(&fb.x).unwrap_or(Ordering::Equal))
        });

        // Heuristisches Gedächtnis: bei Produktwechsel das zuletzt benutzte
        // Fragment ausschließen.
        if self
            .last_product
            .as_deref()
            .is_some_and(|last| last != product.item.as_str())
        {
            if let Some(last_space) = self.last_space.clone() {
                if let Some(pos) = kept
                    .iter()
                    .position(|&i| self.remaining_spaces[i] == last_space)
                {
                    kept.remove(pos);
                    self.last_space = None;
                }
            }
        }

        if reverse_y {
            kept.sort_by(|&a, &b| {
                self.remaining_spaces[b]
                    .y
                    .partial_cmp(&self.remaining_spaces[a].y)
                    .unwrap_or(Ordering::Equal)
            });
        } else {
            kept.sort_by(|&a, &b| {
                self.remaining_spaces[a]
                    .y
                    .partial_cmp(&self.remaining_spaces[b].y)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let mut best: Option<(Placement, f64, usize)> = None;

        for &space_index in &kept {
            if best.is_some() {
                break;
            }
            let space = self.remaining_spaces[space_index].clone();
            let mut rotation = RotationType::initial_rotation(pw, ph, pl);

            for step in 0..RotationType::ALL.len() {
                if step > 0 {
                    rotation = rotation.next();
                }
                let (rw, rh, rl) = rotation.adjust_dimensions(pw, ph, pl);
                if rw > space.width || rh > space.height || rl > space.length {
                    continue;
                }

                let mut trial = candidate.clone();
                trial.set_orientation(rotation);
                trial.set_coordinates(space.x, space.y, space.z);

                let (end_x, end_y, end_z) = trial.extending_point();
                if end_x > bx.width || end_y > bx.height || end_z > bx.length {
                    continue;
                }
                // Entartete Platzierung direkt unter dem Kartondeckel.
                if space.y + min_dim > bx.height {
                    break;
                }
                if check_collision(&trial, existing) {
                    continue;
                }

                let fragmentation = (space.width - rw) * (space.length - rl);
                if best
                    .as_ref()
                    .is_none_or(|(_, score, _)| fragmentation < *score)
                {
                    best = Some((trial, fragmentation, space_index));
                }
            }
        }

        match best {
            Some((placement, score, space_index)) => {
                debug!(
                    item = %placement.product().item,
                    position = ?placement.coordinates(),
                    rotation = placement.rotation().label(),
                    score,
                    "product committed to layer"
                );
                self.last_space = Some(self.remaining_spaces[space_index].clone());
                self.last_product = Some(placement.product().item.clone());
                self.update_remaining_spaces(&placement);
                self.positions.push(placement);
                true
            }
            None => false,
        }
    }

    /// Zerteilt nach einer Platzierung alle geschnittenen Fragmente.
    ///
    /// Nicht geschnittene Fragmente bleiben unverändert erhalten.
    fn update_remaining_spaces(&mut self, placement: &Placement) {
        let bounds = placement.bounding_box();
        let previous = std::mem::take(&mut self.remaining_spaces);
        let mut updated = Vec::with_capacity(previous.len() + 5);

        for space in previous {
            if fragment_intersects(&space, &bounds) {
                updated.extend(split_space_around_product(&space, &bounds));
            } else {
                updated.push(space);
            }
        }

        debug!(
            item = %placement.product().item,
            fragments = updated.len(),
            "remaining spaces updated"
        );
        self.remaining_spaces = updated;
    }
}

/// Ergebnis des Packens einer Bestellung in genau einen Karton.
#[derive(Clone, Debug)]
pub struct BoxResult {
    bx: BoxDefinition,
    box_id: u64,
    layers: Vec<LayerResult>,
    oversized_products: Vec<Product>,
    leftover_products: Vec<Product>,
}

impl BoxResult {
    /// Erzeugt ein leeres Packergebnis über einem Kartontyp.
    ///
    /// Die `box_id` wird bei Erzeugung vergeben und bleibt stabil; sie
    /// identifiziert den Karton in Ausgabezeilen und Ereignissen.
    pub fn new(bx: BoxDefinition, box_id: u64) -> Self {
        Self {
            bx,
            box_id,
            layers: Vec::new(),
            oversized_products: Vec::new(),
            leftover_products: Vec::new(),
        }
    }

    pub fn box_definition(&self) -> &BoxDefinition {
        &self.bx
    }

    pub fn box_id(&self) -> u64 {
        self.box_id
    }

    pub fn layers(&self) -> &[LayerResult] {
        &self.layers
    }

    /// Produkte, die in keiner Ausrichtung in diesen Karton passen.
    pub fn oversized_products(&self) -> &[Product] {
        &self.oversized_products
    }

    /// Produkte, die grundsätzlich passen, für die aber kein Platz blieb.
    pub fn leftover_products(&self) -> &[Product] {
        &self.leftover_products
    }

    /// Alle festgeschriebenen Platzierungen, Schichten in Entstehungsreihenfolge.
    pub fn positions(&self) -> impl Iterator<Item = &Placement> + '_ {
        self.layers.iter().flat_map(|layer| layer.positions().iter())
    }

    /// Anzahl festgeschriebener Platzierungen.
    pub fn placement_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.positions().len()).sum()
    }

    /// Nettogewicht aller festgeschriebenen Produkte in Gramm.
    pub fn packed_weight(&self) -> f64 {
        self.positions().map(|p| p.product().weight).sum()
    }

    /// Entfernt die Vormerkungen zu große Produkte nach einem Commit.
    ///
    /// Die Produkte selbst liegen zu diesem Zeitpunkt in der Rückweisungsliste
    /// der Bestellung und werden mit dem nächsten Karton erneut versucht.
    fn clear_oversized(&mut self) {
        self.oversized_products.clear();
    }

    /// Packt alle offenen Produkte der Bestellung in diesen Karton.
    ///
    /// Produkte, die nicht untergebracht werden können, werden auf der
    /// Bestellung als zurückgewiesen vermerkt und hier als `oversized` oder
    /// `leftover` gebucht.
    pub fn pack_products_by_order(&mut self, order: &mut Order) -> Result<(), PackError> {
        order.order_items();

        while let Some(product) = order.take_item() {
            if !self.add_product_to_box(product.clone())? {
                warn!(
                    item = %product.item,
                    container_type = %self.bx.container_type,
                    "product could not be packed into the carton"
                );
                order.add_rejected_item(&product);
            }
        }

        Ok(())
    }

    /// Prüft über absteigend sortierte Abmessungen, ob das Produkt den Karton
    /// in jeder Ausrichtung sprengt.
    pub fn product_is_oversized(&self, product: &Product) -> bool {
        !self.bx.fits_with_dimensions(product.dimensions())
    }

    /// Versucht, ein einzelnes Produkt unterzubringen.
    ///
    /// Reihenfolge: Übergrößen- und Gewichtsprüfung, dann alle vorhandenen
    /// Schichten in Entstehungsreihenfolge, zuletzt eine neue Schicht oberhalb
    /// der bestehenden.
    ///
    /// # Rückgabewert
    /// `Ok(true)` bei Platzierung, `Ok(false)` wenn das Produkt gebucht, aber
    /// nicht untergebracht wurde.
    fn add_product_to_box(&mut self, product: Product) -> Result<bool, PackError> {
        if self.product_is_oversized(&product) {
            warn!(item = %product.item, "product is too large for the carton");
            self.oversized_products.push(product);
            return Ok(false);
        }

        let net_capacity = self.bx.net_weight_capacity();
        if product.weight > net_capacity {
            // Kann alleine nie getragen werden; zählt wie eine Übergröße.
            warn!(item = %product.item, "product alone exceeds the carton weight capacity");
            self.oversized_products.push(product);
            return Ok(false);
        }
        if self.packed_weight() + product.weight > net_capacity {
            warn!(item = %product.item, "carton weight capacity exhausted");
            self.leftover_products.push(product);
            return Ok(false);
        }

        let existing = self.collect_existing_coordinates();
        let rotation =
            RotationType::initial_rotation(product.width, product.height, product.length);
        let candidate = Placement::new(product.clone(), 0.0, 0.0, 0.0, rotation);

        for (index, layer) in self.layers.iter_mut().enumerate() {
            if layer.add_product(&self.bx, &candidate, &existing, false) {
                debug!(item = %product.item, layer = index + 1, "product placed in existing layer");
                return Ok(true);
            }
        }

        if self.add_new_layer(&candidate, &existing)? {
            debug!(item = %product.item, "product placed in a new layer");
            return Ok(true);
        }

        self.leftover_products.push(product);
        Ok(false)
    }

    /// Legt eine neue Schicht oberhalb der engen Hülle der bestehenden an und
    /// versucht die Platzierung dort.
    ///
    /// Scheitert die Platzierung, wird die Schicht verworfen.
    fn add_new_layer(
        &mut self,
        candidate: &Placement,
        existing: &[OccupiedSpace],
    ) -> Result<bool, PackError> {
        if !candidate.has_valid_coordinates() {
            error!(item = %candidate.product().item, "placement carries undefined coordinates");
            return Err(PackError::InvalidPlacementCoordinates {
                item: candidate.product().item.clone(),
            });
        }

        let base_height: f64 = self.layers.iter().map(LayerResult::layer_height).sum();
        let remaining_height = self.bx.height - base_height;

        if remaining_height >= candidate.product().min_dimension() {
            let mut layer = LayerResult::new(&self.bx, base_height);
            if layer.add_product(&self.bx, candidate, existing, false) {
                self.layers.push(layer);
                return Ok(true);
            }
        }

        warn!(
            item = %candidate.product().item,
            remaining_height,
            "no room for a new layer"
        );
        Ok(false)
    }

    /// Sammelt die Hüllboxen aller Platzierungen für die Kollisionsprüfung.
    fn collect_existing_coordinates(&self) -> Vec<OccupiedSpace> {
        self.positions().map(OccupiedSpace::from_placement).collect()
    }
}

/// Packergebnis einer kompletten Bestellung über alle benutzten Kartons.
#[derive(Clone, Debug)]
pub struct OrderResult {
    order_number: String,
    boxes: Vec<BoxResult>,
}

impl OrderResult {
    pub fn new(order_number: impl Into<String>) -> Self {
        Self {
            order_number: order_number.into(),
            boxes: Vec::new(),
        }
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn add_box(&mut self, box_result: BoxResult) {
        self.boxes.push(box_result);
    }

    pub fn boxes(&self) -> &[BoxResult] {
        &self.boxes
    }

    /// Anzahl aller Platzierungen über alle Kartons.
    pub fn packed_count(&self) -> usize {
        self.boxes.iter().map(BoxResult::placement_count).sum()
    }

    /// Endgültig zurückgewiesene Produkte (nur auf dem letzten Karton möglich).
    pub fn rejected_products(&self) -> impl Iterator<Item = &Product> + '_ {
        self.boxes
            .iter()
            .flat_map(|b| b.leftover_products().iter())
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected_products().count()
    }
}

/// Steuert die Kartonauswahl und die Eskalationsschleife je Bestellung.
#[derive(Debug)]
pub struct Packer {
    next_box_id: u64,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new()
    }
}

impl Packer {
    pub fn new() -> Self {
        Self { next_box_id: 1 }
    }

    fn allocate_box_id(&mut self) -> u64 {
        let id = self.next_box_id;
        self.next_box_id += 1;
        id
    }

    /// Wählt den Startkarton für den aktuellen Bestand der Bestellung.
    ///
    /// Der Katalog wird aufsteigend nach maximalem Inhaltsvolumen durchlaufen.
    /// Kartons, deren Beschreibung `Undersized` oder `Multi` enthält, werden
    /// übersprungen. Bei gesetztem `last` kommen nur noch strikt größere
    /// Kartons in Frage. Unterschreitet die Bestellung ab dem dritten
    /// Kandidaten jede Mindestfüllung, fällt die Wahl per Konvention auf den
    /// kleinsten Karton des Katalogs.
    ///
    /// # Rückgabewert
    /// Index in `sorted_boxes`, oder `None`, wenn der Katalog keinen
    /// verwendbaren Karton enthält.
    fn initial_box_selection(
        order: &Order,
        sorted_boxes: &[BoxDefinition],
        last: Option<usize>,
    ) -> Option<usize> {
        let total_volume = order.total_volume();
        let total_weight = order.total_weight();

        if let Some(last_index) = last {
            if last_index + 1 == sorted_boxes.len() {
                return Some(last_index);
            }
        }

        let mut ignore: i32 = 2;
        let mut fallback: Option<usize> = None;
        let dimensions = order.max_dimensions();

        for (index, bx) in sorted_boxes.iter().enumerate() {
            ignore -= 1;

            if bx.description.contains("Undersized") || bx.description.contains("Multi") {
                continue;
            }

            fallback = Some(index);

            if let Some(last_index) = last {
                if bx.max_volume() <= sorted_boxes[last_index].max_volume() {
                    continue;
                }
            }

            if bx.max_volume() > 1.0 {
                if bx.fits_within(total_volume, total_weight) {
                    if bx.fits_with_dimensions(dimensions) {
                        return Some(index);
                    }
                } else if ignore == 0 && last.is_none() && total_volume < bx.min_volume() {
                    // Die Bestellung ist so klein, dass keine Mindestfüllung
                    // erreichbar ist: Konvention ist der kleinste Karton.
                    return Some(0);
                }
            }
        }

        fallback
    }

    /// Packt eine Bestellung; Kurzform ohne Ereignisse.
    pub fn pack_order(
        &mut self,
        order: &mut Order,
        available_boxes: &[BoxDefinition],
    ) -> Result<OrderResult, PackError> {
        self.pack_order_with_progress(order, available_boxes, |_| {})
    }

    /// Packt eine Bestellung und meldet jeden Schritt über `on_event`.
    ///
    /// Ablauf je Runde: Karton wählen, Bestellung hineinpacken, dann
    /// - bei leerer Leftover-Liste festschreiben und zu große Produkte über
    ///   die Rückweisungsliste erneut anbieten,
    /// - beim größten Karton festschreiben und Leftover endgültig abweisen,
    /// - andernfalls alles zurückrollen und auf den nächstgrößeren Karton
    ///   eskalieren.
    ///
    /// Meldet `NoFittingContainer`, wenn der größte Karton ein Produkt in
    /// keiner Ausrichtung aufnehmen kann.
    pub fn pack_order_with_progress(
        &mut self,
        order: &mut Order,
        available_boxes: &[BoxDefinition],
        mut on_event: impl FnMut(&PackEvent),
    ) -> Result<OrderResult, PackError> {
        let mut sorted_boxes = available_boxes.to_vec();
        sorted_boxes.sort_by(|a, b| {
            a.max_volume()
                .partial_cmp(&b.max_volume())
                .unwrap_or(Ordering::Equal)
        });

        let order_number = order.order_number().to_string();
        let mut result = OrderResult::new(order_number.clone());

        on_event(&PackEvent::OrderStarted {
            order_number: order_number.clone(),
            pending_items: order.items().len(),
        });

        if order.items().is_empty() {
            on_event(&PackEvent::OrderFinished {
                order_number,
                containers: 0,
                packed: 0,
                rejected: 0,
            });
            return Ok(result);
        }

        if sorted_boxes.is_empty() {
            return Err(PackError::NoFittingContainer {
                order: order_number,
            });
        }

        let mut last: Option<usize> = None;

        loop {
            let selected = Self::initial_box_selection(order, &sorted_boxes, last).ok_or_else(
                || PackError::NoFittingContainer {
                    order: order_number.clone(),
                },
            )?;
            let is_last = selected + 1 == sorted_boxes.len() || last == Some(selected);

            let mut box_result =
                BoxResult::new(sorted_boxes[selected].clone(), self.allocate_box_id());
            box_result.pack_products_by_order(order)?;

            if is_last && !box_result.oversized_products().is_empty() {
                for product in box_result.oversized_products() {
                    on_event(&PackEvent::ItemRejected {
                        order_number: order_number.clone(),
                        item: product.item.clone(),
                        reason_code: RejectReason::Oversized.code(),
                        reason_text: RejectReason::Oversized.to_string(),
                    });
                }
                return Err(PackError::NoFittingContainer {
                    order: order_number,
                });
            }

            if box_result.placement_count() == 0 {
                if is_last {
                    return Err(PackError::NoFittingContainer {
                        order: order_number,
                    });
                }
                // Gar nichts hat gepasst; wie ein Fehlversuch behandeln.
                order.reset_all_items();
                last = Some(selected);
                continue;
            }

            if box_result.leftover_products().is_empty() {
                order.secure_packed_items();
                box_result.clear_oversized();
                order.reset_rejected_items();
                emit_box_events(&order_number, &box_result, &mut on_event);
                result.add_box(box_result);
                last = None;
                if order.items().is_empty() {
                    break;
                }
            } else if is_last {
                // Keine Eskalation mehr möglich: Leftover sind endgültig.
                order.secure_packed_items();
                for product in box_result.leftover_products() {
                    on_event(&PackEvent::ItemRejected {
                        order_number: order_number.clone(),
                        item: product.item.clone(),
                        reason_code: RejectReason::NoSpace.code(),
                        reason_text: RejectReason::NoSpace.to_string(),
                    });
                }
                emit_box_events(&order_number, &box_result, &mut on_event);
                result.add_box(box_result);
                break;
            } else {
                order.reset_all_items();
                last = Some(selected);
            }
        }

        on_event(&PackEvent::OrderFinished {
            order_number,
            containers: result.boxes().len(),
            packed: result.packed_count(),
            rejected: result.rejected_count(),
        });

        Ok(result)
    }
}

/// Meldet einen festgeschriebenen Karton samt aller Platzierungen.
fn emit_box_events(
    order_number: &str,
    box_result: &BoxResult,
    on_event: &mut impl FnMut(&PackEvent),
) {
    let bx = box_result.box_definition();
    on_event(&PackEvent::ContainerStarted {
        order_number: order_number.to_string(),
        box_id: box_result.box_id(),
        container_type: bx.container_type.clone(),
        description: bx.description.clone(),
        dims: bx.dimensions(),
        max_weight: bx.max_weight,
    });

    for placement in box_result.positions() {
        on_event(&PackEvent::ItemPlaced {
            order_number: order_number.to_string(),
            box_id: box_result.box_id(),
            item: placement.product().item.clone(),
            rotation: placement.rotation().label(),
            dims: placement.dimensions(),
            position: placement.coordinates(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;

    fn carton(
        dims: (f64, f64, f64),
        weight: f64,
        max_weight: f64,
        fill: (f64, f64),
        container_type: &str,
        description: &str,
    ) -> BoxDefinition {
        BoxDefinition::new(dims.0, dims.1, dims.2, weight, max_weight, fill)
            .unwrap()
            .with_labels(description, container_type, "")
    }

    fn product(item: &str, dims: (f64, f64, f64), weight: f64) -> Product {
        Product::new(dims.0, dims.1, dims.2, weight, 100.0, item, "06C01").unwrap()
    }

    fn order_with(items: Vec<Product>) -> Order {
        let mut order = Order::new("NMR230201", "2024-02-09");
        order.add_items(items);
        order
    }

    /// Keine zwei Platzierungen im selben Karton überlappen sich.
    fn assert_no_overlaps(box_result: &BoxResult) {
        let placements: Vec<&Placement> = box_result.positions().collect();
        for (i, a) in placements.iter().enumerate() {
            for b in placements.iter().skip(i + 1) {
                assert!(
                    !a.bounding_box().intersects(&b.bounding_box()),
                    "Platzierungen {} und {} überlappen sich",
                    a.product().item,
                    b.product().item
                );
            }
        }
    }

    /// Jede Platzierung liegt vollständig im Karton.
    fn assert_inside_bounds(box_result: &BoxResult) {
        let (bw, bh, bl) = box_result.box_definition().dimensions();
        for placement in box_result.positions() {
            let (x, y, z) = placement.coordinates();
            let (ex, ey, ez) = placement.extending_point();
            assert!(x >= 0.0 && y >= 0.0 && z >= 0.0);
            assert!(
                ex <= bw && ey <= bh && ez <= bl,
                "Platzierung {} ragt aus dem Karton",
                placement.product().item
            );
        }
    }

    /// Rotierte Abmessungen sind eine Permutation der Originalabmessungen.
    fn assert_rotation_soundness(box_result: &BoxResult) {
        for placement in box_result.positions() {
            let (rw, rh, rl) = placement.dimensions();
            let mut rotated = [rw, rh, rl];
            let (w, h, l) = placement.product().dimensions();
            let mut original = [w, h, l];
            rotated.sort_by(|a, b| a.partial_cmp(b).unwrap());
            original.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(rotated, original);
        }
    }

    /// Das Nettogewicht überschreitet die Traglast nicht.
    fn assert_weight_bound(box_result: &BoxResult) {
        assert!(
            box_result.packed_weight() <= box_result.box_definition().net_weight_capacity()
        );
    }

    fn assert_all_invariants(box_result: &BoxResult) {
        assert_no_overlaps(box_result);
        assert_inside_bounds(box_result);
        assert_rotation_soundness(box_result);
        assert_weight_bound(box_result);
    }

    #[test]
    fn degenerate_xxs_accepts_item_at_origin() {
        let xxs = carton((1.0, 1.0, 1.0), 0.0, 1000.0, (0.0, 100.0), "XXS", "Tiny");
        let mut order = order_with(vec![product("small", (1.0, 1.0, 1.0), 1.0)]);

        let mut packer = Packer::new();
        let result = packer.pack_order(&mut order, &[xxs]).unwrap();

        assert_eq!(result.boxes().len(), 1);
        let placements: Vec<&Placement> = result.boxes()[0].positions().collect();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].coordinates(), (0.0, 0.0, 0.0));
        assert_eq!(placements[0].dimensions(), (1.0, 1.0, 1.0));
        assert_eq!(placements[0].rotation(), RotationType::RT1);
        assert_eq!(order.packed_items().len(), 1);
    }

    #[test]
    fn single_item_lands_in_large_carton() {
        // Der kleine Karton kann das Produkt nie aufnehmen; die Bestellung
        // landet im großen Karton und wird bei (0,0,0) festgeschrieben.
        let small = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (5.0, 80.0), "S", "Small");
        let large = carton((200.0, 200.0, 200.0), 0.0, 50_000.0, (5.0, 80.0), "L", "Large");
        let mut order = order_with(vec![product("bulky", (150.0, 150.0, 150.0), 500.0)]);

        let mut packer = Packer::new();
        let result = packer.pack_order(&mut order, &[small, large]).unwrap();

        assert_eq!(result.boxes().len(), 1);
        let box_result = &result.boxes()[0];
        assert_eq!(box_result.box_definition().container_type, "L");
        let placements: Vec<&Placement> = box_result.positions().collect();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].coordinates(), (0.0, 0.0, 0.0));
        assert_eq!(order.packed_items().len(), 1);
        assert_all_invariants(box_result);
    }

    #[test]
    fn leftover_escalates_to_next_larger_carton() {
        // Zwei Produkte bestehen die Volumenprüfung des kleinen Kartons,
        // passen dort aber geometrisch nicht zusammen: Rollback und
        // Eskalation auf den großen Karton.
        let small = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "S", "Small");
        let large = carton((200.0, 200.0, 200.0), 0.0, 50_000.0, (5.0, 80.0), "L", "Large");
        let mut order = order_with(vec![
            product("big", (90.0, 90.0, 90.0), 100.0),
            product("cube", (30.0, 30.0, 30.0), 50.0),
        ]);

        let mut packer = Packer::new();
        let result = packer.pack_order(&mut order, &[small, large]).unwrap();

        assert_eq!(result.boxes().len(), 1, "erwartet genau einen Karton");
        let box_result = &result.boxes()[0];
        assert_eq!(box_result.box_definition().container_type, "L");
        assert_eq!(box_result.placement_count(), 2);
        assert_eq!(order.packed_items().len(), 2);
        assert!(order.rejected_items().is_empty());
        assert_all_invariants(box_result);
    }

    #[test]
    fn space_splitting_after_two_placements() {
        let medium = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "M", "Medium");
        let mut order = order_with(vec![
            product("A", (50.0, 50.0, 50.0), 10.0),
            product("B", (25.0, 25.0, 25.0), 10.0),
        ]);

        let mut packer = Packer::new();
        let result = packer.pack_order(&mut order, &[medium]).unwrap();

        let box_result = &result.boxes()[0];
        assert_eq!(box_result.placement_count(), 2);
        let placements: Vec<&Placement> = box_result.positions().collect();
        assert_eq!(placements[0].product().item, "A");
        assert_eq!(placements[0].coordinates(), (0.0, 0.0, 0.0));
        assert_ne!(placements[1].coordinates(), (0.0, 0.0, 0.0));
        assert_no_overlaps(box_result);

        let fragments = box_result.layers()[0].remaining_spaces();
        assert!(
            fragments.len() >= 5,
            "erwartet mindestens 5 Fragmente, gefunden {}",
            fragments.len()
        );
        for fragment in fragments {
            assert!(fragment.volume() > 0.0);
        }
    }

    #[test]
    fn best_fit_tie_breaks_in_visit_order() {
        // Nach C bei (0,0,0) minimiert (40,0,0) den planaren
        // Verschnitt; der Gleichstand mit dem +z-Fragment geht an das zuerst
        // besuchte.
        let medium = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "M", "Medium");
        let mut order = order_with(vec![
            product("C", (40.0, 40.0, 40.0), 10.0),
            product("D", (30.0, 30.0, 30.0), 10.0),
        ]);

        let mut packer = Packer::new();
        let result = packer.pack_order(&mut order, &[medium]).unwrap();

        let placements: Vec<&Placement> = result.boxes()[0].positions().collect();
        assert_eq!(placements[0].coordinates(), (0.0, 0.0, 0.0));
        assert_eq!(placements[1].coordinates(), (40.0, 0.0, 0.0));
    }

    #[test]
    fn oversized_item_in_largest_carton_fails_the_order() {
        let largest = carton((50.0, 50.0, 50.0), 0.0, 50_000.0, (5.0, 80.0), "L", "Large");
        let mut order = order_with(vec![product("huge", (100.0, 100.0, 100.0), 10.0)]);

        let mut packer = Packer::new();
        let err = packer.pack_order(&mut order, &[largest]).unwrap_err();
        assert!(matches!(err, PackError::NoFittingContainer { .. }));
    }

    #[test]
    fn seven_item_order_packs_into_medium_carton() {
        let medium = carton(
            (415.0, 300.0, 510.0),
            805.0,
            19_195.0,
            (5.0, 80.0),
            "M",
            "Carton medium",
        );
        assert_eq!(medium.dimensions(), (415.0, 510.0, 300.0));

        let products = vec![
            product("Product_5252", (113.0, 208.0, 113.0), 900.0),
            product("Product_2037", (45.0, 243.0, 113.0), 560.0),
            product("Product_5591", (100.0, 190.0, 100.0), 665.0),
            product("Product_3410", (138.0, 210.0, 138.0), 1139.0),
            product("Product_2026", (100.0, 120.0, 100.0), 305.0),
            product("Product_4918", (100.0, 102.0, 100.0), 282.0),
            product("Product_5028", (260.0, 145.0, 345.0), 2518.0),
        ];
        let mut order = order_with(products);

        let mut box_result = BoxResult::new(medium, 1);
        box_result.pack_products_by_order(&mut order).unwrap();

        assert!(
            box_result.oversized_products().is_empty(),
            "unerwartete Übergrößen: {:?}",
            box_result
                .oversized_products()
                .iter()
                .map(|p| &p.item)
                .collect::<Vec<_>>()
        );
        assert!(
            box_result.leftover_products().is_empty(),
            "unerwartete Leftover: {:?}",
            box_result
                .leftover_products()
                .iter()
                .map(|p| &p.item)
                .collect::<Vec<_>>()
        );
        assert_eq!(box_result.placement_count(), 7);
        assert_all_invariants(&box_result);
    }

    #[test]
    fn splitter_cuts_full_extent_slabs_around_corner_placement() {
        let space = Fragment::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0);
        let bounds = BoundingBox::from_position_and_dims(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(50.0, 50.0, 50.0),
        );

        let slabs = split_space_around_product(&space, &bounds);
        assert_eq!(slabs.len(), 3);
        assert!(slabs.contains(&Fragment::new(50.0, 0.0, 0.0, 50.0, 100.0, 100.0)));
        assert!(slabs.contains(&Fragment::new(0.0, 50.0, 0.0, 100.0, 50.0, 100.0)));
        assert!(slabs.contains(&Fragment::new(0.0, 0.0, 50.0, 100.0, 100.0, 50.0)));
        for slab in &slabs {
            assert!(slab.fresh);
        }
    }

    #[test]
    fn splitter_produces_six_slabs_for_interior_placement() {
        let space = Fragment::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0);
        let bounds = BoundingBox::from_position_and_dims(
            Vec3::new(30.0, 30.0, 30.0),
            Vec3::new(20.0, 20.0, 20.0),
        );

        let slabs = split_space_around_product(&space, &bounds);
        assert_eq!(slabs.len(), 6);
    }

    #[test]
    fn fragments_not_touching_the_placement_survive_unchanged() {
        let space = Fragment::new(60.0, 0.0, 0.0, 40.0, 100.0, 100.0);
        let touching = BoundingBox::from_position_and_dims(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(50.0, 50.0, 50.0),
        );
        // Gemeinsame Fläche bei x = 60, aber kein offener Schnitt.
        assert!(!fragment_intersects(&space, &touching));

        let overlapping = BoundingBox::from_position_and_dims(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(55.0, 50.0, 50.0),
        );
        assert!(fragment_intersects(&space, &overlapping));
    }

    #[test]
    fn fresh_flags_are_cleared_on_inspection() {
        let medium = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "M", "Medium");
        let mut order = order_with(vec![
            product("A", (50.0, 50.0, 50.0), 10.0),
            product("B", (25.0, 25.0, 25.0), 10.0),
        ]);

        let mut box_result = BoxResult::new(medium, 1);
        box_result.pack_products_by_order(&mut order).unwrap();

        let fragments = box_result.layers()[0].remaining_spaces();
        let fresh = fragments.iter().filter(|f| f.fresh).count();
        let stale = fragments.iter().filter(|f| !f.fresh).count();
        // Die Platten aus dem Split für B sind frisch, die beim Suchlauf für
        // B besuchten Fragmente nicht mehr.
        assert_eq!(fresh, 3);
        assert_eq!(stale, 2);
    }

    #[test]
    fn stacking_uses_tight_envelope_of_committed_placements() {
        // Schicht belegt 250 der 300 cm Höhe; für ein 60 cm hohes Produkt
        // bleibt kein Platz, es wird Leftover.
        let tall = carton((100.0, 300.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "M", "Tall");
        let mut order = order_with(vec![
            product("pillar", (100.0, 250.0, 100.0), 100.0),
            product("brick", (100.0, 60.0, 100.0), 50.0),
        ]);

        let mut box_result = BoxResult::new(tall, 1);
        box_result.pack_products_by_order(&mut order).unwrap();

        assert_eq!(box_result.placement_count(), 1);
        assert_eq!(box_result.layers()[0].layer_height(), 250.0);
        assert_eq!(box_result.leftover_products().len(), 1);
        assert_eq!(box_result.leftover_products()[0].item, "brick");
    }

    #[test]
    fn weight_capacity_is_enforced_per_carton() {
        let light_duty = carton((100.0, 100.0, 100.0), 0.0, 150.0, (0.0, 100.0), "S", "Light");
        let mut order = order_with(vec![
            product("lead1", (10.0, 10.0, 10.0), 100.0),
            product("lead2", (10.0, 10.0, 11.0), 100.0),
        ]);

        let mut box_result = BoxResult::new(light_duty, 1);
        box_result.pack_products_by_order(&mut order).unwrap();

        assert_eq!(box_result.placement_count(), 1);
        assert_eq!(box_result.leftover_products().len(), 1);
        assert_weight_bound(&box_result);
    }

    #[test]
    fn oversized_item_is_retried_in_another_carton() {
        // Gemischte Bestellung: der Stab sprengt den kleinen Karton, wird
        // zurückgewiesen und nach dem Commit in einem größeren Karton
        // untergebracht. Konservierung: jede Position genau einmal.
        let small = carton((20.0, 20.0, 20.0), 0.0, 50_000.0, (0.0, 100.0), "S", "Small");
        let mid = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (50.0, 80.0), "M", "Medium");
        let big = carton((200.0, 200.0, 200.0), 0.0, 50_000.0, (50.0, 80.0), "L", "Large");
        let mut order = order_with(vec![
            product("cube", (15.0, 15.0, 15.0), 10.0),
            product("rod", (40.0, 5.0, 5.0), 10.0),
        ]);

        let mut packer = Packer::new();
        let result = packer.pack_order(&mut order, &[small, mid, big]).unwrap();

        assert_eq!(result.boxes().len(), 2, "erwartet zwei Kartons");
        assert_eq!(result.boxes()[0].box_definition().container_type, "S");
        assert_eq!(result.boxes()[1].box_definition().container_type, "L");
        assert_eq!(result.packed_count(), 2);
        assert_eq!(order.packed_items().len(), 2);

        // Konservierung: |gepackt| + |zu groß| + |Leftover| über alle Kartons.
        let oversized: usize = result.boxes().iter().map(|b| b.oversized_products().len()).sum();
        let leftover: usize = result.boxes().iter().map(|b| b.leftover_products().len()).sum();
        assert_eq!(result.packed_count() + oversized + leftover, 2);

        for box_result in result.boxes() {
            assert_all_invariants(box_result);
        }
    }

    #[test]
    fn selection_returns_smallest_carton_for_undersized_orders() {
        let boxes = vec![
            carton((20.0, 20.0, 20.0), 0.0, 1000.0, (50.0, 100.0), "XXS", "Tiny"),
            carton((100.0, 100.0, 100.0), 0.0, 1000.0, (50.0, 80.0), "M", "Medium"),
            carton((200.0, 200.0, 200.0), 0.0, 1000.0, (50.0, 80.0), "L", "Large"),
        ];
        let order = order_with(vec![product("mini", (10.0, 10.0, 10.0), 1.0)]);

        let selected = Packer::initial_box_selection(&order, &boxes, None);
        assert_eq!(selected, Some(0));
    }

    #[test]
    fn selection_falls_back_to_largest_carton() {
        let boxes = vec![
            carton((20.0, 20.0, 20.0), 0.0, 1000.0, (0.0, 100.0), "XXS", "Tiny"),
            carton((100.0, 100.0, 100.0), 0.0, 1000.0, (5.0, 80.0), "M", "Medium"),
            carton((200.0, 200.0, 200.0), 0.0, 1000.0, (5.0, 80.0), "L", "Large"),
        ];
        let order = order_with(vec![product("giant", (900.0, 900.0, 900.0), 1.0)]);

        // Kein Karton besteht die Volumenprüfung: der größte betrachtete
        // Karton ist der Rückfallwert.
        let selected = Packer::initial_box_selection(&order, &boxes, None);
        assert_eq!(selected, Some(2));

        // Ist der letzte Versuch bereits der größte Karton, bleibt es dabei.
        let selected = Packer::initial_box_selection(&order, &boxes, Some(2));
        assert_eq!(selected, Some(2));
    }

    #[test]
    fn selection_skips_undersized_and_multi_cartons() {
        let boxes = vec![
            carton((50.0, 50.0, 50.0), 0.0, 1000.0, (0.0, 100.0), "XSD", "Undersized box"),
            carton((100.0, 100.0, 100.0), 0.0, 1000.0, (0.0, 80.0), "M", "Medium"),
            carton((200.0, 200.0, 200.0), 0.0, 1000.0, (0.0, 80.0), "MUL", "Multi order box"),
        ];
        let order = order_with(vec![product("cube", (40.0, 40.0, 40.0), 1.0)]);

        let selected = Packer::initial_box_selection(&order, &boxes, None);
        assert_eq!(selected, Some(1));
    }

    #[test]
    fn selection_only_escalates_to_strictly_larger_cartons() {
        let boxes = vec![
            carton((50.0, 50.0, 50.0), 0.0, 1000.0, (0.0, 100.0), "S", "Small"),
            carton((100.0, 100.0, 100.0), 0.0, 1000.0, (0.0, 80.0), "M", "Medium"),
            carton((200.0, 200.0, 200.0), 0.0, 1000.0, (0.0, 80.0), "L", "Large"),
        ];
        let order = order_with(vec![product("cube", (40.0, 40.0, 40.0), 1.0)]);

        // Ohne Vorgänger fällt die Wahl auf den kleinsten passenden Karton.
        assert_eq!(Packer::initial_box_selection(&order, &boxes, None), Some(0));
        // Mit Vorgänger kommen nur noch strikt größere Kartons in Frage.
        assert_eq!(Packer::initial_box_selection(&order, &boxes, Some(0)), Some(1));
        assert_eq!(Packer::initial_box_selection(&order, &boxes, Some(1)), Some(2));
    }

    #[test]
    fn undefined_coordinates_are_a_fault() {
        let medium = carton((100.0, 100.0, 100.0), 0.0, 1000.0, (0.0, 100.0), "M", "Medium");
        let mut box_result = BoxResult::new(medium, 1);

        let mut placement = Placement::new(
            product("ghost", (10.0, 10.0, 10.0), 1.0),
            0.0,
            0.0,
            0.0,
            RotationType::RT1,
        );
        placement.set_coordinates(f64::NAN, 0.0, 0.0);

        let err = box_result.add_new_layer(&placement, &[]).unwrap_err();
        assert!(matches!(err, PackError::InvalidPlacementCoordinates { .. }));
    }

    #[test]
    fn identical_inputs_produce_identical_results() {
        // Determinismus über zwei unabhängige Läufe.
        let run = || {
            let boxes = vec![
                carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "M", "Medium"),
                carton((200.0, 200.0, 200.0), 0.0, 50_000.0, (5.0, 80.0), "L", "Large"),
            ];
            let mut order = order_with(vec![
                product("A", (50.0, 50.0, 50.0), 10.0),
                product("B", (25.0, 25.0, 25.0), 10.0),
                product("C", (40.0, 40.0, 40.0), 10.0),
                product("D", (30.0, 30.0, 30.0), 10.0),
            ]);
            let mut packer = Packer::new();
            let result = packer.pack_order(&mut order, &boxes).unwrap();
            result
                .boxes()
                .iter()
                .flat_map(|b| {
                    b.positions().map(|p| {
                        (
                            b.box_id(),
                            p.product().item.clone(),
                            p.rotation().label(),
                            p.coordinates(),
                        )
                    })
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn progress_events_follow_the_packing_lifecycle() {
        let medium = carton((100.0, 100.0, 100.0), 0.0, 50_000.0, (0.0, 100.0), "M", "Medium");
        let mut order = order_with(vec![
            product("A", (50.0, 50.0, 50.0), 10.0),
            product("B", (25.0, 25.0, 25.0), 10.0),
        ]);

        let mut events = Vec::new();
        let mut packer = Packer::new();
        packer
            .pack_order_with_progress(&mut order, &[medium], |event| {
                events.push(event.clone());
            })
            .unwrap();

        assert!(matches!(events.first(), Some(PackEvent::OrderStarted { .. })));
        assert!(matches!(events.last(), Some(PackEvent::OrderFinished { .. })));
        let placed = events
            .iter()
            .filter(|e| matches!(e, PackEvent::ItemPlaced { .. }))
            .count();
        assert_eq!(placed, 2);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, PackEvent::ContainerStarted { .. }))
                .count(),
            1
        );
    }
}
