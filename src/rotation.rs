//! Axis-aligned rotation model for cuboid products.
//!
//! A rigid cuboid can sit inside a carton in exactly six axis-aligned
//! orientations. Each orientation is a fixed permutation of the product's
//! original `(width, height, length)` triple. The layer engine walks the six
//! orientations starting from an initial "flat side down" preference.

/// One of the six axis-aligned orientations of a cuboid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationType {
    /// Original orientation `(w, h, l)`.
    RT1,
    /// Rotated 90° around the vertical axis `(l, h, w)`.
    RT2,
    /// Width becomes height `(h, w, l)`.
    RT3,
    /// 90° vertical rotation with height swap `(l, w, h)`.
    RT4,
    /// Height becomes length `(h, l, w)`.
    RT5,
    /// Width becomes length `(w, l, h)`.
    RT6,
}

impl RotationType {
    /// All orientations in enumeration order. Ties between orientations that
    /// produce identical triples are resolved by this order, which keeps the
    /// engine deterministic for products with equal dimensions.
    pub const ALL: [RotationType; 6] = [
        RotationType::RT1,
        RotationType::RT2,
        RotationType::RT3,
        RotationType::RT4,
        RotationType::RT5,
        RotationType::RT6,
    ];

    /// Applies this rotation to the original dimensions.
    ///
    /// # Parameters
    /// * `w`, `h`, `l` - Original dimensions in cm
    ///
    /// # Returns
    /// The rotated `(width, height, length)` triple.
    pub fn adjust_dimensions(&self, w: f64, h: f64, l: f64) -> (f64, f64, f64) {
        match self {
            RotationType::RT1 => (w, h, l),
            RotationType::RT2 => (l, h, w),
            RotationType::RT3 => (h, w, l),
            RotationType::RT4 => (l, w, h),
            RotationType::RT5 => (h, l, w),
            RotationType::RT6 => (w, l, h),
        }
    }

    /// Determines the starting orientation for the given dimensions.
    ///
    /// The middle value becomes the width, the smallest the height and the
    /// largest the length, so the product starts with its flat side down.
    /// Subsequent attempts cycle away from this preference via [`next`].
    ///
    /// [`next`]: RotationType::next
    pub fn initial_rotation(w: f64, h: f64, l: f64) -> RotationType {
        let mut sorted = [w, h, l];
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let target = (sorted[1], sorted[0], sorted[2]);

        for rotation in RotationType::ALL {
            if rotation.adjust_dimensions(w, h, l) == target {
                return rotation;
            }
        }

        // Unreachable: the six labels cover every permutation of the triple.
        RotationType::RT1
    }

    /// Advances to the next orientation, cycling RT6 back to RT1.
    pub fn next(self) -> RotationType {
        match self {
            RotationType::RT1 => RotationType::RT2,
            RotationType::RT2 => RotationType::RT3,
            RotationType::RT3 => RotationType::RT4,
            RotationType::RT4 => RotationType::RT5,
            RotationType::RT5 => RotationType::RT6,
            RotationType::RT6 => RotationType::RT1,
        }
    }

    /// Steps back to the previous orientation; inverse of [`next`].
    ///
    /// [`next`]: RotationType::next
    #[allow(dead_code)]
    pub fn previous(self) -> RotationType {
        match self {
            RotationType::RT1 => RotationType::RT6,
            RotationType::RT2 => RotationType::RT1,
            RotationType::RT3 => RotationType::RT2,
            RotationType::RT4 => RotationType::RT3,
            RotationType::RT5 => RotationType::RT4,
            RotationType::RT6 => RotationType::RT5,
        }
    }

    /// Short label for logs and result rows.
    pub fn label(&self) -> &'static str {
        match self {
            RotationType::RT1 => "RT1",
            RotationType::RT2 => "RT2",
            RotationType::RT3 => "RT3",
            RotationType::RT4 => "RT4",
            RotationType::RT5 => "RT5",
            RotationType::RT6 => "RT6",
        }
    }
}
