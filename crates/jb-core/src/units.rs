//! Land-area units and mixed-radix arithmetic
//!
//! Jamabandi records measure area in Kanal and Marla. Totals are shown in a
//! four-tier system, largest first:
//!
//! | Unit    | Size                |
//! |---------|---------------------|
//! | Kila    | 8 Kanal             |
//! | Kanal   | 20 Marla            |
//! | Marla   | 9 Sarshai           |
//! | Sarshai | base unit           |
//!
//! All aggregation happens in Sarshai, the smallest unit, so totals are
//! exact integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratio table for a Kila/Kanal/Marla/Sarshai unit system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSystem {
    /// Sarshai in one Marla
    pub sarshai_per_marla: i64,
    /// Marla in one Kanal
    pub marla_per_kanal: i64,
    /// Kanal in one Kila
    pub kanal_per_kila: i64,
}

impl UnitSystem {
    /// The ratios used by the land registry (1 Kila = 8 Kanal = 160 Marla = 1440 Sarshai)
    pub const JAMABANDI: UnitSystem = UnitSystem {
        sarshai_per_marla: 9,
        marla_per_kanal: 20,
        kanal_per_kila: 8,
    };

    /// Sarshai in one Kanal
    pub const fn sarshai_per_kanal(&self) -> i64 {
        self.marla_per_kanal * self.sarshai_per_marla
    }

    /// Sarshai in one Kila
    pub const fn sarshai_per_kila(&self) -> i64 {
        self.kanal_per_kila * self.sarshai_per_kanal()
    }

    /// Convert a Kanal/Marla pair into Sarshai
    pub fn to_base_units(&self, kanal: i64, marla: i64) -> i64 {
        kanal * self.sarshai_per_kanal() + marla * self.sarshai_per_marla
    }

    /// Like [`to_base_units`](Self::to_base_units), but returns `None` on overflow
    pub fn checked_to_base_units(&self, kanal: i64, marla: i64) -> Option<i64> {
        let kanal = kanal.checked_mul(self.sarshai_per_kanal())?;
        let marla = marla.checked_mul(self.sarshai_per_marla)?;
        kanal.checked_add(marla)
    }

    /// Convert fractional Kanal/Marla into Sarshai, rounded to the nearest whole Sarshai
    ///
    /// The flag is true when rounding dropped a fraction. Returns `None` if the
    /// result is not finite or does not fit in an `i64`.
    pub fn to_base_units_rounded(&self, kanal: f64, marla: f64) -> Option<(i64, bool)> {
        let exact = kanal * self.sarshai_per_kanal() as f64 + marla * self.sarshai_per_marla as f64;
        let rounded = exact.round();
        if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
            Some((rounded as i64, rounded != exact))
        } else {
            None
        }
    }

    /// Decompose a Sarshai count into Kila, Kanal, Marla and Sarshai
    ///
    /// Uses Euclidean division, so the Kanal, Marla and Sarshai fields are
    /// always within `0..ratio`. Only Kila carries the sign of a negative total.
    pub fn from_base_units(&self, total: i64) -> Area {
        let kila = total.div_euclid(self.sarshai_per_kila());
        let remainder = total.rem_euclid(self.sarshai_per_kila());

        let kanal = remainder / self.sarshai_per_kanal();
        let remainder = remainder % self.sarshai_per_kanal();

        Area {
            kila,
            kanal,
            marla: remainder / self.sarshai_per_marla,
            sarshai: remainder % self.sarshai_per_marla,
        }
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::JAMABANDI
    }
}

/// An area in canonical Kila/Kanal/Marla/Sarshai form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Area {
    pub kila: i64,
    pub kanal: i64,
    pub marla: i64,
    pub sarshai: i64,
}

impl Area {
    /// Reassemble the area into Sarshai
    pub fn to_base_units(&self, units: &UnitSystem) -> i64 {
        self.kila * units.sarshai_per_kila()
            + self.kanal * units.sarshai_per_kanal()
            + self.marla * units.sarshai_per_marla
            + self.sarshai
    }

    /// Check whether every field below Kila is within its ratio
    pub fn is_canonical(&self, units: &UnitSystem) -> bool {
        (0..units.kanal_per_kila).contains(&self.kanal)
            && (0..units.marla_per_kanal).contains(&self.marla)
            && (0..units.sarshai_per_marla).contains(&self.sarshai)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Kila, {} Kanal, {} Marla, {} Sarshai",
            self.kila, self.kanal, self.marla, self.sarshai
        )
    }
}
