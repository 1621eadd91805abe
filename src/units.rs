use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

pub const LB_PER_KG: f64 = 2.20462;

/// Unit weights are entered and displayed in. Storage is always kilograms.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Kg => Self::Lb,
            Self::Lb => Self::Kg,
        }
    }

    /// Converts a canonical kilogram value into this unit for display.
    #[must_use]
    pub fn from_kg(self, kg: f64) -> f64 {
        match self {
            Self::Kg => kg,
            Self::Lb => kg_to_lb(kg),
        }
    }

    /// Converts a value entered in this unit into canonical kilograms.
    #[must_use]
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            Self::Kg => value,
            Self::Lb => lb_to_kg(value),
        }
    }
}

/// Rounds to one decimal place.
#[must_use]
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[must_use]
pub fn kg_to_lb(kg: f64) -> f64 {
    round_tenth(kg * LB_PER_KG)
}

#[must_use]
pub fn lb_to_kg(lb: f64) -> f64 {
    round_tenth(lb / LB_PER_KG)
}
