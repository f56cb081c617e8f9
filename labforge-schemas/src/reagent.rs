use serde::{Deserialize, Serialize};
use std::fmt;

/// How a reagent participates in the acid-base chemistry of the vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReagentRole {
    StrongAcid,
    StrongBase,
    WeakAcidComponent,
    ConjugateBaseComponent,
    Indicator,
}

impl ReagentRole {
    /// Whether the role belongs to a weak acid / conjugate base buffer pair.
    pub fn is_conjugate_pair(self) -> bool {
        matches!(
            self,
            ReagentRole::WeakAcidComponent | ReagentRole::ConjugateBaseComponent
        )
    }
}

impl fmt::Display for ReagentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReagentRole::StrongAcid => "strong acid",
            ReagentRole::StrongBase => "strong base",
            ReagentRole::WeakAcidComponent => "weak acid",
            ReagentRole::ConjugateBaseComponent => "conjugate base",
            ReagentRole::Indicator => "indicator",
        };
        f.write_str(name)
    }
}

/// A catalog entry. Reagents are immutable once the experiment is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Reagent {
    pub reagent_id: String,
    pub display_name: String,
    /// mol/L; zero for reagents that carry no concentration (indicators).
    #[serde(default)]
    pub molarity: f64,
    pub role: ReagentRole,
    pub min_volume_ml: f64,
    pub max_volume_ml: f64,
    #[serde(default)]
    pub pka: Option<f64>,
}

impl Reagent {
    pub fn accepts_volume(&self, volume_ml: f64) -> bool {
        volume_ml.is_finite() && volume_ml >= self.min_volume_ml && volume_ml <= self.max_volume_ml
    }

    /// Moles delivered by adding `volume_ml` of this reagent.
    pub fn moles_in(&self, volume_ml: f64) -> f64 {
        self.molarity * volume_ml / 1000.0
    }
}
