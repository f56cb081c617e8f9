//! pH from vessel composition.
//!
//! Strong acid and strong base are first reacted against each other and
//! against the conjugate pair (plain stoichiometry, limiting reagent wins).
//! The remaining composition then selects exactly one regime:
//!
//! 1. no solution: no pH
//! 2. excess strong acid: `-log10[H+]`
//! 3. excess strong base: `14 + log10[OH-]`
//! 4. weak acid and conjugate base: Henderson-Hasselbalch
//! 5. weak acid alone: `0.5 * (pKa - log10 C)`, valid only for small dissociation
//! 6. conjugate base alone: a fixed basic approximation, not a hydrolysis solve
//! 7. exact strong acid/base neutralization: neutral
//! 8. nothing reactive: no pH
//!
//! Every concentration uses the total current volume, and every finite
//! result is clamped to `[0, 14]`.

use crate::simulation::vessel::VesselSnapshot;
use labforge_schemas::reagent::ReagentRole;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PH_MIN: f64 = 0.0;
pub const PH_MAX: f64 = 14.0;
pub const NEUTRAL_PH: f64 = 7.0;

/// Reported for a conjugate base with no acid partner. A qualitative
/// "mildly basic" value rather than a computed one.
pub const CONJUGATE_BASE_ONLY_PH: f64 = 9.0;

/// Mole amounts below this are treated as absent.
pub const MOLE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    StrongAcid,
    StrongBase,
    Buffer,
    WeakAcidOnly,
    ConjugateBaseOnly,
    Neutralized,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Regime::StrongAcid => "strong acid",
            Regime::StrongBase => "strong base",
            Regime::Buffer => "buffer (Henderson-Hasselbalch)",
            Regime::WeakAcidOnly => "weak acid approximation",
            Regime::ConjugateBaseOnly => "conjugate base approximation",
            Regime::Neutralized => "neutralized",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhEstimate {
    pub ph: f64,
    pub regime: Regime,
}

/// Universal indicator color bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBand {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl ColorBand {
    pub fn for_ph(ph: f64) -> Self {
        if ph < 3.0 {
            ColorBand::Red
        } else if ph < 5.0 {
            ColorBand::Orange
        } else if ph < 6.5 {
            ColorBand::Yellow
        } else if ph <= 7.5 {
            ColorBand::Green
        } else if ph <= 11.0 {
            ColorBand::Blue
        } else {
            ColorBand::Purple
        }
    }
}

impl fmt::Display for ColorBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorBand::Red => "red",
            ColorBand::Orange => "orange",
            ColorBand::Yellow => "yellow",
            ColorBand::Green => "green",
            ColorBand::Blue => "blue",
            ColorBand::Purple => "purple",
        };
        f.write_str(name)
    }
}

/// Moles left once strong acid and strong base have reacted.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Reacted {
    strong_acid: f64,
    strong_base: f64,
    weak_acid: f64,
    conjugate_base: f64,
    neutralized: bool,
}

fn present(moles: f64) -> bool {
    moles > MOLE_EPSILON
}

fn react(vessel: &VesselSnapshot) -> Reacted {
    let mut strong_acid = vessel.moles(ReagentRole::StrongAcid);
    let mut strong_base = vessel.moles(ReagentRole::StrongBase);
    let mut weak_acid = vessel.moles(ReagentRole::WeakAcidComponent);
    let mut conjugate_base = vessel.moles(ReagentRole::ConjugateBaseComponent);
    let neutralized = present(strong_acid) && present(strong_base);

    let n = strong_acid.min(strong_base);
    strong_acid -= n;
    strong_base -= n;

    // H+ + A- -> HA
    let n = strong_acid.min(conjugate_base);
    strong_acid -= n;
    conjugate_base -= n;
    weak_acid += n;

    // OH- + HA -> A- + H2O
    let n = strong_base.min(weak_acid);
    strong_base -= n;
    weak_acid -= n;
    conjugate_base += n;

    let zero_if_absent = |m: f64| if present(m) { m } else { 0.0 };
    Reacted {
        strong_acid: zero_if_absent(strong_acid),
        strong_base: zero_if_absent(strong_base),
        weak_acid: zero_if_absent(weak_acid),
        conjugate_base: zero_if_absent(conjugate_base),
        neutralized,
    }
}

fn clamp(ph: f64) -> f64 {
    ph.clamp(PH_MIN, PH_MAX)
}

/// Selects the regime and computes pH. `None` means inconclusive: no
/// solution, nothing reactive, or a pair component with no declared pKa.
pub fn evaluate(vessel: &VesselSnapshot) -> Option<PhEstimate> {
    if vessel.total_volume_ml <= 0.0 {
        return None;
    }
    let volume_l = vessel.total_volume_l();
    let r = react(vessel);

    let estimate = if r.strong_acid > 0.0 {
        PhEstimate {
            ph: -(r.strong_acid / volume_l).log10(),
            regime: Regime::StrongAcid,
        }
    } else if r.strong_base > 0.0 {
        PhEstimate {
            ph: PH_MAX + (r.strong_base / volume_l).log10(),
            regime: Regime::StrongBase,
        }
    } else if r.weak_acid > 0.0 && r.conjugate_base > 0.0 {
        let pka = vessel.pka?;
        PhEstimate {
            ph: pka + ((r.conjugate_base / volume_l) / (r.weak_acid / volume_l)).log10(),
            regime: Regime::Buffer,
        }
    } else if r.weak_acid > 0.0 {
        let pka = vessel.pka?;
        PhEstimate {
            ph: 0.5 * (pka - (r.weak_acid / volume_l).log10()),
            regime: Regime::WeakAcidOnly,
        }
    } else if r.conjugate_base > 0.0 {
        PhEstimate {
            ph: CONJUGATE_BASE_ONLY_PH,
            regime: Regime::ConjugateBaseOnly,
        }
    } else if r.neutralized {
        PhEstimate {
            ph: NEUTRAL_PH,
            regime: Regime::Neutralized,
        }
    } else {
        return None;
    };

    estimate.ph.is_finite().then(|| PhEstimate {
        ph: clamp(estimate.ph),
        regime: estimate.regime,
    })
}

pub fn compute_ph(vessel: &VesselSnapshot) -> Option<f64> {
    evaluate(vessel).map(|e| e.ph)
}
