use crate::{
    equilibrium::{self, ColorBand},
    error::LabError,
    simulation::history::{Action, ActionKind},
};
use labforge_schemas::reagent::{Reagent, ReagentRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the learner would see in the vessel. Derived, never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "band", rename_all = "snake_case")]
pub enum VesselAppearance {
    Empty,
    Clear,
    /// Indicator present but the composition gives no pH to color by.
    Tinted,
    Colored(ColorBand),
}

/// One accepted addition, as it landed in the vessel.
#[derive(Debug, Clone, PartialEq)]
struct Contribution {
    reagent_id: String,
    role: ReagentRole,
    pka: Option<f64>,
    /// Volume actually taken up after clamping at capacity.
    volume_ml: f64,
    moles: f64,
}

/// Immutable view of the vessel handed to the calculator and to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselSnapshot {
    pub capacity_ml: f64,
    pub total_volume_ml: f64,
    pub moles_by_role: BTreeMap<ReagentRole, f64>,
    pub volume_by_reagent: BTreeMap<String, f64>,
    pub has_indicator: bool,
    pub pka: Option<f64>,
    pub appearance: VesselAppearance,
}

impl VesselSnapshot {
    pub fn moles(&self, role: ReagentRole) -> f64 {
        self.moles_by_role.get(&role).copied().unwrap_or(0.0)
    }

    pub fn volume_of(&self, reagent_id: &str) -> f64 {
        self.volume_by_reagent.get(reagent_id).copied().unwrap_or(0.0)
    }

    pub fn total_volume_l(&self) -> f64 {
        self.total_volume_ml / 1000.0
    }

    /// Moles of weak acid plus conjugate base.
    pub fn conjugate_pair_moles(&self) -> f64 {
        self.moles(ReagentRole::WeakAcidComponent) + self.moles(ReagentRole::ConjugateBaseComponent)
    }

    pub fn is_empty(&self) -> bool {
        self.total_volume_ml <= 0.0
    }
}

/// The reaction vessel. Totals are always recomputed from the list of
/// contributions, so reverting an addition restores the previous totals
/// bit for bit.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselState {
    capacity_ml: f64,
    contributions: Vec<Contribution>,
    indicator_placed: bool,
    total_volume_ml: f64,
    moles_by_role: BTreeMap<ReagentRole, f64>,
    has_indicator: bool,
}

impl VesselState {
    pub fn new(capacity_ml: f64) -> Self {
        Self {
            capacity_ml,
            contributions: Vec::new(),
            indicator_placed: false,
            total_volume_ml: 0.0,
            moles_by_role: BTreeMap::new(),
            has_indicator: false,
        }
    }

    pub fn capacity_ml(&self) -> f64 {
        self.capacity_ml
    }

    pub fn total_volume_ml(&self) -> f64 {
        self.total_volume_ml
    }

    pub fn has_indicator(&self) -> bool {
        self.has_indicator
    }

    /// Adds `volume_ml` of `reagent`. Volume beyond capacity spills silently;
    /// the moles delivered are those of the full requested volume.
    pub fn apply_addition(
        &mut self,
        reagent: &Reagent,
        volume_ml: f64,
    ) -> Result<VesselSnapshot, LabError> {
        if !reagent.accepts_volume(volume_ml) {
            return Err(LabError::OutOfRange {
                reagent_id: reagent.reagent_id.clone(),
                volume_ml,
                min_ml: reagent.min_volume_ml,
                max_ml: reagent.max_volume_ml,
            });
        }

        let headroom = (self.capacity_ml - self.total_volume_ml).max(0.0);
        self.contributions.push(Contribution {
            reagent_id: reagent.reagent_id.clone(),
            role: reagent.role,
            pka: reagent.pka,
            volume_ml: volume_ml.min(headroom),
            moles: reagent.moles_in(volume_ml),
        });
        self.recompute();
        Ok(self.snapshot())
    }

    pub fn apply_indicator_placement(&mut self) -> VesselSnapshot {
        self.indicator_placed = true;
        self.recompute();
        self.snapshot()
    }

    /// Exact inverse of the vessel effect of `action`. Measurements have no
    /// vessel effect.
    pub fn revert_last_addition(&mut self, action: &Action) -> Result<VesselSnapshot, LabError> {
        match action.kind {
            ActionKind::AddReagent => {
                let reagent_id = action.reagent_id.as_deref().unwrap_or_default();
                let position = self
                    .contributions
                    .iter()
                    .rposition(|c| c.reagent_id == reagent_id)
                    .ok_or_else(|| LabError::ReagentNotFound(reagent_id.to_string()))?;
                self.contributions.remove(position);
            }
            ActionKind::PlaceIndicator => self.indicator_placed = false,
            ActionKind::Measure => {}
        }
        self.recompute();
        Ok(self.snapshot())
    }

    /// Drops every addition of one reagent. Returns true if anything was removed.
    pub fn remove_reagent(&mut self, reagent_id: &str) -> bool {
        let before = self.contributions.len();
        self.contributions.retain(|c| c.reagent_id != reagent_id);
        self.recompute();
        self.contributions.len() != before
    }

    pub fn reset(&mut self) -> VesselSnapshot {
        self.contributions.clear();
        self.indicator_placed = false;
        self.recompute();
        self.snapshot()
    }

    fn recompute(&mut self) {
        let mut total_volume_ml = 0.0;
        let mut moles_by_role = BTreeMap::new();
        for c in &self.contributions {
            total_volume_ml += c.volume_ml;
            *moles_by_role.entry(c.role).or_insert(0.0) += c.moles;
        }
        self.total_volume_ml = total_volume_ml.min(self.capacity_ml).max(0.0);
        self.moles_by_role = moles_by_role;
        self.has_indicator = self.indicator_placed
            || self.contributions.iter().any(|c| c.role == ReagentRole::Indicator);
    }

    pub fn snapshot(&self) -> VesselSnapshot {
        let mut volume_by_reagent = BTreeMap::new();
        for c in &self.contributions {
            *volume_by_reagent.entry(c.reagent_id.clone()).or_insert(0.0) += c.volume_ml;
        }
        let pka = self
            .contributions
            .iter()
            .filter(|c| c.role.is_conjugate_pair())
            .find_map(|c| c.pka);

        let mut snapshot = VesselSnapshot {
            capacity_ml: self.capacity_ml,
            total_volume_ml: self.total_volume_ml,
            moles_by_role: self.moles_by_role.clone(),
            volume_by_reagent,
            has_indicator: self.has_indicator,
            pka,
            appearance: VesselAppearance::Empty,
        };
        snapshot.appearance = if snapshot.is_empty() {
            VesselAppearance::Empty
        } else if !snapshot.has_indicator {
            VesselAppearance::Clear
        } else {
            match equilibrium::compute_ph(&snapshot) {
                Some(ph) => VesselAppearance::Colored(ColorBand::for_ph(ph)),
                None => VesselAppearance::Tinted,
            }
        };
        snapshot
    }
}
