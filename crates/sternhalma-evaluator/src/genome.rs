//! Evaluation genome: the named weights and constants of the evaluator.
//!
//! A [`Genome`] is a plain value. The trainer never edits one in place; it
//! builds new genomes from the flat value vector ([`Genome::to_values`] /
//! [`Genome::from_values`]) produced by crossover and mutation, clamped to the
//! per-field bounds of [`GenomeField`].

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// One tunable entry of a [`Genome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenomeField {
    // term weights
    Progress,
    GoalDistance,
    CenterControl,
    Blocking,
    JumpPotential,
    // constants
    StragglerDivisor,
    CenterPieceValue,
    BlockingBaseValue,
    JumpPotentialMultiplier,
    JumpPotentialCap,
    RegressionMultiplier,
    GoalLeavePenalty,
    RepetitionPenalty,
    CyclePenalty,
    EndgameThreshold,
}

impl GenomeField {
    pub const LEN: usize = 15;

    pub const ALL: [Self; Self::LEN] = [
        Self::Progress,
        Self::GoalDistance,
        Self::CenterControl,
        Self::Blocking,
        Self::JumpPotential,
        Self::StragglerDivisor,
        Self::CenterPieceValue,
        Self::BlockingBaseValue,
        Self::JumpPotentialMultiplier,
        Self::JumpPotentialCap,
        Self::RegressionMultiplier,
        Self::GoalLeavePenalty,
        Self::RepetitionPenalty,
        Self::CyclePenalty,
        Self::EndgameThreshold,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Valid range of the field. Mutation and crossover clamp into it.
    #[must_use]
    pub fn bounds(self) -> RangeInclusive<f64> {
        match self {
            Self::Progress | Self::GoalDistance => 0.0..=5.0,
            Self::CenterControl | Self::Blocking | Self::JumpPotential => 0.0..=3.0,
            Self::StragglerDivisor => 1.0..=20.0,
            Self::CenterPieceValue | Self::BlockingBaseValue | Self::RegressionMultiplier => {
                0.0..=5.0
            }
            Self::JumpPotentialMultiplier => 0.0..=3.0,
            Self::JumpPotentialCap
            | Self::GoalLeavePenalty
            | Self::RepetitionPenalty
            | Self::CyclePenalty => 0.0..=20.0,
            Self::EndgameThreshold => 1.0..=10.0,
        }
    }

    /// Hand-tuned value used by the preset difficulties.
    #[must_use]
    pub const fn default_value(self) -> f64 {
        match self {
            Self::Progress | Self::CenterPieceValue | Self::BlockingBaseValue => 1.0,
            Self::GoalDistance => 0.8,
            Self::CenterControl => 0.3,
            Self::Blocking => 0.2,
            Self::JumpPotential => 0.4,
            Self::StragglerDivisor => 4.0,
            Self::JumpPotentialMultiplier | Self::RegressionMultiplier => 0.5,
            Self::JumpPotentialCap => 6.0,
            Self::GoalLeavePenalty => 3.0,
            Self::RepetitionPenalty => 2.0,
            Self::CyclePenalty => 1.5,
            Self::EndgameThreshold => 7.0,
        }
    }

    /// Clamps `value` into [`Self::bounds`].
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        let bounds = self.bounds();
        value.clamp(*bounds.start(), *bounds.end())
    }
}

/// Weights and constants of the position evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genome {
    pub progress: f64,
    pub goal_distance: f64,
    pub center_control: f64,
    pub blocking: f64,
    pub jump_potential: f64,
    pub straggler_divisor: f64,
    pub center_piece_value: f64,
    pub blocking_base_value: f64,
    pub jump_potential_multiplier: f64,
    pub jump_potential_cap: f64,
    pub regression_multiplier: f64,
    pub goal_leave_penalty: f64,
    pub repetition_penalty: f64,
    pub cycle_penalty: f64,
    pub endgame_threshold: f64,
}

impl Default for Genome {
    fn default() -> Self {
        Self::from_fn(GenomeField::default_value)
    }
}

impl Genome {
    /// Builds a genome by computing every field with `f`.
    ///
    /// # Example
    ///
    /// ```
    /// use sternhalma_evaluator::genome::{Genome, GenomeField};
    ///
    /// let upper = Genome::from_fn(|f| *f.bounds().end());
    /// assert_eq!(upper.get(GenomeField::EndgameThreshold), 10.0);
    /// ```
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(GenomeField) -> f64,
    {
        let mut values = [0.0; GenomeField::LEN];
        for field in GenomeField::ALL {
            values[field.index()] = f(field);
        }
        Self::from_array(values)
    }

    /// Builds a genome from values in [`GenomeField::ALL`] order, clamping
    /// each into its bounds. Returns `None` on a length mismatch.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let values: [f64; GenomeField::LEN] = values.try_into().ok()?;
        Some(Self::from_fn(|f| f.clamp(values[f.index()])))
    }

    /// Field values in [`GenomeField::ALL`] order.
    #[must_use]
    pub fn to_values(&self) -> Vec<f64> {
        GenomeField::ALL.iter().map(|&f| self.get(f)).collect()
    }

    #[must_use]
    pub fn get(&self, field: GenomeField) -> f64 {
        match field {
            GenomeField::Progress => self.progress,
            GenomeField::GoalDistance => self.goal_distance,
            GenomeField::CenterControl => self.center_control,
            GenomeField::Blocking => self.blocking,
            GenomeField::JumpPotential => self.jump_potential,
            GenomeField::StragglerDivisor => self.straggler_divisor,
            GenomeField::CenterPieceValue => self.center_piece_value,
            GenomeField::BlockingBaseValue => self.blocking_base_value,
            GenomeField::JumpPotentialMultiplier => self.jump_potential_multiplier,
            GenomeField::JumpPotentialCap => self.jump_potential_cap,
            GenomeField::RegressionMultiplier => self.regression_multiplier,
            GenomeField::GoalLeavePenalty => self.goal_leave_penalty,
            GenomeField::RepetitionPenalty => self.repetition_penalty,
            GenomeField::CyclePenalty => self.cycle_penalty,
            GenomeField::EndgameThreshold => self.endgame_threshold,
        }
    }

    /// Returns `true` if every field lies within its bounds.
    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        GenomeField::ALL
            .iter()
            .all(|&f| f.bounds().contains(&self.get(f)))
    }

    fn from_array(v: [f64; GenomeField::LEN]) -> Self {
        Self {
            progress: v[0],
            goal_distance: v[1],
            center_control: v[2],
            blocking: v[3],
            jump_potential: v[4],
            straggler_divisor: v[5],
            center_piece_value: v[6],
            blocking_base_value: v[7],
            jump_potential_multiplier: v[8],
            jump_potential_cap: v[9],
            regression_multiplier: v[10],
            goal_leave_penalty: v[11],
            repetition_penalty: v[12],
            cycle_penalty: v[13],
            endgame_threshold: v[14],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_matches_index() {
        for (i, f) in GenomeField::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_defaults_within_bounds() {
        assert!(Genome::default().is_within_bounds());
        for f in GenomeField::ALL {
            assert!(f.bounds().contains(&f.default_value()), "{f}");
        }
    }

    #[test]
    fn test_values_roundtrip_and_clamp() {
        let g = Genome::default();
        assert_eq!(Genome::from_values(&g.to_values()), Some(g));
        assert_eq!(Genome::from_values(&[1.0; 3]), None);

        let wild = Genome::from_values(&[100.0; GenomeField::LEN]).unwrap();
        assert!(wild.is_within_bounds());
        assert_eq!(wild.get(GenomeField::CenterControl), 3.0);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(Genome::default()).unwrap();
        assert_eq!(json["stragglerDivisor"], 4.0);
        assert_eq!(json["endgameThreshold"], 7.0);
        let back: Genome = serde_json::from_value(json).unwrap();
        assert_eq!(back, Genome::default());
    }
}
