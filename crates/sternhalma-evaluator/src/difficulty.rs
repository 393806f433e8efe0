use serde::{Deserialize, Serialize};

use crate::{genome::Genome, insights::SharedInsights, search::SearchParams};

/// AI strength presets.
///
/// Each preset fixes the search depth and the per-node candidate cap.
/// `Evolved` searches like `Hard` but with the genome produced by training.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Evolved,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Evolved];

    #[must_use]
    pub fn params(self) -> SearchParams {
        let (depth, candidate_cap, randomness) = match self {
            Self::Easy => (1, 6, 0.15),
            Self::Medium => (2, 8, 0.0),
            Self::Hard | Self::Evolved => (3, 10, 0.0),
        };
        SearchParams {
            depth,
            candidate_cap,
            randomness,
        }
    }

    /// Where this preset takes its genome from, given the evolved genome
    /// currently available (if any).
    #[must_use]
    pub fn genome_source(self, evolved: Option<Genome>) -> GenomeSource {
        match (self, evolved) {
            (Self::Evolved, Some(genome)) => GenomeSource::Evolved(genome),
            _ => GenomeSource::Preset,
        }
    }
}

/// Genome used by a search engine.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::IsVariant)]
pub enum GenomeSource {
    /// Hand-tuned defaults, or the running averages of shared insights when
    /// those are available.
    Preset,
    Evolved(Genome),
}

impl GenomeSource {
    #[must_use]
    pub fn resolve(self, insights: Option<&SharedInsights>) -> Genome {
        match self {
            Self::Evolved(genome) => genome,
            Self::Preset => insights.map_or_else(Genome::default, SharedInsights::default_genome),
        }
    }
}
