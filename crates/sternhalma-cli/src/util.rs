use std::{fs::File, io, path::Path};

use anyhow::Context;
use sternhalma_evaluator::genome::Genome;
use sternhalma_training::state::{BestGenomeRecord, TrainingConfig, TrainingState};

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

pub fn read_config_file<P>(path: P) -> anyhow::Result<TrainingConfig>
where
    P: AsRef<Path>,
{
    read_json_file("training config", path)
}

pub fn read_best_file<P>(path: P) -> anyhow::Result<BestGenomeRecord>
where
    P: AsRef<Path>,
{
    read_json_file("best genome", path)
}

pub fn read_state_file<P>(path: P) -> anyhow::Result<TrainingState>
where
    P: AsRef<Path>,
{
    read_json_file("training state", path)
}

/// Reads either a best genome record or a bare genome.
pub fn read_genome_file<P>(path: P) -> anyhow::Result<Genome>
where
    P: AsRef<Path>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum GenomeFile {
        Record(BestGenomeRecord),
        Genome(Genome),
    }

    let genome = match read_json_file("genome", &path)? {
        GenomeFile::Record(record) => record.genome,
        GenomeFile::Genome(genome) => genome,
    };
    anyhow::ensure!(
        genome.is_within_bounds(),
        "genome in {} is out of bounds",
        path.as_ref().display()
    );
    Ok(genome)
}
