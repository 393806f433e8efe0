use std::path::PathBuf;

use sternhalma_evaluator::genome::GenomeField;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ShowBestArg {
    /// Best genome file written by training
    #[arg(long)]
    best: PathBuf,
}

pub(crate) fn run(arg: &ShowBestArg) -> anyhow::Result<()> {
    let record = util::read_best_file(&arg.best)?;

    println!("Best genome");
    println!("  Fitness:    {:.3}", record.fitness);
    println!("  Cycle:      {}", record.cycle);
    println!("  Generation: {}", record.generation);
    println!("  Updated at: {}", record.updated_at);
    println!("  Fields:");
    for field in GenomeField::ALL {
        let bounds = field.bounds();
        println!(
            "    {:<24} {:>8.3}  (default {:.3}, {}..={})",
            field.to_string(),
            record.genome.get(field),
            field.default_value(),
            bounds.start(),
            bounds.end(),
        );
    }
    Ok(())
}
