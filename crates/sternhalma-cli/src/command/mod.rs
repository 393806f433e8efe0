use clap::{Parser, Subcommand};

use self::{play::PlayArg, show_best::ShowBestArg, train::TrainArg};

mod play;
mod show_best;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Play a headless game between AI players
    Play(#[clap(flatten)] PlayArg),
    /// Run the evolutionary trainer for one batch, or repeatedly
    Train(#[clap(flatten)] TrainArg),
    /// Print the best genome found by training
    ShowBest(#[clap(flatten)] ShowBestArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Play(arg) => play::run(&arg)?,
        Mode::Train(arg) => train::run(&arg)?,
        Mode::ShowBest(arg) => show_best::run(&arg)?,
    }
    Ok(())
}
