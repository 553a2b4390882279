use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "architect-ledger")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML file with [mining] settings")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "demo",
        about = "Mint coins, move them between wallets and validate the chain"
    )]
    Demo {
        #[arg(long = "difficulty", help = "Leading zero hex digits required per block")]
        difficulty: Option<u32>,
        #[arg(long = "json", help = "Print the finished chain as JSON")]
        json: bool,
    },
    #[command(name = "mine", about = "Mine empty blocks on a fresh chain")]
    Mine {
        #[arg(long = "blocks", default_value_t = 3, help = "Number of blocks to mine")]
        blocks: usize,
        #[arg(long = "difficulty", help = "Leading zero hex digits required per block")]
        difficulty: Option<u32>,
        #[arg(long = "timeout-secs", help = "Give up on a block after this many seconds")]
        timeout_secs: Option<u64>,
    },
}
