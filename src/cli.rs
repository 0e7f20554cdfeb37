use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the tagged code-model document (YAML).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory the output model is written into.
    #[arg(short, long, default_value = "./generated")]
    pub output: PathBuf,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}
