use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod keymap;
mod run;

/// Runs a Chip-8 ROM in an SDL2 window.
///
/// Hold Space to ignore `--delay`, hold Escape to rewind.
#[derive(Parser, Debug)]
#[command(name = "octet", version, about)]
pub struct Args {
    /// ROM image to load at 0x200.
    #[arg(value_name = "ROM")]
    rom: PathBuf,

    /// Size of one Chip-8 pixel on screen.
    #[arg(long, default_value_t = 10)]
    scale: u32,

    /// Milliseconds to wait between frames. Timers tick once per cycle, so
    /// the default of 16 keeps them close to 60Hz.
    #[arg(long, default_value_t = 16)]
    delay: u64,

    /// CPU cycles to run per frame.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    cycles_per_frame: u32,

    /// Seed for RND; seeded from the clock when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Most verbose log level to print (off, error, warn, info, debug, trace).
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    SimpleLogger::new().with_level(args.log_level).init()?;
    run::run(&args)
}
