// src/main.rs

use taskq::cli::{self, Command};
use taskq::{logging, run};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("tq error: {err}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    // The daemon sets up logging itself, after it has detached.
    if !matches!(args.command, Command::Start { .. }) {
        logging::init_logging(args.log_level, tracing::Level::WARN)?;
    }
    run(args)?;
    Ok(())
}
