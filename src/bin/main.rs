use std::error::Error;

use tracing_subscriber::EnvFilter;

use warden::{
    cli::{parse_args, Cli, Commands},
    config::parse_duration,
    tail,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    match args.command {
        Commands::Tail { id, url, interval } => {
            let interval = parse_duration(&interval)?;
            tail::tail_logs(&url, &id, interval)?;
        }
    }

    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
