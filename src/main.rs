// src/main.rs

use clap::error::ErrorKind;
use connector_sandbox::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = match cli::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            // Usage errors exit with 1 like every other failure.
            let _ = err.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = run_main(args).await {
        eprintln!("connector-sandbox error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main(args: cli::CliArgs) -> anyhow::Result<()> {
    logging::init_logging(args.log_level)?;
    run(args).await
}
