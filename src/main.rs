// src/main.rs

use triggerd::engine::DispatchExit;
use triggerd::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(DispatchExit::Shutdown) => {}
        // Outstanding tasks are abandoned; the supervisor restarts us.
        Ok(DispatchExit::Reload) => std::process::exit(0),
        Err(err) => {
            eprintln!("triggerd error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<DispatchExit> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
