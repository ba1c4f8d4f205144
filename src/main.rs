use clap::Parser;
use std::sync::Arc;

use blobproxy::config::{AppState, Config};
use blobproxy::logger;
use blobproxy::server::{self, signal::ShutdownSignal};

#[derive(Parser, Debug)]
#[command(name = "blobproxy")]
#[command(about = "Serve static content from a blob storage container")]
struct Args {
    /// Config file path, without the .toml extension
    #[arg(short, long, default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Config::load_from(&args.config)?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let state = Arc::new(AppState::from_config(cfg)?);
    logger::log_server_start(&addr, &state.config);

    let shutdown = Arc::new(ShutdownSignal::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown))?;

    server::run(listener, state, shutdown).await?;
    logger::log_info("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("blobproxy").chain(args.iter().copied()))
    }

    #[test]
    fn test_args_config_path() {
        assert_eq!(parse(&[]).unwrap().config, "config");
        assert_eq!(parse(&["-c", "/etc/blobproxy"]).unwrap().config, "/etc/blobproxy");
        assert_eq!(parse(&["--config", "site"]).unwrap().config, "site");
        assert_eq!(parse(&["--config=site"]).unwrap().config, "site");
        assert!(parse(&["-c"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn test_args_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
