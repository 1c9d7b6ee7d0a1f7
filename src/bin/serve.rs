//! mirrorgate: the policy-gated forwarding gateway server.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use mirrorgate::{Config, Executor, Resolver, Services};

#[derive(Parser)]
#[command(name = "mirrorgate")]
#[command(about = "Policy-gated HTTP forwarding gateway", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short = 'f', long = "config", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let cfg = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            log::error!("failed to load config {:?}: {err}", cli.config);
            process::exit(1);
        }
    };

    let resolver = match Resolver::new(&cfg.dns) {
        Ok(resolver) => Arc::new(resolver),
        Err(err) => {
            log::error!("failed to create resolver: {err}");
            process::exit(1);
        }
    };

    let services = Services::new(resolver, &cfg.mmdb.country);
    let executor = match Executor::new(&cfg.rules, &services) {
        Ok(executor) => Arc::new(executor),
        Err(err) => {
            log::error!("failed to build rule chain: {err}");
            process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&cfg.listen).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind {}: {err}", cfg.listen);
            process::exit(1);
        }
    };

    log::info!("listening on {}", cfg.listen);
    if let Err(err) = mirrorgate::serve(listener, executor).await {
        log::error!("server error: {err}");
        process::exit(1);
    }
}
