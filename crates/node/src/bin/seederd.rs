// Path: crates/node/src/bin/seederd.rs
#![forbid(unsafe_code)]

use clap::Parser;
use dasboot_types::config::SeederConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "seederd", about = "DAS BOOT provisioning seeder")]
struct Opts {
    /// Path to the seeder configuration file.
    #[clap(long, default_value = "/etc/das-boot/seeder.toml")]
    config: PathBuf,
}

fn load_config(path: &PathBuf) -> Result<SeederConfig, anyhow::Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    toml::from_str(&text).map_err(|e| anyhow::anyhow!("invalid {}: {e}", path.display()))
}

#[tokio::main]
async fn main() {
    // Install default crypto provider for rustls 0.23+.
    let _ = rustls::crypto::ring::default_provider().install_default();
    if let Err(e) = dasboot_telemetry::init::init_tracing("seederd") {
        eprintln!("cannot initialize logging: {e}");
    }

    let opts = Opts::parse();
    let config = match load_config(&opts.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(target: "seeder", error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    if let Err(e) = dasboot_node::seeder::run(config).await {
        tracing::error!(target: "seeder", error = %e, "seeder failed");
        std::process::exit(1);
    }
}
