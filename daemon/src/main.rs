//! Rumorality daemon: command-line entry point.

mod simulate;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rumorality_crypto::{decode_public_key, decode_signature, derive_identity_id, generate_keypair};
use rumorality_node::{init_logging, LogFormat, NodeConfig};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "rumorality", about = "Rumorality reputation-weighted rumor verification")]
struct Cli {
    /// Log level filter; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "RUMORALITY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "RUMORALITY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. Settings from the file are the
    /// base; CLI flags and env vars override them.
    #[arg(long, env = "RUMORALITY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Generate a fresh Ed25519 identity and print it as JSON.
    Keygen,

    /// Print the effective configuration as TOML.
    Config,

    /// Check a hex signature over a message against a hex public key.
    Verify {
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
        #[arg(long)]
        public_key: String,
    },

    /// Run several nodes in-process on a memory mesh and report the result.
    Simulate(simulate::SimulateArgs),
}

#[derive(Serialize)]
struct KeygenOutput {
    id: String,
    public_key: String,
    private_key: String,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path_str = path.to_string_lossy();
            let config = NodeConfig::from_toml_file(&path_str)
                .with_context(|| format!("loading config from {}", path.display()))?;
            tracing::info!(path = %path.display(), "loaded config");
            config
        }
        None => NodeConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Keygen => {
            let keypair = generate_keypair();
            let output = KeygenOutput {
                id: derive_identity_id(&keypair.public).to_string(),
                public_key: keypair.public.to_hex(),
                private_key: hex::encode(keypair.private.0),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Verify {
            message,
            signature,
            public_key,
        } => {
            let key = decode_public_key(&public_key)?;
            let sig = decode_signature(&signature)?;
            let valid = rumorality_crypto::verify_signature(message.as_bytes(), &sig, &key);
            println!("{}", serde_json::json!({ "valid": valid }));
            if !valid {
                std::process::exit(1);
            }
        }
        Command::Simulate(args) => {
            let report = simulate::run(config, args).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
