use anyhow::{Context, Result};
use clap::Parser;
use kms_tx_signer::oracle::local::generate_secret;
use kms_tx_signer::utils::logging::{init_tracing, redact_key_id};
use kms_tx_signer::{handle, LocalOracle, SignerConfig, StaticFeeDefaults, TransactionAssembler};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use zeroize::Zeroize;

/// Development private key backing the in-process oracle (hex).
const DEV_KEY_VAR: &str = "SIGNER_DEV_PRIVATE_KEY";

/// Sign one JSON event with the configured key and print the response.
#[derive(Debug, Parser)]
#[command(name = "kms-tx-signer", version, about)]
struct Cli {
    /// Event file; stdin when omitted
    #[arg(long)]
    event: Option<PathBuf>,

    /// Print a fresh development key and its address, then exit
    #[arg(long)]
    generate_dev_key: bool,

    /// Pretty-print the response
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_dev_key {
        return print_dev_key(cli.pretty);
    }

    let config = SignerConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_level)?;
    tracing::debug!(
        key_id = %redact_key_id(&config.key_id),
        network = %config.network,
        "configuration loaded"
    );

    let fees = StaticFeeDefaults::from_env().context("loading fee defaults")?;
    let oracle = dev_oracle(&config)?;
    let assembler = TransactionAssembler::from_config(oracle, fees, &config);

    let event = read_event(cli.event.as_ref())?;
    let response = handle(&assembler, &config, &event)?;

    print_json(&serde_json::to_value(&response)?, cli.pretty)
}

fn dev_oracle(config: &SignerConfig) -> Result<LocalOracle> {
    let mut secret_hex = std::env::var(DEV_KEY_VAR)
        .with_context(|| format!("{} must hold the development private key", DEV_KEY_VAR))?;
    let oracle = LocalOracle::from_hex(config.key_id.clone(), &secret_hex);
    secret_hex.zeroize();
    Ok(oracle?)
}

fn read_event(path: Option<&PathBuf>) -> Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading event from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

fn print_dev_key(pretty: bool) -> Result<()> {
    let secret = generate_secret();
    let oracle = LocalOracle::with_key("dev", secret);
    let address = oracle
        .address("dev")
        .context("derived key is missing from the oracle")?;

    let mut secret_hex = hex::encode(secret.secret_bytes());
    let result = print_json(
        &json!({
            "private_key": secret_hex,
            "address": address.checksummed(),
        }),
        pretty,
    );
    secret_hex.zeroize();
    result
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}
