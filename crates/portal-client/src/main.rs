//! `ncd-portal`: operator CLI for the NCD portal backend.
//!
//! Subcommands:
//! - `decode`: decode an envelope or bare token with the response key.
//! - `seal`: seal a JSON value into a token (fixtures, backend debugging).
//! - `keygen`: print a fresh random response key.
//! - `fetch`: GET a backend path and print the decoded payload.
//!
//! `decode` and `seal` only need the key; `fetch` loads the full [`Config`]
//! from `NCD_*` environment variables.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::ResponseEnvelope;
use rand::{rngs::OsRng, RngCore};
use serde_json::Value;
use tracing::{info, warn};

use portal_client::api::{ApiClient, Resource};
use portal_client::config::Config;
use portal_client::crypto::{key::KEY_LEN, SymmetricKey, Token};
use portal_client::envelope::{DecoderConfig, Outcome, ResponseDecoder, TagPolicy};
use portal_client::telemetry;

#[derive(Parser)]
#[command(name = "ncd-portal", about = "NCD portal client utility", version)]
struct Cli {
    /// Log level when RUST_LOG is unset; overrides NCD_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Decode(DecodeArgs),
    Seal(SealArgs),
    Keygen,
    Fetch(FetchArgs),
}

#[derive(Args, Clone)]
struct KeyArgs {
    /// base64url response key.
    #[arg(long, env = "NCD_RESPONSE_ENCRYPTION_KEY", hide_env_values = true)]
    key: Option<String>,
}

/// Decode an envelope (JSON) or a bare token; reads stdin when no input is given.
#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    key: KeyArgs,
    /// Bare token string.
    #[arg(long, conflicts_with = "file")]
    token: Option<String>,
    /// File holding an envelope or token.
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,
    /// Reject tokens whose integrity tag does not verify.
    #[arg(long)]
    verify_tag: bool,
}

/// Seal a JSON value into a token.
#[derive(Args)]
struct SealArgs {
    #[command(flatten)]
    key: KeyArgs,
    /// JSON value to seal.
    #[arg(long)]
    json: String,
    /// Print a full `{encrypted, data}` envelope instead of the bare token.
    #[arg(long)]
    envelope: bool,
}

/// GET a backend path, e.g. `series` or `/investors/INV-001`.
#[derive(Args)]
struct FetchArgs {
    path: String,
    /// Print the raw response instead of failing when decoding fails.
    #[arg(long)]
    best_effort: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let flag = cli.log_level.as_deref();

    match cli.command {
        Command::Decode(args) => {
            init_offline_telemetry(flag)?;
            handle_decode(args)
        }
        Command::Seal(args) => {
            init_offline_telemetry(flag)?;
            handle_seal(args)
        }
        Command::Keygen => {
            init_offline_telemetry(flag)?;
            handle_keygen()
        }
        Command::Fetch(args) => {
            let cfg = Config::from_env().context("configuration invalid")?;
            telemetry::init(telemetry::resolve_level(flag, Some(cfg.log_level.as_str())))?;
            handle_fetch(cfg, args).await
        }
    }
}

/// Commands that run without a full [`Config`] still honour `NCD_LOG_LEVEL`.
fn init_offline_telemetry(flag: Option<&str>) -> Result<()> {
    let configured = std::env::var("NCD_LOG_LEVEL").ok();
    telemetry::init(telemetry::resolve_level(flag, configured.as_deref()))
}

fn load_key(args: &KeyArgs) -> Result<Option<SymmetricKey>> {
    match args.key.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(encoded) => SymmetricKey::from_base64url(encoded)
            .map(Some)
            .context("response key is invalid"),
    }
}

fn handle_decode(args: DecodeArgs) -> Result<()> {
    let decoder = ResponseDecoder::new(DecoderConfig {
        enabled: true,
        key: load_key(&args.key)?,
        tag_policy: if args.verify_tag {
            TagPolicy::Verify
        } else {
            TagPolicy::Ignore
        },
    });

    let input = match (args.token, args.file) {
        (Some(token), _) => token,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let payload = match serde_json::from_str::<Value>(input.trim()) {
        Ok(Value::String(token)) => decoder.decode(&token)?,
        Ok(response) => decoder.process_response(response)?,
        Err(_) => decoder.decode(input.trim())?,
    };
    print_json(&payload)
}

fn handle_seal(args: SealArgs) -> Result<()> {
    let key = load_key(&args.key)?.context("sealing requires a response key (--key)")?;
    let value: Value = serde_json::from_str(&args.json).context("--json is not valid JSON")?;
    let token = Token::seal_now(value.to_string().as_bytes(), &key).encode();
    if args.envelope {
        print_json(&serde_json::to_value(ResponseEnvelope::sealed(token))?)
    } else {
        println!("{token}");
        Ok(())
    }
}

fn handle_keygen() -> Result<()> {
    let mut raw = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut raw);
    let key = SymmetricKey::from_bytes(&raw)?;
    raw.iter_mut().for_each(|b| *b = 0);
    println!("{}", key.to_base64url());
    Ok(())
}

async fn handle_fetch(cfg: Config, args: FetchArgs) -> Result<()> {
    let decoder = ResponseDecoder::new(cfg.decoder_config()?);
    if decoder.is_enabled() && !decoder.has_key() {
        warn!("response encryption is enabled but NCD_RESPONSE_ENCRYPTION_KEY is not set");
    }
    let client = ApiClient::new(&cfg, decoder)?;

    let path = match Resource::from_name(&args.path) {
        Some(resource) => resource.path().to_owned(),
        None => args.path.clone(),
    };
    info!(path = %path, best_effort = args.best_effort, "fetching");

    if args.best_effort {
        match client.get_best_effort(&path).await? {
            Outcome::Decoded(value) => print_json(&value),
            Outcome::Fallback { raw, error } => {
                warn!(kind = error.kind(), "printing undecoded response");
                print_json(&raw)
            }
            Outcome::Failed(error) => Err(error.into()),
        }
    } else {
        let value = client.get(&path).await?;
        print_json(&value)
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
