//! Token commands.
//!
//! `elv-token decode` - Print the claims of a token as JSON.
//! `elv-token explain` - Print the byte budget of a token.
//! `elv-token verify` - Verify a token against trusted signers.
//! `elv-token mint` - Mint and sign a new token.

use anyhow::{bail, Context};
use clap::ValueEnum;
use elv_core::config::{parse_duration, ANY_CONTENT};
use elv_core::{Address, Id, KeyPair, TokenConfig};
use elv_eat::{describe, Grant, Token, TokenBuilder, TokenFormat, Verifier};
use std::fs;
use std::path::{Path, PathBuf};

/// Token types that can be minted from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MintKind {
    Anonymous,
    Plain,
    StateChannel,
    EditorSigned,
    ClientSigned,
}

/// Arguments of `elv-token mint`.
#[derive(Debug, Clone)]
pub struct MintArgs {
    pub kind: MintKind,
    pub space: String,
    pub lib: Option<String>,
    pub content: Option<String>,
    pub subject: Option<String>,
    pub grant: Option<String>,
    pub validity: Option<String>,
    pub format: Option<String>,
    pub key: Option<String>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Read a token from a file if the argument names one, otherwise use it as is.
fn read_token(token: &str) -> anyhow::Result<String> {
    let path = Path::new(token);
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        return Ok(content.trim().to_string());
    }
    Ok(token.trim().to_string())
}

/// Resolve a private key from either a file path or a hex-encoded string,
/// falling back to the key configured in `config`.
fn resolve_private_key(key: Option<String>, config: &TokenConfig) -> anyhow::Result<KeyPair> {
    if let Some(key_str) = key {
        // If it looks like a file path and the file exists, load from file
        let path = Path::new(&key_str);
        if path.exists() {
            return KeyPair::load_from_file(path).with_context(|| {
                format!("Failed to load private key from file: {}", path.display())
            });
        }
        return KeyPair::from_private_key_hex(key_str.trim())
            .context("Failed to parse private key. Expected hex-encoded secp256k1 private key");
    }

    config
        .resolve_private_key()
        .context("Failed to load configured private key")?
        .context("Private key not provided. Either pass --key <path|hex> or set ELV_PRIVATE_KEY env var")
}

/// Resolve an address from either a file path or a hex string.
fn resolve_address(addr: &str) -> anyhow::Result<Address> {
    let path = Path::new(addr);
    let addr_str = if path.exists() {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read address file: {}", path.display()))?
    } else {
        addr.to_string()
    };
    Address::parse(addr_str.trim()).context("Failed to parse address. Expected 20 hex bytes")
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TokenConfig> {
    match path {
        Some(path) => TokenConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display())),
        None => Ok(TokenConfig::default()),
    }
}

fn parse_id(s: &str, what: &str) -> anyhow::Result<Id> {
    Id::parse(s.trim()).with_context(|| format!("Invalid {what} ID: {s}"))
}

/// Pretty-printed JSON view of a token.
fn decode_to_string(token: &str) -> anyhow::Result<String> {
    let token = Token::parse(token).context("Failed to decode token")?;
    let json = token.to_json()?;
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Decode a token and print its claims.
pub fn decode(token: String) -> anyhow::Result<()> {
    let token = read_token(&token)?;
    println!("{}", decode_to_string(&token)?);
    Ok(())
}

/// Print the byte budget of a token.
pub fn explain(token: String) -> anyhow::Result<()> {
    let token = read_token(&token)?;
    let description = describe(&token).context("Failed to decode token")?;
    print!("{description}");
    Ok(())
}

/// Verify a token and render the resulting authorization.
fn verify_to_string(
    token: &str,
    config: Option<&Path>,
    trusted: Option<&str>,
) -> anyhow::Result<String> {
    let mut config = load_config(config)?;
    if let Some(trusted) = trusted {
        let address = resolve_address(trusted)?;
        config
            .trusted_signers
            .insert(ANY_CONTENT.to_string(), address.to_string());
    }

    tracing::debug!(trusted = config.trusted_signers.len(), "Verifying token");
    let verifier = Verifier::new(config)?;
    let auth = verifier
        .authorize(token)
        .context("Token verification failed")?;

    let mut out = String::from("✔ Token is valid\n\n");
    out.push_str(&format!("Type:     {}\n", auth.token().token_type()));
    out.push_str(&format!("Format:   {}\n", auth.token().format()));
    if let Some(embedded) = auth.token().embedded() {
        out.push_str(&format!("Embedded: {}\n", embedded.token_type()));
    }
    if !auth.subject().is_empty() {
        out.push_str(&format!("Subject:  {}\n", auth.subject()));
    }
    if let Some(sid) = auth.space_id() {
        out.push_str(&format!("Space:    {sid}\n"));
    }
    if let Some(qid) = auth.content_id() {
        out.push_str(&format!("Content:  {qid}\n"));
    }
    if let Some(grant) = auth.grant() {
        out.push_str(&format!("Grant:    {grant}\n"));
    }
    if let Some(address) = auth.client_address() {
        out.push_str(&format!("Client:   {address}\n"));
    }
    if let Some(expires) = auth.data().expires {
        out.push_str(&format!("Expires:  {}\n", expires.to_rfc3339()));
    }
    Ok(out)
}

/// Verify a token against the configured trusted signers.
pub fn verify(
    token: String,
    config: Option<PathBuf>,
    trusted: Option<String>,
) -> anyhow::Result<()> {
    let token = read_token(&token)?;
    print!(
        "{}",
        verify_to_string(&token, config.as_deref(), trusted.as_deref())?
    );
    Ok(())
}

/// Build, sign and encode a token.
fn mint_to_string(args: &MintArgs) -> anyhow::Result<String> {
    let config = load_config(args.config.as_deref())?;
    tracing::debug!(kind = ?args.kind, format = ?args.format, "Minting token");

    let sid = parse_id(&args.space, "space")?;
    let lid = match &args.lib {
        Some(lib) => parse_id(lib, "library")?,
        None => Id::default(),
    };
    let qid = match &args.content {
        Some(content) => Some(parse_id(content, "content")?),
        None => None,
    };
    let subject = args.subject.clone().unwrap_or_default();

    let mut builder = match args.kind {
        MintKind::Anonymous => TokenBuilder::new_anonymous(&sid, &lid),
        MintKind::Plain => TokenBuilder::new_plain(&sid, &lid),
        MintKind::StateChannel => {
            let qid = qid.as_ref().context("--content is required for state-channel tokens")?;
            TokenBuilder::new_state_channel(&sid, &lid, qid, &subject)
        }
        MintKind::EditorSigned => {
            let qid = qid.as_ref().context("--content is required for editor-signed tokens")?;
            TokenBuilder::new_editor_signed(&sid, &lid, qid)
        }
        MintKind::ClientSigned => TokenBuilder::new_client_signed(&sid, &lid),
    };

    builder = builder.with_config(&config);
    if let Some(qid) = &qid {
        if !matches!(args.kind, MintKind::StateChannel | MintKind::EditorSigned) {
            builder = builder.with_content_id(qid);
        }
    }
    if !subject.is_empty() {
        builder = builder.with_subject(subject);
    }
    if let Some(grant) = &args.grant {
        builder = builder.with_grant(Grant::parse(grant)?);
    }
    if let Some(validity) = &args.validity {
        let validity = parse_duration(validity)
            .with_context(|| format!("Invalid validity: {validity}"))?;
        builder = builder.with_validity(validity);
    }
    if let Some(format) = &args.format {
        let Some(format) = TokenFormat::from_name(format) else {
            bail!("Unknown token format: {format}");
        };
        builder = builder.with_format(format);
    }

    if args.kind != MintKind::Anonymous {
        let keypair = resolve_private_key(args.key.clone(), &config)?;
        builder = builder.sign(&keypair);
    }

    Ok(builder.encode().context("Failed to mint token")?)
}

/// Mint a token and write it to stdout or a file.
pub fn mint(args: MintArgs) -> anyhow::Result<()> {
    let token = mint_to_string(&args)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &token)
            .with_context(|| format!("Failed to write token: {}", output_path.display()))?;
        println!("✔ Token written to {}", output_path.display());
    } else {
        println!("{token}");
    }

    Ok(())
}
