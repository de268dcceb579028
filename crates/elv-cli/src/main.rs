use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::token::{MintArgs, MintKind};

#[derive(Parser, Debug)]
#[command(
    name = "elv-token",
    version,
    about = "Decode, verify and mint content fabric authorization tokens"
)]
struct Cli {
    /// Log at debug level, ignoring RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the claims of a token as JSON
    Decode {
        /// Token string or path to a file containing it
        token: String,
    },

    /// Print the byte budget of a token
    Explain {
        /// Token string or path to a file containing it
        token: String,
    },

    /// Verify a token against trusted signers
    Verify {
        /// Token string or path to a file containing it
        token: String,

        /// YAML configuration with trusted signers and time limits
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address trusted for every content, or path to a file containing it
        #[arg(long)]
        trusted: Option<String>,
    },

    /// Mint and sign a new token
    Mint {
        /// Token type
        #[arg(value_enum)]
        kind: MintKind,

        /// Space ID
        #[arg(long)]
        space: String,

        /// Library ID
        #[arg(long)]
        lib: Option<String>,

        /// Content ID, required for state-channel and editor-signed tokens
        #[arg(long)]
        content: Option<String>,

        /// Subject the token is issued to
        #[arg(long)]
        subject: Option<String>,

        /// Grant, e.g. read or update
        #[arg(long)]
        grant: Option<String>,

        /// Validity, e.g. 30m, 1h or 7d
        #[arg(long)]
        validity: Option<String>,

        /// Token format, e.g. json-compressed, cbor or legacy
        #[arg(long)]
        format: Option<String>,

        /// Signing key: hex private key or path to a file containing it
        #[arg(long, env = "ELV_PRIVATE_KEY", hide_env_values = true)]
        key: Option<String>,

        /// YAML configuration with format, validity and key defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the token to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Key management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new secp256k1 keypair
    Generate {
        /// Directory to write private.key and public.addr to
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Decode { token } => commands::token::decode(token)?,
        Command::Explain { token } => commands::token::explain(token)?,
        Command::Verify {
            token,
            config,
            trusted,
        } => commands::token::verify(token, config, trusted)?,
        Command::Mint {
            kind,
            space,
            lib,
            content,
            subject,
            grant,
            validity,
            format,
            key,
            config,
            output,
        } => commands::token::mint(MintArgs {
            kind,
            space,
            lib,
            content,
            subject,
            grant,
            validity,
            format,
            key,
            config,
            output,
        })?,
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output } => commands::keys::generate(output)?,
        },
    }

    Ok(())
}
