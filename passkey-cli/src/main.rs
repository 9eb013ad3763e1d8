//! Passkey CLI - drive WebAuthn ceremonies against a passkey server.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use passkey_core::{CoseAlgorithm, SoftAttestation};
use tracing_subscriber::EnvFilter;
use url::Url;

mod client;
mod commands;
mod exit_codes;
mod keyfile;

use commands::inspect::Payload;
use commands::login::LoginArgs;
use commands::register::RegisterArgs;

#[derive(Parser)]
#[command(name = "passkey")]
#[command(author, version, about = "WebAuthn passkey client with a software authenticator", long_about = None)]
#[command(after_help = exit_codes::HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a passkey for USER and save the authenticator to KEY
    Register {
        /// Server base URL
        #[arg(long, default_value = "http://localhost:8080")]
        server: Url,

        /// Provisioned user name
        #[arg(long)]
        user: String,

        /// Key file to create
        #[arg(long, value_name = "FILE")]
        key: PathBuf,

        /// Origin reported in client data (defaults to the server's origin)
        #[arg(long)]
        origin: Option<String>,

        /// Credential key algorithm
        #[arg(long, value_enum, default_value_t = Algorithm::Es256)]
        alg: Algorithm,

        /// Attestation statement to emit
        #[arg(long, value_enum, default_value_t = Attestation::None)]
        attestation: Attestation,

        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Log in as USER with the authenticator saved in KEY
    Login {
        /// Server base URL
        #[arg(long, default_value = "http://localhost:8080")]
        server: Url,

        /// Provisioned user name
        #[arg(long)]
        user: String,

        /// Key file written by `register`
        #[arg(long, value_name = "FILE")]
        key: PathBuf,

        /// Origin reported in client data (defaults to the server's origin)
        #[arg(long)]
        origin: Option<String>,
    },

    /// Decode a base64url WebAuthn payload
    Inspect {
        /// Payload kind
        #[arg(value_enum)]
        payload: Payload,

        /// Base64url-encoded bytes
        #[arg(value_name = "BASE64URL", allow_hyphen_values = true)]
        input: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Es256,
    Eddsa,
}

impl From<Algorithm> for CoseAlgorithm {
    fn from(alg: Algorithm) -> Self {
        match alg {
            Algorithm::Es256 => CoseAlgorithm::Es256,
            Algorithm::Eddsa => CoseAlgorithm::EdDsa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Attestation {
    None,
    Packed,
}

impl From<Attestation> for SoftAttestation {
    fn from(attestation: Attestation) -> Self {
        match attestation {
            Attestation::None => SoftAttestation::None,
            Attestation::Packed => SoftAttestation::PackedSelf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info,passkey=info,passkey_core=info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Register {
            server,
            user,
            key,
            origin,
            alg,
            attestation,
            force,
        } => {
            let args = RegisterArgs {
                server,
                user,
                key,
                origin,
                algorithm: alg.into(),
                attestation: attestation.into(),
                force,
            };
            commands::register::execute(args, cli.quiet).await
        }
        Commands::Login {
            server,
            user,
            key,
            origin,
        } => {
            let args = LoginArgs {
                server,
                user,
                key,
                origin,
            };
            commands::login::execute(args, cli.quiet).await
        }
        Commands::Inspect {
            payload,
            input,
            json,
        } => commands::inspect::execute(payload, &input, json),
    };

    match result {
        Ok(()) => std::process::ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red().bold());
            std::process::ExitCode::from(exit_codes::classify(&err))
        }
    }
}
