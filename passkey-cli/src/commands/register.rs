//! Register command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use passkey_core::{
    CoseAlgorithm, PublicKeyCredentialCreationOptions, SoftAttestation, SoftAuthenticator,
};
use serde_json::{json, Value};
use tracing::info;
use url::Url;

use super::{resolve_origin, StartResponse};
use crate::client::ApiClient;
use crate::keyfile;

pub struct RegisterArgs {
    pub server: Url,
    pub user: String,
    pub key: PathBuf,
    pub origin: Option<String>,
    pub algorithm: CoseAlgorithm,
    pub attestation: SoftAttestation,
    pub force: bool,
}

/// Execute the register command.
pub async fn execute(args: RegisterArgs, quiet: bool) -> Result<()> {
    keyfile::ensure_writable(&args.key, args.force)?;
    let origin = resolve_origin(&args.server, args.origin)?;
    let client = ApiClient::new(args.server)?;

    let start: StartResponse<PublicKeyCredentialCreationOptions> = client
        .post("register/start", &json!({ "username": args.user }))
        .await
        .context("Registration start failed")?;
    info!(
        user = %args.user,
        rp_id = %start.public_key.rp.id,
        excluded = start.public_key.exclude_credentials.len(),
        "Received creation options"
    );

    let mut authenticator = SoftAuthenticator::new(args.algorithm);
    let credential = authenticator
        .register(&start.public_key, &origin, args.attestation)
        .context("Authenticator refused the creation options")?;

    let _: Value = client
        .post(
            "register/finish",
            &json!({
                "username": args.user,
                "session": start.session,
                "credential": credential,
            }),
        )
        .await
        .context("Registration finish failed")?;

    keyfile::save(&args.key, &authenticator)?;
    info!(credential = %authenticator.credential_id(), "Credential registered");

    if !quiet {
        println!("{} {}", "✓".green().bold(), "Passkey registered".green());
        println!("   {} {}", "User:".dimmed(), args.user);
        println!(
            "   {} {}",
            "Credential:".dimmed(),
            authenticator.credential_id()
        );
        println!("   {} {}", "Algorithm:".dimmed(), args.algorithm);
        println!("   {} {}", "Key file:".dimmed(), args.key.display());
    }
    Ok(())
}
