//! Login command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use passkey_core::PublicKeyCredentialRequestOptions;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use url::Url;

use super::{resolve_origin, StartResponse};
use crate::client::ApiClient;
use crate::keyfile;

#[derive(Deserialize)]
struct FinishLogin {
    counter: u32,
}

pub struct LoginArgs {
    pub server: Url,
    pub user: String,
    pub key: PathBuf,
    pub origin: Option<String>,
}

/// Execute the login command.
pub async fn execute(args: LoginArgs, quiet: bool) -> Result<()> {
    let mut authenticator = keyfile::load(&args.key)?;
    let origin = resolve_origin(&args.server, args.origin)?;
    let client = ApiClient::new(args.server)?;

    let start: StartResponse<PublicKeyCredentialRequestOptions> = client
        .post("login/start", &json!({ "username": args.user }))
        .await
        .context("Login start failed")?;
    info!(
        user = %args.user,
        allowed = start.public_key.allow_credentials.len(),
        "Received request options"
    );

    let credential = authenticator
        .authenticate(&start.public_key, &origin)
        .context("Authenticator holds none of the allowed credentials")?;

    // The counter moved even if the server rejects the assertion
    keyfile::save(&args.key, &authenticator)?;

    let finish: FinishLogin = client
        .post(
            "login/finish",
            &json!({
                "username": args.user,
                "session": start.session,
                "credential": credential,
            }),
        )
        .await
        .context("Login finish failed")?;
    info!(counter = finish.counter, "Login verified");

    if !quiet {
        println!("{} {}", "✓".green().bold(), "Login verified".green());
        println!("   {} {}", "User:".dimmed(), args.user);
        println!(
            "   {} {}",
            "Credential:".dimmed(),
            authenticator.credential_id()
        );
        println!("   {} {}", "Counter:".dimmed(), finish.counter);
    }
    Ok(())
}
