//! Inspect command implementation.
//!
//! Decodes raw WebAuthn payloads without verifying them.

use anyhow::{Context, Result};
use ciborium::Value as CborValue;
use clap::ValueEnum;
use colored::Colorize;
use passkey_core::credential::format_aaguid;
use passkey_core::protocol::{AuthenticatorData, ClientData};
use passkey_core::{base64url, AttestationObject, CeremonyError};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Payload {
    /// CBOR attestation object from a registration response
    Attestation,
    /// Binary authenticator data from an assertion
    AuthenticatorData,
    /// clientDataJSON from either ceremony
    ClientData,
}

/// Execute the inspect command.
pub fn execute(payload: Payload, input: &str, json_output: bool) -> Result<()> {
    let bytes = base64url::decode(input.trim())
        .map_err(|e| CeremonyError::Malformed(format!("input is not base64url: {e}")))?;

    let report = match payload {
        Payload::Attestation => {
            let object = AttestationObject::decode(&bytes).context("Invalid attestation object")?;
            json!({
                "fmt": object.format.as_str(),
                "attStmt": object
                    .statement
                    .iter()
                    .map(|(k, _)| cbor_key(k))
                    .collect::<Vec<_>>(),
                "authData": auth_data_json(&object.auth_data),
            })
        }
        Payload::AuthenticatorData => {
            let auth_data =
                AuthenticatorData::parse(&bytes).context("Invalid authenticator data")?;
            auth_data_json(&auth_data)
        }
        Payload::ClientData => {
            let client_data = ClientData::parse(&bytes).context("Invalid clientDataJSON")?;
            let mut report = serde_json::to_value(&client_data.collected)?;
            report["sha256"] = json!(hex::encode(client_data.hash));
            report
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, 0);
    }
    Ok(())
}

fn auth_data_json(auth_data: &AuthenticatorData) -> Value {
    let flags = auth_data.flags;
    let mut report = json!({
        "rpIdHash": hex::encode(auth_data.rp_id_hash),
        "flags": {
            "raw": format!("0x{:02x}", flags.bits()),
            "userPresent": flags.user_present(),
            "userVerified": flags.user_verified(),
            "backupEligible": flags.backup_eligible(),
            "backupState": flags.backup_state(),
            "attestedCredentialData": flags.attested_credential_data(),
            "extensionData": flags.extension_data(),
        },
        "signCount": auth_data.sign_count,
    });
    if let Some(attested) = &auth_data.attested_credential {
        report["attestedCredential"] = json!({
            "aaguid": format_aaguid(&attested.aaguid),
            "credentialId": attested.credential_id.to_string(),
            "algorithm": attested.public_key.algorithm().to_string(),
        });
    }
    if auth_data.extensions.is_some() {
        report["extensions"] = json!(true);
    }
    report
}

fn cbor_key(key: &CborValue) -> String {
    match key {
        CborValue::Text(text) => text.clone(),
        other => format!("{other:?}"),
    }
}

fn print_report(value: &Value, depth: usize) {
    let indent = "   ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::Object(_) => {
                        println!("{indent}{}", format!("{key}:").bold());
                        print_report(value, depth + 1);
                    }
                    _ => println!("{indent}{} {}", format!("{key}:").dimmed(), scalar(value)),
                }
            }
        }
        other => println!("{indent}{}", scalar(other)),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".green().to_string(),
        Value::Bool(false) => "no".red().to_string(),
        Value::Array(items) if items.is_empty() => "(empty)".to_string(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
