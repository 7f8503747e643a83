//! Shared helpers for integration tests

#![allow(dead_code)]

use alloy_primitives::B256;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use siwe_auth_server::config::SiweOptions;

pub const DOMAIN: &str = "app.example";
pub const STATEMENT: &str = "Sign in to Example";
pub const URI: &str = "https://app.example/login";

pub fn options(prevent_replay: bool) -> SiweOptions {
    SiweOptions::new(DOMAIN, STATEMENT, "1", prevent_replay, 300_000)
        .expect("valid test options")
}

pub fn signer() -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&B256::from([0x17u8; 32])).expect("valid secret")
}

/// EIP-191 signature of `message`, hex encoded with `0x`
pub fn sign(signer: &PrivateKeySigner, message: &str) -> String {
    let signature = signer
        .sign_message_sync(message.as_bytes())
        .expect("signing succeeds");
    format!("0x{}", hex::encode(signature.as_bytes()))
}
