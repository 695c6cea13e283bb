//! Parameter and result shapes of `beekeeper_api`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TokenParams<'a> {
    pub token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WalletParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateSessionParams<'a> {
    pub salt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_endpoint: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateSessionResult {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    pub now: String,
    pub timeout_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletDetails {
    pub name: String,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WalletList {
    pub wallets: Vec<WalletDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateResult {
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UnlockParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SetTimeoutParams<'a> {
    pub token: &'a str,
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ImportKeyParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
    pub wif_key: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PublicKeyResult {
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct KeyParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
    pub public_key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PublicKeysParams<'a> {
    pub token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PublicKeys {
    pub keys: Vec<PublicKeyResult>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SignDigestParams<'a> {
    pub token: &'a str,
    pub sig_digest: &'a str,
    pub public_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SignatureResult {
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExistsResult {
    pub exists: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UnlockedResult {
    pub unlocked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EncryptParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
    pub from_public_key: &'a str,
    pub to_public_key: &'a str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EncryptResult {
    pub encrypted_content: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DecryptParams<'a> {
    pub token: &'a str,
    pub wallet_name: &'a str,
    pub from_public_key: &'a str,
    pub to_public_key: &'a str,
    pub encrypted_content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DecryptResult {
    pub decrypted_content: String,
}

/// Snapshot of a session fetched in one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub info: SessionInfo,
    pub wallets: Vec<WalletDetails>,
}
