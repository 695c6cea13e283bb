//! Wallet-service answers that deserve their own error instead of a generic
//! fault, and the translation from one to the other.

use crate::overseer::rules::ErrorMessageRule;
use crate::overseer::{FaultKind, Rule, RuleContext, RuleSet};
use crate::Error;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet `{wallet}` is already unlocked")]
    AlreadyUnlocked { wallet: String },

    #[error("invalid password for wallet `{wallet}`")]
    InvalidPassword { wallet: String },

    /// The service rejected the call while still settling; retry after a cooldown.
    #[error("wallet `{wallet}` is not accessible yet")]
    NotYetAccessible { wallet: String },

    #[error("cannot open wallet `{wallet}`: {message}")]
    CannotOpen { wallet: String, message: String },
}

impl WalletError {
    pub fn wallet(&self) -> &str {
        match self {
            WalletError::AlreadyUnlocked { wallet }
            | WalletError::InvalidPassword { wallet }
            | WalletError::NotYetAccessible { wallet }
            | WalletError::CannotOpen { wallet, .. } => wallet,
        }
    }
}

static ALREADY_UNLOCKED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)already unlocked").expect("static pattern"));

static INVALID_PASSWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)invalid password").expect("static pattern"));

static NOT_YET_ACCESSIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not (yet )?accessible").expect("static pattern"));

static CANNOT_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(unable to open|cannot open|wallet .* does not exist)").expect("static pattern")
});

pub fn wallet_already_unlocked(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorMessageRule::new(ctx, FaultKind::WalletAlreadyUnlocked, &ALREADY_UNLOCKED))
}

pub fn invalid_password(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorMessageRule::new(ctx, FaultKind::InvalidPassword, &INVALID_PASSWORD))
}

pub fn not_yet_accessible(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorMessageRule::new(ctx, FaultKind::NotYetAccessible, &NOT_YET_ACCESSIBLE))
}

pub fn cannot_open_wallet(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorMessageRule::new(ctx, FaultKind::CannotOpenWallet, &CANNOT_OPEN))
}

/// Extra preliminary rules for calls made through the wallet facade.
pub fn wallet_rules() -> RuleSet {
    RuleSet::new()
        .with_preliminary(wallet_already_unlocked)
        .with_preliminary(invalid_password)
        .with_preliminary(not_yet_accessible)
        .with_preliminary(cannot_open_wallet)
}

/// Narrow a surrendered call into a [`WalletError`] when its primary fault
/// is one of the wallet kinds; anything else passes through unchanged.
pub fn translate(err: Error, wallet: &str) -> Error {
    let Some((kind, message)) = err.fault().map(|f| (f.kind, f.message.clone())) else {
        return err;
    };
    let wallet = wallet.to_string();
    let translated = match kind {
        FaultKind::WalletAlreadyUnlocked => WalletError::AlreadyUnlocked { wallet },
        FaultKind::InvalidPassword => WalletError::InvalidPassword { wallet },
        FaultKind::NotYetAccessible => WalletError::NotYetAccessible { wallet },
        FaultKind::CannotOpenWallet => WalletError::CannotOpen { wallet, message },
        _ => return err,
    };
    Error::Wallet(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overseer::{parse_response, GroupedFault, RequestPayload, Tier};
    use serde_json::json;
    use url::Url;

    fn classify(body: &str) -> crate::overseer::Classification {
        RuleSet::standard()
            .extended_with(&wallet_rules())
            .instantiate(
                &Url::parse("http://127.0.0.1:8090").unwrap(),
                Arc::new(RequestPayload::single("beekeeper_api.unlock", json!({}))),
            )
            .classify(&parse_response(body))
    }

    #[test]
    fn test_wallet_faults_are_preliminary() {
        let c = classify(
            r#"{"jsonrpc":"2.0","id":0,"error":{"message":"Assert Exception: Wallet is already unlocked: alice"}}"#,
        );
        assert_eq!(c.tier(), Some(Tier::Preliminary));
        assert_eq!(c.faults()[0].kind, FaultKind::WalletAlreadyUnlocked);
    }

    #[test]
    fn test_translate_known_kinds() {
        let c = classify(r#"{"jsonrpc":"2.0","id":0,"error":{"message":"Invalid password for wallet"}}"#);
        let group = GroupedFault::from_faults(c.faults().to_vec()).unwrap();
        let err = translate(group.into(), "alice");
        assert!(matches!(
            err,
            Error::Wallet(WalletError::InvalidPassword { ref wallet }) if wallet == "alice"
        ));
    }

    #[test]
    fn test_translate_leaves_other_errors_alone() {
        let c = classify(r#"{"jsonrpc":"2.0","id":0,"error":{"message":"something else"}}"#);
        assert_eq!(c.tier(), Some(Tier::FinitelyRepeatable));
        let group = GroupedFault::from_faults(c.faults().to_vec()).unwrap();
        let err = translate(group.into(), "alice");
        assert_eq!(err.fault_kind(), Some(FaultKind::ErrorPresent));
    }
}
