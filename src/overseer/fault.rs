use super::request::RequestPayload;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Every anomaly a rule can report. Retryability is fixed per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    UnparsableResponse,
    ApiNotFound,
    DatabaseLock,
    CountMismatch,
    ProxyResponse,
    ErrorPresent,
    NullResult,
    WalletAlreadyUnlocked,
    InvalidPassword,
    NotYetAccessible,
    CannotOpenWallet,
}

impl FaultKind {
    pub fn retryable(self) -> bool {
        match self {
            FaultKind::UnparsableResponse
            | FaultKind::DatabaseLock
            | FaultKind::CountMismatch
            | FaultKind::ProxyResponse
            | FaultKind::ErrorPresent
            | FaultKind::NullResult
            | FaultKind::NotYetAccessible => true,
            FaultKind::ApiNotFound
            | FaultKind::WalletAlreadyUnlocked
            | FaultKind::InvalidPassword
            | FaultKind::CannotOpenWallet => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FaultKind::UnparsableResponse => "unparsable_response",
            FaultKind::ApiNotFound => "api_not_found",
            FaultKind::DatabaseLock => "database_lock",
            FaultKind::CountMismatch => "count_mismatch",
            FaultKind::ProxyResponse => "proxy_response",
            FaultKind::ErrorPresent => "error_present",
            FaultKind::NullResult => "null_result",
            FaultKind::WalletAlreadyUnlocked => "wallet_already_unlocked",
            FaultKind::InvalidPassword => "invalid_password",
            FaultKind::NotYetAccessible => "not_yet_accessible",
            FaultKind::CannotOpenWallet => "cannot_open_wallet",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One classification outcome, carrying the context it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub url: String,
    pub request: Arc<RequestPayload>,
    /// The response item that triggered the rule.
    pub response: Option<Value>,
    /// The complete response, for batch diagnostics.
    pub whole_response: Option<Value>,
    /// Undecodable body text, set by the unparsable-response rule.
    pub raw_response: Option<String>,
    /// Batch correlation key.
    pub request_id: Option<u64>,
    pub message: String,
}

impl Fault {
    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (url: {}", self.kind, self.message, self.url)?;
        if let Some(id) = self.request_id {
            write!(f, ", request id: {}", id)?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for Fault {}

/// All faults of one classification pass. Never empty; the first fault is
/// the one reported as the cause of surrender.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedFault {
    faults: Vec<Fault>,
}

impl GroupedFault {
    pub fn from_faults(faults: Vec<Fault>) -> Option<Self> {
        if faults.is_empty() {
            None
        } else {
            Some(Self { faults })
        }
    }

    pub fn single(fault: Fault) -> Self {
        Self {
            faults: vec![fault],
        }
    }

    pub fn primary(&self) -> &Fault {
        &self.faults[0]
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Faults keyed by the batch request id they belong to; the first fault
    /// wins when one item produced several.
    pub fn correlated(&self) -> BTreeMap<u64, &Fault> {
        let mut map = BTreeMap::new();
        for fault in &self.faults {
            if let Some(id) = fault.request_id {
                map.entry(id).or_insert(fault);
            }
        }
        map
    }

    pub fn is_correlated(&self) -> bool {
        self.faults.iter().any(|f| f.request_id.is_some())
    }
}

impl fmt::Display for GroupedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary())?;
        if self.faults.len() > 1 {
            write!(f, " (+{} more)", self.faults.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for GroupedFault {}
