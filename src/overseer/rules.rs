//! Built-in response rules.
//!
//! A rule is bound to one call through [`RuleContext`] and inspects parsed
//! responses for a single anomaly. By default a batch is inspected item by
//! item; rules that need the whole array override [`Rule::check`].

use super::fault::{Fault, FaultKind};
use super::request::{RequestPayload, JSONRPC_VERSION};
use super::response::{error_message, item_id, ParsedResponse};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

/// The call a rule instance is bound to.
#[derive(Debug)]
pub struct RuleContext {
    pub url: Url,
    pub request: Arc<RequestPayload>,
}

impl RuleContext {
    pub fn new(url: Url, request: Arc<RequestPayload>) -> Self {
        Self { url, request }
    }

    /// Build a fault for `item` (or for the whole response when `item` is
    /// `None`). Batch items carry their id as correlation key.
    pub fn fault(
        &self,
        kind: FaultKind,
        message: impl Into<String>,
        item: Option<&Map<String, Value>>,
        whole: &ParsedResponse,
    ) -> Fault {
        let request_id = match whole {
            ParsedResponse::Batch(_) => item.and_then(item_id),
            _ => None,
        };
        Fault {
            kind,
            url: self.url.to_string(),
            request: Arc::clone(&self.request),
            response: item.map(|m| Value::Object(m.clone())),
            whole_response: whole.as_json(),
            raw_response: None,
            request_id,
            message: message.into(),
        }
    }
}

pub trait Rule: Send + Sync {
    /// The kind of fault this rule reports.
    fn expected_fault(&self) -> FaultKind;

    fn check(&self, response: &ParsedResponse) -> Vec<Fault> {
        check_each_item(self, response)
    }

    fn check_item(&self, _item: &Map<String, Value>, _whole: &ParsedResponse) -> Option<Fault> {
        None
    }
}

/// Run `rule` over the single item or over every batch item.
pub fn check_each_item<R: Rule + ?Sized>(rule: &R, response: &ParsedResponse) -> Vec<Fault> {
    match response {
        ParsedResponse::Single(item) => rule.check_item(item, response).into_iter().collect(),
        ParsedResponse::Batch(items) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|item| rule.check_item(item, response))
            .collect(),
        ParsedResponse::Failure { .. } => Vec::new(),
    }
}

/// Factory binding a rule type to one call.
pub type RuleFactory = fn(Arc<RuleContext>) -> Box<dyn Rule>;

/// The body could not be decoded as a JSON-RPC envelope.
pub struct UnparsableResponse {
    ctx: Arc<RuleContext>,
}

impl UnparsableResponse {
    pub fn new(ctx: Arc<RuleContext>) -> Self {
        Self { ctx }
    }
}

impl Rule for UnparsableResponse {
    fn expected_fault(&self) -> FaultKind {
        FaultKind::UnparsableResponse
    }

    fn check(&self, response: &ParsedResponse) -> Vec<Fault> {
        match response {
            ParsedResponse::Failure { raw, message } => {
                let mut fault = self.ctx.fault(
                    FaultKind::UnparsableResponse,
                    format!("response is not valid JSON-RPC: {}", message),
                    None,
                    response,
                );
                fault.raw_response = Some(raw.clone());
                vec![fault]
            }
            _ => Vec::new(),
        }
    }
}

/// Reports items whose `error.message` matches a fixed pattern.
pub struct ErrorMessageRule {
    ctx: Arc<RuleContext>,
    kind: FaultKind,
    pattern: &'static Regex,
}

impl ErrorMessageRule {
    pub fn new(ctx: Arc<RuleContext>, kind: FaultKind, pattern: &'static Regex) -> Self {
        Self { ctx, kind, pattern }
    }
}

impl Rule for ErrorMessageRule {
    fn expected_fault(&self) -> FaultKind {
        self.kind
    }

    fn check_item(&self, item: &Map<String, Value>, whole: &ParsedResponse) -> Option<Fault> {
        let message = error_message(item)?;
        if self.pattern.is_match(message) {
            Some(self.ctx.fault(self.kind, message, Some(item), whole))
        } else {
            None
        }
    }
}

static API_NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)could not find (api|method)").expect("static pattern"));

static DATABASE_LOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)unable to acquire database lock").expect("static pattern"));

pub fn unparsable_response(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(UnparsableResponse::new(ctx))
}

/// The requested API is not registered on the server.
pub fn api_not_found(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorMessageRule::new(ctx, FaultKind::ApiNotFound, &API_NOT_FOUND))
}

/// Transient lock contention inside the node.
pub fn database_lock(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorMessageRule::new(ctx, FaultKind::DatabaseLock, &DATABASE_LOCK))
}

/// A batch must be answered with exactly one item per request.
pub struct CountMismatch {
    ctx: Arc<RuleContext>,
}

impl CountMismatch {
    pub fn new(ctx: Arc<RuleContext>) -> Self {
        Self { ctx }
    }
}

impl Rule for CountMismatch {
    fn expected_fault(&self) -> FaultKind {
        FaultKind::CountMismatch
    }

    fn check(&self, response: &ParsedResponse) -> Vec<Fault> {
        let requested = self.ctx.request.len();
        let received = match (self.ctx.request.is_batch(), response) {
            (true, ParsedResponse::Batch(items)) => items.len(),
            // A lone error object is the server rejecting the batch as a whole;
            // the error rules report that one.
            (true, ParsedResponse::Single(item)) if !item.contains_key("error") => 1,
            _ => return Vec::new(),
        };
        if received == requested {
            return Vec::new();
        }
        let message = if received < requested {
            format!("fewer responses than requested: got {}, expected {}", received, requested)
        } else {
            format!("more responses than requested: got {}, expected {}", received, requested)
        };
        vec![self.ctx.fault(FaultKind::CountMismatch, message, None, response)]
    }
}

pub fn count_mismatch(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(CountMismatch::new(ctx))
}

/// Something other than the target service answered: the JSON-RPC marker is
/// missing, a single request got an array back, or a batch result arrived for
/// an id that was never sent.
pub struct ProxyResponse {
    ctx: Arc<RuleContext>,
}

impl ProxyResponse {
    pub fn new(ctx: Arc<RuleContext>) -> Self {
        Self { ctx }
    }
}

impl Rule for ProxyResponse {
    fn expected_fault(&self) -> FaultKind {
        FaultKind::ProxyResponse
    }

    fn check(&self, response: &ParsedResponse) -> Vec<Fault> {
        match response {
            ParsedResponse::Batch(items) if !self.ctx.request.is_batch() => vec![self.ctx.fault(
                FaultKind::ProxyResponse,
                format!("single request answered with an array of {} items", items.len()),
                None,
                response,
            )],
            _ => check_each_item(self, response),
        }
    }

    fn check_item(&self, item: &Map<String, Value>, whole: &ParsedResponse) -> Option<Fault> {
        let marker = item.get("jsonrpc").and_then(Value::as_str);
        if marker != Some(JSONRPC_VERSION) {
            return Some(self.ctx.fault(
                FaultKind::ProxyResponse,
                "response is missing the JSON-RPC 2.0 marker",
                Some(item),
                whole,
            ));
        }
        if self.ctx.request.is_batch() && item.contains_key("result") {
            let known = item_id(item).map(|id| self.ctx.request.contains_id(id));
            if known != Some(true) {
                return Some(self.ctx.fault(
                    FaultKind::ProxyResponse,
                    format!("result carries an id that was never sent: {:?}", item.get("id")),
                    Some(item),
                    whole,
                ));
            }
        }
        None
    }
}

pub fn proxy_response(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ProxyResponse::new(ctx))
}

/// Any `error` member in a response item.
pub struct ErrorPresent {
    ctx: Arc<RuleContext>,
}

impl ErrorPresent {
    pub fn new(ctx: Arc<RuleContext>) -> Self {
        Self { ctx }
    }
}

impl Rule for ErrorPresent {
    fn expected_fault(&self) -> FaultKind {
        FaultKind::ErrorPresent
    }

    fn check_item(&self, item: &Map<String, Value>, whole: &ParsedResponse) -> Option<Fault> {
        let error = item.get("error")?;
        let message = error_message(item)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        Some(self.ctx.fault(FaultKind::ErrorPresent, message, Some(item), whole))
    }
}

pub fn error_present(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(ErrorPresent::new(ctx))
}

/// `"result": null` from a method that is not declared nullable.
pub struct NullResult {
    ctx: Arc<RuleContext>,
}

impl NullResult {
    pub fn new(ctx: Arc<RuleContext>) -> Self {
        Self { ctx }
    }
}

impl Rule for NullResult {
    fn expected_fault(&self) -> FaultKind {
        FaultKind::NullResult
    }

    fn check_item(&self, item: &Map<String, Value>, whole: &ParsedResponse) -> Option<Fault> {
        if !matches!(item.get("result"), Some(Value::Null)) {
            return None;
        }
        let method = self.ctx.request.method_for(item_id(item));
        if method.map(crate::api::allows_null_result).unwrap_or(false) {
            return None;
        }
        Some(self.ctx.fault(
            FaultKind::NullResult,
            format!("null result for `{}`", method.unwrap_or("<unknown>")),
            Some(item),
            whole,
        ))
    }
}

pub fn null_result(ctx: Arc<RuleContext>) -> Box<dyn Rule> {
    Box::new(NullResult::new(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overseer::response::parse_response;
    use serde_json::json;

    fn ctx(payload: RequestPayload) -> Arc<RuleContext> {
        Arc::new(RuleContext::new(
            Url::parse("http://127.0.0.1:8090").unwrap(),
            Arc::new(payload),
        ))
    }

    fn single(method: &str) -> Arc<RuleContext> {
        ctx(RequestPayload::single(method, json!({})))
    }

    #[test]
    fn test_unparsable_keeps_raw_text() {
        let rule = unparsable_response(single("database_api.get_config"));
        let faults = rule.check(&parse_response("404: Not Found"));
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::UnparsableResponse);
        assert!(faults[0].retryable());
        assert_eq!(faults[0].raw_response.as_deref(), Some("404: Not Found"));
    }

    #[test]
    fn test_api_not_found() {
        let rule = api_not_found(single("foo_api.bar"));
        let response = parse_response(
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Assert Exception: Could not find API foo_api"},"id":0}"#,
        );
        let faults = rule.check(&response);
        assert_eq!(faults[0].kind, FaultKind::ApiNotFound);
        assert!(!faults[0].retryable());
    }

    #[test]
    fn test_database_lock() {
        let rule = database_lock(single("database_api.get_config"));
        let response = parse_response(
            r#"{"jsonrpc":"2.0","error":{"code":-32003,"message":"Unable to acquire database lock"},"id":0}"#,
        );
        assert_eq!(rule.check(&response)[0].kind, FaultKind::DatabaseLock);
    }

    #[test]
    fn test_count_mismatch_fewer() {
        let payload = RequestPayload::batch(vec![
            ("a.b", json!({})),
            ("a.c", json!({})),
            ("a.d", json!({})),
        ]);
        let rule = count_mismatch(ctx(payload));
        let response = parse_response(
            r#"[{"jsonrpc":"2.0","result":1,"id":0},{"jsonrpc":"2.0","result":2,"id":1}]"#,
        );
        let faults = rule.check(&response);
        assert_eq!(faults.len(), 1);
        assert!(faults[0].message.contains("fewer"));
        assert_eq!(faults[0].request_id, None);
    }

    #[test]
    fn test_count_mismatch_ignores_single_calls() {
        let rule = count_mismatch(single("a.b"));
        assert!(rule.check(&parse_response(r#"[{"id":0},{"id":1}]"#)).is_empty());
    }

    #[test]
    fn test_count_mismatch_leaves_top_level_error_alone() {
        let payload = RequestPayload::batch(vec![("a.b", json!({})), ("a.c", json!({}))]);
        let rule = count_mismatch(ctx(payload));
        let response =
            parse_response(r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"bad batch"},"id":null}"#);
        assert!(rule.check(&response).is_empty());
    }

    #[test]
    fn test_proxy_response_without_marker() {
        let rule = proxy_response(single("a.b"));
        let faults = rule.check(&parse_response(r#"{"result":{},"id":0}"#));
        assert_eq!(faults[0].kind, FaultKind::ProxyResponse);
    }

    #[test]
    fn test_proxy_response_unknown_id() {
        let payload = RequestPayload::batch(vec![("a.b", json!({}))]);
        let rule = proxy_response(ctx(payload));
        let faults = rule.check(&parse_response(r#"[{"jsonrpc":"2.0","result":{},"id":42}]"#));
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].request_id, Some(42));
    }

    #[test]
    fn test_proxy_response_array_for_single_call() {
        let rule = proxy_response(single("database_api.get_config"));
        let faults = rule.check(&parse_response(r#"[{"jsonrpc":"2.0","result":{},"id":0}]"#));
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::ProxyResponse);
        assert_eq!(faults[0].request_id, None);
        assert!(faults[0].message.contains("array of 1 items"));
    }

    #[test]
    fn test_error_present_per_batch_item() {
        let payload = RequestPayload::batch(vec![("a.b", json!({})), ("a.c", json!({}))]);
        let rule = error_present(ctx(payload));
        let response = parse_response(
            r#"[{"jsonrpc":"2.0","result":{},"id":0},{"jsonrpc":"2.0","error":{"code":-1,"message":"nope"},"id":1}]"#,
        );
        let faults = rule.check(&response);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].request_id, Some(1));
        assert_eq!(faults[0].message, "nope");
        assert!(faults[0].whole_response.as_ref().unwrap().is_array());
    }

    #[test]
    fn test_null_result_for_regular_method() {
        let rule = null_result(single("database_api.get_dynamic_global_properties"));
        let faults = rule.check(&parse_response(r#"{"jsonrpc":"2.0","result":null,"id":1}"#));
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::NullResult);
        assert!(faults[0].retryable());
    }

    #[test]
    fn test_null_result_skips_nullable_method() {
        let rule = null_result(single("condenser_api.get_block"));
        assert!(rule
            .check(&parse_response(r#"{"jsonrpc":"2.0","result":null,"id":0}"#))
            .is_empty());
    }
}
