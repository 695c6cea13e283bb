//! The execution-model independent core of the overseer.
//!
//! Both drivers feed raw bodies into [`OverseerMachine::on_response`] and act
//! on the returned [`Decision`]; only sending and sleeping differ between them.

use super::fault::{FaultKind, GroupedFault};
use super::response::{parse_response, ParsedResponse};
use super::rule_set::{Classification, InstantiatedRuleSet, Tier};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

/// What to do after classifying one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Succeed(Value),
    /// Sleep for the retry period, then send again.
    Retry {
        tier: Tier,
        remaining: i64,
        fault: FaultKind,
    },
    Surrender(GroupedFault),
}

/// Remaining-retries counter for the finitely repeatable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max: u32,
    remaining: i64,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            remaining: i64::from(max),
        }
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn reset(&mut self) {
        self.remaining = i64::from(self.max);
    }

    /// Spend one retry; `false` once the counter went negative.
    pub fn consume(&mut self) -> bool {
        self.remaining -= 1;
        self.remaining >= 0
    }
}

/// Map a classification onto a control-flow decision.
pub fn decide(classification: Classification, parsed: ParsedResponse, budget: &mut RetryBudget) -> Decision {
    match classification {
        Classification::Clean => Decision::Succeed(parsed.into_value()),
        Classification::Fired {
            tier: Tier::Preliminary,
            faults,
        } => Decision::Surrender(faults),
        Classification::Fired {
            tier: Tier::InfinitelyRepeatable,
            faults,
        } => {
            budget.reset();
            Decision::Retry {
                tier: Tier::InfinitelyRepeatable,
                remaining: budget.remaining(),
                fault: faults.primary().kind,
            }
        }
        Classification::Fired {
            tier: Tier::FinitelyRepeatable,
            faults,
        } => {
            if budget.consume() {
                Decision::Retry {
                    tier: Tier::FinitelyRepeatable,
                    remaining: budget.remaining(),
                    fault: faults.primary().kind,
                }
            } else {
                Decision::Surrender(faults)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverseerState {
    Init,
    Sending,
    Classifying,
    Backoff,
    Finished,
}

/// Per-call state machine: `Init → Sending → Classifying → {Backoff → Sending | Finished}`.
#[derive(Debug)]
pub struct OverseerMachine {
    rules: InstantiatedRuleSet,
    budget: RetryBudget,
    state: OverseerState,
    attempts: u32,
}

impl OverseerMachine {
    pub fn new(rules: InstantiatedRuleSet, max_retries: u32) -> Self {
        Self {
            rules,
            budget: RetryBudget::new(max_retries),
            state: OverseerState::Init,
            attempts: 0,
        }
    }

    pub fn state(&self) -> OverseerState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining(&self) -> i64 {
        self.budget.remaining()
    }

    /// Enter `Sending`, returning the 1-based attempt number.
    pub fn begin_send(&mut self) -> Result<u32> {
        match self.state {
            OverseerState::Init | OverseerState::Backoff => {
                self.state = OverseerState::Sending;
                self.attempts += 1;
                Ok(self.attempts)
            }
            other => Err(self.invariant(format!("cannot send from state {:?}", other))),
        }
    }

    /// Classify one raw body and move to `Backoff` or `Finished`.
    pub fn on_response(&mut self, raw: &str) -> Result<Decision> {
        if self.state != OverseerState::Sending {
            return Err(self.invariant(format!("response received in state {:?}", self.state)));
        }
        self.state = OverseerState::Classifying;
        let parsed = parse_response(raw);
        let classification = self.rules.classify(&parsed);
        let decision = decide(classification, parsed, &mut self.budget);
        self.state = match decision {
            Decision::Retry { .. } => OverseerState::Backoff,
            Decision::Succeed(_) | Decision::Surrender(_) => OverseerState::Finished,
        };
        Ok(decision)
    }

    /// The transport failed; nothing more will happen on this call.
    pub fn abort(&mut self) {
        self.state = OverseerState::Finished;
    }

    fn invariant(&self, message: String) -> Error {
        let ctx = self.rules.context();
        Error::invariant_with_context(
            message,
            ErrorContext::new()
                .with_url(ctx.url.as_str())
                .with_source("overseer_machine"),
        )
    }
}
