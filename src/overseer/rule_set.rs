use super::fault::{Fault, GroupedFault};
use super::request::RequestPayload;
use super::response::ParsedResponse;
use super::rules::{self, Rule, RuleContext, RuleFactory};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Control-flow tier of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Malformed or unrecoverable: surrender immediately.
    Preliminary,
    /// Transient contention: retry without spending the budget.
    InfinitelyRepeatable,
    /// Retry while the budget lasts.
    FinitelyRepeatable,
}

impl Tier {
    pub fn name(self) -> &'static str {
        match self {
            Tier::Preliminary => "preliminary",
            Tier::InfinitelyRepeatable => "infinitely_repeatable",
            Tier::FinitelyRepeatable => "finitely_repeatable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Three ordered tiers of rule types.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    preliminary: Vec<RuleFactory>,
    infinitely_repeatable: Vec<RuleFactory>,
    finitely_repeatable: Vec<RuleFactory>,
}

impl RuleSet {
    /// An empty rule set; every response is accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules applied to every call unless a caller says otherwise.
    pub fn standard() -> Self {
        Self::new()
            .with_preliminary(rules::unparsable_response)
            .with_preliminary(rules::api_not_found)
            .with_infinitely_repeatable(rules::database_lock)
            .with_finitely_repeatable(rules::count_mismatch)
            .with_finitely_repeatable(rules::proxy_response)
            .with_finitely_repeatable(rules::error_present)
            .with_finitely_repeatable(rules::null_result)
    }

    pub fn with_preliminary(mut self, rule: RuleFactory) -> Self {
        self.preliminary.push(rule);
        self
    }

    pub fn with_infinitely_repeatable(mut self, rule: RuleFactory) -> Self {
        self.infinitely_repeatable.push(rule);
        self
    }

    pub fn with_finitely_repeatable(mut self, rule: RuleFactory) -> Self {
        self.finitely_repeatable.push(rule);
        self
    }

    /// Append every tier of `other` after the rules already registered.
    pub fn extended_with(mut self, other: &RuleSet) -> Self {
        self.preliminary.extend_from_slice(&other.preliminary);
        self.infinitely_repeatable
            .extend_from_slice(&other.infinitely_repeatable);
        self.finitely_repeatable
            .extend_from_slice(&other.finitely_repeatable);
        self
    }

    pub fn tier(&self, tier: Tier) -> &[RuleFactory] {
        match tier {
            Tier::Preliminary => &self.preliminary,
            Tier::InfinitelyRepeatable => &self.infinitely_repeatable,
            Tier::FinitelyRepeatable => &self.finitely_repeatable,
        }
    }

    /// Bind every rule to one call.
    pub fn instantiate(&self, url: &Url, request: Arc<RequestPayload>) -> InstantiatedRuleSet {
        let context = Arc::new(RuleContext::new(url.clone(), request));
        let build = |factories: &[RuleFactory]| -> Vec<Box<dyn Rule>> {
            factories.iter().map(|f| f(Arc::clone(&context))).collect()
        };
        InstantiatedRuleSet {
            tiers: [
                (Tier::Preliminary, build(&self.preliminary)),
                (Tier::InfinitelyRepeatable, build(&self.infinitely_repeatable)),
                (Tier::FinitelyRepeatable, build(&self.finitely_repeatable)),
            ],
            context,
        }
    }
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Clean,
    /// The first rule that yielded faults, and the tier it belongs to.
    Fired { tier: Tier, faults: GroupedFault },
}

impl Classification {
    pub fn is_clean(&self) -> bool {
        matches!(self, Classification::Clean)
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Classification::Clean => None,
            Classification::Fired { tier, .. } => Some(*tier),
        }
    }

    pub fn faults(&self) -> &[Fault] {
        match self {
            Classification::Clean => &[],
            Classification::Fired { faults, .. } => faults.faults(),
        }
    }
}

/// A rule set bound to one URL and request.
pub struct InstantiatedRuleSet {
    context: Arc<RuleContext>,
    tiers: [(Tier, Vec<Box<dyn Rule>>); 3],
}

impl InstantiatedRuleSet {
    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    /// Evaluate tiers in order; the first rule that yields anything decides
    /// the pass and nothing after it is consulted.
    pub fn classify(&self, response: &ParsedResponse) -> Classification {
        for (tier, rules) in &self.tiers {
            for rule in rules {
                if let Some(faults) = GroupedFault::from_faults(rule.check(response)) {
                    return Classification::Fired {
                        tier: *tier,
                        faults,
                    };
                }
            }
        }
        Classification::Clean
    }
}

impl fmt::Debug for InstantiatedRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (tier, rules) in &self.tiers {
            let kinds: Vec<_> = rules.iter().map(|r| r.expected_fault()).collect();
            list.entry(tier, &kinds);
        }
        list.finish()
    }
}
