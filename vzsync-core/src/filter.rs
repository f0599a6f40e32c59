//! Exclusion rules applied to VCenter records before any comparison
//!
//! Rules come from configuration (`sync.exclusions`); any rule hit excludes the VM.
//! Replica VMs (`*_REP`) and temporary VMs (`temp-*`) are excluded by default.

use serde::{Deserialize, Serialize};

use crate::models::{PowerState, VCenterHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Prefix,
    Suffix,
}

/// One anchored name pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub kind: RuleKind,
    pub literal: String,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

impl ExclusionRule {
    pub fn prefix(literal: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            kind: RuleKind::Prefix,
            literal: literal.into(),
            case_sensitive,
        }
    }

    pub fn suffix(literal: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            kind: RuleKind::Suffix,
            literal: literal.into(),
            case_sensitive,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.case_sensitive {
            return match self.kind {
                RuleKind::Prefix => name.starts_with(&self.literal),
                RuleKind::Suffix => name.ends_with(&self.literal),
            };
        }
        let name = name.to_lowercase();
        let literal = self.literal.to_lowercase();
        match self.kind {
            RuleKind::Prefix => name.starts_with(&literal),
            RuleKind::Suffix => name.ends_with(&literal),
        }
    }
}

/// Why a VM was left out of a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    Pattern { rule: ExclusionRule },
    PoweredOff,
    UnrecognizedPowerState { status: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEngine {
    rules: Vec<ExclusionRule>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}

impl FilterEngine {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        Self { rules }
    }

    pub fn default_rules() -> Vec<ExclusionRule> {
        vec![
            ExclusionRule::suffix("_REP", true),
            ExclusionRule::prefix("temp-", true),
            ExclusionRule::prefix("temp-", false),
        ]
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn is_excluded(&self, vm_name: &str) -> bool {
        self.matching_rule(vm_name).is_some()
    }

    pub fn matching_rule(&self, vm_name: &str) -> Option<&ExclusionRule> {
        self.rules.iter().find(|rule| rule.matches(vm_name))
    }

    /// Exclusion applied by the missing-host pass: patterns, then power state
    pub fn exclusion_for_presence(&self, vm: &VCenterHost) -> Option<ExclusionReason> {
        if let Some(reason) = self.exclusion_for_status(vm) {
            return Some(reason);
        }
        match &vm.power_state {
            PowerState::PoweredOn => None,
            PowerState::PoweredOff => Some(ExclusionReason::PoweredOff),
            PowerState::Unrecognized(status) => Some(ExclusionReason::UnrecognizedPowerState {
                status: status.clone(),
            }),
        }
    }

    /// Exclusion applied by the mismatch passes: patterns only, powered-off VMs stay
    pub fn exclusion_for_status(&self, vm: &VCenterHost) -> Option<ExclusionReason> {
        self.matching_rule(&vm.name)
            .map(|rule| ExclusionReason::Pattern { rule: rule.clone() })
    }
}
