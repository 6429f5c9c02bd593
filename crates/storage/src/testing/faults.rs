//! Fault injection for the in-memory store
//!
//! Rules are checked in insertion order on every store call. A rule fires
//! when its operation matches, its path filter (if any) is a substring of
//! the call's path, its `after` budget is spent and it still has remaining
//! firings.
//!
//! # Example
//!
//! ```ignore
//! use tally_storage::testing::{Fault, FaultOp, FaultRule};
//!
//! // First put into this test's directory reports a conflict without writing
//! store.inject(FaultRule::new(FaultOp::Put, Fault::SpuriousConflict).matching("auth__login"));
//! ```

/// Store operation a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    /// `get`
    Get,
    /// `put`
    Put,
    /// `delete`
    Delete,
    /// `list_directory`
    List,
    /// `list_tree_recursive`
    Tree,
}

/// What happens when a rule fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Report `VersionConflict` without touching the object
    SpuriousConflict,
    /// Store the payload, as a concurrent writer would have, then report
    /// `VersionConflict` to this caller (put only)
    MaterializedConflict,
    /// Report `UpstreamUnavailable`
    Unavailable,
}

/// One injection rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultRule {
    /// Operation to intercept
    pub op: FaultOp,
    /// Injected behaviour
    pub fault: Fault,
    /// Only calls whose path contains this substring
    pub path_contains: Option<String>,
    /// Matching calls to let through before firing
    pub after: u32,
    /// Number of firings left
    pub remaining: u32,
}

impl FaultRule {
    /// Rule that fires once on the first matching call
    pub fn new(op: FaultOp, fault: Fault) -> Self {
        FaultRule {
            op,
            fault,
            path_contains: None,
            after: 0,
            remaining: 1,
        }
    }

    /// Restrict to paths containing `needle`
    pub fn matching(mut self, needle: impl Into<String>) -> Self {
        self.path_contains = Some(needle.into());
        self
    }

    /// Fire `n` times
    pub fn times(mut self, n: u32) -> Self {
        self.remaining = n;
        self
    }

    /// Fire on every matching call
    pub fn always(self) -> Self {
        self.times(u32::MAX)
    }

    /// Let `n` matching calls through first
    pub fn after(mut self, n: u32) -> Self {
        self.after = n;
        self
    }

    fn matches(&self, op: FaultOp, path: &str) -> bool {
        self.op == op
            && self.remaining > 0
            && self
                .path_contains
                .as_deref()
                .map_or(true, |needle| path.contains(needle))
    }
}

/// Ordered set of rules
#[derive(Debug, Default)]
pub struct FaultPlan {
    rules: Vec<FaultRule>,
    fired: u64,
}

impl FaultPlan {
    /// Empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    pub fn push(&mut self, rule: FaultRule) {
        self.rules.push(rule);
    }

    /// Drop every rule
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Total firings so far
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Consult the plan for one call, consuming budgets
    pub fn check(&mut self, op: FaultOp, path: &str) -> Option<Fault> {
        for rule in self.rules.iter_mut() {
            if !rule.matches(op, path) {
                continue;
            }
            if rule.after > 0 {
                rule.after -= 1;
                continue;
            }
            if rule.remaining != u32::MAX {
                rule.remaining -= 1;
            }
            self.fired += 1;
            return Some(rule.fault);
        }
        None
    }
}
