//! Heuristic role inference rules
//!
//! Rules are pure data evaluated top to bottom, first match wins. A rule
//! matches a lowercase name when it contains every `all_of` fragment and
//! none of the `none_of` fragments; it only applies to objects of its
//! role's shape. Steam chuff roles are never inferred here (see `chuff`).

use serde::{Deserialize, Serialize};

use crate::catalog::{Role, Shape};

/// One `(predicate, role)` entry of the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    /// Role assigned on match
    pub role: Role,
    /// Fragments that must all appear
    pub all_of: Vec<String>,
    /// Fragments that must not appear
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub none_of: Vec<String>,
}

impl RoleRule {
    /// Build a rule; fragments are lowercased
    pub fn new(role: Role, all_of: &[&str], none_of: &[&str]) -> Self {
        Self {
            role,
            all_of: all_of.iter().map(|s| s.to_lowercase()).collect(),
            none_of: none_of.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Whether the (already lowercased) name satisfies this rule
    pub fn matches(&self, lowered: &str) -> bool {
        !self.all_of.is_empty()
            && self.all_of.iter().all(|f| lowered.contains(f.as_str()))
            && !self.none_of.iter().any(|f| lowered.contains(f.as_str()))
    }

    fn applies_to(&self, shape: Shape) -> bool {
        !self.role.is_chuff() && self.role.shape() == shape
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<RoleRule>,
}

impl RuleSet {
    /// Built-in rules for the stock vehicle audio layouts
    pub fn builtin() -> Self {
        use Role::{
            Bell, Compressor, DynamicBrake, EngineIdle, EngineLoad, EngineShutdown, EngineStartup,
            GearShift, HornHit, HornLoop, TractionMotors, Whistle,
        };
        let rules = vec![
            RoleRule::new(HornHit, &["horn", "hit"], &[]),
            RoleRule::new(HornHit, &["horn", "short"], &[]),
            RoleRule::new(HornLoop, &["horn"], &["hit"]),
            RoleRule::new(Whistle, &["whistle"], &[]),
            RoleRule::new(Bell, &["bell"], &[]),
            RoleRule::new(EngineStartup, &["startup"], &[]),
            RoleRule::new(EngineStartup, &["engine", "start"], &[]),
            RoleRule::new(EngineStartup, &["ignition"], &[]),
            RoleRule::new(EngineShutdown, &["shutdown"], &[]),
            RoleRule::new(EngineShutdown, &["engine", "stop"], &[]),
            RoleRule::new(EngineIdle, &["idle"], &[]),
            RoleRule::new(TractionMotors, &["traction"], &[]),
            RoleRule::new(TractionMotors, &["electric", "motor"], &[]),
            RoleRule::new(DynamicBrake, &["dynamic"], &[]),
            RoleRule::new(DynamicBrake, &["dynbrake"], &[]),
            RoleRule::new(DynamicBrake, &["blower"], &[]),
            RoleRule::new(Compressor, &["compressor"], &[]),
            RoleRule::new(Compressor, &["airpump"], &[]),
            RoleRule::new(GearShift, &["gear"], &[]),
            RoleRule::new(GearShift, &["shift"], &[]),
            RoleRule::new(EngineLoad, &["engine"], &["start", "stop", "shutdown"]),
            RoleRule::new(EngineLoad, &["diesel"], &[]),
            RoleRule::new(EngineLoad, &["exhaust"], &[]),
        ];
        Self { rules }
    }

    /// Built-in rules followed by `extra`
    pub fn with_extra(extra: &[RoleRule]) -> Self {
        let mut set = Self::builtin();
        set.rules.extend(extra.iter().cloned());
        set
    }

    /// The rules in evaluation order
    pub fn rules(&self) -> &[RoleRule] {
        &self.rules
    }

    /// Infer a role for an object of `shape`
    ///
    /// `names` are tried in priority order (object identifier, node name,
    /// ancestor path, clip names); for each name the whole table is evaluated
    /// before moving on to the next, lower-priority name.
    pub fn infer<'a, I>(&self, shape: Shape, names: I) -> Option<Role>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            let lowered = name.to_lowercase();
            if lowered.is_empty() {
                continue;
            }
            if let Some(rule) = self
                .rules
                .iter()
                .find(|r| r.applies_to(shape) && r.matches(&lowered))
            {
                return Some(rule.role);
            }
        }
        None
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
