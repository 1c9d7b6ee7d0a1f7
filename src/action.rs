//! Rule action types.

use std::fmt;

/// RuleAction represents the verdict a rule applies when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleAction {
    /// Forward the request to its destination
    Allow,
    /// Reject the request with a policy-denied response
    Deny,
}

impl RuleAction {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Deny => "deny",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleAction {
    type Err = ();

    /// Parse an action keyword. Case-sensitive: configuration must say
    /// exactly `allow` or `deny`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(RuleAction::Allow),
            "deny" => Ok(RuleAction::Deny),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_str() {
        assert_eq!("allow".parse(), Ok(RuleAction::Allow));
        assert_eq!("deny".parse(), Ok(RuleAction::Deny));
    }

    #[test]
    fn test_action_rejects_case_variants() {
        assert!("Allow".parse::<RuleAction>().is_err());
        assert!("DENY".parse::<RuleAction>().is_err());
        assert!("".parse::<RuleAction>().is_err());
        assert!("permit".parse::<RuleAction>().is_err());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(RuleAction::Allow.to_string(), "allow");
        assert_eq!(RuleAction::Deny.to_string(), "deny");
    }
}
