//! Unconditional match rule.

use async_trait::async_trait;

use super::Rule;
use crate::metadata::RequestMetadata;
use crate::{RuleAction, RuleType};

/// MatchRule matches every request. Used as a chain terminator to set the
/// default verdict.
pub struct MatchRule {
    action: RuleAction,
}

impl MatchRule {
    /// Create a new MatchRule with the specified action.
    pub fn new(action: RuleAction) -> Self {
        Self { action }
    }
}

#[async_trait]
impl Rule for MatchRule {
    async fn matches(&self, _metadata: &RequestMetadata) -> bool {
        true
    }

    fn action(&self) -> RuleAction {
        self.action
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[tokio::test]
    async fn test_matches_anything() {
        let rule = MatchRule::new(RuleAction::Deny);
        let meta = RequestMetadata {
            src_ip: "8.8.8.8".parse::<IpAddr>().unwrap(),
            host: "anything.example".to_string(),
            protocol: "https".to_string(),
        };
        assert!(rule.matches(&meta).await);
        assert_eq!(rule.action(), RuleAction::Deny);
        assert_eq!(rule.rule_type(), RuleType::Match);
    }
}
