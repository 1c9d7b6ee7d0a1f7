//! Destination host and scheme matching rule.

use async_trait::async_trait;
use url::Url;

use super::Rule;
use crate::error::Error;
use crate::metadata::RequestMetadata;
use crate::{RuleAction, RuleType};

/// DomainRule matches the destination host exactly, optionally restricted
/// to a single scheme.
///
/// # Payload formats
/// - Bare host: `github.com` - matches over both HTTP and HTTPS
/// - Scheme-qualified: `https://github.com` - matches only that scheme
pub struct DomainRule {
    host: String,
    action: RuleAction,
    allow_http: bool,
    allow_https: bool,
}

impl DomainRule {
    /// Create a new DomainRule from a payload string.
    pub fn new(payload: &str, action: RuleAction) -> Result<Self, Error> {
        if payload.starts_with("http://") || payload.starts_with("https://") {
            let url = Url::parse(payload)
                .map_err(|_| Error::InvalidDomainPayload(payload.to_string()))?;
            let host = url
                .host_str()
                .ok_or_else(|| Error::InvalidDomainPayload(payload.to_string()))?
                .to_string();
            Ok(Self {
                host,
                action,
                allow_http: url.scheme() == "http",
                allow_https: url.scheme() == "https",
            })
        } else {
            // No scheme restricts nothing.
            Ok(Self {
                host: payload.to_string(),
                action,
                allow_http: true,
                allow_https: true,
            })
        }
    }
}

#[async_trait]
impl Rule for DomainRule {
    async fn matches(&self, metadata: &RequestMetadata) -> bool {
        // Exact host comparison, no wildcarding.
        if metadata.host != self.host {
            return false;
        }

        let matched = match metadata.protocol.as_str() {
            "http" => self.allow_http,
            "https" => self.allow_https,
            _ => true,
        };
        if matched {
            log::debug!(
                "domain rule match: host={} protocol={} action={}",
                metadata.host,
                metadata.protocol,
                self.action
            );
        }
        matched
    }

    fn action(&self) -> RuleAction {
        self.action
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn metadata(host: &str, protocol: &str) -> RequestMetadata {
        RequestMetadata {
            src_ip: "203.0.113.5".parse::<IpAddr>().unwrap(),
            host: host.to_string(),
            protocol: protocol.to_string(),
        }
    }

    #[tokio::test]
    async fn test_bare_host_matches_both_schemes() {
        let rule = DomainRule::new("github.com", RuleAction::Allow).unwrap();
        assert!(rule.matches(&metadata("github.com", "http")).await);
        assert!(rule.matches(&metadata("github.com", "https")).await);
    }

    #[tokio::test]
    async fn test_scheme_qualified_matches_only_that_scheme() {
        let rule = DomainRule::new("https://github.com", RuleAction::Allow).unwrap();
        assert!(rule.matches(&metadata("github.com", "https")).await);
        assert!(!rule.matches(&metadata("github.com", "http")).await);

        let rule = DomainRule::new("http://github.com", RuleAction::Allow).unwrap();
        assert!(rule.matches(&metadata("github.com", "http")).await);
        assert!(!rule.matches(&metadata("github.com", "https")).await);
    }

    #[tokio::test]
    async fn test_host_comparison_is_exact() {
        let rule = DomainRule::new("github.com", RuleAction::Allow).unwrap();
        assert!(!rule.matches(&metadata("raw.github.com", "https")).await);
        assert!(!rule.matches(&metadata("github.com.evil.example", "https")).await);
    }

    #[test]
    fn test_invalid_scheme_qualified_payload() {
        assert!(DomainRule::new("https://", RuleAction::Allow).is_err());
    }

    #[test]
    fn test_action_and_type() {
        let rule = DomainRule::new("github.com", RuleAction::Deny).unwrap();
        assert_eq!(rule.action(), RuleAction::Deny);
        assert_eq!(rule.rule_type(), RuleType::Domain);
    }
}
