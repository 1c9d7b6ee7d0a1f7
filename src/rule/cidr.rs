//! IP CIDR range matching rule.
//!
//! Not reachable from the rule-spec grammar; constructed programmatically
//! through the library API.

use std::sync::Arc;

use async_trait::async_trait;
use ipnet::IpNet;

use super::Rule;
use crate::error::Error;
use crate::metadata::RequestMetadata;
use crate::resolver::Resolver;
use crate::{RuleAction, RuleType};

/// IpCidrRule matches the source address, or any resolved destination
/// address, against an IP prefix.
pub struct IpCidrRule {
    net: IpNet,
    action: RuleAction,
    source: bool,
    resolver: Arc<Resolver>,
}

impl IpCidrRule {
    /// Create a new IpCidrRule from CIDR notation, e.g. `10.0.0.0/8` or
    /// `2001:db8::/32`.
    pub fn new(
        cidr: &str,
        action: RuleAction,
        source: bool,
        resolver: Arc<Resolver>,
    ) -> Result<Self, Error> {
        let net = cidr
            .parse()
            .map_err(|_| Error::InvalidCidrPattern(cidr.to_string()))?;
        Ok(Self {
            net,
            action,
            source,
            resolver,
        })
    }
}

#[async_trait]
impl Rule for IpCidrRule {
    async fn matches(&self, metadata: &RequestMetadata) -> bool {
        if self.source {
            return self.net.contains(&metadata.src_ip);
        }

        let ips = match self.resolver.resolve(&metadata.host).await {
            Ok(ips) => ips,
            Err(err) => {
                log::warn!(
                    "ipcidr rule resolve error: host={} error={err}",
                    metadata.host
                );
                return false;
            }
        };
        ips.iter().any(|ip| self.net.contains(ip))
    }

    fn action(&self) -> RuleAction {
        self.action
    }

    fn rule_type(&self) -> RuleType {
        RuleType::IpCidr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Arc<Resolver> {
        Arc::new(Resolver::new("192.0.2.1:1").unwrap())
    }

    fn metadata(src: &str, host: &str) -> RequestMetadata {
        RequestMetadata {
            src_ip: src.parse().unwrap(),
            host: host.to_string(),
            protocol: "https".to_string(),
        }
    }

    #[tokio::test]
    async fn test_source_mode_prefix_membership() {
        let rule = IpCidrRule::new("10.0.0.0/8", RuleAction::Deny, true, resolver()).unwrap();
        assert!(rule.matches(&metadata("10.200.3.4", "example.com")).await);
        assert!(!rule.matches(&metadata("11.0.0.1", "example.com")).await);
    }

    #[tokio::test]
    async fn test_destination_mode_with_literal_host() {
        let rule = IpCidrRule::new("192.0.2.0/24", RuleAction::Deny, false, resolver()).unwrap();
        assert!(rule.matches(&metadata("8.8.8.8", "192.0.2.55")).await);
        assert!(!rule.matches(&metadata("8.8.8.8", "198.51.100.1")).await);
    }

    #[tokio::test]
    async fn test_ipv6_prefix() {
        let rule = IpCidrRule::new("2001:db8::/32", RuleAction::Allow, true, resolver()).unwrap();
        assert!(rule.matches(&metadata("2001:db8::99", "example.com")).await);
        assert!(!rule.matches(&metadata("2607:f8b0::1", "example.com")).await);
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(IpCidrRule::new("not-a-cidr", RuleAction::Allow, true, resolver()).is_err());
        assert!(IpCidrRule::new("10.0.0.1", RuleAction::Allow, true, resolver()).is_err());
    }
}
