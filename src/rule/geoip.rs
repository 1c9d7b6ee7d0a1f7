//! GeoIP country matching rule and LAN classification.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use once_cell::sync::Lazy;

use super::{Rule, Services};
use crate::error::Error;
use crate::geoip::GeoDb;
use crate::metadata::RequestMetadata;
use crate::resolver::Resolver;
use crate::{RuleAction, RuleType};

/// IPv4 ranges treated as local beyond the standard private/loopback/
/// link-local classes: shared address space, IETF protocol assignments,
/// the documentation nets, and the reserved block.
static LAN_V4_EXTRA: Lazy<Vec<Ipv4Net>> = Lazy::new(|| {
    [
        "100.64.0.0/10",
        "192.0.0.0/24",
        "192.0.2.0/24",
        "198.51.100.0/24",
        "203.0.113.0/24",
        "240.0.0.0/4",
    ]
    .iter()
    .map(|net| net.parse().expect("static CIDR literal"))
    .collect()
});

/// Classify an address as belonging to the synthetic `lan` pseudo-country.
pub fn is_lan(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_unspecified()
                || v4.is_loopback()
                || v4.is_multicast()
                || v4.is_link_local()
                || LAN_V4_EXTRA.iter().any(|net| net.contains(&v4))
        }
        IpAddr::V6(v6) => {
            let seg0 = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link-local unicast
            v6.is_unspecified()
                || v6.is_loopback()
                || v6.is_multicast()
                || (seg0 & 0xfe00) == 0xfc00
                || (seg0 & 0xffc0) == 0xfe80
        }
    }
}

/// GeoIpRule matches the source or resolved destination address against a
/// country code, or against the fixed LAN ranges for the `lan` sentinel.
pub struct GeoIpRule {
    country: String,
    action: RuleAction,
    /// true: evaluate the caller source IP; false: resolve the destination
    /// host and evaluate the resolved address(es)
    source: bool,
    /// Absent for the `lan` sentinel, which needs no database
    geodb: Option<Arc<GeoDb>>,
    resolver: Arc<Resolver>,
}

impl GeoIpRule {
    /// Create a new GeoIpRule. Opens the GeoIP database through `services`
    /// unless the payload is the `lan` sentinel.
    pub fn new(
        country: &str,
        action: RuleAction,
        source: bool,
        services: &Services,
    ) -> Result<Self, Error> {
        let country = country.to_ascii_lowercase();
        let geodb = if country == "lan" {
            None
        } else {
            Some(services.geodb()?)
        };
        Ok(Self {
            country,
            action,
            source,
            geodb,
            resolver: services.resolver(),
        })
    }

    fn country_matches(&self, ip: IpAddr) -> bool {
        let Some(geodb) = &self.geodb else {
            return false;
        };
        match geodb.country(ip) {
            Ok(Some(code)) => code.eq_ignore_ascii_case(&self.country),
            Ok(None) => false,
            Err(err) => {
                log::warn!("geoip rule lookup error: ip={ip} error={err}");
                false
            }
        }
    }
}

#[async_trait]
impl Rule for GeoIpRule {
    async fn matches(&self, metadata: &RequestMetadata) -> bool {
        let matched = if self.source {
            if self.country == "lan" {
                is_lan(metadata.src_ip)
            } else {
                self.country_matches(metadata.src_ip)
            }
        } else {
            let ips = match self.resolver.resolve(&metadata.host).await {
                Ok(ips) => ips,
                Err(err) => {
                    log::warn!(
                        "geoip rule resolve error: host={} error={err}",
                        metadata.host
                    );
                    return false;
                }
            };
            if self.country == "lan" {
                ips.iter().any(|ip| is_lan(*ip))
            } else {
                match ips.first() {
                    Some(ip) => self.country_matches(*ip),
                    None => false,
                }
            }
        };

        if matched {
            log::debug!(
                "geoip rule match: country={} is_src={} src_ip={} host={} action={}",
                self.country,
                self.source,
                metadata.src_ip,
                metadata.host,
                self.action
            );
        }
        matched
    }

    fn action(&self) -> RuleAction {
        self.action
    }

    fn rule_type(&self) -> RuleType {
        RuleType::GeoIp
    }
}
