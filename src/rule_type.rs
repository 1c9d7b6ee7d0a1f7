//! Rule type definitions.

use std::fmt;

/// RuleType identifies the kind of a compiled rule, mainly for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Unconditional match
    Match,
    /// Destination host and scheme matching
    Domain,
    /// GeoIP country matching (including the `lan` pseudo-country)
    GeoIp,
    /// IP CIDR range matching
    IpCidr,
}

impl RuleType {
    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Match => "match",
            RuleType::Domain => "domain",
            RuleType::GeoIp => "geoip",
            RuleType::IpCidr => "ip-cidr",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
