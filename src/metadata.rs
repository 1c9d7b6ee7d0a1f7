//! Per-request metadata consumed by the rule chain.

use std::net::IpAddr;

use http::HeaderMap;

use crate::error::SourceIpError;

/// Immutable snapshot of the facts a rule chain evaluates against.
///
/// Constructed once per inbound request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Caller source address, header-aware (see [`source_ip`])
    pub src_ip: IpAddr,
    /// Destination host from the resolved target URL
    pub host: String,
    /// Destination scheme from the resolved target URL (`http` or `https`)
    pub protocol: String,
}

/// Derive the caller's source IP, first success wins:
///
/// 1. first comma-separated entry of `X-Forwarded-For`, trimmed
/// 2. `X-Real-IP`
/// 3. the connection remote address with `:port` stripped, unwrapping the
///    bracketed IPv6 form `[addr]:port`
///
/// A candidate that fails to parse falls through to the next level.
pub fn source_ip(headers: &HeaderMap, remote_addr: &str) -> Result<IpAddr, SourceIpError> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(addr) = first.trim().parse() {
                return Ok(addr);
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if let Ok(addr) = real_ip.trim().parse() {
            return Ok(addr);
        }
    }

    let candidate = if remote_addr.contains('[') {
        // [addr]:port form
        let without_port = match remote_addr.rfind(':') {
            Some(idx) => &remote_addr[..idx],
            None => remote_addr,
        };
        without_port.trim_start_matches('[').trim_end_matches(']')
    } else {
        remote_addr.split(':').next().unwrap_or(remote_addr)
    };

    candidate
        .parse()
        .map_err(|_| SourceIpError::Unparseable(remote_addr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let h = headers(&[("x-forwarded-for", "203.0.113.5, 10.0.0.1")]);
        let ip = source_ip(&h, "192.0.2.1:9999").unwrap();
        assert_eq!(ip, "203.0.113.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[("x-real-ip", "203.0.113.9")]);
        let ip = source_ip(&h, "192.0.2.1:9999").unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_unparseable_forwarded_falls_through() {
        let h = headers(&[
            ("x-forwarded-for", "not-an-ip"),
            ("x-real-ip", "203.0.113.9"),
        ]);
        let ip = source_ip(&h, "192.0.2.1:9999").unwrap();
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_remote_addr_ipv4() {
        let ip = source_ip(&HeaderMap::new(), "198.51.100.7:43012").unwrap();
        assert_eq!(ip, "198.51.100.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_remote_addr_ipv6_brackets() {
        let ip = source_ip(&HeaderMap::new(), "[2001:db8::1]:443").unwrap();
        assert_eq!(ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_all_candidates_exhausted() {
        let h = headers(&[("x-forwarded-for", "garbage")]);
        assert!(source_ip(&h, "garbage").is_err());
    }
}
