//! Error types for mirrorgate.

use thiserror::Error;

/// Error type for startup-time operations.
///
/// Any of these is fatal: the process must not serve requests with a
/// partially-built rule chain or an unreadable configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// Rule specification with fewer than two comma-delimited fields
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// Rule action other than `allow` or `deny`
    #[error("invalid rule action: {0}")]
    InvalidAction(String),

    /// Unrecognized rule type keyword
    #[error("invalid rule type: {0}")]
    InvalidRuleType(String),

    /// Domain rule payload that does not parse as a host or URL
    #[error("invalid domain payload: {0}")]
    InvalidDomainPayload(String),

    /// CIDR rule payload that does not parse as an IP prefix
    #[error("invalid CIDR pattern: {0}")]
    InvalidCidrPattern(String),

    /// DNS upstream endpoint that does not parse
    #[error("invalid dns endpoint: {0}")]
    InvalidDnsEndpoint(String),

    /// GeoIP database error
    #[error("GeoIP error: {0}")]
    GeoIp(#[from] maxminddb::MaxMindDBError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for mirrorgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for target URL resolution.
#[derive(Error, Debug)]
pub enum TargetUrlError {
    /// Request path was empty after stripping the leading slash
    #[error("empty path")]
    EmptyPath,

    /// Candidate string did not parse as a URL
    #[error("invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    /// Parsed URL has no scheme
    #[error("missing URL scheme")]
    MissingScheme,

    /// Parsed URL has no host
    #[error("missing URL host")]
    MissingHost,
}

/// Error type for source IP derivation.
#[derive(Error, Debug)]
pub enum SourceIpError {
    /// No header or connection-level candidate parsed as an IP address
    #[error("no parseable source address in headers or remote addr {0}")]
    Unparseable(String),
}

/// Error type for name resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// DNS message encoding or decoding failure
    #[error("dns message error: {0}")]
    Proto(#[from] hickory_proto::error::ProtoError),

    /// UDP transport failure
    #[error("dns transport error: {0}")]
    Io(#[from] std::io::Error),

    /// DoH transport failure
    #[error("doh transport error: {0}")]
    Doh(#[from] reqwest::Error),

    /// DoH endpoint answered with a non-success status
    #[error("doh endpoint returned status {0}")]
    DohStatus(http::StatusCode),
}
