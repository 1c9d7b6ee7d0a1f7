//! Mirrorgate - a policy-gated HTTP forwarding gateway.
//!
//! The inbound request path encodes a destination URL; an ordered chain of
//! policy rules decides whether to relay the request, and permitted
//! requests are forwarded with the response streamed back verbatim.
//!
//! # Features
//!
//! - **Rule chain**: first-match-wins over `match`, `domain`, `src-ip` and
//!   `dst-ip` rule specifications
//! - **GeoIP matching**: country-based decisions via a MaxMind database,
//!   plus a synthetic `lan` pseudo-country for local/reserved ranges
//! - **DNS-aware rules**: destination hosts resolve through a configured
//!   DNS server or DNS-over-HTTPS endpoint
//! - **Streaming relay**: method, headers, status and body mirrored
//!   byte-for-byte without buffering whole payloads
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mirrorgate::{Config, Executor, Resolver, Services};
//!
//! let cfg = Config::load("config.yaml")?;
//! let resolver = Arc::new(Resolver::new(&cfg.dns)?);
//! let services = Services::new(resolver, &cfg.mmdb.country);
//! let executor = Arc::new(Executor::new(&cfg.rules, &services)?);
//!
//! let listener = tokio::net::TcpListener::bind(&cfg.listen).await?;
//! mirrorgate::serve(listener, executor).await?;
//! ```
//!
//! # Rule Grammar
//!
//! A rule specification is `type,payload...,action` where `action` is
//! exactly `allow` or `deny`:
//!
//! - `match,<ignored>,<action>`: matches every request
//! - `domain,<host-or-url>,<action>`: exact destination host; a
//!   scheme-qualified payload restricts the scheme
//! - `src-ip,<country-or-lan>,<action>`: GeoIP match on the caller address
//! - `dst-ip,<country-or-lan>,<action>`: GeoIP match on the resolved
//!   destination address
//!
//! Malformed specifications are fatal at startup.

mod action;
mod config;
mod error;
mod executor;
mod geoip;
mod metadata;
mod resolver;
mod rule_type;
mod target;

pub mod forward;
pub mod rule;
pub mod server;

// Re-export core types
pub use action::RuleAction;
pub use config::Config;
pub use error::{Error, ResolveError, Result, SourceIpError, TargetUrlError};
pub use executor::Executor;
pub use geoip::GeoDb;
pub use metadata::{source_ip, RequestMetadata};
pub use resolver::Resolver;
pub use rule::{compile_chain, parse_rule, Rule, Services};
pub use rule_type::RuleType;
pub use server::serve;
pub use target::resolve_target;
