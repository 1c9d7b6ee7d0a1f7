//! Rule types, the rule trait, and the rule-spec compiler.

mod cidr;
mod domain;
mod geoip;
mod match_all;

pub use cidr::IpCidrRule;
pub use domain::DomainRule;
pub use geoip::GeoIpRule;
pub use match_all::MatchRule;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};
use crate::geoip::GeoDb;
use crate::metadata::RequestMetadata;
use crate::resolver::Resolver;
use crate::{RuleAction, RuleType};

/// Rule is the interface every policy rule variant implements.
///
/// A constructed rule never mutates its own fields; evaluation is safe for
/// concurrent read-only use. Matching is async because destination-mode
/// rules resolve the target host before deciding.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Check whether the request described by `metadata` matches this rule.
    async fn matches(&self, metadata: &RequestMetadata) -> bool;

    /// Get the verdict this rule applies when it matches.
    fn action(&self) -> RuleAction;

    /// Get the type of this rule.
    fn rule_type(&self) -> RuleType;
}

/// Shared lookup services injected into rules at compile time.
///
/// The resolver is built during startup sequencing; the GeoIP database is
/// opened at most once, when the first rule that needs it is compiled.
/// After that both are immutable and shared read-only.
pub struct Services {
    resolver: Arc<Resolver>,
    mmdb_path: PathBuf,
    geodb: OnceCell<Arc<GeoDb>>,
}

impl Services {
    /// Create a service registry from a constructed resolver and the path
    /// of the country GeoIP database.
    pub fn new(resolver: Arc<Resolver>, mmdb_path: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            mmdb_path: mmdb_path.into(),
            geodb: OnceCell::new(),
        }
    }

    /// Get the shared resolver handle.
    pub fn resolver(&self) -> Arc<Resolver> {
        self.resolver.clone()
    }

    /// Get the shared GeoIP database, opening it on first use.
    ///
    /// An unreadable database file is fatal here, at startup, rather than
    /// at evaluation time.
    pub fn geodb(&self) -> Result<Arc<GeoDb>> {
        self.geodb
            .get_or_try_init(|| GeoDb::open(&self.mmdb_path).map(Arc::new))
            .map(Arc::clone)
    }
}

/// Compile a textual rule specification into an executable rule.
///
/// The grammar is `type,payload...,action`: the first field is the type
/// keyword, the last is the action keyword, and everything between is the
/// payload (re-joined with commas).
pub fn parse_rule(spec: &str, services: &Services) -> Result<Box<dyn Rule>> {
    let fields: Vec<&str> = spec.split(',').collect();
    if fields.len() < 2 {
        return Err(Error::InvalidRule(spec.to_string()));
    }

    let keyword = fields[0];
    let action_field = fields[fields.len() - 1];
    let action: RuleAction = action_field
        .parse()
        .map_err(|_| Error::InvalidAction(action_field.to_string()))?;
    let payload = fields[1..fields.len() - 1].join(",");

    match keyword {
        "match" => Ok(Box::new(MatchRule::new(action))),
        "domain" => Ok(Box::new(DomainRule::new(&payload, action)?)),
        "src-ip" => Ok(Box::new(GeoIpRule::new(&payload, action, true, services)?)),
        "dst-ip" => Ok(Box::new(GeoIpRule::new(&payload, action, false, services)?)),
        other => Err(Error::InvalidRuleType(other.to_string())),
    }
}

/// Compile an ordered list of rule specifications into a rule chain.
///
/// Position is the sole priority mechanism. Any malformed spec fails the
/// whole chain.
pub fn compile_chain(specs: &[String], services: &Services) -> Result<Vec<Box<dyn Rule>>> {
    let mut chain = Vec::with_capacity(specs.len());
    for spec in specs {
        let rule = parse_rule(spec, services).map_err(|err| {
            log::error!("failed to parse rule {spec:?}: {err}");
            err
        })?;
        log::debug!("compiled rule: type={} action={}", rule.rule_type(), rule.action());
        chain.push(rule);
    }
    Ok(chain)
}
