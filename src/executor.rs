//! Policy executor: metadata extraction, target resolution, rule chain
//! evaluation, and verdict application.

use std::net::SocketAddr;

use http::{Response, StatusCode};
use hyper::body::Incoming;
use hyper::Request;

use crate::error::Result;
use crate::forward::{text_response, Forwarder, ProxyBody};
use crate::metadata::{source_ip, RequestMetadata};
use crate::rule::{compile_chain, Rule, Services};
use crate::target::resolve_target;
use crate::RuleAction;

/// Executes the policy decision for every inbound request.
///
/// Holds the compiled rule chain (read-only after startup) and the
/// forwarding engine. First matching rule wins; its action decides between
/// forwarding and rejection.
pub struct Executor {
    rules: Vec<Box<dyn Rule>>,
    forwarder: Forwarder,
}

impl Executor {
    /// Compile the configured rule specifications into an executor.
    ///
    /// Any malformed specification is fatal: the gateway must not serve
    /// requests with a partially-built chain.
    pub fn new(specs: &[String], services: &Services) -> Result<Self> {
        Ok(Self {
            rules: compile_chain(specs, services)?,
            forwarder: Forwarder::new(),
        })
    }

    /// Handle one inbound request end to end.
    pub async fn handle(
        &self,
        request: Request<Incoming>,
        remote: SocketAddr,
    ) -> Response<ProxyBody> {
        let src_ip = match source_ip(request.headers(), &remote.to_string()) {
            Ok(src_ip) => src_ip,
            Err(err) => {
                return text_response(
                    StatusCode::BAD_REQUEST,
                    format!("invalid source ip: {err}"),
                );
            }
        };

        let target = match resolve_target(request.uri().path(), request.uri().query()) {
            Ok(target) => target,
            Err(err) => {
                return text_response(
                    StatusCode::BAD_REQUEST,
                    format!("invalid target url: {err}"),
                );
            }
        };
        log::debug!("target URL processed: path={} final={target}", request.uri().path());

        let metadata = RequestMetadata {
            src_ip,
            host: target.host_str().unwrap_or_default().to_string(),
            protocol: target.scheme().to_string(),
        };

        for rule in &self.rules {
            if rule.matches(&metadata).await {
                return match rule.action() {
                    RuleAction::Allow => {
                        log::info!(
                            "allowed by {} rule: src={src_ip} target={target}",
                            rule.rule_type()
                        );
                        self.forwarder.execute(request, target).await
                    }
                    RuleAction::Deny => {
                        log::info!(
                            "denied by {} rule: src={src_ip} target={target}",
                            rule.rule_type()
                        );
                        text_response(StatusCode::FORBIDDEN, "request denied")
                    }
                };
            }
        }

        text_response(StatusCode::BAD_REQUEST, "no rule matched")
    }
}
