//! Hostname resolution over conventional DNS or DNS-over-HTTPS.

use std::net::IpAddr;
use std::ops::{Deref, DerefMut};

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use url::Url;

use crate::error::{Error, ResolveError};

const DNS_MESSAGE_CAPACITY: usize = 512;
const DNS_RESPONSE_LIMIT: usize = 4096;
const POOL_LIMIT: usize = 16;

const USER_AGENT_VALUE: &str = concat!("mirrorgate/", env!("CARGO_PKG_VERSION"));

/// Pool of reusable DNS message buffers.
///
/// Lookups are short-lived and frequent under load; leasing buffers keeps
/// encode/receive allocations bounded.
struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    fn new() -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> PooledBuf<'_> {
        let buf = self
            .buffers
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(DNS_MESSAGE_CAPACITY));
        PooledBuf { pool: self, buf }
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < POOL_LIMIT {
            buffers.push(buf);
        }
    }
}

/// Scoped buffer lease: returns to the pool when dropped, on success and
/// error paths alike.
struct PooledBuf<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuf<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuf<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuf<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

enum Upstream {
    /// Conventional DNS server, `host:port`
    Dns(String),
    /// DNS-over-HTTPS endpoint; queries travel as DNS-message payloads
    Doh { endpoint: Url, client: reqwest::Client },
}

/// Resolves hostnames to IP addresses with a single A query, no retries.
///
/// The upstream is either a conventional DNS server (`host` or `host:port`)
/// or a DoH endpoint (`https://...`). The transport client is built exactly
/// once, at construction, and shared by concurrent lookups.
pub struct Resolver {
    upstream: Upstream,
    pool: BufferPool,
}

impl Resolver {
    /// Build a resolver for the configured upstream endpoint string.
    pub fn new(dns: &str) -> Result<Self, Error> {
        let upstream = if dns.starts_with("https://") {
            let endpoint =
                Url::parse(dns).map_err(|_| Error::InvalidDnsEndpoint(dns.to_string()))?;
            Upstream::Doh {
                endpoint,
                client: reqwest::Client::new(),
            }
        } else {
            let addr = if dns.contains(':') {
                dns.to_string()
            } else {
                format!("{dns}:53")
            };
            Upstream::Dns(addr)
        };
        Ok(Self {
            upstream,
            pool: BufferPool::new(),
        })
    }

    /// Resolve a hostname to its addresses.
    ///
    /// A literal IP address (optionally bracketed or carrying a port)
    /// returns immediately without a query. A query failure is final; the
    /// caller decides how to degrade.
    pub async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        if let Some(ip) = literal_ip(host) {
            return Ok(vec![ip]);
        }

        let name = Name::from_utf8(host)?;
        let mut query = Message::new();
        query
            .set_id(rand::random())
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(name, RecordType::A));

        let mut wire = self.pool.acquire();
        {
            let mut encoder = BinEncoder::new(&mut wire);
            query.emit(&mut encoder)?;
        }

        let response = match &self.upstream {
            Upstream::Dns(addr) => self.exchange_udp(&wire, addr).await?,
            Upstream::Doh { endpoint, client } => {
                Self::exchange_doh(&wire, endpoint, client).await?
            }
        };

        let ips = response
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::A(a)) => Some(IpAddr::V4(a.0)),
                _ => None,
            })
            .collect();
        Ok(ips)
    }

    async fn exchange_udp(&self, wire: &[u8], addr: &str) -> Result<Message, ResolveError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        socket.send(wire).await?;

        let mut reply = self.pool.acquire();
        reply.resize(DNS_RESPONSE_LIMIT, 0);
        let len = socket.recv(&mut reply).await?;
        Ok(Message::from_vec(&reply[..len])?)
    }

    async fn exchange_doh(
        wire: &[u8],
        endpoint: &Url,
        client: &reqwest::Client,
    ) -> Result<Message, ResolveError> {
        let response = client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/dns-message")
            .header(ACCEPT, "application/dns-message")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(wire.to_vec())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ResolveError::DohStatus(response.status()));
        }
        let body = response.bytes().await?;
        Ok(Message::from_vec(&body)?)
    }
}

fn literal_ip(host: &str) -> Option<IpAddr> {
    if let Ok(ip) = host.parse() {
        return Some(ip);
    }
    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = trimmed.parse() {
        return Some(ip);
    }
    // host:port with an IPv4 literal
    host.split(':').next().and_then(|h| h.parse().ok())
}
