//! HTTP client for the one-shot mailbox relay protocol (`spec.md` §4.1).
//!
//! Every rendezvous is a pair of HTTP calls against the same path: one side
//! `POST`s a body, the other `GET`s it; the relay holds the `GET` open until
//! a body arrives, then delivers it exactly once. The client never
//! interprets the body — callers own the address strings (built in
//! `tunnel_protocol::address`) and the JSON shapes.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use reqwest::{dns::Resolve, Client, Url};
use tracing::{debug, warn};

use crate::{Result, TunnelError};

/// A `name: value` header supplied on the CLI with `--header`.
pub type Header = (String, String);

/// Client for the one-shot mailbox relay.
///
/// Built once per session (`reqwest::Client` pools connections internally),
/// so long-poll `GET`s and `POST`s from the same process share the pool, as
/// `spec.md` §4.1 requires ("connection lifetime spans the whole session").
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base: Url,
}

impl RelayClient {
    /// Build a client rooted at `server` (the `--server`/`PIPING_SERVER` base
    /// URL). `insecure` disables TLS certificate verification; `dns_server`,
    /// if given, replaces the system resolver with a single-nameserver
    /// `hickory-resolver` lookup.
    pub fn new(server: &str, insecure: bool, dns_server: Option<SocketAddr>) -> Result<Self> {
        let base = Url::parse(server)
            .map_err(|e| TunnelError::InvalidPeerMessage(format!("bad --server URL: {e}")))?;

        let mut builder = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(600));

        if let Some(addr) = dns_server {
            builder = builder.dns_resolver(Arc::new(OverrideResolver::new(addr)));
        }

        let http = builder.build().map_err(TunnelError::RelayNetwork)?;

        Ok(Self { http, base })
    }

    fn url_for(&self, address: &str) -> Result<Url> {
        self.base
            .join(address)
            .map_err(|e| TunnelError::InvalidPeerMessage(format!("bad relay address: {e}")))
    }

    /// `POST` `body` to `address`. Succeeds only on HTTP 200; any other
    /// status fails with `RelayUnavailable`. `headers` are appended after
    /// `Content-Type`.
    pub async fn post(
        &self,
        address: &str,
        content_type: &str,
        body: impl Into<Bytes>,
        headers: &[Header],
    ) -> Result<()> {
        let url = self.url_for(address)?;
        debug!(%url, "posting to relay");

        let mut req = self
            .http
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.into());
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let resp = req.send().await.map_err(TunnelError::RelayNetwork)?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "relay rejected post");
            return Err(TunnelError::RelayUnavailable {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// `GET` `address`, blocking until the relay has a body to deliver.
    pub async fn get(&self, address: &str, headers: &[Header]) -> Result<Bytes> {
        let url = self.url_for(address)?;
        debug!(%url, "long-polling relay");

        let mut req = self.http.get(url.clone());
        for (name, value) in headers {
            req = req.header(name, value);
        }

        let resp = req.send().await.map_err(TunnelError::RelayNetwork)?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "relay get failed");
            return Err(TunnelError::RelayUnavailable {
                status: status.as_u16(),
            });
        }
        resp.bytes().await.map_err(TunnelError::RelayNetwork)
    }
}

/// `reqwest::dns::Resolve` backed by a single fixed nameserver, for
/// `--dns-server`. `reqwest` wraps resolvers in `Arc` itself, so the lookup
/// is built lazily behind a `OnceLock` the first time it's needed.
#[derive(Clone)]
struct OverrideResolver {
    resolver: Arc<OnceLock<TokioAsyncResolver>>,
    nameserver: SocketAddr,
}

impl OverrideResolver {
    fn new(nameserver: SocketAddr) -> Self {
        Self {
            resolver: Arc::new(OnceLock::new()),
            nameserver,
        }
    }

    fn get(&self) -> &TokioAsyncResolver {
        self.resolver.get_or_init(|| {
            let group = NameServerConfigGroup::from_ips_clear(
                &[self.nameserver.ip()],
                self.nameserver.port(),
                true,
            );
            let config = ResolverConfig::from_parts(None, vec![], group);
            TokioAsyncResolver::tokio(config, ResolverOpts::default())
        })
    }
}

impl Resolve for OverrideResolver {
    fn resolve(&self, name: reqwest::dns::Name) -> reqwest::dns::Resolving {
        let this = self.clone();
        Box::pin(async move {
            let lookup = this
                .get()
                .lookup_ip(name.as_str())
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            Ok(Box::new(addrs.into_iter()) as Box<dyn Iterator<Item = SocketAddr> + Send>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    #[tokio::test]
    async fn post_and_get_round_trip() {
        let app = Router::new().route(
            "/hello",
            get(|| async { "world" }).post(|body: String| async move { body }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = RelayClient::new(&format!("http://{addr}/"), false, None).unwrap();
        client
            .post("hello", "text/plain", Bytes::from_static(b"ignored"), &[])
            .await
            .unwrap();

        let body = client.get("hello", &[]).await.unwrap();
        assert_eq!(&body[..], b"world");
    }

    #[tokio::test]
    async fn non_200_status_is_relay_unavailable() {
        let app = Router::new().route(
            "/gone",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = RelayClient::new(&format!("http://{addr}/"), false, None).unwrap();
        let err = client.get("gone", &[]).await.unwrap_err();
        assert!(matches!(err, TunnelError::RelayUnavailable { status: 404 }));
    }

    #[test]
    fn address_is_joined_against_base_url() {
        let client = RelayClient::new("https://ppng.io/", false, None).unwrap();
        let url = client.url_for("abcd1234/candidates").unwrap();
        assert_eq!(url.as_str(), "https://ppng.io/abcd1234/candidates");
    }
}
