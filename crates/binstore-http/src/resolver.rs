use std::io::{self, Read};
use std::sync::Arc;

use binstore_resolver::{Resolver, ResolverError, ResolverResult};
use binstore_types::{ByteStream, Identifier, Metadata, CONTENT_TYPE};
use reqwest::blocking::{Body, Client, Response};
use reqwest::header::{HeaderValue, CONTENT_TYPE as CONTENT_TYPE_HEADER};
use reqwest::{redirect, StatusCode, Url};

use crate::config::HttpResolverConfig;
use crate::gate::{ConnectionGate, Permit};

/// Resolver for `http` and `https` identifiers.
///
/// The identifier is the resource URL; partitions do not change where
/// content lives. See the crate docs for the consistency caveat.
pub struct HttpResolver {
    client: Client,
    gate: Arc<ConnectionGate>,
    config: HttpResolverConfig,
}

impl HttpResolver {
    pub const SCHEMES: &'static [&'static str] = &["http", "https"];

    /// Build a resolver with its own pooled client.
    ///
    /// Redirects are followed up to `max_redirects`, across hosts and
    /// between `http` and `https`.
    pub fn new(config: HttpResolverConfig) -> ResolverResult<Self> {
        config.validate().map_err(ResolverError::Configuration)?;
        let client = Client::builder()
            .redirect(redirect::Policy::limited(config.max_redirects))
            .pool_max_idle_per_host(config.max_connections_per_route)
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ResolverError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(client, config)
    }

    /// Build a resolver around a pre-built client.
    ///
    /// Redirect and timeout settings are whatever the client was built with.
    /// The connection limits of `config` still apply.
    pub fn with_client(client: Client, config: HttpResolverConfig) -> ResolverResult<Self> {
        config.validate().map_err(ResolverError::Configuration)?;
        let gate = Arc::new(ConnectionGate::new(
            config.max_connections_per_route,
            config.max_connections_total,
        ));
        Ok(Self { client, gate, config })
    }

    pub fn config(&self) -> &HttpResolverConfig {
        &self.config
    }

    /// The gate bounding in-flight requests.
    pub fn gate(&self) -> &Arc<ConnectionGate> {
        &self.gate
    }

    fn url_for(&self, identifier: &Identifier) -> ResolverResult<Url> {
        Url::parse(identifier.as_str()).map_err(|e| ResolverError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })
    }

    fn permit(&self, url: &Url) -> Permit {
        self.gate.acquire(&route_of(url))
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder, url: &Url) -> ResolverResult<Response> {
        request.send().map_err(|e| {
            tracing::error!(url = %url, error = %e, "HTTP request failed");
            ResolverError::Transport {
                url: url.to_string(),
                source: Box::new(e),
            }
        })
    }

    fn ensure_writable(&self, operation: &'static str) -> ResolverResult<()> {
        if self.config.read_only {
            tracing::warn!(operation, "write refused by read-only http resolver");
            return Err(ResolverError::unsupported(self.name(), operation));
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResolver")
            .field("config", &self.config)
            .field("in_use", &self.gate.in_use())
            .finish()
    }
}

/// Pool key for a URL: `scheme://host:port`.
fn route_of(url: &Url) -> String {
    format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}

fn is_gone(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

/// Response body that keeps its connection slot until dropped.
struct GatedBody {
    response: Response,
    _permit: Permit,
}

impl Read for GatedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response.read(buf)
    }
}

impl Resolver for HttpResolver {
    fn name(&self) -> &str {
        "http"
    }

    fn uri_schemes(&self) -> &'static [&'static str] {
        Self::SCHEMES
    }

    fn exists(&self, _partition: &str, identifier: &Identifier) -> ResolverResult<bool> {
        let url = self.url_for(identifier)?;
        let _permit = self.permit(&url);
        let response = self.send(self.client.head(url.clone()), &url)?;
        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "HEAD");
        Ok(status.as_u16() < 400)
    }

    fn get_content(&self, _partition: &str, identifier: &Identifier) -> ResolverResult<Option<ByteStream>> {
        let url = self.url_for(identifier)?;
        let permit = self.permit(&url);
        let response = self.send(self.client.get(url.clone()), &url)?;
        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "GET");
        if is_gone(status) {
            return Ok(None);
        }
        if status.as_u16() >= 400 {
            tracing::error!(url = %url, status = status.as_u16(), "GET failed");
            return Err(ResolverError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(Box::new(GatedBody {
            response,
            _permit: permit,
        })))
    }

    fn set_content(
        &self,
        _partition: &str,
        identifier: &Identifier,
        content: ByteStream,
        metadata: &Metadata,
    ) -> ResolverResult<()> {
        self.ensure_writable("set_content")?;
        let url = self.url_for(identifier)?;
        let mut request = self.client.put(url.clone()).body(Body::new(content));
        if let Some(value) = metadata
            .get(CONTENT_TYPE)
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            request = request.header(CONTENT_TYPE_HEADER, value);
        }

        let _permit = self.permit(&url);
        let response = self.send(request, &url)?;
        let status = response.status();
        if status.as_u16() >= 300 {
            tracing::error!(url = %url, status = status.as_u16(), "PUT rejected");
            return Err(ResolverError::write(
                url.as_str(),
                format!("server responded with status {status}"),
            ));
        }
        tracing::debug!(url = %url, status = status.as_u16(), "PUT");
        Ok(())
    }

    fn purge_content(&self, _partition: &str, identifier: &Identifier) -> ResolverResult<()> {
        self.ensure_writable("purge_content")?;
        let url = self.url_for(identifier)?;
        let _permit = self.permit(&url);
        let response = self.send(self.client.delete(url.clone()), &url)?;
        let status = response.status();
        if status.as_u16() >= 300 && !is_gone(status) {
            tracing::warn!(url = %url, status = status.as_u16(), "DELETE rejected");
            return Err(ResolverError::write(
                url.as_str(),
                format!("server responded with status {status}"),
            ));
        }
        tracing::debug!(url = %url, status = status.as_u16(), "DELETE");
        Ok(())
    }
}
