//! Real transport implementation using reqwest.

use std::collections::HashMap;

use bytes::Bytes;
use reqwest::{Client, Method, Proxy};
use tracing::trace;

use super::types::{HeaderSet, HttpRequest, HttpResponse, TransportError};
use super::{BoxFuture, Transport};
use crate::app::ConfigError;

/// Proxy map keys understood by [`ReqwestTransport::new`].
pub const PROXY_SCHEMES: [&str; 3] = ["http", "https", "all"];

/// Transport backed by a shared `reqwest::Client`.
///
/// The client is built once with the configured proxies. Timeouts are applied
/// per request from [`HttpRequest::timeout`], since tasks may override the
/// engine default.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport routing traffic through the given proxies.
    ///
    /// `proxies` maps a scheme (`http`, `https` or `all`) to a proxy URI.
    pub fn new(proxies: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();

        for (scheme, uri) in proxies {
            builder = builder.proxy(build_proxy(scheme, uri)?);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        method: Method,
        request: &HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let is_head = method == Method::HEAD;
        let mut builder = self
            .client
            .request(method, request.url.as_str())
            .timeout(request.timeout);

        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        trace!(request = %request, head = is_head, "Sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, request))?;

        let status = response.status().as_u16();
        let headers: HeaderSet = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = if is_head {
            Bytes::new()
        } else {
            response.bytes().await.map_err(|e| classify(e, request))?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn head<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        Box::pin(self.send(Method::HEAD, request))
    }

    fn get<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        Box::pin(self.send(Method::GET, request))
    }
}

fn build_proxy(scheme: &str, uri: &str) -> Result<Proxy, ConfigError> {
    let proxy = match scheme.to_ascii_lowercase().as_str() {
        "http" => Proxy::http(uri),
        "https" => Proxy::https(uri),
        "all" => Proxy::all(uri),
        other => return Err(ConfigError::UnsupportedProxyScheme(other.to_string())),
    };

    proxy.map_err(|e| ConfigError::InvalidProxy {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

fn classify(err: reqwest::Error, request: &HttpRequest) -> TransportError {
    let url = request.url.clone();
    if err.is_timeout() {
        TransportError::Timeout {
            url,
            timeout_ms: request.timeout.as_millis() as u64,
        }
    } else if err.is_connect() {
        TransportError::Connect {
            url,
            reason: err.to_string(),
        }
    } else {
        TransportError::Request {
            url,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_proxies() {
        assert!(ReqwestTransport::new(&HashMap::new()).is_ok());
    }

    #[test]
    fn test_new_with_proxies() {
        let proxies = HashMap::from([
            ("http".to_string(), "http://localhost:3128".to_string()),
            ("HTTPS".to_string(), "http://localhost:3129".to_string()),
        ]);
        assert!(ReqwestTransport::new(&proxies).is_ok());
    }

    #[test]
    fn test_unsupported_proxy_scheme() {
        let proxies = HashMap::from([("ftp".to_string(), "http://localhost".to_string())]);
        let err = ReqwestTransport::new(&proxies).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedProxyScheme("ftp".to_string()));
    }

    #[test]
    fn test_invalid_proxy_uri() {
        let proxies = HashMap::from([("all".to_string(), "http://[invalid".to_string())]);
        let err = ReqwestTransport::new(&proxies).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProxy { .. }));
    }
}
