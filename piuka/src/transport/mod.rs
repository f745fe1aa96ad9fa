//! HTTP transport abstraction.
//!
//! The engine never talks to the network directly. Workers issue HEAD and GET
//! requests through the [`Transport`] trait, which keeps connection handling,
//! TLS, redirects and proxies outside the download protocol and lets tests
//! substitute scripted transports.
//!
//! # Example
//!
//! ```ignore
//! use piuka::transport::{HeaderSet, HttpRequest, ReqwestTransport, Transport};
//!
//! let transport = ReqwestTransport::new(&Default::default())?;
//! let request = HttpRequest::new(url, HeaderSet::new(), Duration::from_secs(2));
//! let response = transport.head(&request).await?;
//! println!("{:?}", response.content_length());
//! ```

mod http;
mod types;

pub use futures::future::BoxFuture;
pub use http::{ReqwestTransport, PROXY_SCHEMES};
pub use types::{
    default_user_agent, HeaderSet, HttpRequest, HttpResponse, TransportError, CONTENT_LENGTH,
    RANGE, USER_AGENT,
};

/// Trait for HTTP operations needed by workers.
///
/// Implementations must enforce `request.timeout` themselves and must report
/// non-2xx statuses as successful responses; status classification belongs
/// to the caller.
///
/// Methods return boxed futures so the trait stays object safe and can be
/// shared as `Arc<dyn Transport>`.
pub trait Transport: Send + Sync + 'static {
    /// Performs a HEAD request. The returned body is empty.
    fn head<'a>(&'a self, request: &'a HttpRequest)
        -> BoxFuture<'a, Result<HttpResponse, TransportError>>;

    /// Performs a GET request, honoring any `range` header.
    fn get<'a>(&'a self, request: &'a HttpRequest)
        -> BoxFuture<'a, Result<HttpResponse, TransportError>>;
}
