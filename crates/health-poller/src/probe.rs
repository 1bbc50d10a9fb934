//! HTTP probe logic.
//!
//! A probe issues one GET against the endpoint, bounded by the request
//! timeout, and reduces whatever happens to a [`ProbeResult`]. No retries:
//! debouncing repeated failures is the tracker's job.

use std::time::Duration;

use bytes::Bytes;
use http::header::USER_AGENT;
use http::{Request, StatusCode, Uri};
use http_body_util::Empty;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::trace;

use crate::BoxFuture;
use crate::checker::ProbeResult;

const USER_AGENT_VALUE: &str = concat!("healthpoll/", env!("CARGO_PKG_VERSION"));

#[cfg(feature = "tls")]
type Connector = hyper_tls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "tls"))]
type Connector = HttpConnector;

/// Something that can check an endpoint once.
pub trait Prober: Send + Sync {
    /// Run a single probe.
    fn probe(&self) -> BoxFuture<'_, ProbeResult>;
}

/// Probes an HTTP endpoint with a pooled hyper client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    endpoint: String,
    /// `None` when the endpoint is not an absolute URL; such a prober
    /// always fails without touching the network.
    uri: Option<Uri>,
    timeout: Duration,
    success_status_code: StatusCode,
    client: Client<Connector, Empty<Bytes>>,
}

impl HttpProber {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        success_status_code: StatusCode,
    ) -> Self {
        let endpoint = endpoint.into();
        let uri = parse_endpoint(&endpoint);
        let client = Client::builder(TokioExecutor::new()).build(connector());

        Self {
            endpoint,
            uri,
            timeout,
            success_status_code,
            client,
        }
    }

    /// The endpoint as given by the caller.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn probe_uri(&self, uri: &Uri) -> ProbeResult {
        let request = match Request::get(uri.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(Empty::<Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                trace!(error = %e, endpoint = %self.endpoint, "health probe request invalid");
                return ProbeResult::Failure;
            }
        };

        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(resp)) if resp.status() == self.success_status_code => ProbeResult::Success,
            Ok(Ok(resp)) => {
                trace!(
                    status = %resp.status(),
                    expected = %self.success_status_code,
                    endpoint = %self.endpoint,
                    "health probe unexpected status"
                );
                ProbeResult::Failure
            }
            Ok(Err(e)) => {
                trace!(error = %e, endpoint = %self.endpoint, "health probe request failed");
                ProbeResult::Failure
            }
            Err(_) => {
                trace!(
                    timeout = ?self.timeout,
                    endpoint = %self.endpoint,
                    "health probe timed out"
                );
                ProbeResult::Failure
            }
        }
    }
}

impl Prober for HttpProber {
    fn probe(&self) -> BoxFuture<'_, ProbeResult> {
        Box::pin(async move {
            match &self.uri {
                Some(uri) => self.probe_uri(uri).await,
                None => {
                    trace!(
                        endpoint = %self.endpoint,
                        "health probe endpoint is not an absolute URL"
                    );
                    ProbeResult::Failure
                }
            }
        })
    }
}

/// Accept only absolute URLs; anything else can never be probed.
fn parse_endpoint(endpoint: &str) -> Option<Uri> {
    let uri: Uri = endpoint.parse().ok()?;
    (uri.scheme().is_some() && uri.authority().is_some()).then_some(uri)
}

fn connector() -> Connector {
    #[cfg(feature = "tls")]
    {
        hyper_tls::HttpsConnector::new()
    }
    #[cfg(not(feature = "tls"))]
    {
        HttpConnector::new()
    }
}
