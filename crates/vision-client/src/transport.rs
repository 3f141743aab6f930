//! Blocking HTTP(S) POST to the annotation endpoint.
//!
//! The worker only ever needs a single synchronous request per cycle, so the
//! transport wraps a blocking reqwest client rather than dragging an async
//! runtime into the pipeline. The trait seam lets tests substitute a stub.

use std::time::Duration;

use reqwest::{
    blocking::Client,
    header::{CONTENT_TYPE, LOCATION},
    redirect,
};

use crate::error::AnnotateError;

const REDIRECT_LIMIT: usize = 4;

/// Raw reply from the annotation endpoint.
#[derive(Clone, Debug)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
    /// `Location` header, surfaced so redirects are never silently dropped.
    pub location: Option<String>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Wire transport used by the worker. Implementations must be usable from the
/// worker thread, hence `Send`.
pub trait Transport: Send {
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<HttpReply, AnnotateError>;
}

/// Production transport over HTTP or HTTPS, chosen by URL scheme.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Certificate verification stays on unless `accept_invalid_certs` is set.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, AnnotateError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
            .build()
            .map_err(|err| AnnotateError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> AnnotateError {
        if err.is_timeout() {
            AnnotateError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            AnnotateError::Transport(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<HttpReply, AnnotateError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .map_err(|err| self.classify(err))?
            .to_vec();

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_the_whole_2xx_range() {
        for status in [200, 204, 299] {
            let reply = HttpReply {
                status,
                reason: String::new(),
                body: Vec::new(),
                location: None,
            };
            assert!(reply.is_success());
        }
        for status in [199, 301, 403, 500] {
            let reply = HttpReply {
                status,
                reason: String::new(),
                body: Vec::new(),
                location: None,
            };
            assert!(!reply.is_success());
        }
    }

    #[test]
    fn client_builds_for_both_tls_modes() {
        assert!(HttpTransport::new(Duration::from_secs(20), false).is_ok());
        assert!(HttpTransport::new(Duration::from_secs(20), true).is_ok());
    }
}
