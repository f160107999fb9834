// HTTP exchange abstraction over reqwest
use async_trait::async_trait;
use std::error::Error as _;
use thiserror::Error;

use crate::infrastructure::config::NoaaSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("connection failed mid-transfer: {0}")]
    Io(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = describe_chain(&err);
        if err.is_timeout() || has_timed_out_source(&err) {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Unreachable(message)
        } else if err.is_body() || err.is_decode() || err.is_request() {
            Self::Io(message)
        } else {
            Self::Other(message)
        }
    }
}

fn describe_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn has_timed_out_source(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Opens one GET exchange per fetch.
pub trait HttpConnector: Send + Sync {
    /// Prepare an exchange. Nothing goes on the wire until `status` is awaited.
    fn open(&self, url: &str) -> Box<dyn HttpExchange>;
}

#[async_trait]
pub trait HttpExchange: Send {
    /// Send the request (first call only) and return the response status code.
    async fn status(&mut self) -> Result<u16, TransportError>;

    /// Read the whole response body. Requires a prior successful `status`.
    async fn read_body(&mut self) -> Result<String, TransportError>;

    /// Drop the underlying connection. Safe to call in any state.
    fn release(&mut self);
}

pub struct ReqwestConnector {
    client: reqwest::Client,
}

impl ReqwestConnector {
    pub fn new(settings: &NoaaSettings) -> anyhow::Result<Self> {
        // no whole-call deadline: a body that keeps arriving is never cut off
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout())
            .read_timeout(settings.read_timeout())
            .build()?;

        Ok(Self { client })
    }
}

impl HttpConnector for ReqwestConnector {
    fn open(&self, url: &str) -> Box<dyn HttpExchange> {
        Box::new(ReqwestExchange {
            client: self.client.clone(),
            url: url.to_string(),
            response: None,
            released: false,
        })
    }
}

struct ReqwestExchange {
    client: reqwest::Client,
    url: String,
    response: Option<reqwest::Response>,
    released: bool,
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn status(&mut self) -> Result<u16, TransportError> {
        if self.released {
            return Err(TransportError::Other("exchange already released".to_string()));
        }
        if let Some(response) = &self.response {
            return Ok(response.status().as_u16());
        }

        let response = self.client.get(&self.url).send().await?;
        let status = response.status().as_u16();
        self.response = Some(response);
        Ok(status)
    }

    async fn read_body(&mut self) -> Result<String, TransportError> {
        let response = self.response.take().ok_or_else(|| {
            TransportError::Other("response body requested before status".to_string())
        })?;
        Ok(response.text().await?)
    }

    fn release(&mut self) {
        if !self.released {
            tracing::debug!("Releasing connection to {}", self.url);
        }
        self.response = None;
        self.released = true;
    }
}
