use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::error::{Error, Result};
use super::request::TsRequest;
use super::response::TsResponse;
use super::Timestamper;

const TIMESTAMP_QUERY: &str = "application/timestamp-query";
const TIMESTAMP_REPLY: &str = "application/timestamp-reply";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestamperConfig {
    pub url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TimestamperConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(15),
            user_agent: concat!("shirushi/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TimestamperConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Posts DER requests to a TSA over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTimestamper {
    config: TimestamperConfig,
    http: Client,
}

impl HttpTimestamper {
    pub fn new(config: TimestamperConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::Config("TSA url is empty".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &TimestamperConfig {
        &self.config
    }

    fn post(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let url = &self.config.url;
        log::info!("requesting timestamp from {}", url);
        let resp = self
            .http
            .post(url.as_str())
            .header(CONTENT_TYPE, TIMESTAMP_QUERY)
            .header(ACCEPT, TIMESTAMP_REPLY)
            .body(body)
            .send()?;
        if !resp.status().is_success() {
            return Err(Error::HttpStatus {
                status: resp.status().as_u16(),
                url: url.clone(),
            });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_timestamp_reply(&content_type) {
            return Err(Error::ContentType {
                expected: TIMESTAMP_REPLY,
                actual: content_type,
            });
        }
        let bytes = resp.bytes()?;
        log::info!("received {} byte timestamp reply from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Parameters such as `; charset=binary` are ignored.
fn is_timestamp_reply(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(TIMESTAMP_REPLY))
}

impl Timestamper for HttpTimestamper {
    fn generate_timestamp(&self, request: &TsRequest) -> Result<TsResponse> {
        let reply = self.post(request.encode())?;
        TsResponse::from_der(&reply)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = TimestamperConfig::default();
        assert_eq!(Duration::from_secs(15), config.timeout);
        assert!(config.url.is_empty());
        assert!(config.user_agent.starts_with("shirushi/"));
    }

    #[test]
    fn test_new_rejects_empty_url() {
        let err = HttpTimestamper::new(TimestamperConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_new_with_url() {
        let config = TimestamperConfig::default()
            .with_url("http://timestamp.example.com/tsa")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent");
        let timestamper = HttpTimestamper::new(config.clone()).unwrap();
        assert_eq!(&config, timestamper.config());
    }

    #[rstest(
        content_type,
        expected,
        case("application/timestamp-reply", true),
        case("Application/Timestamp-Reply; charset=binary", true),
        case(" application/timestamp-reply ", true),
        case("application/timestamp-response", false),
        case("text/html", false),
        case("", false)
    )]
    fn test_is_timestamp_reply(content_type: &str, expected: bool) {
        assert_eq!(expected, is_timestamp_reply(content_type));
    }
}
