//! JSON-over-HTTP oracle client.
//!
//! Each operation is a `POST {endpoint}/{operation}` carrying the request as
//! JSON. The body of a successful response is an [`OracleReply`]:
//!
//! ```json
//! {"status": "answer", "result": {"role": "question", "confidence": 0.9}}
//! {"status": "unable", "result": "not enough context"}
//! ```

use std::time::Duration;

use qfill_model::GlobalContext;
use reqwest::blocking::Client;
use reqwest::header::{RETRY_AFTER, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{OracleError, Result};
use crate::oracle::{Oracle, OracleReply};
use crate::request::{
    ClassificationRequest, ContextRequest, HierarchyRequest, HierarchyVerdict, StrategyRequest,
    StrategyVerdict, Verdict,
};

/// Fallback wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

pub struct HttpOracle {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpOracle {
    /// Create a client for `endpoint`. The HTTP timeout is a backstop; the
    /// resilience wrapper enforces the per-call limit.
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(OracleError::Config(format!(
                "endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post<Req, T>(&self, operation: &str, request: &Req) -> Result<OracleReply<T>>
    where
        Req: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/{operation}", self.endpoint);
        debug!(%url, "Calling oracle");
        let mut builder = self
            .client
            .post(&url)
            .header(USER_AGENT, format!("qfill/{}", env!("CARGO_PKG_VERSION")))
            .json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send()?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(OracleError::RateLimited { retry_after_secs });
        }
        if !response.status().is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OracleError::Status { status, message });
        }

        let body = response.text()?;
        parse_reply(&body)
    }
}

/// Decode a reply body. Anything that does not match the reply shape is
/// reported as malformed.
pub fn parse_reply<T: DeserializeOwned>(body: &str) -> Result<OracleReply<T>> {
    serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))
}

impl Oracle for HttpOracle {
    fn name(&self) -> &str {
        "http"
    }

    fn classify(&self, request: &ClassificationRequest) -> Result<OracleReply<Verdict>> {
        self.post("classify", request)
    }

    fn hierarchy(&self, request: &HierarchyRequest) -> Result<OracleReply<HierarchyVerdict>> {
        self.post("hierarchy", request)
    }

    fn strategy(&self, request: &StrategyRequest) -> Result<OracleReply<StrategyVerdict>> {
        self.post("strategy", request)
    }

    fn context(&self, request: &ContextRequest) -> Result<OracleReply<GlobalContext>> {
        self.post("context", request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answer_and_unable() {
        let reply: OracleReply<Verdict> =
            parse_reply(r#"{"status":"answer","result":{"role":"answer","confidence":0.8}}"#)
                .unwrap();
        let verdict = reply.answer().unwrap();
        assert_eq!(verdict.role, "answer");
        assert!((verdict.confidence - 0.8).abs() < f32::EPSILON);

        let reply: OracleReply<Verdict> =
            parse_reply(r#"{"status":"unable","result":"no idea"}"#).unwrap();
        assert_eq!(reply, OracleReply::Unable("no idea".to_string()));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_reply::<Verdict>("I think it is a question column").unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
        let err = parse_reply::<Verdict>(r#"{"status":"answer","result":{"role":1}}"#).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let result = HttpOracle::new("ftp://oracle", None, Duration::from_secs(1));
        assert!(matches!(result, Err(OracleError::Config(_))));
    }
}
