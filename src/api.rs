//! # API Module
//!
//! Typed client for the workflow orchestration service.
//!
//! Every remote payload has an explicit data-transfer type. Responses are
//! parsed strictly: a body that does not match the expected shape is an
//! [`ApiError::Decode`], never a half-filled value. The one lenient field is
//! the node status string, which is kept verbatim when it is not one of the
//! four known values so the presentation layer can decide what to do with it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default timeout for a single request to the orchestration service
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// ERRORS
// =============================================================================
/// Failures talking to the orchestration service.
///
/// Any non-2xx status is a [`ApiError::Status`]; callers never branch on the
/// specific code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Invalid base URL '{0}': {1}")]
    InvalidUrl(String, String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::Connection(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

// =============================================================================
// NODE TYPES
// =============================================================================
/// Role of a node in the agent graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The user prompt entering the workflow
    #[serde(rename = "agent-input")]
    Input,
    /// An intermediate (supervisor or team) agent
    #[serde(rename = "agent")]
    Agent,
    /// A leaf worker agent
    #[serde(rename = "agent-output")]
    Output,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Input => "agent-input",
            NodeKind::Agent => "agent",
            NodeKind::Output => "agent-output",
        }
    }
}

/// Execution status reported for a node.
///
/// Unrecognized strings survive parsing as [`NodeStatus::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Failed,
    Unknown(String),
}

impl NodeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Failed => "failed",
            NodeStatus::Unknown(s) => s,
        }
    }
}

impl From<String> for NodeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => NodeStatus::Pending,
            "running" => NodeStatus::Running,
            "success" => NodeStatus::Success,
            "failed" => NodeStatus::Failed,
            _ => NodeStatus::Unknown(s),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single agent node, as returned on every poll.
///
/// On the wire this is the service's graph-node object
/// (`{id, type, position, data: {label, status, timeElapsed, ...}}`);
/// the nested `data` object is flattened here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireNode", into = "WireNode")]
pub struct AgentNodeStatus {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub status: NodeStatus,
    pub elapsed_seconds: Option<f64>,
    pub estimated_seconds: Option<f64>,
    /// How many times the service has invoked this agent
    pub call_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireNode {
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    data: WireNodeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireNodeData {
    label: String,
    status: NodeStatus,
    #[serde(rename = "timeElapsed", default, skip_serializing_if = "Option::is_none")]
    time_elapsed: Option<f64>,
    #[serde(rename = "timeEstimated", default, skip_serializing_if = "Option::is_none")]
    time_estimated: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number_calls: Option<u32>,
}

impl From<WireNode> for AgentNodeStatus {
    fn from(w: WireNode) -> Self {
        Self {
            id: w.id,
            kind: w.kind,
            label: w.data.label,
            status: w.data.status,
            elapsed_seconds: w.data.time_elapsed,
            estimated_seconds: w.data.time_estimated,
            call_count: w.data.number_calls,
        }
    }
}

impl From<AgentNodeStatus> for WireNode {
    fn from(n: AgentNodeStatus) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            data: WireNodeData {
                label: n.label,
                status: n.status,
                time_elapsed: n.elapsed_seconds,
                time_estimated: n.estimated_seconds,
                number_calls: n.call_count,
            },
        }
    }
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================
/// Response of `POST /agent_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Seconds the current agent has been running; absent or zero when idle
    #[serde(default)]
    pub elapsed_time: Option<f64>,

    /// Full node list; always replaces the previous one
    #[serde(rename = "data")]
    pub nodes: Vec<AgentNodeStatus>,

    #[serde(default)]
    pub current_agent: String,

    #[serde(default)]
    pub task_active: bool,

    /// Free-form message; holds the agent's question while it waits for feedback
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub human_feedback_requested: bool,

    #[serde(default)]
    pub current_agent_call_count: u32,
}

impl StatusResponse {
    /// True when the service reports a non-zero elapsed time.
    pub fn reports_progress(&self) -> bool {
        self.elapsed_time.is_some_and(|t| t != 0.0)
    }

    /// The pending feedback question for the agent with `label`, if any.
    pub fn feedback_question_for(&self, label: &str) -> Option<&str> {
        if self.human_feedback_requested && self.current_agent == label && !self.message.is_empty() {
            Some(self.message.as_str())
        } else {
            None
        }
    }

    pub fn node(&self, id: &str) -> Option<&AgentNodeStatus> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Serialize)]
struct StatusRequest {}

/// Body of `POST /resolve_feedback`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackRequest {
    /// Label of the agent waiting for input
    pub agent: String,
    pub feedback: String,
}

/// Body of `POST /run_agent_stream`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRequest {
    pub prompt: String,
}

// =============================================================================
// STATUS SOURCE SEAM
// =============================================================================
/// Anything that can produce a fresh [`StatusResponse`].
///
/// The poller and the detail view depend on this rather than on the HTTP
/// client directly.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<StatusResponse, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================
/// HTTP client for the orchestration service's three endpoints.
#[derive(Debug, Clone)]
pub struct SymphonyClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl SymphonyClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        url::Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(base_url.to_string(), e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST a JSON body and fail on any non-2xx status.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), text));
        }

        Ok(response)
    }

    /// `POST /agent_status` with an empty body.
    pub async fn agent_status(&self) -> Result<StatusResponse, ApiError> {
        let response = self.post("agent_status", &StatusRequest {}).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `POST /resolve_feedback`; the response body is ignored.
    pub async fn resolve_feedback(&self, agent: &str, feedback: &str) -> Result<(), ApiError> {
        let request = FeedbackRequest {
            agent: agent.to_string(),
            feedback: feedback.to_string(),
        };
        self.post("resolve_feedback", &request).await?;
        Ok(())
    }

    /// `POST /run_agent_stream`; the response body is ignored.
    pub async fn run_agent_stream(&self, prompt: &str) -> Result<(), ApiError> {
        let request = RunRequest {
            prompt: prompt.to_string(),
        };
        self.post("run_agent_stream", &request).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSource for SymphonyClient {
    async fn fetch_status(&self) -> Result<StatusResponse, ApiError> {
        self.agent_status().await
    }
}


/// HTTP tests against a mocked orchestration service
#[cfg(test)]
mod http_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status_body() -> serde_json::Value {
        json!({
            "elapsed_time": 12.5,
            "data": [{
                "id": "1",
                "type": "agent-input",
                "data": { "label": "User", "status": "success", "timeElapsed": 12.5 }
            }]
        })
    }

    #[tokio::test]
    async fn test_agent_status_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agent_status"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        let resp = client.agent_status().await.unwrap();

        assert!(resp.reports_progress());
        assert_eq!(resp.nodes[0].status, NodeStatus::Success);
    }

    #[tokio::test]
    async fn test_agent_status_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agent_status"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        let err = client.agent_status().await.unwrap_err();

        assert!(matches!(err, ApiError::Status(500, ref body) if body == "boom"));
    }

    #[tokio::test]
    async fn test_agent_status_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agent_status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": [] })))
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        let err = client.agent_status().await.unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_resolve_feedback_sends_agent_and_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resolve_feedback"))
            .and(body_json(json!({ "agent": "Searcher Agent", "feedback": "yes" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        client.resolve_feedback("Searcher Agent", "yes").await.unwrap();
    }

    #[tokio::test]
    async fn test_run_agent_stream_rejects_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run_agent_stream"))
            .and(body_json(json!({ "prompt": "hello" })))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        let err = client.run_agent_stream("hello").await.unwrap_err();

        assert!(matches!(err, ApiError::Status(400, _)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Nothing listens on port 9 on a test host
        let client = SymphonyClient::new("http://127.0.0.1:9")
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        let err = client.agent_status().await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::Connection(_) | ApiError::Network(_) | ApiError::Timeout
        ));
    }
}
