//! Node detail view and the human-in-the-loop feedback channel.
//!
//! Loading a detail is all-or-nothing: either the node is found in a fresh
//! status response or the load fails with a [`DetailError`].

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{error, info};

use crate::api::{AgentNodeStatus, ApiError, StatusSource, SymphonyClient};
use crate::graph::Navigation;
use crate::notify::Notifier;

/// Pre-filled answer in the feedback form
pub const DEFAULT_FEEDBACK: &str = "Yes";

/// Shown when the service has not sent a question of its own
pub const FALLBACK_QUESTION: &str =
    "The agent is paused and waiting for your approval. Answer \"yes\" to let it continue.";

#[derive(Error, Debug)]
pub enum DetailError {
    #[error("Failed to load node status: {0}")]
    Api(#[from] ApiError),

    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDetail {
    pub node: AgentNodeStatus,

    /// Question the agent is waiting on, when the service reports one for it
    pub pending_question: Option<String>,

    /// Whether this node takes human feedback
    pub accepts_feedback: bool,
}

impl NodeDetail {
    /// Fetch the current status and pick out `node_id`.
    pub async fn load(
        source: &dyn StatusSource,
        node_id: &str,
        feedback_node_id: &str,
    ) -> Result<Self, DetailError> {
        let response = source.fetch_status().await?;

        let node = response
            .node(node_id)
            .cloned()
            .ok_or_else(|| DetailError::NodeNotFound(node_id.to_string()))?;
        let pending_question = response
            .feedback_question_for(&node.label)
            .map(str::to_string);

        info!(node_id = %node.id, label = %node.label, status = %node.status, "Loaded node detail");

        Ok(Self {
            accepts_feedback: node.id == feedback_node_id,
            node,
            pending_question,
        })
    }

    /// The feedback form for this node, if it takes feedback.
    pub fn feedback_form(&self, client: SymphonyClient, notifier: Notifier) -> Option<FeedbackForm> {
        self.accepts_feedback
            .then(|| FeedbackForm::new(client, notifier, &self.node.label))
    }

    pub fn question(&self) -> &str {
        self.pending_question.as_deref().unwrap_or(FALLBACK_QUESTION)
    }
}

// =============================================================================
// FEEDBACK FORM
// =============================================================================
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Feedback accepted; leave the detail view
    Resolved(Navigation),
    /// A submission is already in flight; nothing was sent
    Busy,
    /// The request failed; the form stays open for another try
    Failed(ApiError),
}

/// Editable feedback value for one agent, with a single-submission guard.
#[derive(Debug)]
pub struct FeedbackForm {
    client: SymphonyClient,
    notifier: Notifier,
    agent_label: String,
    value: String,
    in_flight: AtomicBool,
}

/// Holds a single-flight flag for one request and clears it however the
/// request ends, including when its future is dropped mid-await.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// Set `flag`, or `None` if another request already holds it.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl FeedbackForm {
    pub fn new(client: SymphonyClient, notifier: Notifier, agent_label: &str) -> Self {
        Self {
            client,
            notifier,
            agent_label: agent_label.to_string(),
            value: DEFAULT_FEEDBACK.to_string(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// True while a submission is outstanding (the submit control is disabled).
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };

        match self.client.resolve_feedback(&self.agent_label, &self.value).await {
            Ok(()) => {
                info!(agent = %self.agent_label, "Feedback accepted");
                self.notifier.success("Continuing agent work...");
                SubmitOutcome::Resolved(Navigation::Back)
            }
            Err(e) => {
                error!(agent = %self.agent_label, error = %e, "Failed to submit feedback");
                SubmitOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn status_body() -> serde_json::Value {
        json!({
            "elapsed_time": 3.0,
            "current_agent": "Searcher Agent",
            "human_feedback_requested": true,
            "message": "Can you provide the folder password?",
            "data": [
                { "id": "1", "type": "agent-input", "data": { "label": "User", "status": "success" } },
                { "id": "5", "type": "agent-output", "data": { "label": "Searcher Agent", "status": "running", "timeElapsed": 3.0 } }
            ]
        })
    }

    async fn status_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agent_status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_load_feedback_node() {
        let server = status_server().await;
        let client = SymphonyClient::new(&server.uri()).unwrap();

        let detail = NodeDetail::load(&client, "5", "5").await.unwrap();

        assert_eq!(detail.node.label, "Searcher Agent");
        assert!(detail.accepts_feedback);
        assert_eq!(detail.question(), "Can you provide the folder password?");
    }

    #[tokio::test]
    async fn test_load_plain_node() {
        let server = status_server().await;
        let client = SymphonyClient::new(&server.uri()).unwrap();

        let detail = NodeDetail::load(&client, "1", "5").await.unwrap();

        assert!(!detail.accepts_feedback);
        assert!(detail.pending_question.is_none());
        let (notifier, _rx) = Notifier::channel();
        assert!(detail.feedback_form(client, notifier).is_none());
    }

    #[tokio::test]
    async fn test_load_missing_node() {
        let server = status_server().await;
        let client = SymphonyClient::new(&server.uri()).unwrap();

        let err = NodeDetail::load(&client, "42", "5").await.unwrap_err();
        assert!(matches!(err, DetailError::NodeNotFound(ref id) if id == "42"));
    }

    #[tokio::test]
    async fn test_load_endpoint_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/agent_status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = SymphonyClient::new(&server.uri()).unwrap();

        let err = NodeDetail::load(&client, "5", "5").await.unwrap_err();
        assert!(matches!(err, DetailError::Api(ApiError::Status(503, _))));
    }

    #[tokio::test]
    async fn test_submit_success_navigates_back_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resolve_feedback"))
            .and(body_json(json!({ "agent": "Searcher Agent", "feedback": "Yes" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        let (notifier, mut rx) = Notifier::channel();
        let form = FeedbackForm::new(client, notifier, "Searcher Agent");

        // Double click: the second press lands while the first is in flight
        let (first, second) = tokio::join!(form.submit(), form.submit());
        let outcomes = [first, second];

        let backs = outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Resolved(Navigation::Back)))
            .count();
        let busy = outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Busy))
            .count();
        assert_eq!(backs, 1);
        assert_eq!(busy, 1);
        assert!(!form.is_submitting());

        let note = rx.try_recv().unwrap();
        assert_eq!(note.level, Level::Success);
        assert_eq!(note.message, "Continuing agent work...");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_failure_allows_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resolve_feedback"))
            .respond_with(ResponseTemplate::new(400))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/resolve_feedback"))
            .and(body_json(json!({ "agent": "Searcher Agent", "feedback": "y" })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = SymphonyClient::new(&server.uri()).unwrap();
        let (notifier, mut rx) = Notifier::channel();
        let mut form = FeedbackForm::new(client, notifier, "Searcher Agent");

        assert!(matches!(form.submit().await, SubmitOutcome::Failed(ApiError::Status(400, _))));
        assert!(!form.is_submitting());
        assert!(rx.try_recv().is_err());

        form.set_value("y");
        assert!(matches!(form.submit().await, SubmitOutcome::Resolved(Navigation::Back)));
    }
}
