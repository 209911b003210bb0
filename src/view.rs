//! Shared view state for the workflow graph page.
//!
//! The poller writes it, the run trigger flips `running`, and the renderer
//! reads it. Writers hold the lock only for plain field updates, never across
//! an await.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::{AgentNodeStatus, StatusResponse};

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Node statuses from the most recently applied poll
    pub nodes: Vec<AgentNodeStatus>,

    /// Set once the service reports progress or a run is started; never cleared
    pub running: bool,

    /// Agent the service reported as current on the last applied poll
    pub current_agent: Option<String>,

    /// Sequence number of the poll whose response is in `nodes`
    pub last_applied_seq: u64,

    pub completed_polls: u64,
    pub failed_polls: u64,

    /// Successful responses dropped because a newer poll had already landed
    pub discarded_polls: u64,

    pub last_updated: Option<DateTime<Utc>>,
}

impl ViewState {
    /// Fold a poll response into the view. Nodes are replaced, not merged.
    pub(crate) fn apply(&mut self, seq: u64, response: StatusResponse) {
        self.last_applied_seq = seq;
        if response.reports_progress() {
            self.running = true;
        }
        self.current_agent = if response.current_agent.is_empty() {
            None
        } else {
            Some(response.current_agent)
        };
        self.nodes = response.nodes;
        self.completed_polls += 1;
        self.last_updated = Some(Utc::now());
    }
}

pub type SharedView = Arc<RwLock<ViewState>>;

pub fn shared() -> SharedView {
    Arc::new(RwLock::new(ViewState::default()))
}
