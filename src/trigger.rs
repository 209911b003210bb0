//! Run-workflow trigger: the prompt dialog and the start request.
//!
//! There is no idempotency key. Starting twice starts two remote runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

use crate::api::{ApiError, SymphonyClient};
use crate::detail::InFlight;
use crate::notify::Notifier;
use crate::view::SharedView;

pub const DEFAULT_PROMPT: &str = "Scrape the first sentence on this link https://github.com/langchain-ai/langgraph/tree/main and then search the web to find an important lead developer.";

/// Workflow status shown next to the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Starting,
    Running,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Pending => "Pending",
            RunStatus::Starting => "Starting...",
            RunStatus::Running => "Running",
        })
    }
}

#[derive(Debug)]
pub enum StartOutcome {
    Started,
    /// A start request is already outstanding
    Busy,
    Failed(ApiError),
}

pub struct RunWorkflowTrigger {
    client: SymphonyClient,
    view: SharedView,
    notifier: Notifier,
    prompt: String,
    dialog_open: AtomicBool,
    starting: AtomicBool,
}

impl RunWorkflowTrigger {
    pub fn new(client: SymphonyClient, view: SharedView, notifier: Notifier) -> Self {
        Self {
            client,
            view,
            notifier,
            prompt: DEFAULT_PROMPT.to_string(),
            dialog_open: AtomicBool::new(false),
            starting: AtomicBool::new(false),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn open_dialog(&self) {
        self.dialog_open.store(true, Ordering::SeqCst);
    }

    /// Close the dialog. Refused while a start request is outstanding.
    pub fn close_dialog(&self) -> bool {
        if self.is_starting() {
            return false;
        }
        self.dialog_open.store(false, Ordering::SeqCst);
        true
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog_open.load(Ordering::SeqCst)
    }

    /// True while the trigger control is disabled.
    pub fn is_starting(&self) -> bool {
        self.starting.load(Ordering::SeqCst)
    }

    /// Label of the start button.
    pub fn button_label(&self) -> &'static str {
        if self.is_starting() {
            "Starting..."
        } else {
            "Start Workflow"
        }
    }

    pub async fn status(&self) -> RunStatus {
        if self.view.read().await.running {
            RunStatus::Running
        } else if self.is_starting() {
            RunStatus::Starting
        } else {
            RunStatus::Pending
        }
    }

    /// Submit the prompt to start a remote workflow run.
    pub async fn start(&self) -> StartOutcome {
        let Some(_guard) = InFlight::acquire(&self.starting) else {
            return StartOutcome::Busy;
        };

        info!(prompt_len = self.prompt.len(), "Starting agent workflow");
        let result = self.client.run_agent_stream(&self.prompt).await;

        match result {
            Ok(()) => {
                self.notifier.success("Agent workflow started!");
                self.view.write().await.running = true;
                self.dialog_open.store(false, Ordering::SeqCst);
                StartOutcome::Started
            }
            Err(e) => {
                error!(error = %e, "Failed to start agent workflow");
                StartOutcome::Failed(e)
            }
        }
    }
}
