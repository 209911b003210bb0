//! # Symphony Console
//!
//! Client-side presentation layer for a human-in-the-loop multi-agent
//! workflow service.
//!
//! - [`poller`] keeps a shared view of node statuses fresh on a fixed cadence
//! - [`graph`] turns those statuses into a render-ready graph
//! - [`detail`] loads a single node and submits human feedback for it
//! - [`trigger`] starts new workflow runs
//! - [`validation`] and [`profile`] hold the account form rules
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use symphony_console::{api::SymphonyClient, notify::Notifier, poller::StatusPoller, view};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let client = Arc::new(SymphonyClient::new("http://localhost:8000")?);
//! let (notifier, _toasts) = Notifier::channel();
//! let state = view::shared();
//!
//! let handle = StatusPoller::new(client, state.clone(), notifier, Duration::from_secs(3)).start();
//! tokio::time::sleep(Duration::from_secs(10)).await;
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod detail;
pub mod graph;
pub mod notify;
pub mod poller;
pub mod profile;
pub mod trigger;
pub mod validation;
pub mod view;

pub use api::{AgentNodeStatus, ApiError, NodeKind, NodeStatus, StatusSource, SymphonyClient};
pub use catalog::{Catalog, Topology, WorkflowDefinition};
pub use graph::{present, ColorToken, GraphView, Navigation};
pub use poller::{PollerHandle, StatusPoller};
