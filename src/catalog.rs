//! # Catalog Module
//!
//! The workflow registry and the static graph topology of the demo workflow.
//!
//! Both are immutable after loading. The binary builds one [`Catalog`] at
//! start-up (built-in or from a JSON file) and hands references to the
//! components that need it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::api::NodeKind;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate workflow: {0}")]
    DuplicateWorkflow(String),

    #[error("Duplicate topology node: {0}")]
    DuplicateNode(String),

    #[error("Edge {edge} references unknown node {node}")]
    DanglingEdge { edge: String, node: String },
}

// =============================================================================
// WORKFLOWS
// =============================================================================
/// A workflow the user can open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,

    /// Path segment of the workflow's graph page
    pub route_slug: String,

    pub name: String,
    pub description: String,

    #[serde(default)]
    pub execution_count: u32,

    pub last_run: DateTime<Utc>,
}

// =============================================================================
// TOPOLOGY
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Static layout of one graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Fixed node/edge structure of a workflow graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<TopologyNode>,
    pub edges: Vec<EdgeDefinition>,
}

impl Topology {
    pub fn node(&self, id: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Node ids are unique and every edge joins two known nodes.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(CatalogError::DuplicateNode(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !seen.contains(end.as_str()) {
                    return Err(CatalogError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: end.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// CATALOG
// =============================================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub workflows: Vec<WorkflowDefinition>,
    pub topology: Topology,
}

impl Catalog {
    /// The two demo workflows and the research team topology.
    pub fn builtin() -> Self {
        let now = Utc::now();
        let workflows = vec![
            WorkflowDefinition {
                id: "1".to_string(),
                route_slug: "simple".to_string(),
                name: "Simple Text Message".to_string(),
                description: "Test example.".to_string(),
                execution_count: 5,
                last_run: now,
            },
            WorkflowDefinition {
                id: "2".to_string(),
                route_slug: "nodes".to_string(),
                name: "Research Paper".to_string(),
                description: "Generate a research report on a topic with additional websites as context."
                    .to_string(),
                execution_count: 5,
                last_run: now,
            },
        ];

        Self {
            workflows,
            topology: research_team_topology(),
        }
    }

    /// Parse and validate a JSON catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        info!(path = %path.display(), "Loading workflow catalog");
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        debug!(
            workflows = catalog.workflows.len(),
            nodes = catalog.topology.nodes.len(),
            edges = catalog.topology.edges.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        for workflow in &self.workflows {
            if !ids.insert(workflow.id.as_str()) || !slugs.insert(workflow.route_slug.as_str()) {
                return Err(CatalogError::DuplicateWorkflow(workflow.id.clone()));
            }
        }
        self.topology.validate()
    }

    /// Look a workflow up by id or route slug.
    pub fn workflow(&self, key: &str) -> Option<&WorkflowDefinition> {
        self.workflows
            .iter()
            .find(|w| w.id == key || w.route_slug == key)
    }
}

fn research_team_topology() -> Topology {
    let node = |id: &str, kind, label: &str, x, y| TopologyNode {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        position: Position { x, y },
    };
    let edge = |source: &str, target: &str| EdgeDefinition {
        id: format!("e{}-{}", source, target),
        source: source.to_string(),
        target: target.to_string(),
    };

    Topology {
        nodes: vec![
            node("1", NodeKind::Input, "User", 300.0, 0.0),
            node("2", NodeKind::Agent, "Supervisor Agent", 300.0, 150.0),
            node("3", NodeKind::Agent, "Research Team Agent", 100.0, 300.0),
            node("4", NodeKind::Agent, "Document Authoring Agent", 525.0, 300.0),
            node("5", NodeKind::Output, "Searcher Agent", 0.0, 450.0),
            node("6", NodeKind::Output, "Web Scraper Agent", 175.0, 450.0),
            node("7", NodeKind::Output, "Writer Agent", 350.0, 450.0),
            node("8", NodeKind::Output, "Note Taker Agent", 525.0, 450.0),
            node("9", NodeKind::Output, "Chart Generator Agent", 700.0, 450.0),
        ],
        edges: vec![
            edge("1", "2"),
            edge("2", "3"),
            edge("2", "4"),
            edge("3", "5"),
            edge("3", "6"),
            edge("4", "7"),
            edge("4", "8"),
            edge("4", "9"),
        ],
    }
}
