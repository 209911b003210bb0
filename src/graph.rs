//! Graph presentation adapter.
//!
//! Turns the latest node statuses plus the static topology into a
//! render-ready [`GraphView`]. Everything here is a pure function of its
//! inputs; the only side effect is a warning for status strings it does not
//! recognize.
//!
//! | Status    | Token     | Terminal | Mermaid class |
//! |-----------|-----------|----------|---------------|
//! | pending   | `Neutral` | white    | `neutral`     |
//! | running   | `Amber`   | yellow   | `amber`       |
//! | success   | `Green`   | green    | `green`       |
//! | failed    | `Red`     | red      | `red`         |

use colored::{Color, Colorize};
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::warn;

use crate::api::{AgentNodeStatus, NodeKind, NodeStatus};
use crate::catalog::{Position, Topology, WorkflowDefinition};

// ============================================================================
// View Model
// ============================================================================

/// Visual state derived from a node's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorToken {
    Neutral,
    Amber,
    Green,
    Red,
}

impl ColorToken {
    /// Map a status to its token. Unknown statuses get none and are logged.
    pub fn for_status(status: &NodeStatus) -> Option<Self> {
        match status {
            NodeStatus::Pending => Some(ColorToken::Neutral),
            NodeStatus::Running => Some(ColorToken::Amber),
            NodeStatus::Success => Some(ColorToken::Green),
            NodeStatus::Failed => Some(ColorToken::Red),
            NodeStatus::Unknown(raw) => {
                warn!(status = %raw, "Unrecognized node status, rendering without color");
                None
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorToken::Neutral => "neutral",
            ColorToken::Amber => "amber",
            ColorToken::Green => "green",
            ColorToken::Red => "red",
        }
    }

    fn terminal_color(&self) -> Color {
        match self {
            ColorToken::Neutral => Color::White,
            ColorToken::Amber => Color::Yellow,
            ColorToken::Green => Color::Green,
            ColorToken::Red => Color::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub status: NodeStatus,
    pub color: Option<ColorToken>,
    /// e.g. `"12.5s"`; absent when no elapsed time is reported
    pub duration: Option<String>,
    pub position: Position,
    pub call_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphView {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Where the user should be taken next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(String),
    Back,
}

// ============================================================================
// Mapping
// ============================================================================

/// Build the render-ready graph.
///
/// Only nodes present in both the topology and `nodes` are rendered, in
/// topology order and at topology positions. Edges are kept when both of
/// their endpoints are rendered.
pub fn present(nodes: &[AgentNodeStatus], topology: &Topology) -> GraphView {
    let mut by_id: HashMap<&str, &AgentNodeStatus> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        by_id.entry(node.id.as_str()).or_insert(node);
    }

    let rendered: Vec<GraphNode> = topology
        .nodes
        .iter()
        .filter_map(|slot| {
            let status = by_id.get(slot.id.as_str())?;
            Some(GraphNode {
                id: slot.id.clone(),
                kind: status.kind,
                label: status.label.clone(),
                status: status.status.clone(),
                color: ColorToken::for_status(&status.status),
                duration: status.elapsed_seconds.and_then(format_duration),
                position: slot.position,
                call_count: status.call_count,
            })
        })
        .collect();

    let visible: HashSet<&str> = rendered.iter().map(|n| n.id.as_str()).collect();
    let edges = topology
        .edges
        .iter()
        .filter(|e| visible.contains(e.source.as_str()) && visible.contains(e.target.as_str()))
        .map(|e| GraphEdge {
            id: e.id.clone(),
            source: e.source.clone(),
            target: e.target.clone(),
        })
        .collect();

    GraphView {
        nodes: rendered,
        edges,
    }
}

/// Format seconds with one decimal place, ties rounding up. Zero and
/// non-finite values yield none.
pub fn format_duration(seconds: f64) -> Option<String> {
    if seconds == 0.0 || !seconds.is_finite() {
        return None;
    }
    // `{:.1}` alone rounds ties to even
    let rounded = (seconds * 10.0).round() / 10.0;
    Some(format!("{:.1}s", rounded))
}

/// Route of a node's detail page within a workflow.
pub fn node_route(route_slug: &str, node_id: &str) -> String {
    format!("/{}/{}", route_slug, urlencoding::encode(node_id))
}

/// Selecting a node opens its detail page.
pub fn select_node(workflow: &WorkflowDefinition, node_id: &str) -> Navigation {
    Navigation::To(node_route(&workflow.route_slug, node_id))
}

// ============================================================================
// Rendering
// ============================================================================

/// Render the graph as indented text for a terminal, one line per node.
pub fn render_text(view: &GraphView) -> String {
    if view.nodes.is_empty() {
        return "(no nodes reported yet)".dimmed().to_string();
    }

    // Rows are grouped by vertical position, left to right within a row
    let mut ordered: Vec<&GraphNode> = view.nodes.iter().collect();
    ordered.sort_by(|a, b| {
        a.position
            .y
            .total_cmp(&b.position.y)
            .then(a.position.x.total_cmp(&b.position.x))
    });

    let mut out = String::new();
    let mut current_row: Option<f64> = None;
    for node in ordered {
        if current_row.is_some_and(|y| y != node.position.y) {
            out.push('\n');
        }
        current_row = Some(node.position.y);

        let badge = match node.color {
            Some(token) => format!("[{}]", node.status).color(token.terminal_color()).bold(),
            None => format!("[{}]", node.status).normal(),
        };
        out.push_str(&format!("  {:>2}  {:<26} {}", node.id, node.label, badge));
        if let Some(duration) = &node.duration {
            out.push_str(&format!("  Duration: {}", duration).dimmed().to_string());
        }
        out.push('\n');
    }

    for edge in &view.edges {
        out.push_str(&format!("  {} -> {}\n", edge.source, edge.target).dimmed().to_string());
    }

    out
}

/// Sanitize an id for use as a Mermaid node identifier.
fn mermaid_id(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("n{}", safe)
}

/// Render the graph as a Mermaid flowchart, one `classDef` per color token.
pub fn render_mermaid(view: &GraphView) -> String {
    let mut lines = vec!["flowchart TD".to_string()];

    for node in &view.nodes {
        let id = mermaid_id(&node.id);
        let label = match &node.duration {
            Some(d) => format!("{}<br/>{} · {}", node.label, node.status, d),
            None => format!("{}<br/>{}", node.label, node.status),
        };
        let shape = match node.kind {
            NodeKind::Input => format!("    {}([\"{}\"])", id, label),
            NodeKind::Agent => format!("    {}[\"{}\"]", id, label),
            NodeKind::Output => format!("    {}(\"{}\")", id, label),
        };
        match node.color {
            Some(token) => lines.push(format!("{}:::{}", shape, token.as_str())),
            None => lines.push(shape),
        }
    }

    for edge in &view.edges {
        lines.push(format!(
            "    {} --> {}",
            mermaid_id(&edge.source),
            mermaid_id(&edge.target)
        ));
    }

    lines.push(STYLE_DEFS.trim_end().to_string());
    lines.join("\n")
}

const STYLE_DEFS: &str = r#"
    classDef neutral fill:#F4F4F5,stroke:#52525B,stroke-width:1px
    classDef amber fill:#FEF3C7,stroke:#D97706,stroke-width:2px
    classDef green fill:#DCFCE7,stroke:#16A34A,stroke-width:1px
    classDef red fill:#FEE2E2,stroke:#DC2626,stroke-width:1px
"#;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use chrono::Utc;

    fn status(id: &str, status: &str, elapsed: Option<f64>) -> AgentNodeStatus {
        AgentNodeStatus {
            id: id.to_string(),
            kind: NodeKind::Agent,
            label: format!("Agent {}", id),
            status: NodeStatus::from(status.to_string()),
            elapsed_seconds: elapsed,
            estimated_seconds: None,
            call_count: None,
        }
    }

    #[test]
    fn test_color_tokens() {
        assert_eq!(ColorToken::for_status(&NodeStatus::Pending), Some(ColorToken::Neutral));
        assert_eq!(ColorToken::for_status(&NodeStatus::Running), Some(ColorToken::Amber));
        assert_eq!(ColorToken::for_status(&NodeStatus::Success), Some(ColorToken::Green));
        assert_eq!(ColorToken::for_status(&NodeStatus::Failed), Some(ColorToken::Red));
        assert_eq!(ColorToken::for_status(&NodeStatus::Unknown("idle".into())), None);
    }

    #[test]
    fn test_rendered_nodes_are_intersection() {
        let topology = Catalog::builtin().topology;
        let nodes = vec![
            status("1", "success", None),
            status("5", "running", None),
            status("42", "running", None),
        ];

        let view = present(&nodes, &topology);
        let ids: Vec<&str> = view.nodes.iter().map(|n| n.id.as_str()).collect();

        assert_eq!(ids, vec!["1", "5"]);
        assert!(view.node("42").is_none());
    }

    #[test]
    fn test_edges_need_both_endpoints() {
        let topology = Catalog::builtin().topology;
        let nodes = vec![
            status("1", "success", None),
            status("2", "running", None),
            status("5", "pending", None),
        ];

        let view = present(&nodes, &topology);
        let edges: Vec<&str> = view.edges.iter().map(|e| e.id.as_str()).collect();

        // 3 is missing, so e3-5 and e2-3 are dropped
        assert_eq!(edges, vec!["e1-2"]);
    }

    #[test]
    fn test_empty_poll_renders_nothing() {
        let view = present(&[], &Catalog::builtin().topology);
        assert!(view.nodes.is_empty());
        assert!(view.edges.is_empty());
    }

    #[test]
    fn test_success_node_with_duration() {
        let topology = Catalog::builtin().topology;
        let view = present(&[status("1", "success", Some(12.5))], &topology);
        let node = view.node("1").unwrap();

        assert_eq!(node.color, Some(ColorToken::Green));
        assert_eq!(node.duration.as_deref(), Some("12.5s"));
        assert_eq!(node.position, topology.node("1").unwrap().position);
    }

    #[test]
    fn test_unknown_status_has_no_color() {
        let view = present(&[status("2", "idle", None)], &Catalog::builtin().topology);
        let node = view.node("2").unwrap();
        assert_eq!(node.color, None);
        assert_eq!(node.status.as_str(), "idle");
    }

    #[test]
    fn test_present_is_idempotent() {
        let topology = Catalog::builtin().topology;
        let nodes = vec![status("1", "success", Some(1.0)), status("3", "failed", None)];

        let first = present(&nodes, &topology);
        let second = present(&nodes, &topology);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let topology = Catalog::builtin().topology;
        let nodes = vec![status("1", "success", None), status("1", "failed", None)];
        let view = present(&nodes, &topology);
        assert_eq!(view.nodes.len(), 1);
        assert_eq!(view.nodes[0].status, NodeStatus::Success);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.5).as_deref(), Some("12.5s"));
        assert_eq!(format_duration(3.14159).as_deref(), Some("3.1s"));
        assert_eq!(format_duration(500.0).as_deref(), Some("500.0s"));
        assert_eq!(format_duration(0.0), None);
        assert_eq!(format_duration(f64::NAN), None);
    }

    #[test]
    fn test_format_duration_ties_round_up() {
        assert_eq!(format_duration(12.25).as_deref(), Some("12.3s"));
        assert_eq!(format_duration(4.25).as_deref(), Some("4.3s"));
        assert_eq!(format_duration(0.05).as_deref(), Some("0.1s"));
    }

    #[test]
    fn test_select_node_navigates_to_detail() {
        let workflow = WorkflowDefinition {
            id: "2".to_string(),
            route_slug: "nodes".to_string(),
            name: "Research Paper".to_string(),
            description: String::new(),
            execution_count: 0,
            last_run: Utc::now(),
        };
        assert_eq!(select_node(&workflow, "5"), Navigation::To("/nodes/5".to_string()));
        assert_eq!(node_route("nodes", "a b"), "/nodes/a%20b");
    }

    #[test]
    fn test_render_text_mentions_labels() {
        let topology = Catalog::builtin().topology;
        let view = present(&[status("1", "success", Some(2.0))], &topology);
        let text = render_text(&view);
        assert!(text.contains("Agent 1"));
        assert!(text.contains("success"));
        assert!(text.contains("2.0s"));
    }

    #[test]
    fn test_render_mermaid() {
        let topology = Catalog::builtin().topology;
        let nodes = vec![status("1", "success", None), status("2", "idle", None)];
        let mermaid = render_mermaid(&present(&nodes, &topology));

        assert!(mermaid.starts_with("flowchart TD"));
        assert!(mermaid.contains(":::green"));
        assert!(mermaid.contains("n1 --> n2"));
        assert!(mermaid.contains("classDef amber"));
        // unknown status has no class attached
        assert!(mermaid.lines().any(|l| l.contains("n2[") && !l.contains(":::")));
    }
}
