use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::flow::nodes::{FlowNode, NodeKind};

/// A stored directed graph of nodes and edges representing one
/// conversational script. Immutable during execution and shared via `Arc`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

/// A directed transition between two nodes. The `label` is display-only for
/// non-branch transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Flow {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn node(&self, node_id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn start_node(&self) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| matches!(n.kind, NodeKind::Start))
    }

    /// Successor of a non-branch node: target of the first edge in
    /// declaration order whose source matches. Graphs with ambiguous fan-out
    /// rely on this first-match rule; it must not be "improved".
    pub fn successor(&self, node_id: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.source == node_id)
            .map(|e| e.target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_follows_first_edge_in_declaration_order() {
        let flow = Flow::from_json(
            r#"{
                "id": "f1",
                "name": "fanout",
                "nodes": [
                    {"id": "a", "kind": "start"},
                    {"id": "b", "kind": "end"},
                    {"id": "c", "kind": "end"}
                ],
                "edges": [
                    {"id": "e1", "source": "a", "target": "b"},
                    {"id": "e2", "source": "a", "target": "c"}
                ]
            }"#,
        )
        .expect("flow parses");

        assert_eq!(flow.successor("a"), Some("b"));
        assert_eq!(flow.successor("b"), None);
    }

    #[test]
    fn unknown_node_kind_fails_at_parse_time() {
        let raw = r#"{
            "id": "f2",
            "name": "bad",
            "nodes": [{"id": "x", "kind": "teleport"}],
            "edges": []
        }"#;
        assert!(Flow::from_json(raw).is_err());
    }

    #[test]
    fn interaction_node_round_trips_optional_fields() {
        let flow = Flow::from_json(
            r#"{
                "id": "f3",
                "name": "ask",
                "nodes": [
                    {"id": "q", "kind": "interaction", "prompt": "Name?",
                     "validation_pattern": "^[A-Z].*", "timeout_seconds": 30,
                     "fallback_node": "bail"}
                ],
                "edges": []
            }"#,
        )
        .expect("flow parses");

        match &flow.node("q").expect("node q").kind {
            NodeKind::Interaction(inter) => {
                assert_eq!(inter.prompt, "Name?");
                assert_eq!(inter.validation_pattern.as_deref(), Some("^[A-Z].*"));
                assert_eq!(inter.timeout_seconds, Some(30));
                assert_eq!(inter.fallback_node.as_deref(), Some("bail"));
            }
            other => panic!("expected interaction node, got {:?}", other),
        }
    }
}
