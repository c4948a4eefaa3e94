//! Graphviz rendering of a model.
//!
//! Reads the same [`StructuredModel`] as the compiler and never looks at the
//! generated guards. Turning the DOT text into an image is left to `dot`.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::model::{StructuredModel, TAG_ANYTIME_CALL, TAG_ANYTIME_REACH};

pub const DEFAULT_EDGE_COLOR: &str = "orange";
pub const DIAGRAM_FILE_NAME: &str = "state_model.dot";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    State(String),
    /// Pseudo node for the anytime sections.
    Special(&'static str),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(name) => f.write_str(name),
            Self::Special(tag) => f.write_str(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    label: Option<String>,
    color: String,
    dotted: bool,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label.as_deref().unwrap_or_default())
    }
}

#[derive(Default)]
struct Builder {
    graph: DiGraph<Node, Edge>,
    nodes: BTreeMap<String, NodeIndex>,
}

impl Builder {
    fn state(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.nodes.get(name) {
            return *index;
        }
        let index = self.graph.add_node(Node::State(name.to_string()));
        self.nodes.insert(name.to_string(), index);
        index
    }
}

/// Renders `model` as a DOT digraph labelled with `source`.
pub fn render_dot(model: &StructuredModel, source: &str) -> String {
    let mut builder = Builder::default();

    for (from, fncs) in &model.transitions {
        let from = builder.state(from.as_str());
        for (fnc, to) in fncs {
            let to = builder.state(to.as_str());
            let color = model
                .config
                .coloring
                .get(fnc)
                .map_or(DEFAULT_EDGE_COLOR, String::as_str);
            builder.graph.add_edge(
                from,
                to,
                Edge {
                    label: Some(format!("{fnc}()")),
                    color: color.to_string(),
                    dotted: false,
                },
            );
        }
    }

    if !model.anytime_call.is_empty() {
        let special = builder.graph.add_node(Node::Special(TAG_ANYTIME_CALL));
        for fnc in &model.anytime_call {
            builder.graph.add_edge(
                special,
                special,
                Edge {
                    label: Some(format!("{fnc}()")),
                    color: DEFAULT_EDGE_COLOR.to_string(),
                    dotted: true,
                },
            );
        }
    }

    if !model.anytime_reach.is_empty() {
        let special = builder.graph.add_node(Node::Special(TAG_ANYTIME_REACH));
        for state in &model.anytime_reach {
            let to = builder.state(state.as_str());
            builder.graph.add_edge(
                special,
                to,
                Edge {
                    label: None,
                    color: DEFAULT_EDGE_COLOR.to_string(),
                    dotted: true,
                },
            );
        }
    }

    let content = Dot::with_attr_getters(
        &builder.graph,
        &[Config::EdgeNoLabel, Config::GraphContentOnly],
        &|_, edge| {
            let edge = edge.weight();
            let style = if edge.dotted { "dotted" } else { "solid" };
            match &edge.label {
                Some(label) => {
                    let color = escape(&edge.color);
                    format!("label = \"{label}\" color = \"{color}\" style = {style}")
                }
                None => format!("color = \"{}\" style = {style}", escape(&edge.color)),
            }
        },
        &|_, (_, node)| match node {
            Node::State(_) => String::new(),
            Node::Special(_) => "style = filled color = green".to_string(),
        },
    )
    .to_string();

    let source = escape(source);
    format!(
        "digraph {{\n    label = \"Source yaml file: {source}\"\n    labelloc = t\n    fontsize = 30\n    rankdir = LR\n    size = \"8,5\"\n{content}}}\n"
    )
}

/// Escapes text for a double-quoted DOT attribute value.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn transitions_become_labelled_edges() {
        let model = StructuredModel::from_yaml_str(indoc! {"
            config:
              coloring:
                Deactivate: red
            states_transitions:
              Init:
                Activate: Active
              Active:
                Deactivate: Init
        "})
        .unwrap();
        let dot = render_dot(&model, "door.yml");

        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains("label = \"Source yaml file: door.yml\""));
        assert!(dot.contains("label = \"Activate()\" color = \"orange\" style = solid"));
        assert!(dot.contains("label = \"Deactivate()\" color = \"red\" style = solid"));
        assert!(dot.contains("label = \"Init\""));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn anytime_sections_get_pseudo_nodes() {
        let model = StructuredModel::from_yaml_str(indoc! {"
            states_transitions:
              Init:
                Activate: Active
            states_special:
              anytime_call: [Reset]
              anytime_reach: [Init]
        "})
        .unwrap();
        let dot = render_dot(&model, "m.yml");

        assert!(dot.contains("label = \"anytime_call\""));
        assert!(dot.contains("label = \"anytime_reach\""));
        assert!(dot.contains("style = filled color = green"));
        assert!(dot.contains("label = \"Reset()\" color = \"orange\" style = dotted"));
        assert_eq!(dot.matches("style = dotted").count(), 2);
    }

    #[test]
    fn quotes_in_colors_and_sources_are_escaped() {
        let model = StructuredModel::from_yaml_str(indoc! {r#"
            config:
              coloring:
                Block: 'red" penwidth = "9'
            states_transitions:
              Init:
                Block: Blocked
        "#})
        .unwrap();
        let dot = render_dot(&model, r#"C:\models\"door".yml"#);

        assert!(dot.contains(r#"color = "red\" penwidth = \"9" style = solid"#));
        assert!(dot.contains(r#"label = "Source yaml file: C:\\models\\\"door\".yml""#));
        assert!(!dot.contains(r#"color = "red" penwidth"#));
    }

    #[test]
    fn empty_model_is_an_empty_graph() {
        let dot = render_dot(&StructuredModel::default(), "empty.yml");
        assert!(!dot.contains("->"));
    }
}
