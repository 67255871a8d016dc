//! Keyboard construction and pressed-control resolution.
//!
//! The wire shape is an ordered list of button rows. Straight double
//! quotes in display text render as paired typographic quotes; resolution
//! accepts either style from the client.

use serde::{Deserialize, Serialize};

use super::graph::{Control, MenuGraph};

/// One button of a keyboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardKey {
    pub id: String,
    pub text: String,
}

/// Ordered rows of buttons, as sent to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard(pub Vec<Vec<KeyboardKey>>);

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-button row.
    pub fn push_row(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.0.push(vec![KeyboardKey {
            id: id.into(),
            text: text.into(),
        }]);
    }

    /// Append all rows of another keyboard.
    pub fn extend(&mut self, other: Keyboard) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Map typographic guillemets back to straight quotes for matching.
fn straighten_quotes(input: &str) -> String {
    input.replace(['«', '»'], "\"")
}

/// Replace unescaped straight double quotes with alternating « » pairs.
pub fn typographic_quotes(input: &str) -> String {
    let mut count = 0usize;
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '"' {
            out.push(if count % 2 == 0 { '«' } else { '»' });
            count += 1;
        } else {
            out.push(ch);
        }
    }
    out
}

impl MenuGraph {
    /// Build the keyboard for a menu: one row per control, display text
    /// run through quote typography. Returns `None` for a menu without
    /// controls (or an unknown menu).
    pub fn keyboard(&self, menu: &str) -> Option<Keyboard> {
        let node = self.node(menu)?;
        if node.controls.is_empty() {
            return None;
        }
        let mut keyboard = Keyboard::new();
        for control in &node.controls {
            keyboard.push_row(control.id.clone(), typographic_quotes(&control.text));
        }
        Some(keyboard)
    }

    /// Resolve a pressed control within `menu` by display text
    /// (case-insensitive, whitespace-trimmed) or by exact id. The input
    /// is expected to be lowercased and trimmed already; a second pass
    /// normalizes guillemets to straight quotes on both sides so either
    /// quote style matches a button configured with the other.
    pub fn find_control(&self, menu: &str, pressed: &str) -> Option<&Control> {
        let node = self.node(menu)?;
        node.controls
            .iter()
            .find(|control| {
                pressed == control.text.trim().to_lowercase()
                    || (!control.id.is_empty() && pressed == control.id)
            })
            .or_else(|| {
                let pressed = straighten_quotes(pressed);
                node.controls.iter().find(|control| {
                    pressed == straighten_quotes(&control.text.trim().to_lowercase())
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::menu::graph::{Action, MenuNode, ReplyFragment};

    fn graph_with_controls(controls: Vec<Control>) -> MenuGraph {
        let mut graph = MenuGraph::default();
        graph.nodes.insert(
            "start".to_string(),
            MenuNode {
                replies: vec![ReplyFragment::text("hi")],
                controls,
                ..Default::default()
            },
        );
        graph
    }

    fn nav(id: &str, text: &str) -> Control {
        Control {
            id: id.to_string(),
            text: text.to_string(),
            replies: vec![],
            action: Action::Navigate,
            goto: Some("start".to_string()),
        }
    }

    #[test]
    fn quotes_alternate_in_pairs() {
        assert_eq!(typographic_quotes(r#"say "hi" and "bye""#), "say «hi» and «bye»");
        assert_eq!(typographic_quotes("no quotes"), "no quotes");
    }

    #[test]
    fn keyboard_rows_follow_control_order() {
        let graph = graph_with_controls(vec![nav("1", "Yes"), nav("2", "No")]);
        let keyboard = graph.keyboard("start").unwrap();
        assert_eq!(keyboard.0.len(), 2);
        assert_eq!(keyboard.0[0][0].text, "Yes");
        assert_eq!(keyboard.0[1][0].id, "2");
    }

    #[test]
    fn keyboard_none_without_controls() {
        let graph = graph_with_controls(vec![]);
        assert!(graph.keyboard("start").is_none());
        assert!(graph.keyboard("missing").is_none());
    }

    #[test]
    fn resolution_is_case_insensitive_and_trimmed() {
        let graph = graph_with_controls(vec![nav("1", "Да")]);
        // The dispatcher lowercases and trims before resolving.
        assert!(graph.find_control("start", "да").is_some());
        assert!(graph.find_control("start", " да ".trim()).is_some());
        assert!(graph.find_control("start", "нет").is_none());
    }

    #[test]
    fn resolution_matches_by_id() {
        let graph = graph_with_controls(vec![nav("42", "Answer")]);
        assert!(graph.find_control("start", "42").is_some());
    }

    #[test]
    fn typographic_press_matches_straight_config() {
        let graph = graph_with_controls(vec![nav("1", r#"open "help""#)]);
        assert!(graph.find_control("start", "open «help»").is_some());
    }

    #[test]
    fn straight_press_matches_typographic_config() {
        let graph = graph_with_controls(vec![nav("1", "open «help»")]);
        assert!(graph.find_control("start", r#"open "help""#).is_some());
    }
}
