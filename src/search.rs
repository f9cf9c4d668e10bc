//! Table search over the laid-out nodes.
//!
//! Matches are stored as node ids in diagram order. Highlighting is derived
//! from the match list on demand, never written back into the nodes.

use serde::Serialize;

use crate::model::TableNode;

/// How a node should be drawn relative to the active search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeHighlight {
    /// No search active.
    Normal,
    /// Search active, node did not match.
    Dimmed,
    Matched,
    /// The match the viewport is centered on.
    Current,
}

/// Match counter shown in the search box ("2 of 5").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatus {
    pub match_count: usize,
    pub current_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<String>,
    current_index: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Recompute matches for `query` and reset to the first one.
    pub fn update(&mut self, nodes: &[TableNode], query: &str) {
        self.query = query.to_string();
        self.matches = find_matches(nodes, query);
        self.current_index = 0;
    }

    /// Recompute matches for the current query after a re-layout, keeping
    /// the current match when it survived.
    pub fn refresh(&mut self, nodes: &[TableNode]) {
        let current = self.current().map(str::to_string);
        self.matches = find_matches(nodes, &self.query);
        self.current_index = current
            .and_then(|id| self.matches.iter().position(|m| *m == id))
            .unwrap_or(0);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Advance to the next match, wrapping at the end.
    pub fn next(&mut self) -> Option<&str> {
        if self.matches.is_empty() {
            return None;
        }
        self.current_index = (self.current_index + 1) % self.matches.len();
        self.current()
    }

    /// Step back to the previous match, wrapping at the start.
    pub fn previous(&mut self) -> Option<&str> {
        if self.matches.is_empty() {
            return None;
        }
        self.current_index = (self.current_index + self.matches.len() - 1) % self.matches.len();
        self.current()
    }

    pub fn current(&self) -> Option<&str> {
        self.matches.get(self.current_index).map(String::as_str)
    }

    pub fn status(&self) -> SearchStatus {
        SearchStatus {
            match_count: self.matches.len(),
            current_index: self.current_index,
        }
    }

    pub fn highlight(&self, id: &str) -> NodeHighlight {
        if !self.is_active() {
            NodeHighlight::Normal
        } else if self.current() == Some(id) {
            NodeHighlight::Current
        } else if self.matches.iter().any(|m| m == id) {
            NodeHighlight::Matched
        } else {
            NodeHighlight::Dimmed
        }
    }
}

/// Case-insensitive substring match on id or display name. A blank query
/// matches nothing.
fn find_matches(nodes: &[TableNode], query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    nodes
        .iter()
        .filter(|n| {
            n.id.to_lowercase().contains(&needle) || n.display_name.to_lowercase().contains(&needle)
        })
        .map(|n| n.id.clone())
        .collect()
}
