//! Value types shared by every stage: table metadata coming in from the data
//! source, positioned nodes and edges going out to the host.

use serde::{Deserialize, Serialize};

/// Rendering verbosity for a whole diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Header plus column rows.
    #[default]
    Detailed,
    /// Header only.
    Compact,
}

impl DetailLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "detailed" | "all" => Some(Self::Detailed),
            "compact" | "tables" => Some(Self::Compact),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Detailed => Self::Compact,
            Self::Compact => Self::Detailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            is_primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }
}

/// Identifier returned by table enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub id: String,
    pub schema: Option<String>,
}

/// Table metadata as fetched from the data source, before layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Qualified name (`schema.table` when a schema is known).
    pub id: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableMeta {
    pub fn new(id: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            id: id.into(),
            columns,
        }
    }

    pub fn display_name(&self) -> &str {
        display_name(&self.id)
    }
}

/// Unqualified part of a table id.
pub fn display_name(id: &str) -> &str {
    id.rsplit_once('.').map_or(id, |(_, name)| name)
}

/// A positioned table. Coordinates are world units with `(x, y)` at the
/// top-left corner of the rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    pub id: String,
    pub display_name: String,
    pub columns: Vec<ColumnSpec>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_anchor: bool,
}

impl TableNode {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, (px, py): (f64, f64)) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// A foreign key from `source_table.source_column` to
/// `target_table.target_column`. Equality is the 4-tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdge {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl RelationshipEdge {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        }
    }

    pub fn touches(&self, table: &str) -> bool {
        self.source_table == table || self.target_table == table
    }

    pub fn is_self_ref(&self) -> bool {
        self.source_table == self.target_table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Fold over every node rectangle. An empty set yields the zero rect.
    pub fn of_nodes(nodes: &[TableNode]) -> Self {
        let Some(first) = nodes.first() else {
            return Self::default();
        };

        nodes.iter().skip(1).fold(
            Self {
                min_x: first.x,
                min_y: first.y,
                max_x: first.x + first.width,
                max_y: first.y + first.height,
            },
            |b, n| Self {
                min_x: b.min_x.min(n.x),
                min_y: b.min_y.min(n.y),
                max_x: b.max_x.max(n.x + n.width),
                max_y: b.max_y.max(n.y + n.height),
            },
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 && self.height() <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

impl LoadProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.loaded as f64 / self.total as f64
        }
    }
}
