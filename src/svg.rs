use crate::config::SizingConfig;
use crate::diagram::Scene;
use crate::layout::{ArrowHead, EdgePath, RoutedEdge};
use crate::measure::NodeMetrics;
use crate::model::{DetailLevel, TableNode};
use crate::search::NodeHighlight;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

const ARROW_LENGTH: f64 = 10.0;
const ARROW_SPREAD: f64 = 0.45;

/// Paints a [`Scene`] as a standalone SVG document.
pub struct SvgRenderer {
    metrics: NodeMetrics,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: NodeMetrics::default(),
        }
    }
}

impl SvgRenderer {
    pub fn from_config(config: &SizingConfig) -> Self {
        Self {
            metrics: NodeMetrics::from_config(config),
        }
    }

    pub fn render(&self, scene: &Scene) -> Result<String, fmt::Error> {
        let mut svg = String::new();

        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            scene.width, scene.height, scene.width, scene.height
        )?;

        writeln!(
            &mut svg,
            r#"<style>
  .node-bg {{ fill: #fff; }}
  .node-header {{ fill: #e0e0e0; }}
  .node-border {{ fill: none; stroke: #333; stroke-width: 1.5; }}
  .anchor .node-border {{ stroke: #1a5fb4; stroke-width: 3; }}
  .table-name {{ font-family: monospace; font-size: 14px; font-weight: bold; }}
  .column-count {{ font-family: monospace; font-size: 11px; fill: #666; }}
  .column-text {{ font-family: monospace; font-size: 12px; }}
  .column-type {{ font-family: monospace; font-size: 12px; fill: #666; }}
  .pk {{ font-weight: bold; }}
  .fk {{ font-style: italic; }}
  .more {{ font-family: monospace; font-size: 11px; fill: #888; }}
  .edge {{ stroke: #666; stroke-width: 1.5; fill: none; }}
  .edge.emphasized {{ stroke: #1a5fb4; stroke-width: 2.5; }}
  .arrow {{ fill: #666; }}
  .arrow.emphasized {{ fill: #1a5fb4; }}
  .dimmed {{ opacity: 0.25; }}
  .matched .node-border {{ stroke: #e5a50a; stroke-width: 2.5; }}
  .current .node-border {{ stroke: #c01c28; stroke-width: 3.5; }}
</style>"#
        )?;

        let vp = scene.viewport;
        writeln!(
            &mut svg,
            r#"<g transform="translate({} {}) scale({})">"#,
            vp.pan_x, vp.pan_y, vp.zoom
        )?;

        let highlights: HashMap<&str, NodeHighlight> = scene
            .nodes
            .iter()
            .zip(&scene.highlights)
            .map(|(n, h)| (n.id.as_str(), *h))
            .collect();

        // Columns that start a drawn relationship
        let fk_columns: HashSet<(&str, &str)> = scene
            .edges
            .iter()
            .map(|e| (e.edge.source_table.as_str(), e.edge.source_column.as_str()))
            .collect();

        // Edges first, behind nodes
        for edge in &scene.edges {
            let dimmed = [&edge.edge.source_table, &edge.edge.target_table]
                .iter()
                .all(|id| highlights.get(id.as_str()) == Some(&NodeHighlight::Dimmed));
            self.render_edge(&mut svg, edge, dimmed)?;
        }

        for node in &scene.nodes {
            let highlight = highlights
                .get(node.id.as_str())
                .copied()
                .unwrap_or(NodeHighlight::Normal);
            self.render_node(&mut svg, node, highlight, scene.detail, &fk_columns)?;
        }

        writeln!(&mut svg, "</g>")?;
        writeln!(&mut svg, "</svg>")?;
        Ok(svg)
    }

    fn render_node(
        &self,
        svg: &mut String,
        node: &TableNode,
        highlight: NodeHighlight,
        detail: DetailLevel,
        fk_columns: &HashSet<(&str, &str)>,
    ) -> fmt::Result {
        let x = node.x;
        let y = node.y;
        let w = node.width;
        let m = &self.metrics;

        let mut class = String::from("node");
        if node.is_anchor {
            class.push_str(" anchor");
        }
        match highlight {
            NodeHighlight::Normal => {}
            NodeHighlight::Dimmed => class.push_str(" dimmed"),
            NodeHighlight::Matched => class.push_str(" matched"),
            NodeHighlight::Current => class.push_str(" current"),
        }
        writeln!(
            svg,
            r#"<g class="{}" data-id="{}">"#,
            class,
            escape_xml(&node.id)
        )?;

        writeln!(
            svg,
            r#"<rect class="node-bg" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, node.height
        )?;

        let name = m.truncate(&node.display_name, w - m.padding * 2.0);
        match detail {
            DetailLevel::Compact => {
                writeln!(
                    svg,
                    r#"<rect class="node-header" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
                    x, y, w, node.height
                )?;
                writeln!(
                    svg,
                    r#"<text class="table-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                    x + w / 2.0,
                    y + node.height / 2.0 - 2.0,
                    escape_xml(&name)
                )?;
                writeln!(
                    svg,
                    r#"<text class="column-count" x="{}" y="{}" text-anchor="middle">{} columns</text>"#,
                    x + w / 2.0,
                    y + node.height - 6.0,
                    node.columns.len()
                )?;
            }
            DetailLevel::Detailed => {
                let header_h = m.header_height;
                writeln!(
                    svg,
                    r#"<rect class="node-header" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
                    x, y, w, header_h
                )?;
                writeln!(
                    svg,
                    r#"<text class="table-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                    x + w / 2.0,
                    y + header_h / 2.0 + 5.0,
                    escape_xml(&name)
                )?;
                writeln!(
                    svg,
                    r##"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#333" stroke-width="1" />"##,
                    x,
                    y + header_h,
                    x + w,
                    y + header_h
                )?;

                let shown = m.displayed_columns(node.columns.len());
                let half = (w - m.padding * 2.0) / 2.0;
                let mut row_y = y + header_h + m.row_height * 0.7;
                for col in &node.columns[..shown] {
                    let is_fk = fk_columns.contains(&(node.id.as_str(), col.name.as_str()));
                    let mut class = "column-text".to_string();
                    if col.is_primary_key {
                        class.push_str(" pk");
                    }
                    if is_fk {
                        class.push_str(" fk");
                    }

                    let marker = match (col.is_primary_key, is_fk) {
                        (true, _) => "◆ ",
                        (false, true) => "→ ",
                        (false, false) => "  ",
                    };
                    let label = m.truncate(&format!("{}{}", marker, col.name), half);
                    writeln!(
                        svg,
                        r#"<text class="{}" x="{}" y="{}">{}</text>"#,
                        class,
                        x + m.padding,
                        row_y,
                        escape_xml(&label)
                    )?;

                    let mut data_type = m.truncate(&col.data_type, half);
                    if !col.is_nullable && !col.is_primary_key {
                        data_type.push('!');
                    }
                    writeln!(
                        svg,
                        r#"<text class="column-type" x="{}" y="{}" text-anchor="end">{}</text>"#,
                        x + w - m.padding,
                        row_y,
                        escape_xml(&data_type)
                    )?;

                    row_y += m.row_height;
                }

                let hidden = m.hidden_columns(node.columns.len());
                if hidden > 0 {
                    writeln!(
                        svg,
                        r#"<text class="more" x="{}" y="{}">+{} more</text>"#,
                        x + m.padding,
                        row_y - m.row_height * 0.7 + m.overflow_badge_height * 0.7,
                        hidden
                    )?;
                }
            }
        }

        writeln!(
            svg,
            r#"<rect class="node-border" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, node.height
        )?;
        writeln!(svg, "</g>")
    }

    fn render_edge(&self, svg: &mut String, edge: &RoutedEdge, dimmed: bool) -> fmt::Result {
        let mut class = String::from("edge");
        if edge.emphasized {
            class.push_str(" emphasized");
        }
        if dimmed {
            class.push_str(" dimmed");
        }

        let d = match edge.path {
            EdgePath::Line { from, to } => format!("M {} {} L {} {}", from.0, from.1, to.0, to.1),
            EdgePath::Cubic { from, c1, c2, to } => format!(
                "M {} {} C {} {}, {} {}, {} {}",
                from.0, from.1, c1.0, c1.1, c2.0, c2.1, to.0, to.1
            ),
        };
        writeln!(
            svg,
            r#"<path class="{}" d="{}" data-from="{}" data-to="{}" />"#,
            class,
            d,
            escape_xml(&format!("{}.{}", edge.edge.source_table, edge.edge.source_column)),
            escape_xml(&format!("{}.{}", edge.edge.target_table, edge.edge.target_column))
        )?;

        let arrow_class = class.replacen("edge", "arrow", 1);
        writeln!(
            svg,
            r#"<polygon class="{}" points="{}" />"#,
            arrow_class,
            arrow_points(&edge.arrow)
        )
    }
}

/// Triangle with its tip on the target border, opening back along the path.
fn arrow_points(arrow: &ArrowHead) -> String {
    let (tx, ty) = arrow.tip;
    let left = arrow.angle + std::f64::consts::PI - ARROW_SPREAD;
    let right = arrow.angle + std::f64::consts::PI + ARROW_SPREAD;
    format!(
        "{},{} {},{} {},{}",
        tx,
        ty,
        tx + ARROW_LENGTH * left.cos(),
        ty + ARROW_LENGTH * left.sin(),
        tx + ARROW_LENGTH * right.cos(),
        ty + ARROW_LENGTH * right.sin()
    )
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::diagram::Diagram;
    use crate::loader::LoadOutcome;
    use crate::model::{ColumnSpec, RelationshipEdge, TableMeta};

    fn diagram(detail: DetailLevel) -> Diagram {
        let mut wide: Vec<ColumnSpec> = (0..11)
            .map(|i| ColumnSpec::new(format!("c{}", i), "int"))
            .collect();
        wide.insert(0, ColumnSpec::new("id", "bigint").primary_key());
        wide.push(ColumnSpec::new("user_id", "int").not_null());

        let outcome = LoadOutcome {
            tables: vec![
                TableMeta::new("public.orders", wide),
                TableMeta::new("public.users", vec![ColumnSpec::new("id", "int").primary_key()]),
            ],
            relationships: vec![RelationshipEdge::new(
                "public.orders",
                "user_id",
                "public.users",
                "id",
            )],
            anchor: Some("public.orders".to_string()),
        };
        Diagram::from_outcome(outcome, detail, &EngineConfig::default())
    }

    #[test]
    fn test_render_basic() {
        let scene = diagram(DetailLevel::Detailed).scene();
        let svg = SvgRenderer::default().render(&scene).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("orders"));
        assert!(svg.contains(r#"<g transform="translate("#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_overflow_badge() {
        let scene = diagram(DetailLevel::Detailed).scene();
        let svg = SvgRenderer::default().render(&scene).unwrap();

        // 13 columns, 8 shown
        assert!(svg.contains("+5 more"));
        assert!(svg.contains("◆ id"));
        assert!(!svg.contains("c7<"));
    }

    #[test]
    fn test_render_edges_and_anchor() {
        let scene = diagram(DetailLevel::Detailed).scene();
        let svg = SvgRenderer::default().render(&scene).unwrap();

        assert!(svg.contains(r#"class="edge emphasized""#));
        assert!(svg.contains(r#"class="arrow emphasized""#));
        assert!(svg.contains(r#"class="node anchor""#));
        assert!(svg.contains(r#"data-from="public.orders.user_id""#));
    }

    #[test]
    fn test_render_compact_hides_columns() {
        let scene = diagram(DetailLevel::Compact).scene();
        let svg = SvgRenderer::default().render(&scene).unwrap();

        assert!(svg.contains("13 columns"));
        assert!(!svg.contains("◆ id"));
    }

    #[test]
    fn test_render_search_classes() {
        let mut diagram = diagram(DetailLevel::Detailed);
        diagram.set_search_query("users");
        let svg = SvgRenderer::default().render(&diagram.scene()).unwrap();

        assert!(svg.contains(r#"class="node current""#));
        assert!(svg.contains(r#"class="node anchor dimmed""#));
    }

    #[test]
    fn test_render_escapes_and_unicode() {
        let outcome = LoadOutcome {
            tables: vec![TableMeta::new(
                "ユーザー",
                vec![ColumnSpec::new("名前", "text"), ColumnSpec::new("a<b", "int")],
            )],
            ..LoadOutcome::default()
        };
        let diagram = Diagram::from_outcome(outcome, DetailLevel::Detailed, &EngineConfig::default());
        let svg = SvgRenderer::default().render(&diagram.scene()).unwrap();

        assert!(svg.contains("ユーザー"));
        assert!(svg.contains("名前"));
        assert!(svg.contains("a&lt;b"));
    }

    #[test]
    fn test_arrow_points_back_along_path() {
        let points = arrow_points(&ArrowHead {
            tip: (100.0, 0.0),
            angle: 0.0,
        });
        let xs: Vec<f64> = points
            .split(' ')
            .map(|p| p.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(xs[0], 100.0);
        assert!(xs[1] < 100.0 && xs[2] < 100.0);
    }
}
