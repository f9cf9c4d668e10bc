use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::SizingConfig;
use crate::model::{ColumnSpec, DetailLevel};

/// Node rectangle sizing and monospace text measurement.
#[derive(Debug, Clone)]
pub struct NodeMetrics {
    pub detailed_width: f64,
    pub compact_width: f64,
    pub compact_height: f64,
    pub header_height: f64,
    pub row_height: f64,
    pub max_display_columns: usize,
    pub overflow_badge_height: f64,
    pub padding: f64,
    pub char_width: f64,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::from_config(&SizingConfig::default())
    }
}

impl NodeMetrics {
    pub fn from_config(config: &SizingConfig) -> Self {
        Self {
            detailed_width: config.detailed_width,
            compact_width: config.compact_width,
            compact_height: config.compact_height,
            header_height: config.header_height,
            row_height: config.row_height,
            max_display_columns: config.max_display_columns,
            overflow_badge_height: config.overflow_badge_height,
            padding: config.padding,
            char_width: config.char_width,
        }
    }

    pub fn width(&self, detail: DetailLevel) -> f64 {
        match detail {
            DetailLevel::Detailed => self.detailed_width,
            DetailLevel::Compact => self.compact_width,
        }
    }

    /// Height is bounded by `max_display_columns`; wider tables get an
    /// overflow badge instead of more rows.
    pub fn height(&self, columns: &[ColumnSpec], detail: DetailLevel) -> f64 {
        match detail {
            DetailLevel::Compact => self.compact_height,
            DetailLevel::Detailed => {
                let shown = self.displayed_columns(columns.len());
                let badge = if self.hidden_columns(columns.len()) > 0 {
                    self.overflow_badge_height
                } else {
                    0.0
                };
                self.header_height + shown as f64 * self.row_height + badge + self.padding
            }
        }
    }

    pub fn size(&self, columns: &[ColumnSpec], detail: DetailLevel) -> (f64, f64) {
        (self.width(detail), self.height(columns, detail))
    }

    pub fn displayed_columns(&self, count: usize) -> usize {
        count.min(self.max_display_columns)
    }

    /// Number behind the "+N more" badge.
    pub fn hidden_columns(&self, count: usize) -> usize {
        count.saturating_sub(self.max_display_columns)
    }

    pub fn text_width(&self, text: &str) -> f64 {
        UnicodeWidthStr::width(text) as f64 * self.char_width
    }

    /// Cut `text` so it fits in `max_width`, ending in an ellipsis when cut.
    pub fn truncate(&self, text: &str, max_width: f64) -> String {
        if self.text_width(text) <= max_width {
            return text.to_string();
        }

        let budget = ((max_width / self.char_width).floor() as usize).saturating_sub(1);
        let mut used = 0;
        let mut out = String::new();
        for c in text.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > budget {
                break;
            }
            used += w;
            out.push(c);
        }
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(n: usize) -> Vec<ColumnSpec> {
        (0..n)
            .map(|i| ColumnSpec::new(format!("c{}", i), "int"))
            .collect()
    }

    #[test]
    fn test_compact_height_ignores_columns() {
        let m = NodeMetrics::default();
        assert_eq!(m.height(&columns(0), DetailLevel::Compact), 44.0);
        assert_eq!(m.height(&columns(40), DetailLevel::Compact), 44.0);
    }

    #[test]
    fn test_detailed_height_grows_per_row() {
        let m = NodeMetrics::default();
        assert_eq!(m.height(&columns(0), DetailLevel::Detailed), 36.0 + 8.0);
        assert_eq!(m.height(&columns(3), DetailLevel::Detailed), 36.0 + 3.0 * 22.0 + 8.0);
    }

    #[test]
    fn test_detailed_height_capped_with_badge() {
        let m = NodeMetrics::default();
        let at_cap = m.height(&columns(8), DetailLevel::Detailed);
        let over_cap = m.height(&columns(9), DetailLevel::Detailed);
        let far_over = m.height(&columns(60), DetailLevel::Detailed);

        assert_eq!(at_cap, 36.0 + 8.0 * 22.0 + 8.0);
        assert_eq!(over_cap, at_cap + 20.0);
        assert_eq!(far_over, over_cap);
        assert_eq!(m.hidden_columns(60), 52);
    }

    #[test]
    fn test_compact_is_narrower() {
        let m = NodeMetrics::default();
        assert!(m.width(DetailLevel::Compact) < m.width(DetailLevel::Detailed));
    }

    #[test]
    fn test_unicode_width() {
        let m = NodeMetrics::default();
        // 全角文字は幅2
        assert_eq!(m.text_width("注文"), 4.0 * 7.5);
        assert_eq!(m.text_width("orders"), 6.0 * 7.5);
    }

    #[test]
    fn test_truncate() {
        let m = NodeMetrics::default();
        assert_eq!(m.truncate("orders", 100.0), "orders");
        let cut = m.truncate("customer_shipping_addresses", 75.0);
        assert_eq!(cut, "customer_…");
        assert!(m.text_width(&cut) <= 75.0);
    }
}
