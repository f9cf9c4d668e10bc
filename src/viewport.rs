//! Pan/zoom state and world <-> screen transforms.
//!
//! The transform is always translate-then-scale:
//! `screen = pan + zoom * world`. Every inverse in this module undoes exactly
//! that composition.

use serde::Serialize;

use crate::config::ViewportConfig;
use crate::layout::Point;
use crate::model::{Bounds, TableNode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    /// Large diagrams may zoom further out than small ones. The cut-off is the
    /// same node count that drops the diagram to compact rendering.
    pub fn for_node_count(config: &ViewportConfig, count: usize, large_above: usize) -> Self {
        let min = if count > large_above {
            config.zoom_min_large
        } else {
            config.zoom_min_small
        };
        Self {
            min,
            max: config.zoom_max,
        }
    }

    /// An inverted range settles on `max` instead of panicking.
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    state: ViewportState,
    range: ZoomRange,
    width: f64,
    height: f64,
    fit_margin: f64,
    max_fit_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            state: ViewportState::default(),
            range: ZoomRange {
                min: config.zoom_min_small,
                max: config.zoom_max,
            },
            width: config.width,
            height: config.height,
            fit_margin: config.fit_margin,
            max_fit_zoom: config.max_fit_zoom,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn range(&self) -> ZoomRange {
        self.range
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Replace the zoom range, re-clamping the current zoom into it.
    pub fn set_range(&mut self, range: ZoomRange) {
        self.range = range;
        self.state.zoom = range.clamp(self.state.zoom);
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.state.zoom = self.range.clamp(self.state.zoom + delta);
    }

    /// Zoom while keeping the world point under `screen` fixed.
    pub fn zoom_at(&mut self, delta: f64, screen: Point) {
        let world = self.screen_to_world(screen);
        self.zoom_by(delta);
        self.state.pan_x = screen.0 - self.state.zoom * world.0;
        self.state.pan_y = screen.1 - self.state.zoom * world.1;
    }

    /// Unclamped; content may leave the screen entirely.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.state.pan_x += dx;
        self.state.pan_y += dy;
    }

    /// Choose zoom and pan so the margin-padded bounds fill the viewport,
    /// never zooming past `max_fit_zoom`.
    pub fn fit_to_bounds(&mut self, bounds: &Bounds) {
        let scale = (self.width / (bounds.width() + self.fit_margin))
            .min(self.height / (bounds.height() + self.fit_margin))
            .min(self.max_fit_zoom);
        self.state.zoom = self.range.clamp(scale);

        let (cx, cy) = bounds.center();
        self.center_world((cx, cy));
    }

    /// Put the node's center in the middle of the viewport at the current zoom.
    pub fn center_on(&mut self, node: &TableNode) {
        self.center_world(node.center());
    }

    fn center_world(&mut self, (wx, wy): Point) {
        self.state.pan_x = self.width / 2.0 - self.state.zoom * wx;
        self.state.pan_y = self.height / 2.0 - self.state.zoom * wy;
    }

    pub fn world_to_screen(&self, (wx, wy): Point) -> Point {
        (
            self.state.pan_x + self.state.zoom * wx,
            self.state.pan_y + self.state.zoom * wy,
        )
    }

    pub fn screen_to_world(&self, (sx, sy): Point) -> Point {
        (
            (sx - self.state.pan_x) / self.state.zoom,
            (sy - self.state.pan_y) / self.state.zoom,
        )
    }

    /// Rectangle of the viewport in world coordinates.
    pub fn visible_world(&self) -> Bounds {
        let (min_x, min_y) = self.screen_to_world((0.0, 0.0));
        let (max_x, max_y) = self.screen_to_world((self.width, self.height));
        Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}
