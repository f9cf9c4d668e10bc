pub mod config;
pub mod ddl;
pub mod diagram;
pub mod error;
pub mod layout;
pub mod loader;
pub mod measure;
pub mod model;
pub mod search;
pub mod session;
pub mod source;
pub mod sql;
pub mod svg;
pub mod viewport;

use wasm_bindgen::prelude::*;

use config::EngineConfig;
use diagram::Diagram;
use loader::{LoadScope, Loader};
use model::DetailLevel;
use source::MemorySource;
use svg::SvgRenderer;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Load every table (or one table and its neighbours) from DDL text into a
/// fitted diagram. The in-memory source never suspends, so the load future
/// is driven to completion on the calling thread.
pub fn diagram_from_ddl(
    source: &str,
    table: Option<String>,
    detail: DetailLevel,
    config: &EngineConfig,
) -> Result<Diagram, String> {
    let source = MemorySource::from_ddl(source).map_err(|e| e.to_string())?;
    let scope = match table {
        Some(id) => LoadScope::SingleTable(id),
        None => LoadScope::WholeSchema(None),
    };

    let loader = Loader::new(&source, &config.loader);
    let outcome = pollster::block_on(loader.load(&scope, |_| {})).map_err(|e| e.user_message())?;
    Ok(Diagram::from_outcome(outcome, detail, config))
}

fn wasm_diagram(
    source: &str,
    table: Option<String>,
    detail: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
) -> Result<Diagram, String> {
    let detail = detail
        .as_deref()
        .and_then(DetailLevel::from_str)
        .unwrap_or_default();

    let mut diagram = diagram_from_ddl(source, table, detail, &EngineConfig::default())?;
    if let (Some(width), Some(height)) = (width, height) {
        diagram.set_viewport_size(width, height);
        diagram.fit();
    }
    Ok(diagram)
}

/// Render DDL to SVG
#[wasm_bindgen(js_name = "ddlToSvg")]
pub fn render_ddl(
    source: &str,
    table: Option<String>,
    detail: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
) -> Result<String, String> {
    let diagram = wasm_diagram(source, table, detail, width, height)?;
    SvgRenderer::default()
        .render(&diagram.scene())
        .map_err(|e| e.to_string())
}

/// Lay out DDL and return the scene snapshot as JSON
#[wasm_bindgen(js_name = "ddlToScene")]
pub fn ddl_scene(
    source: &str,
    table: Option<String>,
    detail: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
) -> Result<String, String> {
    let diagram = wasm_diagram(source, table, detail, width, height)?;
    serde_json::to_string(&diagram.scene()).map_err(|e| e.to_string())
}
