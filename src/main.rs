use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use erscope::config::EngineConfig;
use erscope::diagram::Diagram;
use erscope::loader::{LoadScope, Loader};
use erscope::model::DetailLevel;
use erscope::source::{DataSource, MemorySource};
use erscope::svg::SvgRenderer;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Svg,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Detail {
    Detailed,
    Compact,
}

/// Lay out the tables of a DDL dump as a relationship diagram
#[derive(Parser, Debug)]
#[command(name = "erscope", version)]
struct Args {
    /// SQL file with CREATE TABLE / ALTER TABLE statements
    input: PathBuf,

    /// Open the diagram on one table and its foreign-key neighbours
    #[arg(short, long, conflicts_with = "schema")]
    table: Option<String>,

    /// Restrict a whole-schema diagram to one schema
    #[arg(short, long)]
    schema: Option<String>,

    #[arg(short, long, value_enum, default_value = "detailed")]
    detail: Detail,

    /// Highlight tables matching this text and center on the first match
    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,

    /// TOML file overriding layout and viewport constants
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "svg")]
    format: Format,

    /// Print the generated CREATE TABLE for this table instead of a diagram
    #[arg(long, conflicts_with_all = ["table", "search"])]
    ddl: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }

    let input = fs::read_to_string(&args.input)
        .map_err(|e| format!("failed to read {}: {}", args.input.display(), e))?;
    let source = MemorySource::from_ddl(&input)?;
    info!(tables = source.table_count(), "parsed schema");

    if let Some(table) = &args.ddl {
        let ddl = source.generate_ddl(table).await?;
        return write_output(args.output.as_ref(), &ddl);
    }

    let scope = match args.table {
        Some(table) => LoadScope::SingleTable(table),
        None => LoadScope::WholeSchema(args.schema),
    };
    let detail = match args.detail {
        Detail::Detailed => DetailLevel::Detailed,
        Detail::Compact => DetailLevel::Compact,
    };

    let loader = Loader::new(&source, &config.loader);
    let outcome = loader
        .load(&scope, |p| {
            tracing::debug!(loaded = p.loaded, total = p.total, "progress");
        })
        .await
        .map_err(|e| e.user_message())?;

    if outcome.is_empty() {
        return Err(format!("no tables found for {}", scope).into());
    }

    let mut diagram = Diagram::from_outcome(outcome, detail, &config);
    if let Some(query) = &args.search {
        let status = diagram.set_search_query(query);
        info!(%query, matches = status.match_count, "search");
    }

    let rendered = match args.format {
        Format::Svg => SvgRenderer::from_config(&config.sizing).render(&diagram.scene())?,
        Format::Json => serde_json::to_string_pretty(&diagram.scene())?,
    };
    write_output(args.output.as_ref(), &rendered)
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => fs::write(path, content)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?,
        None => print!("{}", content),
    }
    Ok(())
}
