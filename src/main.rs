//! DbReport - SQL reporting CLI with chart rendering
//!
//! Runs one of four fixed report queries against a Postgres database,
//! computes descriptive statistics where the report calls for them, and
//! renders the report's charts to image files.
//!
//! Exit codes:
//!   0 - Success (charts rendered)
//!   1 - Runtime error (config, rendering, boundary parse failure, etc.)
//!   2 - Query produced no rows (nothing rendered)

mod analysis;
mod cli;
mod config;
mod db;
mod geo;
mod queries;
mod render;
mod table;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, ReportKind};
use config::Config;
use queries::{
    COL_FINAL_AVERAGE, COL_PRODUCT, COL_REGION, COL_STATUS, COL_STUDENT, COL_TOTAL_SALES,
    STATUS_APPROVED, STATUS_REPROVED,
};
use render::{bar, choropleth, dashboard, pie, RenderContext};
use std::path::PathBuf;
use std::time::Instant;
use table::ResultTable;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("DbReport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the report
    match run_report(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .dbreport.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".dbreport.toml");

    if path.exists() {
        eprintln!("⚠️  .dbreport.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .dbreport.toml")?;

    println!("✅ Created .dbreport.toml with default settings.");
    println!("   Edit it to set the database URL, output directory, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete report workflow. Returns exit code (0 or 2).
async fn run_report(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(report) = args.report else {
        bail!("no report selected");
    };

    let sql = report_sql(report, &config);

    // Handle --dry-run: print the SQL and exit
    if args.dry_run {
        return handle_dry_run(report, &sql);
    }

    // Step 1: Load the data. The connection is opened for exactly one
    // query and closed again before any rendering starts.
    println!("📥 Running {} report", report.name());
    let table = db::load_or_empty(&config.database, &sql).await;

    if table.is_empty() {
        println!("📭 Nothing to report.");
        return Ok(2);
    }
    println!("   Loaded {} rows", table.len());
    debug!("Columns: {:?}", table.columns());

    // Step 2: Render the report's charts
    let ctx = RenderContext::from_config(&config.charts);
    let mut charts: Vec<PathBuf> = Vec::new();

    match report {
        ReportKind::Grades => run_grades(&table, &config, &ctx, &mut charts)?,
        ReportKind::Inventory => run_inventory(&table, &ctx, &mut charts)?,
        ReportKind::Sales => run_sales(&table, &config, &ctx, &mut charts).await?,
        ReportKind::Dashboard => run_dashboard(&table, &ctx, &mut charts)?,
    }

    // Step 3: Print the run summary
    let duration = start_time.elapsed().as_secs_f64();

    println!("\n📊 Report Summary:");
    println!("   Report: {}", report.name());
    println!("   Rows: {}", table.len());
    println!("   Charts rendered: {}", charts.len());
    for path in &charts {
        println!("     🖼  {}", path.display());
    }
    println!(
        "   Generated at: {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("   Duration: {:.1}s", duration);

    println!("\n✅ Report complete!");
    Ok(0)
}

/// Handle --dry-run: print the SQL the report would execute, exit.
fn handle_dry_run(report: ReportKind, sql: &str) -> Result<i32> {
    println!("\n🔍 Dry run: no connection opened, no chart rendered.\n");
    println!("The {} report would execute:\n", report.name());
    println!("{}\n", sql);
    println!("✅ Dry run complete.");
    Ok(0)
}

/// The fixed SQL for a report variant.
fn report_sql(report: ReportKind, config: &Config) -> String {
    match report {
        ReportKind::Grades => queries::grades_query(config.charts.pass_cutoff),
        // The dashboard charts the same per-product totals as the inventory
        // report; only the sales report needs the per-region join.
        ReportKind::Inventory | ReportKind::Dashboard => queries::INVENTORY_QUERY.to_string(),
        ReportKind::Sales => queries::SALES_QUERY.to_string(),
    }
}

/// Grades report: class statistics plus the status-colored bar chart with
/// the cutoff line.
fn run_grades(
    table: &ResultTable,
    config: &Config,
    ctx: &RenderContext,
    charts: &mut Vec<PathBuf>,
) -> Result<()> {
    if let Some(stats) = analysis::ClassStats::compute(
        table,
        COL_STUDENT,
        COL_FINAL_AVERAGE,
        COL_STATUS,
        STATUS_APPROVED,
        STATUS_REPROVED,
    )? {
        println!("\n--- Class Statistics ---");
        println!("{}", stats);
    }

    let cutoff = config.charts.pass_cutoff;
    let opts = bar::BarOptions {
        stem: "grades".to_string(),
        title: "Student Averages Report".to_string(),
        x_desc: "Students".to_string(),
        y_desc: "Final Averages".to_string(),
        label_col: COL_STUDENT.to_string(),
        value_col: COL_FINAL_AVERAGE.to_string(),
        coloring: bar::BarColoring::Status(COL_STATUS.to_string()),
        threshold: Some((cutoff, format!("Cutoff ({:.1})", cutoff))),
        currency: false,
        y_max: Some(10.5),
    };

    if let Some(path) = bar::render(table, &opts, ctx)? {
        charts.push(path);
    }
    Ok(())
}

/// Inventory report: single-color bar chart with currency labels.
fn run_inventory(
    table: &ResultTable,
    ctx: &RenderContext,
    charts: &mut Vec<PathBuf>,
) -> Result<()> {
    let opts = bar::BarOptions {
        stem: "inventory".to_string(),
        title: "Total Stock Value Report".to_string(),
        x_desc: "Products".to_string(),
        y_desc: "Total Stock Value".to_string(),
        label_col: COL_PRODUCT.to_string(),
        value_col: COL_TOTAL_SALES.to_string(),
        coloring: bar::BarColoring::Fixed(render::INVENTORY_BAR_COLOR),
        threshold: None,
        currency: true,
        y_max: None,
    };

    if let Some(path) = bar::render(table, &opts, ctx)? {
        charts.push(path);
    }
    Ok(())
}

/// Sales report: ranking bar chart, region pie chart, and the state
/// choropleth. A boundary-fetch failure skips only the map.
async fn run_sales(
    table: &ResultTable,
    config: &Config,
    ctx: &RenderContext,
    charts: &mut Vec<PathBuf>,
) -> Result<()> {
    let total = table.sum(COL_TOTAL_SALES)?;

    let bar_opts = bar::BarOptions {
        stem: "sales_by_product".to_string(),
        title: format!(
            "Sales by Product (Total: {})",
            render::format_currency(&ctx.currency_prefix, total)
        ),
        x_desc: "Products".to_string(),
        y_desc: "Sales".to_string(),
        label_col: COL_PRODUCT.to_string(),
        value_col: COL_TOTAL_SALES.to_string(),
        coloring: bar::BarColoring::Category(COL_REGION.to_string()),
        threshold: None,
        currency: true,
        y_max: None,
    };
    if let Some(path) = bar::render(table, &bar_opts, ctx)? {
        charts.push(path);
    }

    let pie_opts = pie::PieOptions {
        stem: "sales_by_region".to_string(),
        title: "Sales Distribution by Region".to_string(),
        category_col: COL_REGION.to_string(),
        value_col: COL_TOTAL_SALES.to_string(),
    };
    if let Some(path) = pie::render(table, &pie_opts, ctx)? {
        charts.push(path);
    }

    println!("🗺️  Fetching state boundaries...");
    match geo::fetch_boundaries(&config.geo).await {
        Ok(boundaries) => {
            let map_opts = choropleth::ChoroplethOptions {
                stem: "sales_by_state".to_string(),
                title: "Sales by State".to_string(),
                region_col: COL_REGION.to_string(),
                value_col: COL_TOTAL_SALES.to_string(),
            };
            if let Some(path) = choropleth::render(table, &boundaries, &map_opts, ctx)? {
                charts.push(path);
            }
        }
        Err(e) => {
            warn!("Boundary fetch failed: {}", e);
            println!("⚠️  Could not fetch boundaries: {}. Skipping map.", e);
        }
    }

    Ok(())
}

/// Dashboard report: KPI header over the sales bar chart.
fn run_dashboard(
    table: &ResultTable,
    ctx: &RenderContext,
    charts: &mut Vec<PathBuf>,
) -> Result<()> {
    let opts = dashboard::DashboardOptions {
        stem: "dashboard".to_string(),
        title: "Sales Analytics Report".to_string(),
        label_col: COL_PRODUCT.to_string(),
        value_col: COL_TOTAL_SALES.to_string(),
        x_desc: "Products".to_string(),
        y_desc: "Revenue".to_string(),
    };

    if let Some(path) = dashboard::render(table, &opts, ctx)? {
        charts.push(path);
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .dbreport.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
