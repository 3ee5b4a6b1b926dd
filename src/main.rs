use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bookharvest::api::{CatalogApi, CatalogClient, IsbndbClient};
use bookharvest::config::{load_config, Config};
use bookharvest::harvest::{
    BatchImportController, FixedDelayScheduler, HarvestController, HarvestReport,
};
use bookharvest::models::{normalize_isbn, HarvestQuery, PageSize};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use serde_json::json;

/// Bookharvest - harvest book records from bibliographic search APIs into a catalog
#[derive(Parser, Debug)]
#[command(name = "bookharvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Harvest book records from bibliographic search APIs into a local catalog", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> OutputFormat {
        match self {
            OutputFormat::Auto => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Table
                } else {
                    OutputFormat::Json
                }
            }
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Harvest books for a subject across search pages
    #[command(alias = "h")]
    Harvest {
        /// Subject to search for
        subject: String,

        /// Publication-year filter
        #[arg(long, short)]
        year: Option<String>,

        /// Results per page (10, 20, 50 or 100)
        #[arg(long, default_value_t = 20)]
        page_size: u32,

        /// Pages to fetch (capped at 50)
        #[arg(long, short, default_value_t = 1)]
        max_pages: u32,

        /// Push harvested records to the catalog when the run finishes
        #[arg(long)]
        import: bool,
    },

    /// Backfill authors for catalog books missing them
    #[command(alias = "b")]
    Backfill {
        /// Total number of books to process
        #[arg(long, short)]
        target: u64,

        /// Books per server-side batch call
        #[arg(long, default_value_t = 20)]
        batch_size: u32,
    },

    /// Check which ISBNs the catalog already holds
    Check {
        /// ISBNs to probe (hyphens and spacing are ignored)
        isbns: Vec<String>,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("bookharvest={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    let output = cli.output.resolve();
    let show_progress = !cli.quiet && output == OutputFormat::Table;

    match cli.command {
        Commands::Harvest {
            subject,
            year,
            page_size,
            max_pages,
            import,
        } => {
            run_harvest(
                &config,
                subject,
                year,
                page_size,
                max_pages,
                import,
                output,
                show_progress,
            )
            .await
        }
        Commands::Backfill { target, batch_size } => {
            run_backfill(&config, target, batch_size, output, show_progress).await
        }
        Commands::Check { isbns } => run_check(&config, isbns, output).await,
    }
}

fn catalog_client(config: &Config) -> Arc<CatalogClient> {
    Arc::new(CatalogClient::new(config.services.catalog_url.as_str()))
}

fn search_client(config: &Config) -> Result<Arc<IsbndbClient>> {
    let api_key = config
        .services
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty() && !k.contains("your-"))
        .context("no search API key configured; set BOOKHARVEST_API_KEY or [services].api_key")?;
    Ok(Arc::new(IsbndbClient::with_base_url(
        api_key,
        config.services.search_url.as_str(),
    )))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

#[allow(clippy::too_many_arguments)]
async fn run_harvest(
    config: &Config,
    subject: String,
    year: Option<String>,
    page_size: u32,
    max_pages: u32,
    import: bool,
    output: OutputFormat,
    show_progress: bool,
) -> Result<()> {
    let page_size = PageSize::try_from(page_size).map_err(|e| anyhow::anyhow!(e))?;
    let mut query = HarvestQuery::new(subject)
        .page_size(page_size)
        .max_pages(max_pages);
    if let Some(year) = year {
        query = query.year(year);
    }

    let catalog = catalog_client(config);
    let mut controller = HarvestController::new(search_client(config)?, catalog.clone())
        .with_scheduler(Box::new(FixedDelayScheduler::new(config.scheduler_config())));

    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });

    let progress = if show_progress {
        let mut rx = controller.snapshots();
        let pb = spinner();
        let bar = pb.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow().clone();
                bar.set_message(format!(
                    "page {} | {} gathered | {} duplicates | {} already in catalog",
                    snapshot.state.pages_fetched,
                    snapshot.accumulated,
                    snapshot.duplicates,
                    snapshot.existing_filtered,
                ));
            }
        });
        Some(pb)
    } else {
        None
    };

    let report = controller.run(&query).await?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    print_harvest_report(&report, output);

    if import && !report.records.is_empty() && !report.state.aborted {
        let summary = catalog
            .import_books(&report.records)
            .await
            .context("importing harvested records")?;
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            _ => {
                println!(
                    "{} imported {} of {} records ({} duplicates, {} errors)",
                    "✓".green(),
                    summary.stored,
                    summary.total,
                    summary.duplicates,
                    summary.errors.len()
                );
                for error in &summary.errors {
                    println!("  {} {}", "✗".red(), error);
                }
            }
        }
    }

    if report.state.aborted {
        std::process::exit(1);
    }
    Ok(())
}

fn print_harvest_report(report: &HarvestReport, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let value = json!({
                "state": report.state,
                "accumulated": report.records.len(),
                "duplicates": report.duplicates,
                "existing_filtered": report.existing_filtered,
                "warnings": report.warnings,
                "records": report.records,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).expect("report serializes")
            );
        }
        OutputFormat::Plain => {
            for record in &report.records {
                println!(
                    "{}\t{}\t{}",
                    if record.isbn13.is_empty() {
                        &record.isbn
                    } else {
                        &record.isbn13
                    },
                    record.title,
                    record.author_line()
                );
            }
            print_harvest_summary(report);
        }
        _ => {
            if !report.records.is_empty() {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL_CONDENSED);
                table.set_header(vec!["ISBN-13", "Title", "Authors", "Publisher", "Published"]);
                for record in &report.records {
                    table.add_row(vec![
                        if record.isbn13.is_empty() {
                            record.isbn.clone()
                        } else {
                            record.isbn13.clone()
                        },
                        record.title.clone(),
                        record.author_line(),
                        record.publisher.clone(),
                        record.date_published.clone().unwrap_or_default(),
                    ]);
                }
                println!("{table}");
            }
            print_harvest_summary(report);
        }
    }
}

fn print_harvest_summary(report: &HarvestReport) {
    let state = &report.state;
    if let Some(reason) = &state.abort_reason {
        println!(
            "{} run aborted ({}), {} books fetched before the abort",
            "✗".red(),
            reason,
            report.records.len()
        );
    } else if report.records.is_empty() {
        println!("{} no new books found", "ℹ".blue());
    } else {
        println!(
            "{} {} books gathered across {} pages",
            "✓".green(),
            report.records.len(),
            state.pages_fetched
        );
    }
    println!(
        "  server total {} | duplicates dropped {} | already in catalog {} | pages skipped {}",
        state.total_reported, report.duplicates, report.existing_filtered, state.pages_skipped
    );
    for warning in &report.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }
}

async fn run_backfill(
    config: &Config,
    target: u64,
    batch_size: u32,
    output: OutputFormat,
    show_progress: bool,
) -> Result<()> {
    if batch_size == 0 {
        bail!("batch size must be at least 1");
    }

    let mut controller =
        BatchImportController::new(catalog_client(config)).with_batch_delay(config.batch_delay());

    let progress = if show_progress {
        let mut rx = controller.snapshots();
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template("{bar:40} {pos}% {msg}")
                .expect("static template is valid"),
        );
        let bar = pb.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow().clone();
                bar.set_position(snapshot.percent() as u64);
                bar.set_message(format!(
                    "{}/{} processed, {} failed",
                    snapshot.state.total_processed,
                    snapshot.state.total_target,
                    snapshot.state.total_failed
                ));
            }
        });
        Some(pb)
    } else {
        None
    };

    let state = controller.run(target, batch_size).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        _ => {
            if state.total_processed >= state.total_target {
                println!(
                    "{} processed {} books, {} failed",
                    "✓".green(),
                    state.total_processed,
                    state.total_failed
                );
            } else {
                println!(
                    "{} backfill stopped early: {} of {} processed",
                    "✗".red(),
                    state.total_processed,
                    state.total_target
                );
            }
            for error in state.errors.iter().take(5) {
                println!("  {} {}", "✗".red(), error);
            }
            if state.errors.len() > 5 {
                println!("  ...and {} more", state.errors.len() - 5);
            }
        }
    }

    if state.total_processed < state.total_target {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_check(config: &Config, isbns: Vec<String>, output: OutputFormat) -> Result<()> {
    if isbns.is_empty() {
        bail!("provide at least one ISBN to check");
    }
    let normalized: Vec<String> = isbns.iter().map(|i| normalize_isbn(i)).collect();

    let catalog = catalog_client(config);
    let existing = catalog
        .existing_isbns(&normalized)
        .await
        .context("checking the catalog")?;

    match output {
        OutputFormat::Json => {
            let value = json!({
                "checked": normalized,
                "existing": existing.iter().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            for isbn in &normalized {
                if existing.contains(isbn) {
                    println!("{} {} already in catalog", "✓".green(), isbn);
                } else {
                    println!("{} {} not in catalog", "○".yellow(), isbn);
                }
            }
        }
    }
    Ok(())
}
