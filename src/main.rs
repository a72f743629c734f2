//! formulary CLI application
//!
//! Command-line interface for the formulary library.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use formulary::jobs::JobBoard;
use formulary::models::{FormulaRecord, Job};
use formulary::search::{highlight, render_marked};
use formulary::{
    ApiClient, Config, FormulaStore, JobApi, NewFormula, Normalization, PdfSource,
    SearchCoordinator, SearchMode, SearchSession, SearchView,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "formulary")]
#[command(about = "Search, collect and convert LaTeX formulas stored on a formulary backend")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding config and environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all stored formulas
    List,

    /// Show a single formula
    Show {
        /// Formula id
        id: i64,
    },

    /// Search formulas once
    Search {
        /// LaTeX fragment to look for
        latex: String,

        /// Use the backend's structural index comparison
        #[arg(long)]
        deep: bool,
    },

    /// Incremental search reading one term per line
    Watch {
        /// Start in deep mode
        #[arg(long)]
        deep: bool,
    },

    /// Store a new formula
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        latex: String,

        #[arg(long, default_value = "")]
        source: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Extract formulas from a PDF in the background
    ImportPdf {
        /// Local PDF file
        #[arg(required_unless_present = "url", conflicts_with = "url")]
        path: Option<PathBuf>,

        /// Remote PDF to download first
        #[arg(long)]
        url: Option<String>,

        /// Wait until the extraction job finishes
        #[arg(long)]
        wait: bool,
    },

    /// Recognise the formula in a screenshot
    ImportScreenshot {
        /// Image file
        image: PathBuf,
    },

    /// Render LaTeX to a PNG file
    ExportPng {
        latex: String,

        /// Output file (defaults to the configured PNG name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect and manage background jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },

    /// Interactive chat with the formula assistant
    Chat,
}

#[derive(Subcommand)]
enum JobsCommand {
    /// List unarchived jobs
    List {
        /// Only jobs whose id contains this fragment
        #[arg(long, default_value = "")]
        filter: String,
    },

    /// Show the status of a job
    Status { id: i64 },

    /// Archive a job
    Archive { id: i64 },

    /// Wait until a job finishes
    Wait { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let client = ApiClient::new(&config.api).context("Failed to create backend client")?;

    match cli.command {
        Commands::List => list_command(&client).await?,
        Commands::Show { id } => show_command(&client, id).await?,
        Commands::Search { latex, deep } => search_command(&client, &config, latex, deep).await?,
        Commands::Watch { deep } => watch_command(client, &config, deep).await?,
        Commands::Add {
            name,
            latex,
            source,
            description,
        } => {
            let formula = NewFormula {
                name,
                latex,
                source,
                description: description.unwrap_or_default(),
            };
            add_command(&client, &config, formula).await?;
        }
        Commands::ImportPdf { path, url, wait } => {
            let source = match (path, url) {
                (Some(path), _) => PdfSource::File(path),
                (None, Some(url)) => PdfSource::Url(url),
                (None, None) => bail!("Either a PDF path or --url is required"),
            };
            import_pdf_command(&client, &config, source, wait).await?;
        }
        Commands::ImportScreenshot { image } => {
            println!("🖼️  Recognising {}...", image.display());
            let latex = formulary::import_screenshot(&client, &image).await?;
            println!("✅ {}", latex);
        }
        Commands::ExportPng { latex, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.export.default_png_name));
            let size = formulary::export_png(&client, &latex, &output).await?;
            println!(
                "✅ Exported to {} ({})",
                output.display(),
                formulary::utils::format_file_size(size)
            );
        }
        Commands::Jobs { command } => jobs_command(&client, &config, command).await?,
        Commands::Chat => formulary::chat_interactive(&client).await?,
    }

    Ok(())
}

/// File, then environment, then command-line flags
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_formula(formula: &FormulaRecord, term: &str, normalization: Normalization) {
    let id = formula
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let latex = render_marked(&highlight(&formula.latex, term, normalization), "[", "]");
    println!("{:>5}. {} | {}", id, formula.name, latex);
}

async fn list_command(client: &ApiClient) -> anyhow::Result<()> {
    let formulas = client.list_formulas().await?;
    if formulas.is_empty() {
        println!("📭 No formulas stored yet");
        return Ok(());
    }

    println!("📋 {} formulas:", formulas.len());
    for formula in &formulas {
        print_formula(formula, "", Normalization::default());
    }
    Ok(())
}

async fn show_command(client: &ApiClient, id: i64) -> anyhow::Result<()> {
    let formula = client
        .get_formula(id)
        .await
        .with_context(|| format!("Failed to fetch formula {}", id))?;

    println!("📐 {}", formula.name);
    println!("   LaTeX:  {}", formula.latex);
    if !formula.source.is_empty() {
        println!("   Source: {}", formula.source);
    }
    if !formula.description.is_empty() {
        println!("   Notes:  {}", formula.description);
    }
    Ok(())
}

async fn search_command(
    client: &ApiClient,
    config: &Config,
    latex: String,
    deep: bool,
) -> anyhow::Result<()> {
    let mode = if deep { SearchMode::Deep } else { SearchMode::Shallow };
    println!("🔍 {} search for: \"{}\"", mode, latex);

    let mut coordinator = SearchCoordinator::new(&config.search);
    coordinator.set_mode(mode);
    coordinator.set_search_term(latex.as_str());
    coordinator.refresh(client).await;
    coordinator.sync_deep(client).await;

    let view = coordinator.view();
    if let Some(error) = &view.error {
        bail!("Search failed: {}", error);
    }
    print_results(&view, coordinator.normalization());
    Ok(())
}

fn print_results(view: &SearchView, normalization: Normalization) {
    if view.visible.is_empty() {
        println!("❌ No matching formulas");
        return;
    }
    println!("📋 {} matches:", view.visible.len());
    for formula in &view.visible {
        print_formula(formula, &view.term, normalization);
    }
}

async fn watch_command(client: ApiClient, config: &Config, deep: bool) -> anyhow::Result<()> {
    println!("🔍 Incremental search");
    println!("   Type a term per line; ':deep' / ':shallow' switch mode, ':refresh' reloads, ':q' quits");
    println!();

    let (handle, task) = SearchSession::spawn(Arc::new(client), &config.search);
    if deep {
        handle.set_mode(SearchMode::Deep).await?;
    }

    // Print every settled snapshot as it arrives
    let mut watcher = handle.clone();
    let normalization = config.search.normalization;
    let printer = tokio::spawn(async move {
        let mut last: Option<SearchView> = None;
        while let Ok(view) = watcher.changed().await {
            if view.loading || last.as_ref() == Some(&view) {
                continue;
            }
            println!();
            println!("── {} search for \"{}\"", view.mode, view.term);
            match &view.error {
                Some(error) => println!("❌ {}", error),
                None => print_results(&view, normalization),
            }
            last = Some(view);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":q" | ":quit" => break,
            ":deep" => handle.set_mode(SearchMode::Deep).await?,
            ":shallow" => handle.set_mode(SearchMode::Shallow).await?,
            ":refresh" => handle.refresh().await?,
            _ => handle.edit(line.trim()).await?,
        }
    }

    handle.shutdown().await?;
    task.await.context("Search session panicked")?;
    printer.abort();
    println!("👋 Goodbye!");
    Ok(())
}

async fn add_command(client: &ApiClient, config: &Config, formula: NewFormula) -> anyhow::Result<()> {
    let mut coordinator = SearchCoordinator::new(&config.search);
    coordinator.create(client, &formula).await?;

    let count = coordinator
        .all_formulas()
        .ready()
        .map(Vec::len)
        .unwrap_or_default();
    println!("✅ Stored '{}' ({} formulas in total)", formula.name, count);
    Ok(())
}

async fn import_pdf_command(
    client: &ApiClient,
    config: &Config,
    source: PdfSource,
    wait: bool,
) -> anyhow::Result<()> {
    match &source {
        PdfSource::File(path) => println!("📄 Uploading {}...", path.display()),
        PdfSource::Url(url) => println!("🌐 Fetching {}...", url),
    }

    let job = formulary::import_pdf(client, &source).await?;
    println!("✅ Queued as job {} ({})", job.id, job.status.label());

    if wait {
        wait_command(client, config, job.id).await?;
    }
    Ok(())
}

fn print_job(job: &Job) {
    let actions: Vec<String> = job
        .status
        .allowed_actions()
        .iter()
        .map(|action| format!("{:?}", action).to_lowercase())
        .collect();
    println!(
        "{:>6}  {:<11} {}  [{}]",
        job.id,
        job.status.label(),
        job.datetime.format("%Y-%m-%d %H:%M:%S"),
        actions.join(", ")
    );
}

async fn jobs_command(client: &ApiClient, config: &Config, command: JobsCommand) -> anyhow::Result<()> {
    match command {
        JobsCommand::List { filter } => {
            let mut board = JobBoard::new();
            board.refresh(client).await?;
            let jobs = board.filter_by_id(&filter);
            if jobs.is_empty() {
                println!("📭 No jobs");
                return Ok(());
            }
            println!("📋 {} jobs:", jobs.len());
            for job in jobs {
                print_job(job);
            }
        }
        JobsCommand::Status { id } => {
            let job = client.job_status(id).await?;
            print_job(&job);
        }
        JobsCommand::Archive { id } => {
            let mut board = JobBoard::new();
            board.archive(client, id).await?;
            println!("🗄️  Archived job {} ({} jobs remain)", id, board.jobs().len());
        }
        JobsCommand::Wait { id } => wait_command(client, config, id).await?,
    }
    Ok(())
}

async fn wait_command(client: &ApiClient, config: &Config, id: i64) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Job {} submitted", id));

    let result = formulary::wait_for_job(client, id, &config.jobs, |job| {
        spinner.set_message(format!("Job {} {}", job.id, job.status.label().to_lowercase()));
    })
    .await;
    spinner.finish_and_clear();

    let job = result?;
    match job.status {
        formulary::JobStatus::Failed => bail!("Job {} failed", job.id),
        _ => println!("✅ Job {} {}", job.id, job.status.label().to_lowercase()),
    }
    Ok(())
}
