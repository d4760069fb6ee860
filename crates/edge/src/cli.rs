// crates/edge/src/cli.rs

use crate::{router::build_router, settings, state::AppState, Error};
use adapt::NotionClient;
use clap::{builder::ValueHint, Args, Parser, Subcommand};
use domain::{
    page::{PageProperties, PageSummary},
    setting::Settings,
};
use serde_json::Value as Json;
use serve::{transform::render_block, upstream::Upstream};
use std::{
    io::{self, Write},
    net::SocketAddr,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};
use tracing::{error, info};

pub type Result<T> = std::result::Result<T, Error>;

/// Notion relay CLI
#[tokio::main(flavor = "multi_thread")]
#[tracing::instrument(skip_all)]
pub async fn start() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start(start) => do_start(&cli.global, start).await,
        Commands::Check => do_check(&cli.global).await,
        Commands::Pages => do_pages(&cli.global).await,
        Commands::Show(show) => do_show(&cli.global, show).await,
    };

    result.map_or_else(
        |e| {
            error!("Command failed: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
        |_| ExitCode::SUCCESS,
    )
}

#[derive(Parser, Debug)]
#[command(name = "notion-relay", version, about = "CRUD relay for Notion pages and blocks")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Settings file (TOML); missing file means defaults + env
    #[arg(
        long,
        short,
        global = true,
        env = "RELAY_CONFIG",
        default_value = "relay.toml",
        value_hint = ValueHint::FilePath
    )]
    pub config: PathBuf,

    /// Integration credential
    #[arg(long, global = true, env = "NOTION_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Collection pages are created in and listed from
    #[arg(long, global = true, env = "NOTION_DATABASE_ID")]
    pub database_id: Option<String>,

    /// Upstream API base URL
    #[arg(long, global = true, env = "NOTION_BASE_URL", value_hint = ValueHint::Url)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP relay
    Start(StartCmd),
    /// Query the collection once and report whether the credential works
    Check,
    /// List pages in the collection
    Pages,
    /// Print one page and its content blocks
    Show(ShowCmd),
}

#[derive(Parser, Debug)]
pub struct StartCmd {
    /// Port to listen on
    #[arg(long, short, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
pub struct ShowCmd {
    /// Page id
    #[arg(value_name = "PAGE_ID")]
    pub page_id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all)]
fn load_settings(global: &GlobalArgs, port: Option<u16>) -> Result<Settings> {
    let settings = settings::load(
        &global.config,
        settings::Overrides {
            port,
            api_key: global.api_key.clone(),
            database_id: global.database_id.clone(),
            base_url: global.base_url.clone(),
        },
    )?;
    settings.validate()?;
    Ok(settings)
}

#[tracing::instrument(skip_all)]
async fn do_start(global: &GlobalArgs, start: StartCmd) -> Result<()> {
    let settings = load_settings(global, start.port)?;
    let client = NotionClient::new(&settings.upstream)?;
    let state = AppState::new(Arc::new(client), settings.upstream.database_id.clone());

    let addr = SocketAddr::from((settings.server.ip, settings.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Relay listening on http://{}", addr);
    if settings.upstream.database_id.is_none() {
        info!("No database ID configured; /api/database and page creation will answer 400");
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Connection smoke test: one collection query, with hints for the usual
/// credential and sharing mistakes.
#[tracing::instrument(skip_all)]
async fn do_check(global: &GlobalArgs) -> Result<()> {
    let settings = load_settings(global, None)?;
    let client = NotionClient::new(&settings.upstream)?;
    let mut out = io::stdout();

    writeln!(out, "Testing upstream connection...")?;
    writeln!(out, "API key: {}", settings.upstream.api_key_hint())?;
    writeln!(
        out,
        "Database ID: {}",
        settings.upstream.database_id.as_deref().unwrap_or("(not set)")
    )?;

    let database_id = settings
        .upstream
        .database_id
        .as_deref()
        .ok_or(Error::MissingDatabase)?;

    writeln!(out, "\nQuerying database...")?;
    match client.query_database(database_id).await {
        Ok(result) => write_check_success(&mut out, &result)?,
        Err(e) => {
            writeln!(out, "Error: {}", e.details())?;
            if let Some(status) = e.status() {
                writeln!(out, "Status: {status}")?;
            }
            write_check_hint(&mut out, e.status())?;
            return Err(e.into());
        }
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn do_pages(global: &GlobalArgs) -> Result<()> {
    let settings = load_settings(global, None)?;
    let client = NotionClient::new(&settings.upstream)?;
    let database_id = settings
        .upstream
        .database_id
        .as_deref()
        .ok_or(Error::MissingDatabase)?;

    let result = client.query_database(database_id).await?;
    let pages = PageSummary::from_query(&result);
    write_pages(&mut io::stdout(), &pages)?;
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn do_show(global: &GlobalArgs, show: ShowCmd) -> Result<()> {
    let settings = load_settings(global, None)?;
    let client = NotionClient::new(&settings.upstream)?;

    let page = client.retrieve_page(&show.page_id).await?;
    let children = client.list_children(&show.page_id).await?;
    write_page(&mut io::stdout(), &page, &children)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn write_check_success(out: &mut impl Write, result: &Json) -> io::Result<()> {
    let pages = result
        .get("results")
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    writeln!(out, "Success! Found {} pages in database", pages.len())?;
    if let Some(first) = pages.first() {
        let props = first.get("properties").cloned().unwrap_or(Json::Null);
        writeln!(
            out,
            "\nFirst page properties: {}",
            serde_json::to_string_pretty(&props).unwrap_or_default()
        )?;
    }
    Ok(())
}

fn write_check_hint(out: &mut impl Write, status: Option<u16>) -> io::Result<()> {
    match status {
        Some(401) => writeln!(
            out,
            "\nAuthentication failed. Please check your API key."
        ),
        Some(404) => {
            writeln!(out, "\nDatabase not found. Please check:")?;
            writeln!(out, "   1. The database ID is correct")?;
            writeln!(out, "   2. The integration has access to the database")
        }
        _ => Ok(()),
    }
}

fn write_pages(out: &mut impl Write, pages: &[PageSummary]) -> io::Result<()> {
    writeln!(out, "All Pages ({})", pages.len())?;
    if pages.is_empty() {
        return writeln!(out, "No pages found. Create your first page!");
    }
    for page in pages {
        writeln!(out, "\n{}  [{}]", page.title, page.status)?;
        writeln!(out, "  id:      {}", page.id)?;
        writeln!(out, "  created: {}", date_or_dash(page.created_time))?;
        writeln!(out, "  updated: {}", date_or_dash(page.last_edited_time))?;
    }
    Ok(())
}

fn write_page(out: &mut impl Write, page: &Json, children: &Json) -> io::Result<()> {
    let summary = PageSummary::from_page(page);
    let props = PageProperties::from_page(page);
    writeln!(out, "{}  [{}]", summary.title, props.status)?;
    if summary.archived {
        writeln!(out, "(archived)")?;
    }
    writeln!(out)?;

    let blocks = children
        .get("results")
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if blocks.is_empty() {
        return writeln!(out, "No content yet");
    }
    for block in blocks {
        writeln!(out, "{}", render_block(block))?;
    }
    Ok(())
}

fn date_or_dash(t: Option<chrono::DateTime<chrono::Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_owned())
}
