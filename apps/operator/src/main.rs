use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planner_core::{
    config::normalize_server_url, load_client_settings, HttpPlanningBackend, PlanningBackend,
    Severity, ShortageState, WorkflowEvent, WorkflowOrchestrator,
};
use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod render;

use render::{render_plan, render_resolution, render_shortage_state, render_sources};

#[derive(Parser, Debug)]
#[command(about = "Turn a build request into a stock-checked manufacturing plan")]
struct Args {
    /// Planning service base URL; overrides operator.toml and APP__SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a plan and annotate every part with its stock status.
    Plan {
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Walk through each out-of-stock part and raise transfer requests.
        #[arg(long)]
        resolve: bool,
    },
    /// List every location holding stock of a part.
    Locate { part_number: String },
}

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_client_settings(args.config.as_deref())?;
    if let Some(url) = args.server_url {
        settings.server_url = normalize_server_url(&url)?;
    }
    info!(server_url = %settings.server_url, "using planning service");
    let backend = Arc::new(HttpPlanningBackend::new(&settings)?);

    match args.command {
        Command::Plan { prompt, resolve } => {
            let mut workflow = WorkflowOrchestrator::new(backend, settings.call_policy());
            tokio::spawn(forward_events(workflow.subscribe_events()));
            run_plan(&mut workflow, &prompt.join(" "), resolve).await
        }
        Command::Locate { part_number } => {
            let policy = settings.call_policy();
            let backend = backend.as_ref();
            let part = part_number.as_str();
            let sources = policy
                .read("locate_part", move || backend.locate_part(part))
                .await
                .with_context(|| format!("failed to locate {part_number}"))?;
            if sources.is_empty() {
                println!("{part_number}: no stock available at any location");
            } else {
                print!("{}", render_sources(&sources));
            }
            Ok(())
        }
    }
}

async fn run_plan(workflow: &mut WorkflowOrchestrator, prompt: &str, resolve: bool) -> Result<()> {
    let view = workflow.generate_plan(prompt).await?;
    print!("{}", render_plan(view));

    let shortages: Vec<String> = view
        .shortages()
        .map(|row| row.part.part_number.clone())
        .collect();
    if shortages.is_empty() || !resolve {
        return Ok(());
    }

    let mut input = BufReader::new(stdin()).lines();
    for part_number in shortages {
        if let Err(err) = resolve_shortage(workflow, &part_number, &mut input).await {
            error!(%part_number, error = %err, "shortage left unresolved");
        }
        workflow.close_shortage();
    }
    Ok(())
}

async fn resolve_shortage(
    workflow: &mut WorkflowOrchestrator,
    part_number: &str,
    input: &mut InputLines,
) -> Result<()> {
    println!();
    let session = workflow.open_shortage(part_number).await?;
    let view = match session.state() {
        ShortageState::LocationsAvailable(view) => view.clone(),
        other => {
            println!("{}", render_shortage_state(part_number, other));
            return Ok(());
        }
    };
    print!("{}", render_resolution(&view));

    let Some(choice) = ask(input, "Source number (blank to skip): ").await? else {
        return Ok(());
    };
    let source = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| view.sources.get(index))
        .with_context(|| format!("no source numbered '{choice}'"))?;
    workflow.select_source(&source.location)?;

    if let Some(raw) = ask(input, &format!("Quantity [{}]: ", view.quantity)).await? {
        let quantity = raw
            .parse::<u32>()
            .with_context(|| format!("'{raw}' is not a quantity"))?;
        workflow.set_quantity(quantity)?;
    }
    if let Some(ShortageState::LocationsAvailable(current)) =
        workflow.shortage().map(|s| s.state())
    {
        if current.exceeds_available() {
            warn!(
                %part_number,
                quantity = current.quantity,
                available = source.quantity,
                "quantity exceeds stock at the source; the service may reject it"
            );
        }
    }

    workflow.submit_sourcing_request().await?;
    if let Some(session) = workflow.shortage() {
        println!("{}", render_shortage_state(part_number, session.state()));
    }
    Ok(())
}

/// `None` for a blank answer or closed input.
async fn ask(input: &mut InputLines, question: &str) -> Result<Option<String>> {
    print!("{question}");
    std::io::Write::flush(&mut std::io::stdout())?;
    let line = input.next_line().await?;
    Ok(line
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty()))
}

async fn forward_events(mut events: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match events.recv().await {
            Ok(WorkflowEvent::Notification { severity, message }) => match severity {
                Severity::Info => info!(%message, "workflow"),
                Severity::Error => error!(%message, "workflow"),
            },
            Ok(WorkflowEvent::PlanReady(view)) => {
                info!(parts = view.parts.len(), "plan ready");
            }
            Ok(WorkflowEvent::ShortageUpdated { part_number, state }) => {
                info!(%part_number, state = state.label(), "shortage updated");
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "workflow events dropped"),
            Err(RecvError::Closed) => break,
        }
    }
}
