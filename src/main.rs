//! # Symphony Console
//!
//! Terminal front end for the human-in-the-loop agent workflow service.
//!
//! This binary demonstrates:
//! - Periodic status polling with cancellation on shutdown
//! - Rendering a live agent graph in the terminal
//! - Answering an agent that is waiting for human feedback
//! - CLI design with clap subcommands
//! - Structured logging with tracing
//!
//! ## Quick Start
//! ```bash
//! cargo run -- watch nodes
//! ```

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use symphony_console::catalog::{Catalog, WorkflowDefinition};
use symphony_console::config::Config;
use symphony_console::detail::{NodeDetail, SubmitOutcome};
use symphony_console::graph::{self, select_node, GraphView, Navigation};
use symphony_console::notify::Notifier;
use symphony_console::poller::StatusPoller;
use symphony_console::trigger::{RunWorkflowTrigger, StartOutcome};
use symphony_console::view::{self, ViewState};
use symphony_console::SymphonyClient;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "symphony",
    version,
    about = "Watch and steer a human-in-the-loop multi-agent workflow",
    long_about = r#"
Symphony Console - a terminal view of your agent team.

It talks to a running orchestration service and lets you:
  1. Watch the agent graph update live
  2. Inspect a single agent node
  3. Answer an agent that is waiting for your feedback
  4. Start a new research run

EXAMPLES:
  # Watch the research workflow until Ctrl-C
  symphony watch nodes

  # Start a run with your own prompt
  symphony run --prompt "Find the lead developer of tokio"

  # Let the searcher agent continue
  symphony feedback 5 --value yes
"#
)]
struct Args {
    /// Base URL of the orchestration service (overrides SYMPHONY_API_URL)
    #[arg(long = "api-url", env = "SYMPHONY_API_URL", global = true)]
    api_url: Option<String>,

    /// JSON workflow catalog (overrides SYMPHONY_CATALOG)
    #[arg(long = "catalog", env = "SYMPHONY_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose/debug logging",
        default_value = "false",
        global = true
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available workflows
    Workflows,

    /// Poll the workflow status and redraw the agent graph
    Watch {
        /// Workflow id or route slug
        #[arg(default_value = "nodes")]
        workflow: String,

        /// Stop after this many polls
        #[arg(long)]
        ticks: Option<u64>,

        /// Print the graph as a Mermaid flowchart instead of text
        #[arg(long)]
        mermaid: bool,

        /// Follow one node: show its detail route and status under the graph
        #[arg(long, value_name = "NODE_ID")]
        select: Option<String>,
    },

    /// Show the details of one agent node
    Node {
        /// Node id
        id: String,
    },

    /// Answer an agent that is waiting for human feedback
    Feedback {
        /// Node id of the waiting agent
        id: String,

        /// Feedback value
        #[arg(long, default_value = symphony_console::detail::DEFAULT_FEEDBACK)]
        value: String,
    },

    /// Start a new workflow run
    Run {
        /// Research prompt
        #[arg(long)]
        prompt: Option<String>,
    },
}

/// Everything a command needs, built once at start-up.
struct Console {
    config: Config,
    client: SymphonyClient,
    catalog: Catalog,
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    init_logging(&log_directive(args.verbose, &config.log_level))?;

    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(path) = args.catalog {
        config.catalog_path = Some(path);
    }
    config.validate()?;

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::builtin(),
    };
    let client = SymphonyClient::new(&config.api_url)?.with_timeout(config.request_timeout);

    info!(
        api_url = %config.api_url,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Configuration loaded"
    );

    let console = Console {
        config,
        client,
        catalog,
    };

    let result = match args.command {
        Command::Workflows => {
            list_workflows(&console.catalog);
            Ok(())
        }
        Command::Watch {
            workflow,
            ticks,
            mermaid,
            select,
        } => {
            let opts = WatchOptions {
                ticks,
                mermaid,
                select,
            };
            watch(&console, &workflow, &opts).await
        }
        Command::Node { id } => show_node(&console, &id).await,
        Command::Feedback { id, value } => send_feedback(&console, &id, value).await,
        Command::Run { prompt } => run_workflow(&console, prompt).await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
        if e.to_string().contains("Connection failed") {
            eprintln!("\nTip: make sure the orchestration service is running:");
            eprintln!("   uvicorn symphony_api:app --port 8000");
        }
    }

    result
}

// =============================================================================
// COMMANDS
// =============================================================================
fn list_workflows(catalog: &Catalog) {
    println!("{}", "Agent Workflows".bold());
    for workflow in &catalog.workflows {
        println!(
            "\n  {}  {}\n      {}\n      route: /{}  executions: {}  last run: {}",
            workflow.id,
            workflow.name.bold(),
            workflow.description.dimmed(),
            workflow.route_slug,
            workflow.execution_count,
            workflow.last_run.format("%Y-%m-%d %H:%M UTC"),
        );
    }
}

/// Options of the `watch` command.
struct WatchOptions {
    ticks: Option<u64>,
    mermaid: bool,
    select: Option<String>,
}

async fn watch(console: &Console, key: &str, opts: &WatchOptions) -> Result<()> {
    let workflow = console
        .catalog
        .workflow(key)
        .with_context(|| format!("Unknown workflow: {}", key))?;

    if let Some(id) = &opts.select {
        if !console.catalog.topology.contains(id) {
            anyhow::bail!("Node {} is not part of workflow {}", id, workflow.name);
        }
    }

    let (notifier, mut toasts) = Notifier::channel();
    let state = view::shared();
    let poller = StatusPoller::new(
        Arc::new(console.client.clone()),
        state.clone(),
        notifier,
        console.config.poll_interval,
    );

    // Show something before the first tick
    poller.refresh_now().await;
    let handle = poller.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping poller");
                break;
            }
            toast = toasts.recv() => {
                let Some(toast) = toast else { break };
                let snapshot = state.read().await.clone();
                redraw(console, workflow, &snapshot, opts);
                eprintln!("{}", toast);

                let finished = snapshot.completed_polls + snapshot.failed_polls;
                if opts.ticks.is_some_and(|limit| finished >= limit) {
                    break;
                }
            }
        }
    }

    handle.stop().await;
    Ok(())
}

fn redraw(console: &Console, workflow: &WorkflowDefinition, state: &ViewState, opts: &WatchOptions) {
    let graph_view = graph::present(&state.nodes, &console.catalog.topology);

    if opts.mermaid {
        println!("{}\n", graph::render_mermaid(&graph_view));
        return;
    }

    // Clear the screen and home the cursor
    print!("\x1B[2J\x1B[H");
    let status = if state.running {
        "Running".green().bold()
    } else {
        "Pending".normal()
    };
    println!("{} : {}   [{}]", "Workflow".bold(), workflow.name, status);
    println!("{}\n", workflow.description.dimmed());
    println!("{}", graph::render_text(&graph_view));

    if let Some(agent) = &state.current_agent {
        println!("Current agent: {}", agent);
    }
    if let Some(id) = &opts.select {
        println!("{}", selection_line(workflow, &graph_view, id));
    }
}

/// Footer for the followed node: where selecting it leads and how it is doing.
fn selection_line(workflow: &WorkflowDefinition, graph_view: &GraphView, id: &str) -> String {
    let Some(node) = graph_view.node(id) else {
        return format!("Selected: {} (no status yet)", id);
    };
    let route = match select_node(workflow, &node.id) {
        Navigation::To(route) => route,
        Navigation::Back => String::new(),
    };
    let duration = node.duration.as_deref().unwrap_or("-");
    format!("Selected: {} [{}] {} -> {}", node.label, node.status, duration, route)
}

async fn show_node(console: &Console, id: &str) -> Result<()> {
    let detail = NodeDetail::load(&console.client, id, &console.config.feedback_node_id).await?;
    let node = &detail.node;

    println!("{}", node.label.bold());
    println!("  id:       {}", node.id);
    println!("  kind:     {}", node.kind.as_str());
    println!("  status:   {}", node.status);
    if let Some(duration) = node.elapsed_seconds.and_then(graph::format_duration) {
        println!("  duration: {}", duration);
    }
    if let Some(calls) = node.call_count {
        println!("  calls:    {}", calls);
    }

    if detail.accepts_feedback {
        println!("\n{}", detail.question());
        println!("Answer with: symphony feedback {} --value <answer>", node.id);
    }

    Ok(())
}

async fn send_feedback(console: &Console, id: &str, value: String) -> Result<()> {
    let detail = NodeDetail::load(&console.client, id, &console.config.feedback_node_id).await?;

    let (notifier, mut toasts) = Notifier::channel();
    let mut form = detail
        .feedback_form(console.client.clone(), notifier)
        .with_context(|| format!("Node {} ({}) does not take feedback", id, detail.node.label))?;
    form.set_value(value);

    match form.submit().await {
        SubmitOutcome::Resolved(_) => {
            while let Ok(toast) = toasts.try_recv() {
                println!("{}", toast);
            }
            Ok(())
        }
        SubmitOutcome::Busy => anyhow::bail!("A feedback submission is already in flight"),
        SubmitOutcome::Failed(e) => Err(e).context("Failed to submit feedback"),
    }
}

async fn run_workflow(console: &Console, prompt: Option<String>) -> Result<()> {
    let (notifier, mut toasts) = Notifier::channel();
    let mut trigger = RunWorkflowTrigger::new(console.client.clone(), view::shared(), notifier);
    if let Some(prompt) = prompt {
        trigger.set_prompt(prompt);
    }

    trigger.open_dialog();
    println!("{}\n  {}\n", "What would you like to research today?".bold(), trigger.prompt());

    match trigger.start().await {
        StartOutcome::Started => {
            while let Ok(toast) = toasts.try_recv() {
                println!("{}", toast);
            }
            println!("Status: {}", trigger.status().await);
            Ok(())
        }
        StartOutcome::Busy => anyhow::bail!("A start request is already in flight"),
        StartOutcome::Failed(e) => Err(e).context("Failed to start workflow"),
    }
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Filter directive for the subscriber: `--verbose` forces DEBUG, otherwise
/// the configured level (`RUST_LOG`, default `info`) applies.
fn log_directive(verbose: bool, configured: &str) -> String {
    if verbose {
        Level::DEBUG.as_str().to_lowercase()
    } else {
        configured.to_string()
    }
}

/// Initialize the tracing subscriber for structured logging.
fn init_logging(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("Invalid log filter: {}", directive))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
