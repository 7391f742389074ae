use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use capability_router::config::TopologyFile;
use capability_router::scheduler::job::JobProperties;
use capability_router::scheduler::{ResolverSnapshot, Routing, TopologyTracker};
use capability_router::shutdown::install_shutdown_handler;
use capability_router::topology::{event_channel, ClusterView, TopologyEvent};

#[derive(Parser, Debug)]
#[command(name = "capability-router")]
#[command(version)]
#[command(about = "Inspect capability-based job routing for a cluster topology")]
#[command(propagate_version = true)]
struct Args {
    /// Topology file (JSON): local instance, members, job manager and queue settings
    #[arg(long, short = 'f', global = true, default_value = "topology.json")]
    file: PathBuf,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List the instances able to consume a topic
    Targets {
        /// Job topic (e.g., "jobs/index/full")
        topic: String,
    },

    /// Route jobs for a topic and show the chosen targets
    Resolve {
        /// Job topic (e.g., "jobs/index/full")
        topic: String,

        /// Number of jobs to route (shows round robin for unordered queues)
        #[arg(long, short = 'n', default_value = "1")]
        count: usize,

        /// Instance the jobs were created on (defaults to the local instance)
        #[arg(long)]
        created_on: Option<String>,
    },

    /// Show the capability index of the topology
    Capabilities,

    /// Watch the topology file and rebuild routing whenever it changes
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,
    },
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct TargetsOutput {
    topic: String,
    local_instance: String,
    targets: Vec<String>,
}

#[derive(Serialize)]
struct ResolvedJob {
    #[serde(flatten)]
    routing: Routing,
    properties: JobProperties,
}

#[derive(Serialize)]
struct ResolveOutput {
    topic: String,
    jobs: Vec<ResolvedJob>,
}

#[derive(Serialize)]
struct CapabilitiesOutput {
    local_instance: String,
    leader: bool,
    patterns: BTreeMap<String, Vec<String>>,
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Load the topology file and build a tracker with its initial snapshot.
async fn load_tracker(
    path: &Path,
) -> Result<(TopologyTracker, Arc<ResolverSnapshot>), Box<dyn std::error::Error>> {
    let file = TopologyFile::load(path).await?;
    let view = ClusterView::from_description(file.view)?;
    let tracker = TopologyTracker::from_config(&file.config);
    tracker.handle_event(TopologyEvent::Init(Arc::new(view)));
    let snapshot = tracker.current().ok_or("topology snapshot was not built")?;
    Ok((tracker, snapshot))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

async fn run_targets(
    path: &Path,
    topic: String,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_tracker, snapshot) = load_tracker(path).await?;
    let out = TargetsOutput {
        targets: snapshot.potential_targets(&topic),
        local_instance: snapshot.local_instance_id().to_string(),
        topic,
    };

    match output {
        OutputFormat::Json => print_json(&out)?,
        OutputFormat::Table => {
            println!("Topic: {} (resolved on {})", out.topic, out.local_instance);
            if out.targets.is_empty() {
                println!("No instance announces this topic.");
            } else {
                for (pos, target) in out.targets.iter().enumerate() {
                    println!("{:>4}  {}", pos + 1, target);
                }
            }
        }
    }
    Ok(())
}

async fn run_resolve(
    path: &Path,
    topic: String,
    count: usize,
    created_on: Option<String>,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tracker, _snapshot) = load_tracker(path).await?;
    let properties = match created_on {
        Some(id) => JobProperties::new().with_created_instance(id),
        None => JobProperties::new(),
    };

    let jobs: Vec<ResolvedJob> = (0..count)
        .map(|_| {
            let mut properties = properties.clone();
            let routing = tracker.assign(&topic, &mut properties);
            ResolvedJob {
                routing,
                properties,
            }
        })
        .collect();

    match output {
        OutputFormat::Json => print_json(&ResolveOutput { topic, jobs })?,
        OutputFormat::Table => {
            println!("{:<6} {:<24} {:<18} TARGET", "JOB", "QUEUE", "TYPE");
            println!("{}", "-".repeat(70));
            for (pos, ResolvedJob { routing, .. }) in jobs.iter().enumerate() {
                let target = match (&routing.target, routing.drop) {
                    (_, true) => "<dropped>".to_string(),
                    (Some(target), false) => target.clone(),
                    (None, false) => "<none>".to_string(),
                };
                println!(
                    "{:<6} {:<24} {:<18} {}",
                    pos + 1,
                    routing.queue_name,
                    routing.queue_type.to_string(),
                    target
                );
            }
        }
    }
    Ok(())
}

async fn run_capabilities(
    path: &Path,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_tracker, snapshot) = load_tracker(path).await?;
    let out = CapabilitiesOutput {
        local_instance: snapshot.local_instance_id().to_string(),
        leader: snapshot.is_leader(),
        patterns: snapshot.instance_capabilities(),
    };

    match output {
        OutputFormat::Json => print_json(&out)?,
        OutputFormat::Table => {
            println!(
                "Local instance: {}{}",
                out.local_instance,
                if out.leader { " (leader)" } else { "" }
            );
            println!();
            println!("{:<40} INSTANCES", "PATTERN");
            println!("{}", "-".repeat(70));
            for (pattern, instances) in &out.patterns {
                println!("{:<40} {}", pattern, instances.join(", "));
            }
        }
    }
    Ok(())
}

/// Poll the topology file and feed changes to a tracker until SIGINT/SIGTERM.
///
/// A change of the member set is published as `Changing` + `Changed`; a
/// change limited to member properties as `PropertiesChanged`.
async fn run_watch(path: PathBuf, interval_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = install_shutdown_handler()?;

    let mut last = TopologyFile::load(&path).await?;
    let tracker = Arc::new(TopologyTracker::from_config(&last.config));
    let (sender, events) = event_channel(16);

    let tracker_task = {
        let tracker = tracker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { tracker.run(events, shutdown).await })
    };

    let mut current_view = Arc::new(ClusterView::from_description(last.view.clone())?);
    sender
        .send(TopologyEvent::Init(current_view.clone()))
        .await?;
    tracing::info!(path = %path.display(), "Watching topology file");

    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let next = match TopologyFile::load(&path).await {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to reload topology file");
                        continue;
                    }
                };
                if next == last {
                    continue;
                }
                if next.config != last.config {
                    tracing::warn!("Router configuration changed, restart to apply it");
                }

                let view = match ClusterView::from_description(next.view.clone()) {
                    Ok(view) => Arc::new(view),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring invalid topology");
                        continue;
                    }
                };

                let membership_changed = next.view.local != last.view.local
                    || next.view.instance_ids() != last.view.instance_ids();
                current_view.invalidate();
                if membership_changed {
                    sender.send(TopologyEvent::Changing).await?;
                    sender.send(TopologyEvent::Changed(view.clone())).await?;
                } else {
                    sender.send(TopologyEvent::PropertiesChanged(view.clone())).await?;
                }

                current_view = view;
                last = next;
            }
        }
    }

    drop(sender);
    tracker_task.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so table/json output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Targets { topic } => run_targets(&args.file, topic, &args.output).await,
        Commands::Resolve {
            topic,
            count,
            created_on,
        } => run_resolve(&args.file, topic, count, created_on, &args.output).await,
        Commands::Capabilities => run_capabilities(&args.file, &args.output).await,
        Commands::Watch { interval_ms } => run_watch(args.file, interval_ms).await,
    }
}
