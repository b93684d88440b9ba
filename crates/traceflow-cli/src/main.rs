//! Traceflow CLI - offline analysis of message captures
//!
//! Replays a JSONL message capture through the correlation engine and renders
//! statistics, trace summaries, or the disconnected-component view.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;
use traceflow_core::{GraphConfig, Message};
use traceflow_correlate::{GraphBuilder, TimeFilter, TopicGraph};

#[derive(Parser)]
#[command(name = "traceflow")]
#[command(version)]
#[command(about = "Trace correlation and topic-flow analytics", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (json, text)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Path to the topic-graph configuration file
    #[arg(short, long, global = true, env = "TRACEFLOW_GRAPH")]
    graph: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recorded message capture
    Analyze {
        /// Input file (JSONL, one message per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis type (stats, traces, components)
        #[arg(short = 't', long, default_value = "stats")]
        analysis_type: String,

        /// Time filter for the components view
        /// (all, last_hour, last_30min, last_15min, last_5min, custom)
        #[arg(long, default_value = "all")]
        time_filter: String,

        /// Window in minutes when the time filter is "custom"
        #[arg(long)]
        custom_minutes: Option<i64>,
    },

    /// Show the flow of one trace through the topic graph
    Flow {
        /// Input file (JSONL, one message per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Trace id to inspect
        trace_id: String,
    },

    /// Show the configured topic graph
    Topics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let graph_path = cli
        .graph
        .clone()
        .context("no topic-graph configuration; pass --graph or set TRACEFLOW_GRAPH")?;
    let config = GraphConfig::load(&graph_path)
        .with_context(|| format!("failed to load topic graph from {}", graph_path.display()))?;

    let json = cli.format == "json";

    match cli.command {
        Commands::Analyze {
            input,
            analysis_type,
            time_filter,
            custom_minutes,
        } => {
            analyze_command(
                &config,
                &input,
                &analysis_type,
                &time_filter,
                custom_minutes,
                json,
            )
            .await
        }
        Commands::Flow { input, trace_id } => flow_command(&config, &input, &trace_id, json).await,
        Commands::Topics => topics_command(&config),
    }
}

/// Replay a JSONL capture into a fresh graph builder
async fn replay_capture(config: &GraphConfig, input: &Path) -> anyhow::Result<GraphBuilder> {
    let builder = GraphBuilder::new(config);

    let file = File::open(input)
        .with_context(|| format!("failed to open capture file {}", input.display()))?;
    let reader = BufReader::new(file);

    let mut skipped = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(&line) {
            Ok(message) => builder.add_message(message).await,
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped unparseable capture lines");
    }

    Ok(builder)
}

async fn analyze_command(
    config: &GraphConfig,
    input: &Path,
    analysis_type: &str,
    time_filter: &str,
    custom_minutes: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let builder = replay_capture(config, input).await?;

    match analysis_type {
        "stats" => {
            let report = builder.get_statistics().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("\n=== Topic Statistics ===\n");
            println!(
                "{} traces, {} messages\n",
                report.total_traces, report.total_messages
            );
            println!(
                "{:<24} {:>9} {:>8} {:>10} {:>10} {:>10}",
                "topic", "messages", "traces", "rate/min", "p50 ms", "p95 ms"
            );
            for stats in &report.topics {
                println!(
                    "{:<24} {:>9} {:>8} {:>10.2} {:>10.0} {:>10.0}",
                    stats.topic,
                    stats.message_count,
                    stats.trace_count,
                    stats.rate_total,
                    stats.age_p50_ms,
                    stats.age_p95_ms
                );
            }
        }
        "traces" => {
            let summary = builder.get_trace_summary().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("\n=== Traces ===\n");
            println!("{} traces in flight\n", summary.total_traces);
            for entry in &summary.traces {
                println!(
                    "{:<28} {:>5} msgs {:>3} topics {:>9} ms  [{}]",
                    entry.trace_id,
                    entry.message_count,
                    entry.topics.len(),
                    entry.duration_ms,
                    entry.topics.join(" -> ")
                );
            }
        }
        "components" => {
            let filter = TimeFilter::parse(time_filter);
            let data = builder.get_filtered_graph_data(filter, custom_minutes).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            println!("\n=== Disconnected Components ({}) ===\n", data.time_filter);
            for (i, component) in data.components.iter().enumerate() {
                println!(
                    "component {} ({} topics, {} messages, health {:.1}):",
                    i + 1,
                    component.topics.len(),
                    component.summary.total_messages,
                    component.summary.health_score
                );
                println!("  topics: {}", component.topics.join(", "));
                for edge in &component.edges {
                    println!(
                        "  {} -> {}  flows={} rate={:.2}/min",
                        edge.source, edge.destination, edge.flow_count, edge.message_rate
                    );
                }
            }
        }
        other => anyhow::bail!("unknown analysis type: {other} (expected stats, traces, components)"),
    }

    Ok(())
}

async fn flow_command(
    config: &GraphConfig,
    input: &Path,
    trace_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let builder = replay_capture(config, input).await?;

    let Some(flow) = builder.get_trace_flow_data(trace_id).await else {
        anyhow::bail!("trace not found: {trace_id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&flow)?);
        return Ok(());
    }

    println!("\n=== Trace {} ===\n", flow.trace_id);
    println!(
        "{} messages across {} topics in {} ms\n",
        flow.message_count, flow.topic_count, flow.duration_ms
    );
    for hop in &flow.hops {
        println!(
            "{:<24} {:>5} msgs  first {}  last {}",
            hop.topic,
            hop.message_count,
            hop.first_seen.to_rfc3339(),
            hop.last_seen.to_rfc3339()
        );
    }

    Ok(())
}

fn topics_command(config: &GraphConfig) -> anyhow::Result<()> {
    let graph = TopicGraph::from_config(config);

    println!("\n=== Topic Graph ===\n");
    println!("{} topics, {} edges\n", graph.all_topics().len(), graph.edges().len());
    for topic in graph.all_topics() {
        let destinations = graph.destinations(topic);
        if destinations.is_empty() {
            println!("{topic}");
        } else {
            println!("{topic} -> {}", destinations.join(", "));
        }
    }

    Ok(())
}
