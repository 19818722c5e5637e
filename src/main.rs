use region_sweep::aggregator::aggregator::Aggregator;
use region_sweep::aggregator::types::Strategy;
use region_sweep::bench::measure;
use region_sweep::config::{SweepConfig, parse_millis};
use region_sweep::partition::filter::FilterPredicate;
use region_sweep::partition::types::PartitionId;
use region_sweep::server;
use region_sweep::source::http::HttpSource;
use region_sweep::source::memory::InMemorySource;
use region_sweep::source::retry::Retrying;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

const PROGRAM: &str = "region-sweep";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("run") => run_command(&args[2..]).await,
        Some("serve") => serve_command(&args[2..]).await,
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: {} run [options]", PROGRAM);
    eprintln!("       {} serve --bind <addr:port> --fixtures <path>", PROGRAM);
    eprintln!();
    eprintln!("run options:");
    eprintln!("  --endpoint <url>        partition service base URL");
    eprintln!("  --home <partition>      partition used to discover the others");
    eprintln!("  --jitter-ms <n>         upper bound of the per-task jitter");
    eprintln!("  --strategy <name>       sequential | fan-out | group | all (default: all)");
    eprintln!("  --filter <name=v1,v2>   extra filter predicate, repeatable");
    eprintln!();
    eprintln!(
        "Example: {} run --endpoint http://127.0.0.1:7000 --strategy group --filter tag:Name=web",
        PROGRAM
    );
}

async fn run_command(args: &[String]) -> anyhow::Result<()> {
    let mut config = SweepConfig::from_env()?;
    let mut strategies: Vec<Strategy> = Strategy::ALL.to_vec();
    let mut extra: Vec<FilterPredicate> = vec![];

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--endpoint", Some(v)) => config.endpoint = v.clone(),
            ("--home", Some(v)) => config.home_partition = PartitionId::new(v.clone()),
            ("--jitter-ms", Some(v)) => config.jitter_max = parse_millis("--jitter-ms", v)?,
            ("--strategy", Some(v)) if v == "all" => strategies = Strategy::ALL.to_vec(),
            ("--strategy", Some(v)) => {
                strategies = vec![v.parse().map_err(|e: String| anyhow::anyhow!(e))?];
            }
            ("--filter", Some(v)) => {
                let predicate = FilterPredicate::parse(v)
                    .with_context(|| format!("invalid filter {:?}, expected name=v1,v2", v))?;
                extra.push(predicate);
            }
            (flag, _) => {
                eprintln!("Unknown or incomplete option: {}", flag);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 2;
    }

    tracing::info!(
        "Sweeping through {} via {} (jitter up to {:?})",
        config.home_partition,
        config.endpoint,
        config.jitter_max
    );

    let source = Arc::new(Retrying::new(
        HttpSource::new(&config.endpoint, config.request_timeout),
        config.retry.clone(),
    ));
    let aggregator = Aggregator::new(source.clone(), source, config.aggregator());

    for strategy in strategies {
        let (report, outcome) = measure(&aggregator, strategy, extra.clone()).await;

        let records = match outcome {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("{} failed: {}", strategy, e);
                eprintln!("[{}] {}", PROGRAM, e);
                std::process::exit(1);
            }
        };

        println!("{}", report);
        println!("{}", serde_json::to_string_pretty(&records)?);
        println!();
    }

    Ok(())
}

async fn serve_command(args: &[String]) -> anyhow::Result<()> {
    let mut bind_addr: Option<SocketAddr> = None;
    let mut fixtures: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match (args[i].as_str(), args.get(i + 1)) {
            ("--bind", Some(v)) => bind_addr = Some(v.parse()?),
            ("--fixtures", Some(v)) => fixtures = Some(v.clone()),
            (flag, _) => {
                eprintln!("Unknown or incomplete option: {}", flag);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 2;
    }

    let bind_addr = bind_addr.context("--bind is required")?;
    let fixtures = fixtures.context("--fixtures is required")?;

    let source = Arc::new(InMemorySource::load_fixture_file(&fixtures)?);
    tracing::info!("Press Ctrl+C to shutdown");
    server::serve(bind_addr, source).await
}
