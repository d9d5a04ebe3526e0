//! `incident-guard` command line
//!
//! Runs one mutation or lookup against a memory store seeded from JSON and
//! prints the outcome or the rejection. Exit code 1 means rejected.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use incident_guard::prelude::*;
use incident_guard::telemetry::init_tracing;
use incident_store::Record;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::new("incident-guard")
        .version(incident_guard::VERSION)
        .about("Guarded incident mutations and admin customer lookup")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Guard configuration (TOML)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("mutate")
                .about("Run one mutation request against a seeded store")
                .arg(seed_arg())
                .arg(
                    Arg::new("request")
                        .long("request")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Mutation request (JSON)"),
                ),
        )
        .subcommand(
            Command::new("lookup")
                .about("Look up a customer through the admin gateway")
                .arg(seed_arg())
                .arg(
                    Arg::new("customer-id")
                        .long("customer-id")
                        .required(true)
                        .help("Customer identifier, passed through verbatim"),
                )
                .arg(
                    Arg::new("admin")
                        .long("admin")
                        .action(ArgAction::SetTrue)
                        .help("Issue the lookup as an administrator"),
                ),
        )
}

fn seed_arg() -> Arg {
    Arg::new("seed")
        .long("seed")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Seed data: JSON object of entity name to rows")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    init_tracing(matches.get_flag("json-logs")).context("failed to install tracing subscriber")?;

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => GuardConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GuardConfig::default(),
    };

    let passed = match matches.subcommand() {
        Some(("mutate", args)) => mutate(&config, args).await?,
        Some(("lookup", args)) => lookup(&config, args).await?,
        _ => anyhow::bail!("unknown subcommand"),
    };

    std::process::exit(if passed { 0 } else { 1 });
}

async fn mutate(config: &GuardConfig, args: &ArgMatches) -> Result<bool> {
    let store = seeded_store(config, required_path(args, "seed")?)?;
    let request_path = required_path(args, "request")?;
    let text = std::fs::read_to_string(request_path)
        .with_context(|| format!("failed to read request {}", request_path.display()))?;
    let request: MutationRequest =
        serde_json::from_str(&text).context("request is not a valid mutation")?;

    let services = compose(config, store, Arc::new(TracingSink));
    report(services.incidents.handle(request).await)
}

async fn lookup(config: &GuardConfig, args: &ArgMatches) -> Result<bool> {
    let store = seeded_store(config, required_path(args, "seed")?)?;
    let customer_id = args
        .get_one::<String>("customer-id")
        .context("missing --customer-id")?;

    let mut request = LookupRequest::new(customer_id.as_str());
    if args.get_flag("admin") {
        request = request.with_requester(Requester::admin("cli"));
    }

    let services = compose(config, store, Arc::new(TracingSink));
    report(services.admin.handle(&request).await)
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing --{name}"))
}

fn seeded_store(config: &GuardConfig, path: &Path) -> Result<Arc<dyn RecordStore>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed {}", path.display()))?;
    let seed: BTreeMap<String, Vec<Record>> =
        serde_json::from_str(&text).context("seed must map entity names to row arrays")?;

    let store = MemoryStore::with_entities([&config.incident_entity, &config.customer_entity]);
    for (entity, rows) in seed {
        tracing::debug!(%entity, rows = rows.len(), "seeding entity");
        store.seed(entity, rows);
    }
    Ok(Arc::new(store))
}

fn report<T: Serialize>(result: Result<T, Rejection>) -> Result<bool> {
    let (json, passed) = match result {
        Ok(value) => (serde_json::to_string_pretty(&value)?, true),
        Err(rejection) => (serde_json::to_string_pretty(&rejection)?, false),
    };
    println!("{json}");
    Ok(passed)
}
