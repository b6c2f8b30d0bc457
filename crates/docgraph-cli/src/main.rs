use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use docgraph_core::{
    Clock, ContentGroup, ContentGroups, DocumentGraph, GraphError, ManualClock,
    MemoryStore, Name, SystemClock, Tables, DETAILS, NODE_LABEL, SYSTEM, TITLE, TYPE,
};
use docgraph_governance::labels::{
    EDIT_TYPE, ORIGINAL_DOCUMENT_KEY, SCHEDULE_KEY, TIMESHARE_TYPE, TIME_SHARE_KEY,
    TIME_SHARE_START_DATE_KEY,
};
use docgraph_governance::{Dao, DaoConfig, MemoryBallotBox, TimeShare, Vote};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ALICE: Name = Name::from_static("alice");
const BOB: Name = Name::from_static("bob");

fn cli() -> Command {
    let store = Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Snapshot file");
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("DAO configuration (TOML)");

    Command::new("docgraph")
        .version(docgraph_core::VERSION)
        .about("Content-addressed document graph with governance proposals")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("init")
                .about("Create a store with its root document")
                .arg(store.clone())
                .arg(config.clone()),
        )
        .subcommand(
            Command::new("demo")
                .about("Run an edit and a time-share proposal end to end")
                .arg(store.clone())
                .arg(config),
        )
        .subcommand(
            Command::new("show")
                .about("Print documents and edges")
                .arg(store)
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the raw snapshot"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("init", args)) => init(args),
        Some(("demo", args)) => demo(args),
        Some(("show", args)) => show(args),
        _ => Err(anyhow!("unknown subcommand")),
    }
}

fn store_path(args: &ArgMatches) -> Result<&PathBuf> {
    args.get_one::<PathBuf>("store")
        .ok_or_else(|| anyhow!("--store is required"))
}

fn load_config(args: &ArgMatches) -> Result<DaoConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => DaoConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(DaoConfig::default()),
    }
}

/// Existing snapshot, or an empty store if the file does not exist yet
fn open_store(path: &Path, clock: Arc<dyn Clock>) -> Result<MemoryStore> {
    if path.exists() {
        MemoryStore::load(path, clock).with_context(|| format!("loading {}", path.display()))
    } else {
        Ok(MemoryStore::with_clock(clock))
    }
}

fn init(args: &ArgMatches) -> Result<()> {
    let path = store_path(args)?;
    let config = load_config(args)?;
    let dao = Dao::open(
        open_store(path, Arc::new(SystemClock))?,
        MemoryBallotBox::new(),
        config,
    )?;
    dao.store().save(path)?;
    println!("root {}", dao.root());
    Ok(())
}

fn demo(args: &ArgMatches) -> Result<()> {
    let path = store_path(args)?;
    let config = load_config(args)?;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let dao = Dao::open(open_store(path, clock.clone())?, MemoryBallotBox::new(), config)?;

    for member in [&ALICE, &BOB] {
        if dao.member(member)?.is_none() {
            dao.enroll(member)?;
        }
    }
    // keeps reruns from colliding with documents of earlier runs
    let run = clock.now().to_rfc3339();

    let role = ContentGroups::from(vec![
        ContentGroup::labeled(DETAILS)
            .with(TITLE, "Treasurer")
            .with("seats", 1i64)
            .with("run", run.as_str()),
        ContentGroup::labeled(SYSTEM)
            .with(TYPE, Name::from_static("role"))
            .with(NODE_LABEL, "Treasurer"),
    ]);
    let role = dao.store().transaction(|tx| {
        let doc = DocumentGraph::new(tx).get_or_create_document(BOB, role)?;
        Ok::<_, GraphError>(*doc.hash())
    })?;

    let edit = dao.propose(
        &ALICE,
        &EDIT_TYPE,
        ContentGroups::from(vec![ContentGroup::labeled(DETAILS)
            .with(TITLE, "Two treasurers")
            .with("seats", 2i64)
            .with(ORIGINAL_DOCUMENT_KEY, role)]),
    )?;
    dao.vote(&ALICE, &edit, Vote::Pass, 2)?;
    dao.vote(&BOB, &edit, Vote::Fail, 1)?;

    let head = dao.store().transaction(|tx| {
        TimeShare::new(&mut DocumentGraph::new(tx), ALICE, 100, clock.now())
    })?;
    let schedule = dao.propose(
        &BOB,
        &TIMESHARE_TYPE,
        ContentGroups::from(vec![ContentGroup::labeled(DETAILS)
            .with(TITLE, "Half time")
            .with(TIME_SHARE_KEY, 50i64)
            .with(TIME_SHARE_START_DATE_KEY, clock.now() + chrono::Duration::days(30))
            .with(SCHEDULE_KEY, *head.hash())
            .with("run", run.as_str())]),
    )?;
    dao.vote(&BOB, &schedule, Vote::Pass, 1)?;

    clock.advance(dao.config().voting_period());
    for proposal in [edit, schedule] {
        let state = dao.close(&ALICE, &proposal)?;
        println!("proposal {} {state}", proposal.short());
    }

    let links = dao.store().read(|t| head.chain(t))?;
    for link in &links {
        println!(
            "time share {} share={} start={}",
            link.hash().short(),
            link.share(),
            link.start_date()
        );
    }

    dao.store().save(path)?;
    info!(path = %path.display(), "demo saved");
    Ok(())
}

fn show(args: &ArgMatches) -> Result<()> {
    let path = store_path(args)?;
    let store = MemoryStore::load(path, Arc::new(SystemClock))
        .with_context(|| format!("loading {}", path.display()))?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
        return Ok(());
    }
    store.read(print_tables);
    Ok(())
}

fn print_tables(tables: &Tables) {
    println!("documents ({})", tables.document_count());
    for doc in tables.documents() {
        let kind = doc
            .document_type()
            .map_or_else(|_| "-".to_string(), |t| t.to_string());
        let label = doc
            .content()
            .get_as::<String>(SYSTEM, NODE_LABEL)
            .or_else(|_| doc.content().get_as::<String>(DETAILS, TITLE))
            .unwrap_or_default();
        println!(
            "  {} {:<10} {:<8} {}",
            doc.hash().short(),
            kind,
            doc.creator().as_str(),
            label
        );
    }
    println!("edges ({})", tables.edge_count());
    for edge in tables.edges() {
        println!(
            "  {} --{}--> {}",
            edge.from_node().short(),
            edge.label(),
            edge.to_node().short()
        );
    }
}
