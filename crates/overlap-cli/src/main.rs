use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use overlap_core::{
    Aggregate, DocumentStore, Metric, OverlapParams, DEFAULT_FRAGMENT_THRESHOLD,
    DEFAULT_PAGE_THRESHOLD,
};
use overlap_local::run::{self, Sources, DEFAULT_MAX_DOCS};
use overlap_local::{FileStore, Format, Report, TypesenseStore};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "overlap")]
#[command(about = "Find duplicated and near-duplicated content across two sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare fragments (heading + content blocks) of two sites.
    Fragments(FragmentsCmd),
    /// Compare whole pages of two sites.
    Pages(PagesCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Title,
    Content,
    Link,
    Embedding,
    Tags,
    Combined,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Title => Metric::Title,
            MetricArg::Content => Metric::Content,
            MetricArg::Link => Metric::Link,
            MetricArg::Embedding => Metric::Embedding,
            MetricArg::Tags => Metric::Tags,
            MetricArg::Combined => Metric::Combined,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AggregateArg {
    Flat,
    Page,
}

impl From<AggregateArg> for Aggregate {
    fn from(a: AggregateArg) -> Self {
        match a {
            AggregateArg::Flat => Aggregate::Flat,
            AggregateArg::Page => Aggregate::Page,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for Format {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Json => Format::Json,
            FormatArg::Csv => Format::Csv,
        }
    }
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Hostname suffix selecting site A (e.g. `servicesaustralia.gov.au`).
    #[arg(long)]
    site_a: String,
    /// Hostname suffix selecting site B.
    #[arg(long)]
    site_b: String,
    /// Minimum fused score kept (clamped to 0..=1). Default: 0.55 for fragments, 0.4 for pages.
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f64>,
    /// Maximum pairs returned (clamped to 1..=50000).
    #[arg(long, default_value_t = 2000)]
    max_pairs: usize,
    #[arg(long, value_enum, default_value_t = MetricArg::Combined)]
    metric: MetricArg,
    /// Drop documents whose title is boilerplate ("Overview", "Contact us", ...).
    #[arg(long)]
    ignore_generic: bool,
    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,
    /// Write the report here instead of stdout (parent dirs are created).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    /// Search service base URL.
    #[arg(long, env = "OVERLAP_TYPESENSE_URL")]
    typesense_url: Option<String>,
    #[arg(long, env = "OVERLAP_TYPESENSE_API_KEY", hide_env_values = true)]
    typesense_api_key: Option<String>,
    /// Field passed as `query_by` on match-all queries.
    #[arg(long, env = "OVERLAP_TYPESENSE_QUERY_BY", default_value = "title")]
    query_by: String,
    /// Per-collection load cap (clamped to 1..=200000).
    #[arg(long, default_value_t = DEFAULT_MAX_DOCS)]
    max_docs: usize,
    #[arg(long, default_value = "fragments")]
    fragments_collection: String,
    /// Separate fragment collection holding site B.
    #[arg(long)]
    site_b_collection: Option<String>,
    /// Read fragments from a dump file (JSON array or JSON Lines) instead of the search service.
    #[arg(long)]
    fragments_file: Option<PathBuf>,
    /// Dump file holding site B's fragments.
    #[arg(long)]
    site_b_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct FragmentsCmd {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// `flat` lists fragment pairs; `page` rolls them up per page pair with coverage.
    #[arg(long, value_enum, default_value_t = AggregateArg::Flat)]
    aggregate: AggregateArg,
}

#[derive(clap::Args, Debug)]
struct PagesCmd {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    store: StoreArgs,
    /// Precomputed page collection; empty or missing falls back to fragments.
    #[arg(long, default_value = "pages")]
    pages_collection: String,
    /// Read precomputed pages from a dump file.
    #[arg(long)]
    pages_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", default_value = "json")]
    output: String,
}

/// Name a separately supplied site B dump is registered under.
const SITE_B_FILE_COLLECTION: &str = "site_b";

fn load_env_file() {
    // Opt-in; never overrides the process environment and never logs values.
    let Ok(p) = std::env::var("OVERLAP_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("overlap=info"));
    // stdout carries the report.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn params(common: &CommonArgs, aggregate: Aggregate, default_threshold: f64) -> OverlapParams {
    OverlapParams {
        site_a: common.site_a.clone(),
        site_b: common.site_b.clone(),
        threshold: common.threshold.unwrap_or(default_threshold),
        max_pairs: common.max_pairs,
        metric: common.metric.into(),
        ignore_generic: common.ignore_generic,
        aggregate,
    }
}

/// Dump files win over the search service; any `--*-file` flag switches stores.
fn open_store(
    store: &StoreArgs,
    pages: Option<(&str, Option<&Path>)>,
) -> Result<(Box<dyn DocumentStore>, Sources)> {
    let mut sources = Sources {
        fragments: store.fragments_collection.clone(),
        fragments_b: store.site_b_collection.clone(),
        pages: pages.map(|(c, _)| c.to_string()),
        max_docs: store.max_docs,
    };

    let pages_file = pages.and_then(|(_, f)| f);
    let any_file =
        store.fragments_file.is_some() || store.site_b_file.is_some() || pages_file.is_some();
    if any_file {
        let mut fs = FileStore::new();
        if let Some(p) = &store.fragments_file {
            fs = fs.with_file(&sources.fragments, p)?;
        }
        if let Some(p) = &store.site_b_file {
            let coll = sources
                .fragments_b
                .get_or_insert_with(|| SITE_B_FILE_COLLECTION.to_string())
                .clone();
            fs = fs.with_file(&coll, p)?;
        }
        if let (Some(p), Some(coll)) = (pages_file, sources.pages.as_deref()) {
            fs = fs.with_file(coll, p)?;
        }
        return Ok((Box::new(fs), sources));
    }

    let url = store.typesense_url.as_deref().context(
        "no store configured: pass --fragments-file, or --typesense-url (OVERLAP_TYPESENSE_URL)",
    )?;
    let key = store
        .typesense_api_key
        .as_deref()
        .context("missing --typesense-api-key (OVERLAP_TYPESENSE_API_KEY)")?;
    let ts = TypesenseStore::new(url, key)?.with_query_by(&store.query_by);
    Ok((Box::new(ts), sources))
}

fn emit(report: &Report, common: &CommonArgs) -> Result<()> {
    let body = overlap_local::render::render(report, common.format.into())?;
    match &common.out {
        Some(out) => {
            if let Some(p) = out.parent() {
                if !p.as_os_str().is_empty() {
                    std::fs::create_dir_all(p)?;
                }
            }
            let mut body = body;
            if !body.ends_with('\n') {
                body.push('\n');
            }
            std::fs::write(out, body).with_context(|| format!("write {}", out.display()))?;
            tracing::info!(path = %out.display(), "wrote report");
            println!("{}", out.display());
        }
        None => println!("{}", body.trim_end()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fragments(args) => {
            let params = params(&args.common, args.aggregate.into(), DEFAULT_FRAGMENT_THRESHOLD);
            let (store, sources) = open_store(&args.store, None)?;
            let report = run::fragment_overlap(store.as_ref(), params, &sources).await?;
            emit(&report, &args.common)?;
        }
        Commands::Pages(args) => {
            let params = params(&args.common, Aggregate::Flat, DEFAULT_PAGE_THRESHOLD);
            let (store, sources) = open_store(
                &args.store,
                Some((args.pages_collection.as_str(), args.pages_file.as_deref())),
            )?;
            let report = run::page_overlap(store.as_ref(), params, &sources).await?;
            emit(&report, &args.common)?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": overlap_local::render::SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "overlap",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("overlap {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }

    Ok(())
}
