//! Civ Atlas - Headless inspection CLI
//!
//! Loads or generates a population into an in-memory atlas, runs one
//! command against it, and prints the result as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use civ_atlas::civilization::{CivilizationDraft, CivilizationRecord};
use civ_atlas::core::config::AtlasConfig;
use civ_atlas::core::error::{AtlasError, Result};
use civ_atlas::query::SearchRequest;
use civ_atlas::{seed, Atlas};

/// Civ Atlas - explore civilization attribute space
#[derive(Parser, Debug)]
#[command(name = "civ-atlas")]
#[command(about = "Query, compare, and aggregate civilization records")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate this many sample civilizations
    #[arg(long, default_value_t = 200, conflicts_with = "load")]
    generate: usize,

    /// Seed for generated civilizations
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// JSON file containing an array of civilization drafts
    #[arg(long)]
    load: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the attribute catalog
    Attributes,
    /// Population-wide histograms
    Stats,
    /// Value distribution of one attribute
    Distribution { attribute: String },
    /// Faceted search
    Search {
        /// Facet as attribute=value1,value2 (repeatable)
        #[arg(long = "facet")]
        facets: Vec<String>,
        /// Case-insensitive text to find in name or description
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Civilizations most similar to the named one
    Similar {
        name: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        #[arg(long)]
        min: Option<f64>,
    },
    /// Attribute-by-attribute comparison of two civilizations
    Compare { left: String, right: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_facet(raw: &str) -> Result<(String, Vec<String>)> {
    let (attribute, values) = raw
        .split_once('=')
        .ok_or_else(|| AtlasError::invalid_argument("facet", format!("expected attribute=values, got `{}`", raw)))?;
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((attribute.trim().to_string(), values))
}

async fn populate(atlas: &Atlas, args: &Args) -> Result<usize> {
    let drafts: Vec<CivilizationDraft> = match &args.load {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => seed::generate_drafts(args.seed, args.generate),
    };
    for draft in &drafts {
        atlas.civilizations().create(draft).await?;
    }
    Ok(drafts.len())
}

async fn find_by_name(atlas: &Atlas, name: &str) -> Result<CivilizationRecord> {
    let page = atlas
        .query()
        .search(&SearchRequest::new().text(name).page_size(atlas.config().max_page_size))
        .await?;
    page.items
        .into_iter()
        .find(|record| record.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| AtlasError::not_found("civilization", name))
}

async fn run(args: Args) -> Result<()> {
    let config = AtlasConfig::load(args.config.as_deref())?;
    let atlas = Atlas::in_memory(config)?;

    let loaded = populate(&atlas, &args).await?;
    tracing::info!(civilizations = loaded, "population ready");

    match &args.command {
        Command::Attributes => print_json(&atlas.registry().catalog()),
        Command::Stats => print_json(&atlas.analytics().statistics().await?),
        Command::Distribution { attribute } => {
            print_json(&atlas.analytics().distribution(attribute).await?)
        }
        Command::Search {
            facets,
            text,
            tag,
            page,
            page_size,
        } => {
            let mut request = SearchRequest::new().page(*page);
            for raw in facets {
                let (attribute, values) = parse_facet(raw)?;
                request = request.facet(attribute, values);
            }
            request.free_text = text.clone();
            request.tag = tag.clone();
            request.page_size = *page_size;
            print_json(&atlas.query().search(&request).await?)
        }
        Command::Similar { name, top_k, min } => {
            let record = find_by_name(&atlas, name).await?;
            print_json(&atlas.similarity().find_similar(record.id, *top_k, *min).await?)
        }
        Command::Compare { left, right } => {
            let left = find_by_name(&atlas, left).await?;
            let right = find_by_name(&atlas, right).await?;
            print_json(&atlas.similarity().compare(left.id, right.id).await?)
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("civ_atlas=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
