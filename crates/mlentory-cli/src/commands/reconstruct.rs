//! `mlentory reconstruct`: `Reconstruct(model_uri, t)` against the Neo4j
//! temporal metadata graph (§4.7, §4.10).

use crate::output::print_info;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use mlentory_core::config::StoreSecrets;
use mlentory_core::temporal::reconstruct as reconstruct_snapshots;
use mlentory_neo4j::Neo4jStore;
use mlentory_neo4j::Neo4jTemporalStore;
use mlentory_core::temporal::TemporalStore;

#[derive(Args, Debug)]
pub struct ReconstructArgs {
    /// The model's MLentory IRI (or any IRI the temporal graph knows it by).
    pub model_uri: String,

    /// RFC3339 timestamp to reconstruct the model's metadata at.
    pub at: String,

    /// Print the raw predicate -> values map as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ReconstructArgs) -> Result<()> {
    let at = DateTime::parse_from_rfc3339(&args.at)
        .context("parsing --at as an RFC3339 timestamp")?
        .with_timezone(&Utc);

    let secrets = StoreSecrets::from_env().context("resolving store credentials")?;
    let store = Neo4jStore::connect(&secrets.neo4j_uri, &secrets.neo4j_user, &secrets.neo4j_password)
        .await
        .context("connecting to Neo4j")?;
    let temporal_store = Neo4jTemporalStore::new(store);

    print_info(&format!("reconstructing {} at {}", args.model_uri, at.to_rfc3339()));
    let snapshots = temporal_store
        .all_snapshots(&args.model_uri)
        .await
        .context("loading snapshots")?;
    let state = reconstruct_snapshots(&snapshots, at);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let mut table = comfy_table::Table::new();
    table.set_header(vec!["predicate", "values"]);
    for (predicate, values) in &state {
        table.add_row(vec![predicate.clone(), values.join(", ")]);
    }
    println!("{table}");
    Ok(())
}
