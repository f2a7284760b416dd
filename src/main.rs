use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use atlas::clustering::{ClusterStrategy, HierarchyParams, PartitionParams};
use atlas::engine::{ClusterLayoutEngine, EngineConfig};
use atlas::layout::OverlapPolicy;
use atlas::logging::configure_logging;
use atlas::mst::MstSpace;
use atlas::output::{write_edge_table, write_point_table};
use atlas::providers::{InputRecord, JsonVectorProvider, LeadingAxesProjector};

#[derive(Parser)]
#[clap(name = "atlas", about = "Cluster layout engine for embedding maps")]
struct Cli {
    /// Delimited input file with a header row
    #[clap(short, long)]
    input: PathBuf,

    /// Field delimiter of the input file
    #[clap(long, default_value = "\t")]
    delimiter: char,

    /// Column holding the item label
    #[clap(long, default_value = "label")]
    label_column: String,

    /// Text columns, concatenated in order. With the default JSON
    /// embedding provider this is the column holding the vector.
    #[clap(long = "text-column", default_value = "embedding")]
    text_columns: Vec<String>,

    /// Column holding the raw popularity signal
    #[clap(long, default_value = "popularity")]
    popularity_column: String,

    /// Where to write the point table
    #[clap(long, default_value = "points.csv")]
    points_out: PathBuf,

    /// Where to write the MST edge table
    #[clap(long, default_value = "edges.csv")]
    edges_out: PathBuf,

    /// Use the flat k-means partition instead of the hierarchical tree
    #[clap(long)]
    flat: bool,

    /// Maximum cluster depth (hierarchical mode)
    #[clap(long, default_value = "2")]
    max_depth: usize,

    /// Minimum members per cluster
    #[clap(long, default_value = "10")]
    min_nodes: usize,

    /// Minimum cluster count (flat mode)
    #[clap(long, default_value = "7")]
    min_clusters: usize,

    /// Maximum cluster count (flat mode)
    #[clap(long, default_value = "50")]
    max_clusters: usize,

    /// Multiplier applied to raw projection coordinates
    #[clap(long, default_value = "500.0")]
    scale: f64,

    /// Space the per-cluster MSTs are computed in
    #[clap(long, value_enum, default_value = "embedding")]
    mst_space: MstSpaceArg,

    /// What to do with clusters that still overlap after relaxation
    #[clap(long, value_enum, default_value = "nudge")]
    overlap: OverlapArg,

    /// Seed for jitter and overlap nudges
    #[clap(long, default_value = "42")]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum MstSpaceArg {
    Embedding,
    Layout,
}

#[derive(Clone, Copy, ValueEnum)]
enum OverlapArg {
    Nudge,
    Merge,
}

fn main() -> Result<()> {
    configure_logging();
    let cli = Cli::parse();

    let records = load_delimited(&cli)?;
    info!("Loaded {} input rows from {}", records.len(), cli.input.display());

    let strategy = if cli.flat {
        ClusterStrategy::FlatPartition(PartitionParams {
            min_clusters: cli.min_clusters,
            max_clusters: cli.max_clusters,
            min_nodes_per_cluster: cli.min_nodes,
            seed: cli.seed,
        })
    } else {
        ClusterStrategy::Hierarchical(HierarchyParams {
            max_cluster_depth: cli.max_depth,
            min_nodes_per_cluster: cli.min_nodes,
        })
    };

    let mut config = EngineConfig {
        strategy,
        seed: cli.seed,
        mst_space: match cli.mst_space {
            MstSpaceArg::Embedding => MstSpace::Embedding,
            MstSpaceArg::Layout => MstSpace::Layout,
        },
        ..EngineConfig::default()
    };
    config.layout.projection_scale = cli.scale;
    config.layout.overlap_policy = match cli.overlap {
        OverlapArg::Nudge => OverlapPolicy::Nudge { max_retries: 5 },
        OverlapArg::Merge => OverlapPolicy::Merge,
    };

    let mut engine = ClusterLayoutEngine::new(config);
    engine.load_records(records, &JsonVectorProvider)?;
    engine.make_clusters(&LeadingAxesProjector, None)?;

    write_point_table(&cli.points_out, engine.items(), engine.ordinal_labels())?;
    write_edge_table(&cli.edges_out, engine.mst_edges())?;
    info!(
        "Done: {} items in {} clusters, {} MST edges",
        engine.items().len(),
        engine.clusters().len(),
        engine.mst_edges().len()
    );
    Ok(())
}

/// Reads the delimited input file into loader records. A missing
/// required column is a fatal schema error.
fn load_delimited(cli: &Cli) -> Result<Vec<InputRecord>> {
    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let mut lines = contents.lines();
    let header = lines.next().context("input file is empty")?;
    let columns: Vec<&str> = header.split(cli.delimiter).map(str::trim).collect();

    let find = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .with_context(|| format!("required column \"{name}\" not found in header"))
    };
    let label_index = find(&cli.label_column)?;
    let popularity_index = find(&cli.popularity_column)?;
    let text_indices: Vec<usize> = cli
        .text_columns
        .iter()
        .map(|name| find(name))
        .collect::<Result<_>>()?;

    let mut records = Vec::new();
    for (number, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(cli.delimiter).collect();
        let width = label_index.max(popularity_index).max(
            text_indices.iter().copied().max().unwrap_or(0),
        );
        if fields.len() <= width {
            bail!(
                "row {} has {} fields, expected at least {}",
                number + 2,
                fields.len(),
                width + 1
            );
        }
        records.push(InputRecord {
            label: fields[label_index].trim().to_string(),
            text_fields: text_indices
                .iter()
                .map(|&index| fields[index].to_string())
                .collect(),
            raw_popularity: fields[popularity_index].trim().to_string(),
        });
    }
    Ok(records)
}
