use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::clustering::{ClusterId, Item};
use crate::error::Result;
use crate::mst::MstEdge;
use crate::TARGET_CLUSTERING;

/// Quotes a field when it contains the delimiter, a quote, or a
/// newline, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes the point table: one row per item with its layout position,
/// importance z-value, cluster id, and ordinal cluster label. UTF-8
/// with a header row. Unset importance is written as an empty field.
pub fn write_point_table(
    path: &Path,
    items: &[Item],
    ordinal_labels: &HashMap<ClusterId, usize>,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "label,x,y,z,cluster_id,cluster_label")?;
    for item in items {
        let z = item
            .importance
            .map(|v| v.to_string())
            .unwrap_or_default();
        let (cluster_id, ordinal) = match item.cluster_id {
            Some(id) => (
                id.to_string(),
                ordinal_labels.get(&id).map(|o| o.to_string()).unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            csv_field(&item.label),
            item.position[0],
            item.position[1],
            z,
            cluster_id,
            ordinal
        )?;
    }
    writer.flush()?;

    info!(
        target: TARGET_CLUSTERING,
        "Wrote {} point rows to {}",
        items.len(),
        path.display()
    );
    Ok(())
}

/// Writes the edge table: one row per spanning-tree edge.
pub fn write_edge_table(path: &Path, edges: &[MstEdge]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "cluster_id,start_label,end_label")?;
    for edge in edges {
        writeln!(
            writer,
            "{},{},{}",
            edge.cluster_id,
            csv_field(&edge.start_label),
            csv_field(&edge.end_label)
        )?;
    }
    writer.flush()?;

    info!(
        target: TARGET_CLUSTERING,
        "Wrote {} edge rows to {}",
        edges.len(),
        path.display()
    );
    Ok(())
}
