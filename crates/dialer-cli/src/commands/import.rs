//! Import command - load contacts from a JSON file

use std::path::Path;

use dialer_core::engine::DedupConfig;
use dialer_core::model::{ContactField, NewContact};
use dialer_core::DialerEngine;
use tracing::{info, warn};

use super::read_json;

/// Execute import command
pub async fn execute(
    engine: &DialerEngine,
    campaign_id: &str,
    file: &Path,
    dedup: bool,
    dedup_fields: Vec<String>,
) -> anyhow::Result<()> {
    let rows: Vec<NewContact> = read_json(file)?;
    info!("📥 Importing {} rows from {}", rows.len(), file.display());

    let dedup = DedupConfig {
        enabled: dedup,
        fields: dedup_fields.into_iter().map(ContactField::from).collect(),
    };

    let report = engine.import_batch(campaign_id, rows, &dedup).await?;

    for rejected in &report.invalids {
        warn!("Row {} rejected: {}", rejected.index, rejected.reason);
    }

    println!("imported: {}", report.valids.len());
    println!("rejected: {}", report.invalids.len());
    Ok(())
}
