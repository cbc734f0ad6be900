//! Digest command: one-shot scan of both roots.

use std::sync::Arc;

use serde_json::json;

use crate::config::Settings;
use crate::process::{ProcFileLinker, ProcessRegistry};
use crate::share::ShareRegistry;

/// Scan both roots without watching and print both digests as JSON.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let linker = Arc::new(ProcFileLinker::new(settings.tracking.process.clone()));
    let process = ProcessRegistry::new(&settings.tracking, &settings.monitor, linker);
    let share = ShareRegistry::new(&settings.tracking);

    process.rescan().await?;
    share.rescan().await?;

    let output = json!({
        "process": process.generate_digest(),
        "share": share.generate_digest(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    process.dispose().await;
    share.dispose().await;
    Ok(())
}
