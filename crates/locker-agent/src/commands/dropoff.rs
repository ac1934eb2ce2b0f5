use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;

use crate::outbox::Outbox;

pub async fn execute(
    db_path: &str,
    locker_id: &str,
    tracking_id: Option<String>,
    status: &str,
) -> Result<()> {
    let outbox = Outbox::open(db_path).await?;

    let tracking_id = tracking_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if let Some(existing) = outbox.get(&tracking_id).await? {
        bail!(
            "Package {} is already queued (state: {})",
            existing.tracking_id,
            existing.sync_state
        );
    }

    let package = outbox
        .enqueue(&tracking_id, locker_id, status, Utc::now())
        .await?;

    println!(
        "{} Package queued: id={}, tracking_id={}",
        "✓".green(),
        package.id,
        package.tracking_id.bold()
    );

    outbox.close().await;
    Ok(())
}
