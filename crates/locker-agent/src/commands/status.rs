use anyhow::Result;
use colored::Colorize;

use crate::outbox::Outbox;

pub async fn execute(db_path: &str) -> Result<()> {
    let outbox = Outbox::open(db_path).await?;
    let counts = outbox.counts().await?;

    println!("{}", "Outbox".bold());
    println!("  pending: {}", counts.pending.to_string().yellow());
    println!("  synced:  {}", counts.synced.to_string().green());
    println!("  failed:  {}", counts.failed.to_string().red());

    outbox.close().await;
    Ok(())
}
