use anyhow::Result;
use colored::Colorize;

use crate::outbox::Outbox;

pub async fn execute(db_path: &str, reset: bool) -> Result<()> {
    if reset {
        let (outbox, backup) = Outbox::reset(db_path).await?;
        if let Some(backup) = backup {
            println!("{} Backup created at: {}", "✓".green(), backup.display());
        }
        outbox.close().await;
    } else {
        Outbox::open(db_path).await?.close().await;
    }

    println!("{} Outbox ready at {}", "✓".green(), db_path);
    Ok(())
}
