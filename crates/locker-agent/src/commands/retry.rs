use anyhow::Result;
use colored::Colorize;

use crate::outbox::Outbox;
use crate::worker;
use crate::SyncArgs;

pub async fn execute(db_path: &str, args: &SyncArgs) -> Result<()> {
    let outbox = Outbox::open(db_path).await?;

    let revived = outbox.reset_failed().await?;
    if revived == 0 {
        println!("No failed packages to retry");
        outbox.close().await;
        return Ok(());
    }

    println!("Found {} failed package(s). Resetting and retrying...", revived);

    let client = args.client()?;
    let report = worker::sync_once(&outbox, &client, args.max_retries).await?;

    println!("{} Synced {} package(s)", "✓".green(), report.synced);
    if report.deferred > 0 {
        println!(
            "{} {} package(s) still pending, the sync worker will keep retrying",
            "!".yellow(),
            report.deferred
        );
    }
    if report.failed > 0 {
        println!("{} {} package(s) failed again", "✗".red(), report.failed);
    }

    outbox.close().await;
    Ok(())
}
