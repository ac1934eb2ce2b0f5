use anyhow::Result;
use colored::Colorize;

use crate::outbox::Outbox;
use crate::worker;
use crate::SyncArgs;

pub async fn execute(db_path: &str, args: &SyncArgs, once: bool) -> Result<()> {
    let outbox = Outbox::open(db_path).await?;
    let client = args.client()?;

    if once {
        let report = worker::sync_once(&outbox, &client, args.max_retries).await?;
        println!(
            "{} synced, {} pending retry, {} failed",
            report.synced.to_string().green(),
            report.deferred.to_string().yellow(),
            report.failed.to_string().red()
        );
    } else {
        worker::run(&outbox, &client, args.max_retries, args.interval()).await?;
    }

    outbox.close().await;
    Ok(())
}
