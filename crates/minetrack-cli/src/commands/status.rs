use crate::commands::common::{format_status_lines, now_ms, print_json, CliContext};
use crate::error::CliError;

pub async fn run_status(ctx: &CliContext, json: bool) -> Result<(), CliError> {
    let store = ctx.open_store().await?;
    let statuses = store.all_sync_status().await?;

    if json {
        return print_json(&statuses);
    }

    let stats = store.local_stats().await?;
    for line in format_status_lines(&statuses, now_ms()) {
        println!("{line}");
    }
    println!(
        "Stored: {} national, {} local, {} hotspots",
        stats.national, stats.local, stats.hotspots
    );
    Ok(())
}
