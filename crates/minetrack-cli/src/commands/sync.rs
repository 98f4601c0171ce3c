use minetrack_core::models::Category;
use minetrack_core::remote::HttpRemoteClient;
use minetrack_core::sync::{ReplicaSyncEngine, SyncRunReport};

use crate::commands::common::{format_progress, print_json, CliContext};
use crate::error::CliError;

pub async fn run_sync(
    ctx: &CliContext,
    page_size: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    if ctx.offline {
        return Err(CliError::Offline);
    }

    let config = ctx.remote_config(page_size)?;
    let client = HttpRemoteClient::new(&config)?;
    let engine =
        ReplicaSyncEngine::new(ctx.open_store().await?, client).with_page_size(config.page_size);

    let mut last_line = String::new();
    let report = engine
        .run(|progress| {
            if json {
                return;
            }
            let line = format_progress(progress);
            if line != last_line {
                eprintln!("{line}");
                last_line = line;
            }
        })
        .await?;

    if json {
        print_json(&report)?;
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::SyncIncomplete(
            report
                .first_error
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

pub fn format_report_lines(report: &SyncRunReport) -> Vec<String> {
    let mut lines = Category::ALL
        .into_iter()
        .map(|category| {
            let details = report.download_details.get(category);
            let duplicates = *report.duplicate_details.get(category);
            let mut line = format!(
                "{:<16} {} received, {} saved, {} skipped, {} stored",
                category.label(),
                details.received,
                details.saved,
                details.skipped,
                report.stats.get(category)
            );
            if duplicates > 0 {
                line.push_str(&format!(", {duplicates} duplicate id(s)"));
            }
            if let Some(error) = &details.error {
                line.push_str(&format!(" (failed: {error})"));
            }
            line
        })
        .collect::<Vec<_>>();
    lines.push(report.summary());
    lines
}
