use minetrack_core::drafts::DraftQueue;
use minetrack_core::models::{DraftPatch, NewDraft};
use minetrack_core::remote::HttpRemoteClient;

use crate::cli::{DraftCommands, DraftFields};
use crate::commands::common::{
    format_draft_lines, now_ms, parse_attachments, parse_form_data, parse_gps, print_json,
    resolve_draft, short_id, CliContext,
};
use crate::error::CliError;

pub async fn run_draft(ctx: &CliContext, command: DraftCommands) -> Result<(), CliError> {
    match command {
        DraftCommands::New {
            report_type,
            reporter,
            fields,
        } => {
            let reporter_id = ctx.reporter_id(reporter)?;
            let patch = draft_patch(&fields)?;
            let input = NewDraft {
                reporter_id,
                report_type,
                gps_location: patch.gps_location,
                form_data: patch.form_data.unwrap_or_default(),
                attachments: patch.attachments.unwrap_or_default(),
            };
            let draft = ctx.local_drafts(ctx.open_store().await?).save(input).await?;
            println!("Saved draft {} ({})", short_id(&draft.id.as_str()), draft.report_type);
            Ok(())
        }
        DraftCommands::Edit {
            id,
            report_type,
            fields,
        } => {
            let mut patch = draft_patch(&fields)?;
            patch.report_type = report_type;
            if patch.is_empty() {
                return Err(CliError::InvalidArgument(
                    "nothing to update; pass at least one field".to_string(),
                ));
            }

            let store = ctx.open_store().await?;
            let draft = resolve_draft(&id, &store).await?;
            let updated = ctx.local_drafts(store).update(&draft.id, patch).await?;
            println!("Updated draft {}", short_id(&updated.id.as_str()));
            Ok(())
        }
        DraftCommands::List { reporter, json } => {
            let reporter_id = ctx.reporter_id(reporter)?;
            let drafts = ctx
                .local_drafts(ctx.open_store().await?)
                .list(&reporter_id)
                .await?;

            if json {
                return print_json(&drafts);
            }
            if drafts.is_empty() {
                println!("No drafts for {reporter_id}.");
                return Ok(());
            }
            for line in format_draft_lines(&drafts, now_ms()) {
                println!("{line}");
            }
            Ok(())
        }
        DraftCommands::Delete { id } => {
            let store = ctx.open_store().await?;
            let draft = resolve_draft(&id, &store).await?;
            ctx.local_drafts(store).delete(&draft.id).await?;
            println!("Deleted draft {}", short_id(&draft.id.as_str()));
            Ok(())
        }
        DraftCommands::Sync { reporter } => run_draft_sync(ctx, reporter).await,
    }
}

async fn run_draft_sync(ctx: &CliContext, reporter: Option<String>) -> Result<(), CliError> {
    let reporter_id = ctx.reporter_id(reporter)?;
    let store = ctx.open_store().await?;

    if ctx.offline {
        let pending = store.get_dirty_drafts(&reporter_id).await?.len();
        println!("Offline; {pending} draft(s) waiting to be submitted");
        return Ok(());
    }

    let client = HttpRemoteClient::new(&ctx.remote_config(None)?)?;
    let summary = DraftQueue::new(store, client, ctx.network())
        .sync_all(&reporter_id)
        .await?;

    println!(
        "Submitted {} draft(s), {} failed",
        summary.synced_count, summary.failed_count
    );
    for failure in &summary.failures {
        println!(
            "  {}: {}",
            short_id(&failure.draft_id.as_str()),
            failure.error
        );
    }
    Ok(())
}

/// Optional draft fields given on the command line.
pub fn draft_patch(fields: &DraftFields) -> Result<DraftPatch, CliError> {
    let attachments = parse_attachments(&fields.attachments)?;
    Ok(DraftPatch {
        report_type: None,
        gps_location: parse_gps(fields.lat, fields.lon, fields.accuracy)?,
        form_data: parse_form_data(fields.data.as_deref())?,
        attachments: (!attachments.is_empty()).then_some(attachments),
    })
}
