use minetrack_core::models::Category;
use minetrack_core::query::{DirectoryQuery, QueryService};

use crate::cli::BrowseFilters;
use crate::commands::common::{format_record_lines, print_json, CliContext};
use crate::error::CliError;

pub fn directory_query(filters: BrowseFilters) -> DirectoryQuery {
    DirectoryQuery {
        page: Some(filters.page),
        limit: Some(filters.limit),
        search: filters.search,
        province: filters.province,
        status: filters.status,
        classification: filters.classification,
        record_type: filters.record_type,
    }
}

pub async fn run_browse(
    ctx: &CliContext,
    category: Category,
    filters: BrowseFilters,
    json: bool,
) -> Result<(), CliError> {
    let service = QueryService::new(ctx.open_store().await?);
    let listing = service.list(category, &directory_query(filters)).await?;

    if json {
        return print_json(&listing);
    }

    if listing.data.is_empty() {
        let status = service.sync_status(category).await?;
        if status.last_sync_at.is_none() {
            println!("No {category} records stored yet. Run `minetrack sync` first.");
        } else {
            println!("No matching {category} records.");
        }
        return Ok(());
    }

    for line in format_record_lines(&listing.data) {
        println!("{line}");
    }
    let pagination = listing.pagination;
    println!(
        "Page {} of {} ({} records)",
        pagination.current_page, pagination.total_pages, pagination.total_records
    );
    Ok(())
}
