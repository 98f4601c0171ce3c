use minetrack_core::models::Category;
use minetrack_core::query::QueryService;

use crate::commands::common::{print_json, CliContext};
use crate::error::CliError;

pub async fn run_filters(ctx: &CliContext, category: Category, json: bool) -> Result<(), CliError> {
    let options = QueryService::new(ctx.open_store().await?)
        .filter_options(category)
        .await?;

    if json {
        return print_json(&options);
    }

    for (label, values) in [
        ("Provinces", &options.provinces),
        ("Statuses", &options.statuses),
        ("Classifications", &options.classifications),
        ("Types", &options.types),
    ] {
        if values.is_empty() {
            println!("{label}: (none)");
        } else {
            println!("{label}: {}", values.join(", "));
        }
    }
    Ok(())
}
