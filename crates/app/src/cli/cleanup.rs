use clap::Args;
use trellis::records::{AutomaticDiscountId, CodeDiscountId, DiscountId, DiscountRecord};
use trellis_app::{
    cleanup::{CleanlinessReport, CleanupReport},
    errors::DiscountError,
};

use super::{Output, StoreArgs, table};

#[derive(Debug, Args)]
pub(crate) struct CleanupArgs {
    /// Treat the next discount as automatic, so every active automatic discount is removed
    #[arg(long)]
    incoming_automatic: bool,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Debug, Args)]
pub(crate) struct DeleteArgs {
    /// Discount id, e.g. gid://shopify/DiscountAutomaticNode/123
    #[arg(long, value_parser = parse_id)]
    id: DiscountId,

    #[command(flatten)]
    store: StoreArgs,
}

pub(crate) async fn run(args: CleanupArgs, output: Output) -> Result<(), String> {
    let context = args.store.context()?;

    let report = context
        .cleanup
        .cleanup(context.predicate.as_ref(), args.incoming_automatic)
        .await;

    output.print(&report, render)
}

pub(crate) async fn delete(args: DeleteArgs, output: Output) -> Result<(), String> {
    let context = args.store.context()?;

    context
        .cleanup
        .delete(&args.id)
        .await
        .map_err(|error| output.failure(&DiscountError::from(error)))?;

    output.print(&args.id, |id| format!("deleted {} discount {id}", id.kind()))
}

pub(crate) async fn verify_clean(args: StoreArgs, output: Output) -> Result<(), String> {
    let context = args.context()?;

    let report = context
        .cleanup
        .verify_clean()
        .await
        .map_err(|error| output.failure(&DiscountError::from(error)))?;

    output.print(&report, render_cleanliness)
}

pub(super) fn render(report: &CleanupReport) -> String {
    let mut sections = Vec::new();

    let deleted: Vec<_> = report
        .automatic_deleted
        .iter()
        .chain(&report.code_deleted)
        .map(|deleted| vec![deleted.id.kind().to_string(), deleted.title.clone()])
        .collect();

    if !deleted.is_empty() {
        sections.push(table::grid(["Removed", "Title"], deleted));
    }

    if !report.failures.is_empty() {
        sections.push(table::grid(
            ["Not removed", "Title", "Reason"],
            report.failures.iter().map(|failure| {
                vec![
                    failure.id.to_string(),
                    failure.title.clone(),
                    failure.reason.clone(),
                ]
            }),
        ));
    }

    if !report.scan_errors.is_empty() {
        sections.push(table::grid(
            ["Not scanned", "Reason"],
            report
                .scan_errors
                .iter()
                .map(|error| vec![error.kind.to_string(), error.reason.clone()]),
        ));
    }

    sections.push(table::fields([
        (
            "Shop",
            report
                .shop
                .as_ref()
                .map_or_else(|| "unreachable".to_string(), |shop| shop.name.clone()),
        ),
        ("Removed", report.deleted_count().to_string()),
        ("Settled", table::yes_no(report.settled)),
        ("Automatic left", report.remaining_automatic.to_string()),
        ("Code left", report.remaining_code.to_string()),
    ]));

    sections.join("\n")
}

fn render_cleanliness(report: &CleanlinessReport) -> String {
    if report.is_clean {
        return "no discounts left in the store".to_string();
    }

    table::grid(
        ["Kind", "Title", "Status", "Value"],
        report
            .automatic
            .iter()
            .chain(&report.code)
            .map(record_row),
    )
}

fn record_row(record: &DiscountRecord) -> Vec<String> {
    vec![
        record.representation().to_string(),
        record.title.clone(),
        format!("{:?}", record.status),
        record
            .value
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string),
    ]
}

/// Tell automatic and code discount ids apart by their node type.
fn parse_id(input: &str) -> Result<DiscountId, String> {
    let input = input.trim();

    if input.contains("/DiscountAutomaticNode/") {
        Ok(DiscountId::Automatic(AutomaticDiscountId::new(input)))
    } else if input.contains("/DiscountCodeNode/") {
        Ok(DiscountId::Code(CodeDiscountId::new(input)))
    } else {
        Err(format!(
            "expected a DiscountAutomaticNode or DiscountCodeNode id, got {input:?}"
        ))
    }
}
