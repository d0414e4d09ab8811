use trellis::{consistency::ConsistencyReport, discounts::normalize::NormalizeContext};
use trellis_app::pipeline::FixCheckoutOutcome;

use super::{Output, StoreArgs, create, table};

pub(crate) async fn run(args: StoreArgs, output: Output) -> Result<(), String> {
    let context = args.context()?;

    let report = context
        .validator
        .analyze()
        .await
        .map_err(|error| output.failure(&error))?;

    output.print(&report, render)
}

pub(crate) async fn fix_checkout(args: StoreArgs, output: Output) -> Result<(), String> {
    let context = args.context()?;

    let fixed = context
        .pipeline
        .fix_checkout(&NormalizeContext::now())
        .await
        .map_err(|error| output.failure(&error))?;

    output.print(&fixed, |fixed: &FixCheckoutOutcome| {
        format!(
            "{}\n{}",
            create::render(&fixed.outcome),
            render(&fixed.report)
        )
    })
}

fn render(report: &ConsistencyReport) -> String {
    let mut sections = Vec::new();

    if !report.discounts.is_empty() {
        sections.push(table::grid(
            ["Kind", "Title", "Value"],
            report.discounts.iter().map(|discount| {
                vec![
                    discount.kind.to_string(),
                    discount.title.clone(),
                    discount
                        .value
                        .as_ref()
                        .map_or_else(|| "-".to_string(), ToString::to_string),
                ]
            }),
        ));
    }

    sections.push(table::fields([
        ("Checkout ready", table::yes_no(report.checkout_ready)),
        ("Automatic", report.active_automatic.to_string()),
        ("Code", report.active_code.to_string()),
        ("Currency", report.currency_code.clone()),
    ]));

    if !report.issues.is_empty() {
        sections.push(table::grid(
            ["Issues"],
            report.issues.iter().map(|issue| vec![issue.to_string()]),
        ));
    }

    sections.push(table::grid(
        ["Next steps"],
        report
            .recommendations
            .iter()
            .map(|recommendation| vec![recommendation.to_string()]),
    ));

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use trellis::consistency::evaluate;

    use super::*;

    #[test]
    fn empty_stores_suggest_a_test_discount() {
        let report = evaluate(&[], &[], Some("AED"));

        let rendered = render(&report);

        assert!(rendered.contains("Checkout ready"));
        assert!(rendered.contains("AED"));
        assert!(rendered.contains("Create a test discount"));
        assert!(!rendered.contains("Issues"));
    }
}
