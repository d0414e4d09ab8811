use clap::{Args, ValueEnum};
use trellis::discounts::{
    DiscountKind, DiscountSpec, OrderType,
    normalize::{NormalizeError, ValidationError, parse_amount, parse_date},
};
use trellis_app::{errors::DiscountError, pipeline::PipelineOutcome};

use super::{Output, StoreArgs, cleanup, table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    /// Percentage points off, e.g. 10 for 10%
    Percentage,

    /// Fixed amount off, in the shop currency
    Fixed,
}

impl From<KindArg> for DiscountKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Percentage => Self::Percentage,
            KindArg::Fixed => Self::Fixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OrderTypeArg {
    All,
    CodOnly,
    PrepaidOnly,
}

impl From<OrderTypeArg> for OrderType {
    fn from(order_type: OrderTypeArg) -> Self {
        match order_type {
            OrderTypeArg::All => Self::All,
            OrderTypeArg::CodOnly => Self::CodOnly,
            OrderTypeArg::PrepaidOnly => Self::PrepaidOnly,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct CreateArgs {
    /// Customer-facing discount name
    #[arg(long)]
    name: String,

    /// What the value measures
    #[arg(long, value_enum, default_value_t = KindArg::Percentage)]
    kind: KindArg,

    /// Percentage points or currency units
    #[arg(long)]
    value: String,

    /// Minimum order subtotal
    #[arg(long)]
    min_order_value: Option<String>,

    /// Upper bound on the discount amount
    #[arg(long)]
    max_discount: Option<String>,

    /// First day the discount applies (YYYY-MM-DD); defaults to today
    #[arg(long)]
    starts_on: Option<String>,

    /// Last day the discount applies (YYYY-MM-DD); defaults to a year from today
    #[arg(long)]
    ends_on: Option<String>,

    /// Which orders the discount is meant for
    #[arg(long, value_enum, default_value_t = OrderTypeArg::All)]
    order_type: OrderTypeArg,

    /// Apply at checkout without a code
    #[arg(long)]
    auto_apply: bool,

    #[command(flatten)]
    store: StoreArgs,
}

impl CreateArgs {
    fn spec(&self) -> Result<DiscountSpec, ValidationError> {
        let optional_amount = |field: &'static str, input: &Option<String>| {
            input
                .as_deref()
                .map(|input| parse_amount(field, input))
                .transpose()
        };

        let optional_date = |field: &'static str, input: &Option<String>| {
            input
                .as_deref()
                .map(|input| parse_date(field, input))
                .transpose()
        };

        Ok(DiscountSpec {
            name: self.name.clone(),
            kind: self.kind.into(),
            raw_value: parse_amount("value", &self.value)?,
            min_order_value: optional_amount("min_order_value", &self.min_order_value)?
                .unwrap_or_default(),
            max_discount: optional_amount("max_discount", &self.max_discount)?,
            starts_on: optional_date("starts_on", &self.starts_on)?,
            ends_on: optional_date("ends_on", &self.ends_on)?,
            order_type: self.order_type.into(),
            auto_apply: self.auto_apply,
        })
    }
}

pub(crate) async fn run(args: CreateArgs, output: Output) -> Result<(), String> {
    let spec = args
        .spec()
        .map_err(|error| output.failure(&DiscountError::from(NormalizeError::from(error))))?;

    let context = args.store.context()?;

    let outcome = context
        .pipeline
        .run(&spec)
        .await
        .map_err(|error| output.failure(&error))?;

    output.print(&outcome, render)
}

pub(super) fn render(outcome: &PipelineOutcome) -> String {
    let discount = &outcome.discount;
    let created = &outcome.created;

    let delivery = created
        .code
        .as_ref()
        .map_or_else(|| "automatic".to_string(), |code| format!("code {code}"));

    let summary = table::fields([
        ("Discount", created.record.id.to_string()),
        ("Title", discount.title().to_string()),
        ("Value", discount.display_value()),
        ("Sent as", discount.encoded_value().value().to_string()),
        ("Window", format!("{} to {}", discount.starts_on(), discount.ends_on())),
        ("Delivery", delivery),
        ("Removed", outcome.cleanup.deleted_count().to_string()),
    ]);

    format!(
        "{}\n{summary}\n{}",
        cleanup::render(&outcome.cleanup),
        created.message
    )
}
