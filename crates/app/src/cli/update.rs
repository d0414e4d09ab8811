use clap::Args;
use trellis_app::errors::DiscountError;

use super::Output;

#[derive(Debug, Args)]
pub(crate) struct UpdateArgs {
    /// Discount id to edit
    #[arg(long)]
    id: String,
}

/// Discounts cannot be edited in place; explain how to replace one instead.
pub(crate) fn run(args: UpdateArgs, output: Output) -> Result<(), String> {
    tracing::info!(id = %args.id, "update requested");

    Err(output.failure(&DiscountError::UpdateUnsupported))
}
