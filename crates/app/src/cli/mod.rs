use clap::{Args, Parser, Subcommand};
use trellis_app::{
    config::{LoggingConfig, ReconcileConfig, StoreConfig},
    context::AppContext,
    errors::{DiscountError, ErrorSummary},
    observability,
};

mod analyze;
mod cleanup;
mod create;
mod monitor;
mod probe;
mod table;
mod update;

#[derive(Debug, Parser)]
#[command(
    name = "trellis",
    about = "Discount reconciliation and checkout consistency checks",
    long_about = None
)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    /// Print reports as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Remove conflicting discounts and create a new one
    Create(create::CreateArgs),

    /// Remove conflicting discounts without creating anything
    Cleanup(cleanup::CleanupArgs),

    /// Delete one discount by id
    Delete(cleanup::DeleteArgs),

    /// Report any discounts still present in the store
    VerifyClean(StoreArgs),

    /// Check the active discounts for checkout problems
    Analyze(StoreArgs),

    /// Replace problem discounts with a plain 10% automatic discount
    FixCheckout(StoreArgs),

    /// Reconcile a stream of checkout snapshots (JSON lines)
    Monitor(monitor::MonitorArgs),

    /// Check the store connection and print shop details
    Probe(StoreArgs),

    /// Edit an existing discount
    Update(update::UpdateArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init(&self.logging)
            .map_err(|error| format!("failed to initialize logging: {error}"))?;

        let output = Output { json: self.json };

        match self.command {
            Commands::Create(args) => create::run(args, output).await,
            Commands::Cleanup(args) => cleanup::run(args, output).await,
            Commands::Delete(args) => cleanup::delete(args, output).await,
            Commands::VerifyClean(args) => cleanup::verify_clean(args, output).await,
            Commands::Analyze(args) => analyze::run(args, output).await,
            Commands::FixCheckout(args) => analyze::fix_checkout(args, output).await,
            Commands::Monitor(args) => monitor::run(args, output).await,
            Commands::Probe(args) => probe::run(args, output).await,
            Commands::Update(args) => update::run(args, output),
        }
    }
}

/// Store connection and reconciliation settings shared by every store-backed subcommand.
#[derive(Debug, Args)]
pub(crate) struct StoreArgs {
    #[command(flatten)]
    store: StoreConfig,

    #[command(flatten)]
    reconcile: ReconcileConfig,
}

impl StoreArgs {
    fn context(self) -> Result<AppContext, String> {
        AppContext::from_config(self.store, &self.reconcile)
            .map_err(|error| format!("failed to initialize: {error}"))
    }
}

/// How reports are printed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Output {
    json: bool,
}

impl Output {
    /// Print `value` as JSON, or print the rendered table.
    fn print<T, F>(self, value: &T, render: F) -> Result<(), String>
    where
        T: serde::Serialize,
        F: FnOnce(&T) -> String,
    {
        if self.json {
            let json = serde_json::to_string_pretty(value)
                .map_err(|error| format!("failed to serialize report: {error}"))?;

            println!("{json}");
        } else {
            println!("{}", render(value));
        }

        Ok(())
    }

    /// Message for a failed operation, with its kind and what to do next.
    fn failure(self, error: &DiscountError) -> String {
        let summary = ErrorSummary::from(error);

        if self.json {
            return serde_json::to_string_pretty(&summary)
                .unwrap_or_else(|_| summary.message.clone());
        }

        format!(
            "error ({}): {}\n{}",
            summary.kind, summary.message, summary.remediation
        )
    }
}
