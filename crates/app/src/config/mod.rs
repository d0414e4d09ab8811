//! Configuration groups shared by every subcommand.

mod observability;
mod reconcile;
mod store;

pub use observability::{LogFormat, LoggingConfig};
pub use reconcile::ReconcileConfig;
pub use store::StoreConfig;
