//! Discount reconciliation services against an external store.

pub mod checkout;
pub mod cleanup;
pub mod config;
pub mod consistency;
pub mod context;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod writer;

#[cfg(test)]
mod test;
