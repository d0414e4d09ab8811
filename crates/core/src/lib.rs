//! Trellis
//!
//! Trellis keeps a store's discounts and its checkout totals in agreement. It normalises discount
//! requests into exactly encoded values, decides which existing discounts conflict with a new one,
//! flags discount configurations likely to break checkout arithmetic and recomputes checkout
//! totals independently of the store.
//!
//! Everything in this crate is synchronous and free of I/O. Talking to a store is the job of the
//! `trellis-app` crate.

pub mod checkout;
pub mod conflicts;
pub mod consistency;
pub mod discounts;
pub mod ids;
pub mod prelude;
pub mod records;
