//! Test doubles shared by service tests.

mod store;

pub(crate) use store::FakeStore;
