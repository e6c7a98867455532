// Mockall triggers this warning for every mocked trait.
#![cfg_attr(test, allow(clippy::unused_unit))]

pub mod config;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod profile_resolver;
pub mod profile_store;
pub mod sync;
pub mod transport;
pub mod util;
