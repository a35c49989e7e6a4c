//! Request interception for fallow.
//!
//! This crate classifies outgoing requests, runs the matching caching
//! strategy against the partition store in `fallow-core`, and drives the
//! install/activate lifecycle that keeps partitions in step with the
//! deployed version.

pub mod fetch;
pub mod lifecycle;
pub mod offline;
pub mod request;
pub mod routing;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
pub use lifecycle::{
    ActivationReport, ClientSessions, ControlCommand, ControlOutcome, InstallReport, LifecycleController, Phase,
};
pub use request::{Destination, Method, Request, RequestMode};
pub use routing::{Route, RoutingTable, Strategy};
pub use strategy::{StrategyContext, Timeouts};
pub use worker::Worker;
