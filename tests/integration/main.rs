//! p2plink integration test harness.
//!
//! Scenarios drive a [`LinkCoordinator`] through [`MockPlatform`], which
//! records every OS request and answers them as scripted. Platform
//! notifications are injected with `handle_event`, so each test controls
//! exactly what the OS reports and when. Time is paused; timers fire by
//! sleeping past them.

mod infra;

mod advertise;
mod lifecycle;
mod links;
mod loopback;

pub use infra::*;
