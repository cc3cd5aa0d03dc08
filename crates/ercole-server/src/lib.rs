//! The Ercole data-service: HTTP boundary, configuration and schedulers
//! around [`ercole_engine::HostDataService`].

pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod openapi;
pub mod scheduler;
pub mod state;
