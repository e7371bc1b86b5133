//! Integration tests for the devlog pipeline

mod batch_flow;
mod config_integration;
mod recap_flow;
mod support;
