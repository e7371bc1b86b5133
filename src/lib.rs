//! devlog: dated engineering posts from git activity
//!
//! Selects days that need a post, builds a grounded prompt from the day's ideas
//! or commits, asks a remote text-generation service to write it, decodes the
//! unreliable reply, and writes a front-matter document. The recap flow also
//! commits and pushes the new file.

pub mod activity;
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod decode;
pub mod document;
pub mod error;
pub mod logging;
pub mod overrides;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod publish;
pub mod selector;
