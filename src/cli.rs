//! CLI domain: parse, route, and output only.
//! No pipeline logic; the route table dispatches to the pipeline.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::RunContext;
