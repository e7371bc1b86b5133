//! Merge rules: defaults, override order, environment layer.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

pub const ENV_PREFIX: &str = "DEVLOG";
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
///
/// Only the keys other layers commonly override are seeded here; everything
/// else falls back to serde defaults during deserialization.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("generation.model", crate::config::DEFAULT_MODEL)?
        .set_default("generation.endpoint", crate::config::DEFAULT_ENDPOINT)?
        .set_default("output.blog_dir", "content/blog")?
        .set_default("output.extension", "mdx")
}

/// Highest-precedence layer: `DEVLOG__SECTION__KEY=value`.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    )
}
