//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only scalar knobs are seeded here; list and path defaults come from the
/// serde defaults of each section.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("generation.variations", 2)?
        .set_default("generation.max_variations", 3)?
        .set_default("generation.stagger_ms", 800)?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.initial_delay_ms", 1500)
}
