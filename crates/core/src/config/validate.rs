use super::{types::Config, ConfigError};
use crate::profile::CoverMode;

/// Validate configuration
/// Currently validates:
/// - Parallelism limits and the stop grace period are not 0
/// - Scaled covers have a size
/// - A created cue sheet has a file name
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let fail = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    // Runner validation
    if config.runner.max_parallel_splits == 0 {
        return fail("runner.max_parallel_splits cannot be 0");
    }
    if config.runner.max_parallel_encodes == 0 {
        return fail("runner.max_parallel_encodes cannot be 0");
    }
    if config.runner.stop_grace_ms == 0 {
        return fail("runner.stop_grace_ms cannot be 0");
    }

    // Profile validation
    let profile = &config.profile;
    if profile.copy_cover.mode == CoverMode::Scale && profile.copy_cover.size == 0 {
        return fail("profile.copy_cover.size cannot be 0 in scale mode");
    }
    if profile.embed_cover.mode == CoverMode::Scale && profile.embed_cover.size == 0 {
        return fail("profile.embed_cover.size cannot be 0 in scale mode");
    }
    if profile.cue.create && profile.cue.file_name.trim().is_empty() {
        return fail("profile.cue.file_name cannot be empty when cue creation is enabled");
    }

    Ok(())
}
