pub mod query;
pub mod same_user;
pub mod serve;
pub mod whoami;

use crate::cli::GlobalArgs;
use crate::error::IdentcheckError;

use ident_core::IdentConfig;
use ident_core::config::default_config_dir;

use log::debug;

/// Exit code when the peer is somebody else.
pub const EXIT_OTHER_USER: u8 = 3;

/// Config file, then environment, then `--port`.
pub fn resolve_config(global: &GlobalArgs) -> Result<IdentConfig, IdentcheckError> {
    resolve_config_with(global, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_config_with<F>(
    global: &GlobalArgs,
    env: F,
) -> Result<IdentConfig, IdentcheckError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_dir = global.config_dir.clone().or_else(default_config_dir);

    let mut config = match config_dir {
        Some(dir) => IdentConfig::load(&dir)?,
        None => {
            debug!("No config directory available, using defaults");
            IdentConfig::default()
        }
    };

    config.apply_overrides(env)?;

    if let Some(port) = global.port {
        config.port = port;
        config.validate()?;
    }

    Ok(config)
}
