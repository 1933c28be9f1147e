mod settings;


use config::{Config, ConfigError, Environment, File};

pub use settings::{
    ConnectionSettings, LoggingSettings, PartialConnectionSettings, PartialLoggingSettings,
    PartialSettings, Settings,
};

/// Loads the configuration from `config/default.*` (optional) and
/// `SOCKPROBE_*` environment variables, then fills the gaps with defaults.
///
/// Nested keys use a double underscore in the environment, for example
/// `SOCKPROBE_CONNECTION__URL` or `SOCKPROBE_LOGGING__LEVEL`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("SOCKPROBE")
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
