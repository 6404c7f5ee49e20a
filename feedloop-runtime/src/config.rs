use config::{Config, File, FileFormat};
use std::path::Path;

use crate::error::SchedulerError;

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config, SchedulerError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .add_source(config::Environment::with_prefix("FEEDLOOP").separator("_"))
        .build()?;
    Ok(config)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config, SchedulerError> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Yaml))
        .add_source(config::Environment::with_prefix("FEEDLOOP").separator("_"))
        .build()?;
    Ok(config)
}

/// Resolve config placeholder like ${feeds.market.interval} or
/// ${feeds.market.interval:60s}. Anything else passes through untouched.
pub fn resolve_config_value(value: &str, config: &Config) -> Result<String, SchedulerError> {
    if value.starts_with("${") && value.ends_with('}') {
        let inner = &value[2..value.len() - 1];

        if let Some(colon_pos) = inner.find(':') {
            let key = &inner[..colon_pos];
            let default_value = &inner[colon_pos + 1..];

            match config.get_string(key) {
                Ok(resolved) => Ok(resolved),
                Err(_) => Ok(default_value.to_string()),
            }
        } else {
            config
                .get_string(inner)
                .map_err(|_| SchedulerError::MissingConfigKey(inner.to_string()))
        }
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config::builder()
            .add_source(File::from_str(
                "[feeds.market]\ninterval = \"30s\"\nenabled = true\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn literals_pass_through() {
        let config = sample_config();
        assert_eq!(resolve_config_value("5s", &config).unwrap(), "5s");
        assert_eq!(resolve_config_value("1000", &config).unwrap(), "1000");
    }

    #[test]
    fn placeholders_resolve_from_config() {
        let config = sample_config();
        assert_eq!(
            resolve_config_value("${feeds.market.interval}", &config).unwrap(),
            "30s"
        );
        assert_eq!(
            resolve_config_value("${feeds.market.enabled}", &config).unwrap(),
            "true"
        );
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let config = sample_config();
        assert_eq!(
            resolve_config_value("${feeds.news.interval:2m}", &config).unwrap(),
            "2m"
        );
    }

    #[test]
    fn missing_key_without_default_is_an_error() {
        let config = sample_config();
        assert!(matches!(
            resolve_config_value("${feeds.news.interval}", &config),
            Err(SchedulerError::MissingConfigKey(_))
        ));
    }
}
