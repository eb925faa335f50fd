//! Settings parser for .dtb/config.toml

use std::path::Path;

use dtb_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const DTB_DIR: &str = ".dtb";

/// Load settings from `<project_path>/.dtb/config.toml`.
///
/// A missing, unreadable or invalid file yields the defaults.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(DTB_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create `.dtb/config.toml` with the default settings if it does not exist.
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let dtb_dir = project_path.join(DTB_DIR);

    if !dtb_dir.exists() {
        std::fs::create_dir_all(&dtb_dir)
            .map_err(|e| Error::config(format!("Failed to create .dtb dir: {}", e)))?;
    }

    let config_path = dtb_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# devtools-bridge configuration

[server]
# Origin of the Metro dev server
metro_server_origin = "http://localhost:8081"

[broadcast]
# How long to wait for app responses (milliseconds)
timeout_ms = 10000
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings(temp.path());

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let dtb_dir = temp.path().join(".dtb");
        std::fs::create_dir_all(&dtb_dir).unwrap();

        let config = r#"
[server]
metro_server_origin = "http://192.168.1.20:19000"

[broadcast]
timeout_ms = 2500
"#;
        std::fs::write(dtb_dir.join("config.toml"), config).unwrap();

        let settings = load_settings(temp.path());

        assert_eq!(
            settings.server.metro_server_origin,
            "http://192.168.1.20:19000"
        );
        assert_eq!(settings.broadcast.timeout_ms, 2500);
    }

    #[test]
    fn test_load_settings_partial() {
        let temp = tempdir().unwrap();
        let dtb_dir = temp.path().join(".dtb");
        std::fs::create_dir_all(&dtb_dir).unwrap();
        std::fs::write(dtb_dir.join("config.toml"), "[broadcast]\ntimeout_ms = 500\n").unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings.broadcast.timeout_ms, 500);
        assert_eq!(settings.server.metro_server_origin, "http://localhost:8081");
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let dtb_dir = temp.path().join(".dtb");
        std::fs::create_dir_all(&dtb_dir).unwrap();

        std::fs::write(dtb_dir.join("config.toml"), "not valid toml {{{{").unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_init_config_dir() {
        let temp = tempdir().unwrap();

        init_config_dir(temp.path()).unwrap();

        assert!(temp.path().join(".dtb/config.toml").exists());
        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let temp = tempdir().unwrap();
        let dtb_dir = temp.path().join(".dtb");
        std::fs::create_dir_all(&dtb_dir).unwrap();
        std::fs::write(dtb_dir.join("config.toml"), "[broadcast]\ntimeout_ms = 42\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        assert_eq!(load_settings(temp.path()).broadcast.timeout_ms, 42);
    }
}
