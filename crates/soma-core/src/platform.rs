use std::path::PathBuf;

const APP_DIR: &str = "soma";

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/soma/
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}
