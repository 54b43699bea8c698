use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "cookbook").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config::in_dir(data_dir))
    }

    fn in_dir(data_dir: PathBuf) -> Self {
        Config {
            db_path: data_dir.join("cookbook.db"),
            catalog_path: data_dir.join("catalog.json"),
            data_dir,
        }
    }

    /// Read the server API key, generating and storing one on first use.
    pub fn load_or_create_api_key(&self) -> Result<String> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");
        if path.exists() {
            let existing =
                std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(existing.to_string());
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated API key: {key}");
        eprintln!("Send it as: Authorization: Bearer {key}");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_in_data_dir() {
        let config = Config::in_dir(PathBuf::from("/tmp/cookbook"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/cookbook/cookbook.db"));
        assert_eq!(config.catalog_path, PathBuf::from("/tmp/cookbook/catalog.json"));
    }

    #[test]
    fn test_api_key_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path().to_path_buf());

        let key = config.load_or_create_api_key().unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(config.load_or_create_api_key().unwrap(), key);
    }

    #[test]
    fn test_unreadable_api_key_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path().to_path_buf());
        let path = dir.path().join("api_key");
        std::fs::write(&path, [0xff, 0xfe, b'k']).unwrap();

        let err = config.load_or_create_api_key().unwrap_err();
        assert!(err.to_string().contains("Failed to read API key file"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xfe, b'k']);
    }

    #[test]
    fn test_blank_api_key_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(dir.path().to_path_buf());
        std::fs::write(dir.path().join("api_key"), "  \n").unwrap();

        assert_eq!(config.load_or_create_api_key().unwrap().len(), 64);
    }
}
