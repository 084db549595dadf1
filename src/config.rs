use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub struct GimportConfig {
    pub cache_dir: Option<PathBuf>,
    pub versioning: Option<bool>,
    pub mirror_dir: Option<PathBuf>,
    pub default_remote: Option<String>,
    pub git_timeout: Option<Duration>,
    pub lock_timeout: Option<Duration>,
}

impl GimportConfig {
    /// Reads `file` (or the default config file when `None`), then lets
    /// `GIMPORT_*` environment variables override it. Missing files are fine.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let file = file.map(Path::to_path_buf).or_else(default_config_file);
        let raw_config = RawConfig::load(file, None)?;

        Ok(Self {
            cache_dir: raw_config.cache.dir.map(expand_home),
            versioning: raw_config.cache.versioning,
            mirror_dir: raw_config.mirror.dir.map(expand_home),
            default_remote: raw_config.git.remote,
            git_timeout: raw_config.git.timeout.map(Duration::from_secs),
            lock_timeout: raw_config.lock.timeout.map(Duration::from_secs),
        })
    }
}

fn default_config_file() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".config").join("gimport").join("config.toml"))
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: PathBuf) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match home::home_dir() {
            Some(home) => home.join(rest),
            None => path,
        },
        Err(_) => path,
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    mirror: MirrorConfig,
    #[serde(default)]
    git: GitConfig,
    #[serde(default)]
    lock: LockConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CacheConfig {
    dir: Option<PathBuf>,
    versioning: Option<bool>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct MirrorConfig {
    dir: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GitConfig {
    remote: Option<String>,
    timeout: Option<u64>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct LockConfig {
    timeout: Option<u64>,
}

impl RawConfig {
    fn load(
        file: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml).required(false));
        }
        builder
            .add_source(Environment::with_prefix("GIMPORT").separator("_").source(env))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_empty() {
        let env = HashMap::from([]);
        let config = RawConfig::load(None, Some(env)).unwrap();
        assert_eq!(config, RawConfig::default())
    }

    #[test]
    fn load_environment() {
        let env = HashMap::from([
            ("GIMPORT_CACHE_DIR".to_owned(), "/cache".to_owned()),
            ("GIMPORT_CACHE_VERSIONING".to_owned(), "false".to_owned()),
            ("GIMPORT_GIT_REMOTE".to_owned(), "git@github.com:".to_owned()),
            ("GIMPORT_GIT_TIMEOUT".to_owned(), "30".to_owned()),
        ]);
        let config = RawConfig::load(None, Some(env)).unwrap();
        assert_eq!(
            config,
            RawConfig {
                cache: CacheConfig {
                    dir: Some("/cache".into()),
                    versioning: Some(false),
                },
                git: GitConfig {
                    remote: Some("git@github.com:".to_owned()),
                    timeout: Some(30),
                },
                ..Default::default()
            }
        )
    }

    #[test]
    fn load_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            r#"
[cache]
dir = "/from/file"

[mirror]
dir = "/mirrors"

[lock]
timeout = 10
"#,
        )
        .unwrap();
        let env = HashMap::from([("GIMPORT_CACHE_DIR".to_owned(), "/from/env".to_owned())]);

        let config = RawConfig::load(Some(file), Some(env)).unwrap();

        assert_eq!(
            config,
            RawConfig {
                cache: CacheConfig {
                    dir: Some("/from/env".into()),
                    versioning: None,
                },
                mirror: MirrorConfig {
                    dir: Some("/mirrors".into()),
                },
                lock: LockConfig { timeout: Some(10) },
                ..Default::default()
            }
        )
    }

    #[test]
    fn missing_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let env = HashMap::from([]);
        let config = RawConfig::load(Some(dir.path().join("missing.toml")), Some(env)).unwrap();
        assert_eq!(config, RawConfig::default())
    }

    #[test]
    fn expand_home_leaves_other_paths_alone() {
        assert_eq!(expand_home("/cache".into()), PathBuf::from("/cache"));
        if let Some(home) = home::home_dir() {
            assert_eq!(expand_home("~/cache".into()), home.join("cache"));
        }
    }
}
