//! `Config` — the typeful representation of `~/.bulkup/config.ini`, plus
//! `ProfileBook`, the collaborator that owns the credentials directory and
//! the active-profile marker (spec.md §6, §9 "Global mutable state").
//!
//! Kept as explicit values constructed once at startup and passed into the
//! rest of the pipeline, rather than the module-level global the source
//! used.

pub mod constants;
mod error;

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use self::constants as c;
pub use self::error::{Error, ErrorKind, Result};
use crate::metadata::TemplateConfig;
use crate::upload::{DEFAULT_CHUNK_SIZE, DEFAULT_RETRY_COUNT};

/// `auth.*` configuration (spec.md §6). OAuth acquisition itself is out of
/// scope; this just carries the paths/scopes the (external) acquirer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub client_secrets_file: Option<PathBuf>,
    pub scopes: Vec<String>,
    pub token_file: Option<PathBuf>,
    pub upload_endpoint: String,
    pub api_base: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            client_secrets_file: None,
            scopes: vec![c::DEFAULT_SCOPE.to_string()],
            token_file: None,
            upload_endpoint: c::DEFAULT_UPLOAD_ENDPOINT.to_string(),
            api_base: c::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// `upload.*` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub chunk_size: u64,
    pub retry_count: usize,
    pub privacy_status: String,
    pub daily_quota_limit: u64,
    pub workers: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_count: DEFAULT_RETRY_COUNT,
            privacy_status: "private".to_string(),
            daily_quota_limit: 10_000,
            workers: 1,
        }
    }
}

/// The full, merged configuration surface (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub metadata: TemplateConfig,
    pub history_db: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auth: AuthConfig::default(),
            upload: UploadConfig::default(),
            metadata: TemplateConfig::default(),
            history_db: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location
    /// (`crate::core::config_file()`), falling back to defaults if the file
    /// doesn't exist.
    pub fn from_config_file_or_default() -> Result<Config> {
        let path = crate::core::config_file().map_err(|_| Error::missing_key("home_dir"))?;
        if !path.exists() {
            return Ok(Config::default());
        }
        Config::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let ini = Ini::load_from_file(path)?;
        Ok(Config::from_ini(&ini))
    }

    /// Loads configuration the same way as [`Config::from_config_file_or_default`],
    /// then layers `BULKUP_*` environment overrides on top of the `auth`
    /// section, mirroring the teacher's
    /// `Config::from_config_file_and_environment` reading
    /// `PENNSIEVE_API_TOKEN`/`PENNSIEVE_API_KEY`/`PENNSIEVE_API_SECRET`/
    /// `PENNSIEVE_API_ENVIRONMENT`. OAuth acquisition itself stays out of
    /// scope (spec.md §1); these overrides only redirect where the
    /// (external) acquirer's inputs and outputs live.
    pub fn from_config_file_and_environment() -> Result<Config> {
        let mut config = Config::from_config_file_or_default()?;
        config.apply_environment_overrides();
        Ok(config)
    }

    fn apply_environment_overrides(&mut self) {
        if let Ok(v) = env::var("BULKUP_CLIENT_SECRETS_FILE") {
            self.auth.client_secrets_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("BULKUP_SCOPES") {
            self.auth.scopes = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("BULKUP_TOKEN_FILE") {
            self.auth.token_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("BULKUP_UPLOAD_ENDPOINT") {
            self.auth.upload_endpoint = v;
        }
        if let Ok(v) = env::var("BULKUP_API_BASE") {
            self.auth.api_base = v;
        }
    }

    fn from_ini(ini: &Ini) -> Config {
        let mut config = Config::default();

        if let Some(section) = ini.section(Some(c::AUTH_SECTION)) {
            if let Some(v) = section.get(c::CLIENT_SECRETS_FILE_KEY) {
                config.auth.client_secrets_file = Some(PathBuf::from(v));
            }
            if let Some(v) = section.get(c::SCOPES_KEY) {
                config.auth.scopes = v.split(',').map(|s| s.trim().to_string()).collect();
            }
            if let Some(v) = section.get(c::TOKEN_FILE_KEY) {
                config.auth.token_file = Some(PathBuf::from(v));
            }
            if let Some(v) = section.get(c::UPLOAD_ENDPOINT_KEY) {
                config.auth.upload_endpoint = v.to_string();
            }
            if let Some(v) = section.get(c::API_BASE_KEY) {
                config.auth.api_base = v.to_string();
            }
        }

        if let Some(section) = ini.section(Some(c::UPLOAD_SECTION)) {
            if let Some(v) = section.get(c::CHUNK_SIZE_KEY).and_then(|v| v.parse().ok()) {
                config.upload.chunk_size = v;
            }
            if let Some(v) = section.get(c::RETRY_COUNT_KEY).and_then(|v| v.parse().ok()) {
                config.upload.retry_count = v;
            }
            if let Some(v) = section.get(c::PRIVACY_STATUS_KEY) {
                config.upload.privacy_status = v.to_string();
            }
            if let Some(v) = section
                .get(c::DAILY_QUOTA_LIMIT_KEY)
                .and_then(|v| v.parse().ok())
            {
                config.upload.daily_quota_limit = v;
            }
            if let Some(v) = section.get(c::WORKERS_KEY).and_then(|v| v.parse().ok()) {
                config.upload.workers = v;
            }
        }

        if let Some(section) = ini.section(Some(c::METADATA_SECTION)) {
            if let Some(v) = section.get(c::TITLE_TEMPLATE_KEY) {
                config.metadata.title_template = v.to_string();
            }
            if let Some(v) = section.get(c::DESCRIPTION_TEMPLATE_KEY) {
                config.metadata.description_template = v.to_string();
            }
            if let Some(v) = section.get(c::TAGS_KEY) {
                config.metadata.tags =
                    v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
            }
        }

        if let Some(section) = ini.section(Some(c::HISTORY_SECTION)) {
            if let Some(v) = section.get(c::HISTORY_DB_KEY) {
                config.history_db = Some(PathBuf::from(v));
            }
        }

        config
    }

    /// Resolves the effective history database path: the configured
    /// override, or `crate::core::database_file()`.
    pub fn resolve_history_db(&self) -> crate::core::Result<PathBuf> {
        match &self.history_db {
            Some(path) => Ok(path.clone()),
            None => crate::core::database_file(),
        }
    }
}

/// Owns the `tokens/` directory and the `.active_profile` marker file
/// (spec.md §6). Replaces the source's module-level active-profile global
/// with an explicit collaborator constructed once at startup.
pub struct ProfileBook {
    tokens_dir: PathBuf,
    marker_file: PathBuf,
}

impl ProfileBook {
    pub fn new(tokens_dir: PathBuf, marker_file: PathBuf) -> ProfileBook {
        ProfileBook {
            tokens_dir,
            marker_file,
        }
    }

    /// Opens the default `ProfileBook`, rooted at `crate::core::tokens_dir()`
    /// / `crate::core::active_profile_file()`, migrating a legacy
    /// single-file credential into `tokens/default` on first run if found.
    pub fn open_default() -> crate::core::Result<ProfileBook> {
        let tokens_dir = crate::core::tokens_dir()?;
        let marker_file = crate::core::active_profile_file()?;
        let book = ProfileBook::new(tokens_dir, marker_file);
        book.migrate_legacy_credential()?;
        Ok(book)
    }

    fn legacy_credential_file(&self) -> PathBuf {
        self.tokens_dir
            .parent()
            .map(|home| home.join(c::LEGACY_TOKEN_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(c::LEGACY_TOKEN_FILE_NAME))
    }

    /// Migrates the well-known legacy single-file credential into
    /// `tokens/default`, once. A no-op if the legacy file is absent or the
    /// destination already exists.
    fn migrate_legacy_credential(&self) -> crate::core::Result<bool> {
        let legacy = self.legacy_credential_file();
        if !legacy.exists() {
            return Ok(false);
        }

        let destination = self.tokens_dir.join(c::DEFAULT_PROFILE_NAME);
        if destination.exists() {
            return Ok(false);
        }

        fs::create_dir_all(&self.tokens_dir)?;
        fs::copy(&legacy, &destination)?;
        log::info!(
            "migrated legacy credential {:?} to {:?}",
            legacy,
            destination
        );
        Ok(true)
    }

    /// Returns the name of the currently active profile, defaulting to
    /// `"default"` if no marker file exists yet.
    pub fn active_profile(&self) -> String {
        fs::read_to_string(&self.marker_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| c::DEFAULT_PROFILE_NAME.to_string())
    }

    /// Switches the active profile, writing the marker file. Does not
    /// require the target profile's credential file to already exist.
    pub fn set_active_profile(&self, name: &str) -> crate::core::Result<()> {
        if let Some(parent) = self.marker_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.marker_file, name)?;
        Ok(())
    }

    /// The credential file path for the named profile.
    pub fn profile_file(&self, name: &str) -> PathBuf {
        self.tokens_dir.join(name)
    }

    /// The credential file path for the currently active profile.
    pub fn active_profile_file(&self) -> PathBuf {
        self.profile_file(&self.active_profile())
    }

    /// Reads the active profile's credential file as a bearer access token,
    /// the simplest form `Credentials` can take (OAuth acquisition and
    /// refresh are out of this crate's scope per spec.md §1). `BULKUP_ACCESS_TOKEN`
    /// overrides the on-disk credential when set, the same escape hatch the
    /// teacher's `PENNSIEVE_API_TOKEN` provides for CI and scripted runs.
    pub fn active_credentials(&self) -> crate::core::Result<crate::upload::Credentials> {
        if let Ok(access_token) = env::var("BULKUP_ACCESS_TOKEN") {
            return Ok(crate::upload::Credentials { access_token });
        }
        let path = self.active_profile_file();
        if !path.exists() {
            // Surfaces before any HTTP call, Orchestrator, or UploadDriver
            // is ever constructed.
            return Err(crate::upload::Error::auth_missing().into());
        }
        let access_token = fs::read_to_string(&path)?.trim().to_string();
        Ok(crate::upload::Credentials { access_token })
    }

    /// Lists every profile with a credential file on disk.
    pub fn list_profiles(&self) -> crate::core::Result<Vec<String>> {
        if !self.tokens_dir.exists() {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.tokens_dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.upload.chunk_size, 4 * 1024 * 1024);
        assert_eq!(config.upload.retry_count, 5);
        assert_eq!(config.upload.privacy_status, "private");
        assert_eq!(config.upload.daily_quota_limit, 10_000);
    }

    #[test]
    fn from_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(
            &path,
            "[upload]\nchunk_size = 1048576\nretry_count = 3\nprivacy_status = public\n\n[metadata]\ntags = a, b\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.upload.chunk_size, 1_048_576);
        assert_eq!(config.upload.retry_count, 3);
        assert_eq!(config.upload.privacy_status, "public");
        assert_eq!(config.metadata.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn environment_overrides_layer_on_top_of_file_config() {
        let mut config = Config::default();
        assert_eq!(config.auth.api_base, "https://www.googleapis.com/youtube/v3");

        env::set_var("BULKUP_API_BASE", "https://example.invalid/v3");
        env::set_var("BULKUP_SCOPES", "scope-a, scope-b");
        config.apply_environment_overrides();
        env::remove_var("BULKUP_API_BASE");
        env::remove_var("BULKUP_SCOPES");

        assert_eq!(config.auth.api_base, "https://example.invalid/v3");
        assert_eq!(
            config.auth.scopes,
            vec!["scope-a".to_string(), "scope-b".to_string()]
        );
    }

    #[test]
    fn profile_book_defaults_to_default_profile() {
        let dir = tempdir().unwrap();
        let book = ProfileBook::new(dir.path().join("tokens"), dir.path().join(".active_profile"));
        assert_eq!(book.active_profile(), "default");
    }

    #[test]
    fn profile_book_set_active_profile_round_trips() {
        let dir = tempdir().unwrap();
        let book = ProfileBook::new(dir.path().join("tokens"), dir.path().join(".active_profile"));
        book.set_active_profile("work").unwrap();
        assert_eq!(book.active_profile(), "work");
    }

    #[test]
    fn profile_book_migrates_legacy_credential_once() {
        let dir = tempdir().unwrap();
        let home = dir.path();
        fs::write(home.join("token.json"), "{}").unwrap();
        let tokens_dir = home.join("tokens");

        let book = ProfileBook::new(tokens_dir.clone(), home.join(".active_profile"));
        assert!(book.migrate_legacy_credential().unwrap());
        assert!(tokens_dir.join("default").exists());

        // Idempotent: second call is a no-op since the destination exists.
        assert!(!book.migrate_legacy_credential().unwrap());
    }
}
