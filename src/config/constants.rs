//! Program level configuration constants and `config.ini` section/key names.

/// Console/file logging output format, unchanged from the teacher's
/// `AGENT_LOG_FORMAT`.
pub const LOG_FORMAT: &str =
    "[{d(%Y-%m-%d %H:%M:%S %Z)(utc)}][{l}][{t}] {m}{n}";

/// Section and key names used when parsing/writing `config.ini`.
pub const AUTH_SECTION: &str = "auth";
pub const UPLOAD_SECTION: &str = "upload";
pub const METADATA_SECTION: &str = "metadata";
pub const HISTORY_SECTION: &str = "history";

pub const CLIENT_SECRETS_FILE_KEY: &str = "client_secrets_file";
pub const SCOPES_KEY: &str = "scopes";
pub const TOKEN_FILE_KEY: &str = "token_file";

pub const CHUNK_SIZE_KEY: &str = "chunk_size";
pub const RETRY_COUNT_KEY: &str = "retry_count";
pub const PRIVACY_STATUS_KEY: &str = "privacy_status";
pub const DAILY_QUOTA_LIMIT_KEY: &str = "daily_quota_limit";
pub const WORKERS_KEY: &str = "workers";

pub const TITLE_TEMPLATE_KEY: &str = "title_template";
pub const DESCRIPTION_TEMPLATE_KEY: &str = "description_template";
pub const TAGS_KEY: &str = "tags";

pub const HISTORY_DB_KEY: &str = "history_db";

pub const UPLOAD_ENDPOINT_KEY: &str = "upload_endpoint";
pub const API_BASE_KEY: &str = "api_base";

/// Default remote scope requested for OAuth, out of this crate's scope to
/// acquire but still a value it threads through to the (external) acquirer.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// Default resumable-upload session endpoint for the `ResumableUploadDriver`.
pub const DEFAULT_UPLOAD_ENDPOINT: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable";

/// Default REST base for the `HttpPlaylistDriver`/`HttpUploadsLister`.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Well-known legacy single-file credential name, migrated once into
/// `tokens/default` on first run (spec.md §6).
pub const LEGACY_TOKEN_FILE_NAME: &str = "token.json";

/// Name of the active-profile marker file.
pub const ACTIVE_PROFILE_FILE_NAME: &str = ".active_profile";

/// Default profile name used when no `.active_profile` marker exists yet.
pub const DEFAULT_PROFILE_NAME: &str = "default";
