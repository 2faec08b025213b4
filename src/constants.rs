//! # Constants
//!
//! Shared constants used throughout kubesec.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default upper bound for a single cluster call (seconds)
/// A call that does not finish in time is killed and reported as failed
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// Lower bound for the per-call timeout; zero would fail every call
pub const MIN_COMMAND_TIMEOUT_SECS: u64 = 1;

/// Default kubectl binary looked up on `PATH`
pub const DEFAULT_KUBECTL_PATH: &str = "kubectl";

/// Namespace used when no selection filter is supplied
pub const DEFAULT_NAMESPACE: &str = "default";

/// The only Secret type kubesec reads or writes
pub const OPAQUE_SECRET_TYPE: &str = "Opaque";

/// Lines of context shown above and below a `find` match
pub const SEARCH_CONTEXT_LINES: usize = 2;

/// Matching lines previewed per key before `update-value` asks for confirmation
/// Display cap only, every occurrence is still replaced
pub const DEFAULT_PREVIEW_LINES: usize = 5;

/// Maximum width of old/new values echoed in the `update-value` banner
pub const BANNER_VALUE_WIDTH: usize = 60;

/// Maximum width of a previewed line in the `update-value` diff
pub const PREVIEW_LINE_WIDTH: usize = 80;

/// Folder prefix for `backup` runs (followed by the context name)
pub const BACKUP_FOLDER_PREFIX: &str = "kubesec-backup";

/// Folder prefix for the snapshot taken before `update-value` mutates anything
pub const ROLLBACK_FOLDER_PREFIX: &str = "kubesec-rollback";

/// Timestamp format appended to backup folder names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Separator line framing the secrets-file header
pub const SECRETS_FILE_RULE: &str = "#######################################";

/// Field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "kubesec";

/// Width of the `=` rule printed around command banners
pub const BANNER_RULE_WIDTH: usize = 45;
