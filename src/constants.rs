// persistence
pub const GROUPS_KEY: &str = "changegroups.groups";
pub const STORE_VERSION: u32 = 1;
pub const STORE_FILE_NAME: &str = "changegroups.json";

// config
pub const CONFIG_DIR_NAME: &str = "git-changegroups";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_CONFIG: &str = "GIT_CHANGEGROUPS_CONFIG";
pub const ENV_STORE: &str = "GIT_CHANGEGROUPS_STORE";
pub const ENV_VERBOSE: &str = "GIT_CHANGEGROUPS_VERBOSE";

// commit message
pub const MAX_LINE_LENGTH: usize = 72;

// ui
pub const MAX_FILES_TO_SHOW: usize = 10;
pub const SHORT_ID_LENGTH: usize = 8;
pub const MIN_ID_PREFIX_LENGTH: usize = 4;

// watch
pub const WATCH_DEBOUNCE_MS: u64 = 500;
