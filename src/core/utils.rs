use dirs::home_dir;
use std::{
    env,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Environment variable that overrides the data directory.
pub const HOME_ENV: &str = "EXPENSE_CORE_HOME";

const DEFAULT_DIR_NAME: &str = ".expense_core";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const BOOK_FILE: &str = "expense_book.json";
const DATABASE_FILE: &str = "expenses.db";
const TMP_SUFFIX: &str = "tmp";

/// Returns the application-specific data directory, defaulting to `~/.expense_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Resolves every file the crate persists relative to a base directory.
pub struct PathResolver;

impl PathResolver {
    pub fn base_dir() -> PathBuf {
        app_data_dir()
    }

    /// Uses `root` when given, otherwise the default data directory.
    pub fn resolve_base(root: Option<PathBuf>) -> PathBuf {
        root.unwrap_or_else(Self::base_dir)
    }

    pub fn config_dir_in(base: &Path) -> PathBuf {
        base.join(CONFIG_DIR)
    }

    pub fn config_file_in(base: &Path) -> PathBuf {
        Self::config_dir_in(base).join(CONFIG_FILE)
    }

    pub fn book_file_in(base: &Path) -> PathBuf {
        base.join(BOOK_FILE)
    }

    pub fn database_file_in(base: &Path) -> PathBuf {
        base.join(DATABASE_FILE)
    }
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to a sibling temp file and renames it over `path`.
pub fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)
}
