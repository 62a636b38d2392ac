use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("cannot determine the user's home directory")]
    HomeMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    let rest = match raw.strip_prefix('~') {
        Some(rest) => rest.trim_start_matches(['/', '\\']),
        None => return Ok(PathBuf::from(raw)),
    };
    let home = dirs::home_dir().ok_or(HomeDirError::HomeMissing)?;
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

/// Resolve the server home directory.
///
/// A configured path may start with `~` and must be absolute afterwards.
/// Without one, `<user home>/<default_subdir>` is used (`%APPDATA%` on
/// Windows). The directory is created when `create` is set.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match config_home {
        Some(raw) => {
            let expanded = expand_tilde(&raw)?;
            if !expanded.is_absolute() {
                return Err(HomeDirError::AbsoluteRequired(
                    expanded.to_string_lossy().into(),
                ));
            }
            expanded
        }
        None => default_base()?.join(default_subdir),
    };

    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

#[cfg(target_os = "windows")]
fn default_base() -> Result<PathBuf, HomeDirError> {
    dirs::config_dir().ok_or(HomeDirError::HomeMissing)
}

#[cfg(not(target_os = "windows"))]
fn default_base() -> Result<PathBuf, HomeDirError> {
    dirs::home_dir().ok_or(HomeDirError::HomeMissing)
}

/// Join `file` onto `base` unless it is already absolute.
pub fn resolve_under(base: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
