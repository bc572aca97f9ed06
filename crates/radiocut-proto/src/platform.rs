use std::path::PathBuf;

pub const MP3WRAP_ENV: &str = "MP3WRAP_PATH";

pub fn config_dir() -> PathBuf {
    // On Windows, check for portable config.toml in executable directory first
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_config = exe_dir.join("config.toml");
                if portable_config.exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    // On macOS and Linux, always use ~/.config/radiocut/
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("radiocut")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("radiocut")
    }
}

#[cfg(unix)]
fn mp3wrap_binary_names() -> &'static [&'static str] {
    &["mp3wrap"]
}

#[cfg(windows)]
fn mp3wrap_binary_names() -> &'static [&'static str] {
    &["mp3wrap.exe", "mp3wrap"]
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Find the mp3wrap binary used to join chunk files.
///
/// Searches in order:
/// 1. `MP3WRAP_PATH` environment variable
/// 2. Beside the current executable (or its `external/` folder)
/// 3. PATH
pub fn find_mp3wrap_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(MP3WRAP_ENV) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(p) = find_beside_exe(mp3wrap_binary_names()) {
        return Some(p);
    }

    find_on_path(mp3wrap_binary_names())
}

/// Bare binary name, for when discovery fails and the OS lookup is the last resort.
pub fn mp3wrap_fallback_name() -> &'static str {
    mp3wrap_binary_names()[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_is_namespaced() {
        assert!(config_dir().ends_with("radiocut"));
    }

    #[test]
    fn missing_binaries_are_not_found_on_empty_path() {
        assert!(find_on_path(&["definitely-not-a-real-binary-name"]).is_none());
    }
}
