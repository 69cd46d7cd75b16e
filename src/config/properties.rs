//! Profile properties artifact.
//!
//! Each container profile ships a small generated key/value file under
//! `<install_dir>/config/<profile>.container.properties`. The container
//! reads it to learn its management bind port; the supervisor reads the
//! same file to discover where to connect. Absence of the file is not an
//! error anywhere, callers fall back to documented defaults.

use crate::config::types::{Result, DEFAULT_MANAGEMENT_PORT, PROP_MANAGEMENT_PORT};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the properties artifact for a profile.
pub fn profile_properties_path(install_dir: &Path, profile: &str) -> PathBuf {
    install_dir
        .join("config")
        .join(format!("{}.container.properties", profile))
}

/// Parse a `key=value` properties file. Blank lines and lines starting
/// with `#` are skipped; values may contain `=`.
pub fn load_properties(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_properties(&content))
}

fn parse_properties(content: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    props
}

/// Resolve the remote management port for a profile, falling back to
/// [`DEFAULT_MANAGEMENT_PORT`] when the artifact is absent, unreadable
/// or does not carry a parseable port.
pub fn management_port(install_dir: &Path, profile: &str) -> u16 {
    let path = profile_properties_path(install_dir, profile);

    let props = match load_properties(&path) {
        Ok(props) => props,
        Err(e) => {
            log::debug!(
                "Could not read properties [{}]: {}, using default port {}",
                path.display(),
                e,
                DEFAULT_MANAGEMENT_PORT
            );
            return DEFAULT_MANAGEMENT_PORT;
        }
    };

    match props.get(PROP_MANAGEMENT_PORT).map(|s| s.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(e)) => {
            log::warn!(
                "Invalid management port in [{}]: {}, using default {}",
                path.display(),
                e,
                DEFAULT_MANAGEMENT_PORT
            );
            DEFAULT_MANAGEMENT_PORT
        }
        None => DEFAULT_MANAGEMENT_PORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rigbox-props-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("config")).unwrap();
        dir
    }

    #[test]
    fn test_parse_properties_skips_comments_and_blanks() {
        let props = parse_properties("# comment\n\nfoo=bar\nspaced = value = x\n");
        assert_eq!(props.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(props.get("spaced").map(String::as_str), Some("value = x"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_management_port_fallback_when_absent() {
        let dir = scratch_dir("absent");
        assert_eq!(management_port(&dir, "common"), DEFAULT_MANAGEMENT_PORT);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_management_port_from_artifact() {
        let dir = scratch_dir("present");
        fs::write(
            profile_properties_path(&dir, "common"),
            format!("{}=9990\n", PROP_MANAGEMENT_PORT),
        )
        .unwrap();
        assert_eq!(management_port(&dir, "common"), 9990);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_management_port_fallback_on_garbage() {
        let dir = scratch_dir("garbage");
        fs::write(
            profile_properties_path(&dir, "common"),
            format!("{}=not-a-port\n", PROP_MANAGEMENT_PORT),
        )
        .unwrap();
        assert_eq!(management_port(&dir, "common"), DEFAULT_MANAGEMENT_PORT);
        let _ = fs::remove_dir_all(&dir);
    }
}
