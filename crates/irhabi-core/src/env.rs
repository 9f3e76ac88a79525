//! Environment access with typed defaults.
//!
//! A `.env` file in the working directory is loaded once by [`load`]; values
//! already present in the process environment win over the file.

use std::path::Path;

/// Load `.env` from the working directory. A missing file is not an error.
pub fn load() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {
            tracing::debug!("No .env file found, using process environment")
        }
        Err(e) => tracing::warn!(error = %e, "Failed to parse .env file"),
    }
}

/// Load a specific env file. Existing variables are not overridden.
pub fn load_from(path: impl AsRef<Path>) -> Result<(), dotenvy::Error> {
    dotenvy::from_path(path.as_ref()).map(|_| ())
}

/// Value of `key`, or `default` when unset or empty.
pub fn get_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) if !val.is_empty() => val,
        _ => default.to_string(),
    }
}

/// Value of `key` parsed as an integer. Zero, unset, or unparsable values
/// fall back to `default`.
pub fn get_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v != 0)
        .unwrap_or(default)
}

/// Value of `key` as a bool. Only the literal `"true"` is truthy; any other
/// non-empty value is false. Unset or empty falls back to `default`.
pub fn get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) if !val.is_empty() => val == "true",
        _ => default,
    }
}

/// Value of `key` if set and non-empty.
pub fn get_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_for_missing_keys() {
        assert_eq!(get_string("IRHABI_TEST_MISSING_STR", "fallback"), "fallback");
        assert_eq!(get_int("IRHABI_TEST_MISSING_INT", 42), 42);
        assert!(get_bool("IRHABI_TEST_MISSING_BOOL", true));
        assert!(get_optional("IRHABI_TEST_MISSING_OPT").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "IRHABI_TEST_FILE_STR=hello").unwrap();
        writeln!(file, "IRHABI_TEST_FILE_INT=12").unwrap();
        writeln!(file, "IRHABI_TEST_FILE_ZERO=0").unwrap();
        writeln!(file, "IRHABI_TEST_FILE_BOOL=true").unwrap();
        writeln!(file, "IRHABI_TEST_FILE_FALSY=yes").unwrap();

        load_from(file.path()).unwrap();

        assert_eq!(get_string("IRHABI_TEST_FILE_STR", "x"), "hello");
        assert_eq!(get_int("IRHABI_TEST_FILE_INT", 1), 12);
        assert_eq!(get_int("IRHABI_TEST_FILE_ZERO", 7), 7);
        assert!(get_bool("IRHABI_TEST_FILE_BOOL", false));
        assert!(!get_bool("IRHABI_TEST_FILE_FALSY", true));
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(load_from("/nonexistent/irhabi/.env").is_err());
    }
}
