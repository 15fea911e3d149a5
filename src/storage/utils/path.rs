// Path helper utilities shared across storage backends
use crate::error::{InvalidNameSnafu, Result};
use crate::storage::Namespace;
use snafu::ensure;

/// Reject names that are empty or would escape their namespace.
pub fn validate_name(field: &str, name: &str) -> Result<()> {
    ensure!(
        !name.trim().is_empty(),
        InvalidNameSnafu {
            field,
            reason: "must not be empty",
        }
    );
    ensure!(
        !name.contains(['/', '\\']),
        InvalidNameSnafu {
            field,
            reason: format!("'{name}' must not contain path separators"),
        }
    );
    ensure!(
        name != "." && name != "..",
        InvalidNameSnafu {
            field,
            reason: format!("'{name}' is not a file name"),
        }
    );
    Ok(())
}

/// Return a new String that guarantees a trailing '/'.
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Build the object key for a name inside a namespace, e.g. `trash/a.txt`.
pub fn object_key(namespace: Namespace, name: &str) -> String {
    format!("{}{name}", namespace_prefix(namespace))
}

/// Key prefix of a namespace, with trailing '/'.
pub fn namespace_prefix(namespace: Namespace) -> String {
    ensure_trailing_slash(namespace.as_str())
}

/// Strip the namespace prefix from a listed key.
///
/// Returns `None` for the bare prefix itself (the directory marker) and for
/// keys nested deeper than one level.
pub fn strip_namespace<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    let key = key.trim_start_matches('/');
    let name = key.strip_prefix(prefix)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name)
}
