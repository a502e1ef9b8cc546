//! Posix-style path helpers.
//!
//! Api paths, fetch URLs and rewritten import specifiers always use forward
//! slashes, whatever the host platform, so they are handled as strings
//! rather than `std::path::Path`.

/// Joins segments with `/` and normalizes the result.
///
/// Empty segments are skipped; a leading `/` on the first non-empty segment
/// keeps the result absolute.
pub fn join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .filter(|p| !p.as_ref().is_empty())
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/");

    normalize(&joined)
}

/// Lexically normalizes a path: collapses repeated slashes, drops `.`
/// segments and folds `..` into its parent where one exists.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    if absolute {
        format!("/{}", body)
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

/// Joins `parts` under `root`, dropping any `..` that would climb above it.
pub fn join_under<I, S>(root: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let relative = join(parts);
    let inside = relative
        .split('/')
        .skip_while(|segment| *segment == "..")
        .collect::<Vec<_>>()
        .join("/");
    join([root, inside.as_str()])
}

/// Returns the parent of a posix path, or `.` when there is none.
pub fn dirname(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Whether an import specifier is relative to the importing file.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_skips_empty_segments() {
        assert_eq!(join(["", "api", "admin/products"]), "api/admin/products");
        assert_eq!(join(["/", "api", "admin", "products"]), "/api/admin/products");
        assert_eq!(join(["/admin/", "/api/", "crud"]), "/admin/api/crud");
    }

    #[test]
    fn test_normalize_parent_segments() {
        assert_eq!(normalize("@/api/admin/products/../types"), "@/api/admin/types");
        assert_eq!(normalize("./a/./b"), "a/b");
        assert_eq!(normalize("../x"), "../x");
        assert_eq!(normalize("/../x"), "/x");
        assert_eq!(normalize(""), ".");
    }

    #[test]
    fn test_join_under_clamps_at_root() {
        assert_eq!(join_under("@", ["api/crud/products", "../types"]), "@/api/crud/types");
        assert_eq!(join_under("@", ["api/crud/products", "../../../../shared"]), "@/shared");
        assert_eq!(join_under("@", ["api", "../.."]), "@");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("api/admin/products/index.ts"), "api/admin/products");
        assert_eq!(dirname("index.ts"), ".");
        assert_eq!(dirname("/index.ts"), "/");
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("./types"));
        assert!(is_relative("../types"));
        assert!(!is_relative("@/types"));
        assert!(!is_relative("vue"));
        assert!(!is_relative(".hidden"));
    }
}
