//! Materialized paths for categories and locations

/// Path of a node: parent path followed by its own id, e.g. "1/4/9/"
pub fn node_path(parent_path: Option<&str>, id: i32) -> String {
    format!("{}{}/", parent_path.unwrap_or(""), id)
}

/// Display name built from the parent's complete name
pub fn complete_name(parent_complete_name: Option<&str>, name: &str) -> String {
    match parent_complete_name {
        Some(parent) => format!("{} / {}", parent, name),
        None => name.to_string(),
    }
}

/// True when `candidate_path` is `node_path` itself or lies below it
pub fn is_within(candidate_path: &str, node_path: &str) -> bool {
    candidate_path.starts_with(node_path)
}

/// Rewrite a descendant path after its ancestor moved from `old` to `new`
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> String {
    match path.strip_prefix(old_prefix) {
        Some(rest) => format!("{}{}", new_prefix, rest),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(node_path(None, 1), "1/");
        assert_eq!(node_path(Some("1/4/"), 9), "1/4/9/");
        assert_eq!(complete_name(Some("Văn học / Tiểu thuyết"), "Lịch sử"), "Văn học / Tiểu thuyết / Lịch sử");
        assert_eq!(complete_name(None, "Root"), "Root");
    }

    #[test]
    fn test_recursion_detection() {
        assert!(is_within("1/4/9/", "1/4/"));
        assert!(is_within("1/4/", "1/4/"));
        // "1/40/" is not below "1/4/"
        assert!(!is_within("1/40/", "1/4/"));
        assert!(!is_within("2/", "1/"));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase_path("1/4/9/", "1/4/", "7/4/"), "7/4/9/");
        assert_eq!(rebase_path("2/3/", "1/4/", "7/4/"), "2/3/");
    }
}
