//! Path parsing and comparison: validation, parent/name splitting, ancestor
//! testing and lowest-common-ancestor computation, all by component rather
//! than raw substring matching.
//!
//! Every path, including intermediate parent paths, begins and ends with
//! `/`; `"/"` alone denotes the root. This lets ancestor/prefix checks be
//! plain byte-string comparisons: a `/`-delimited boundary can never be
//! mistaken for a mid-component match.

/// The longest a path string may be.
pub const MAX_PATH_LENGTH: usize = 4095;

/// The longest a single path component (segment between slashes) may be.
pub const MAX_COMPONENT_LENGTH: usize = 255;

/// Whether `path` is `"/"`, or of the form `(/[a-z]{1,MAX_COMPONENT_LENGTH})+/`,
/// within `MAX_PATH_LENGTH`.
pub(crate) fn valid(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    if path.len() > MAX_PATH_LENGTH || !path.starts_with('/') || !path.ends_with('/') {
        return false;
    }
    let inner = &path[1..path.len() - 1];
    !inner.is_empty()
        && inner.split('/').all(|component| {
            !component.is_empty()
                && component.len() <= MAX_COMPONENT_LENGTH
                && component.bytes().all(|b| b.is_ascii_lowercase())
        })
}

/// Splits `path` into its parent path and final component name.
///
/// `parent_path + last_name + "/" == path`. Returns `None` for the root,
/// which has no parent. `path` must be valid.
pub(crate) fn split_parent(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let trimmed = &path[..path.len() - 1];
    let idx = trimmed
        .rfind('/')
        .expect("valid non-root path has an internal '/'");
    Some((&path[..idx + 1], &trimmed[idx + 1..]))
}

/// The path's components, root-to-leaf. Empty for the root.
pub(crate) fn component_list(path: &str) -> Vec<&str> {
    if path == "/" {
        Vec::new()
    } else {
        path[1..path.len() - 1].split('/').collect()
    }
}

pub(crate) fn depth(path: &str) -> usize {
    component_list(path).len()
}

/// Whether `ancestor` is `descendant` or a proper ancestor of it.
///
/// Valid, since both args are delimited by `/` at every boundary, a plain
/// prefix test is exact at component boundaries.
pub(crate) fn is_ancestor(ancestor: &str, descendant: &str) -> bool {
    descendant.starts_with(ancestor)
}

/// The lowest common ancestor path of `a` and `b`.
pub(crate) fn lca(a: &str, b: &str) -> String {
    let a_components = component_list(a);
    let b_components = component_list(b);
    let shared = a_components
        .iter()
        .zip(b_components.iter())
        .take_while(|(x, y)| x == y)
        .count();
    let mut out = String::from("/");
    for component in &a_components[..shared] {
        out.push_str(component);
        out.push('/');
    }
    out
}

/// The components of `descendant` that lie beyond `ancestor`.
///
/// `ancestor` must actually be an ancestor of (or equal to) `descendant`.
pub(crate) fn suffix_after<'a>(ancestor: &str, descendant: &'a str) -> Vec<&'a str> {
    let mut components = component_list(descendant);
    components.split_off(depth(ancestor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_valid() {
        assert!(valid("/"));
    }

    #[test]
    fn rejects_missing_slashes_uppercase_and_digits() {
        assert!(!valid("/a"));
        assert!(!valid("a/"));
        assert!(!valid("/A/"));
        assert!(!valid("/a1/"));
        assert!(!valid("//"));
        assert!(!valid("/a//b/"));
    }

    #[test]
    fn accepts_nested_lowercase_path() {
        assert!(valid("/a/bc/d/"));
    }

    #[test]
    fn split_parent_of_root_is_none() {
        assert_eq!(split_parent("/"), None);
    }

    #[test]
    fn split_parent_of_top_level_entry() {
        assert_eq!(split_parent("/a/"), Some(("/", "a")));
    }

    #[test]
    fn split_parent_of_nested_entry() {
        assert_eq!(split_parent("/a/b/c/"), Some(("/a/b/", "c")));
    }

    #[test]
    fn is_ancestor_cases() {
        assert!(is_ancestor("/", "/a/b/"));
        assert!(is_ancestor("/a/", "/a/"));
        assert!(is_ancestor("/a/", "/a/b/"));
        assert!(!is_ancestor("/a/", "/ab/"));
        assert!(!is_ancestor("/a/b/", "/a/"));
    }

    #[test]
    fn lca_of_siblings() {
        assert_eq!(lca("/a/b/", "/a/c/"), "/a/");
    }

    #[test]
    fn lca_of_unrelated_paths_is_root() {
        assert_eq!(lca("/a/", "/b/"), "/");
    }

    #[test]
    fn suffix_after_ancestor() {
        assert_eq!(suffix_after("/a/", "/a/b/c/"), vec!["b", "c"]);
        assert_eq!(suffix_after("/", "/a/b/"), vec!["a", "b"]);
    }
}
