//! Translation of glob path filters into SQL `LIKE` predicates.
//!
//! `LIKE` matches ASCII letters case-insensitively, so `*.JPG` also selects
//! `a.jpg`. Other characters compare exactly.

use thaw_core::PathFilters;

/// Escape character used in every generated `LIKE` pattern.
const ESCAPE: char = '\\';

/// Convert a glob (`*`, `?`) to a `LIKE` pattern, escaping literal `%` and `_`.
pub(crate) fn glob_to_like(pattern: &str) -> String {
    let mut like = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => like.push('%'),
            '?' => like.push('_'),
            '%' | '_' | ESCAPE => {
                like.push(ESCAPE);
                like.push(c);
            }
            other => like.push(other),
        }
    }
    like
}

/// `WHERE` clause over `basePath` and its bind values. Empty for no filters.
pub(crate) fn where_clause(filters: &PathFilters) -> (String, Vec<String>) {
    if filters.is_empty() {
        return (String::new(), Vec::new());
    }

    let predicates = vec![r"basePath LIKE ? ESCAPE '\'"; filters.patterns().len()];
    let binds = filters.patterns().iter().map(|p| glob_to_like(p)).collect();
    (format!("WHERE {}", predicates.join(" OR ")), binds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_like() {
        assert_eq!(glob_to_like("photos/*.jpg"), "photos/%.jpg");
        assert_eq!(glob_to_like("a?c"), "a_c");
        assert_eq!(glob_to_like("100%_done"), r"100\%\_done");
    }

    #[test]
    fn test_where_clause() {
        let (clause, binds) = where_clause(&PathFilters::new(["a/*", "b/?"]));
        assert_eq!(
            clause,
            r"WHERE basePath LIKE ? ESCAPE '\' OR basePath LIKE ? ESCAPE '\'"
        );
        assert_eq!(binds, vec!["a/%".to_string(), "b/_".to_string()]);
    }

    #[test]
    fn test_no_filters_no_clause() {
        let (clause, binds) = where_clause(&PathFilters::all());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
    }
}
