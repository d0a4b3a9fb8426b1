//! Shared guardrails for lookup payload bounds.

pub const MAX_QUERY_LENGTH: usize = 512;
pub const MAX_SEARCH_LIMIT: i64 = 100;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

pub fn clamp_int(value: i64, minimum: i64, maximum: i64) -> i64 {
    value.max(minimum).min(maximum)
}

pub fn clamp_limit(value: i64, maximum: i64) -> i64 {
    clamp_int(value, 1, maximum)
}

/// Trim and cap a query at [`MAX_QUERY_LENGTH`] bytes on a char boundary.
pub fn truncate_query(query: &str) -> String {
    let stripped = query.trim();
    if stripped.len() <= MAX_QUERY_LENGTH {
        return stripped.to_string();
    }
    let mut end = MAX_QUERY_LENGTH;
    while !stripped.is_char_boundary(end) {
        end -= 1;
    }
    stripped[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_bounds() {
        assert_eq!(clamp_limit(0, MAX_SEARCH_LIMIT), 1);
        assert_eq!(clamp_limit(-5, MAX_SEARCH_LIMIT), 1);
        assert_eq!(clamp_limit(5_000, MAX_SEARCH_LIMIT), MAX_SEARCH_LIMIT);
        assert_eq!(clamp_limit(42, MAX_SEARCH_LIMIT), 42);
    }

    #[test]
    fn truncate_query_trims_and_caps() {
        assert_eq!(truncate_query("  widget  "), "widget");
        assert_eq!(truncate_query(&"a".repeat(600)).len(), MAX_QUERY_LENGTH);
    }

    #[test]
    fn truncate_query_respects_char_boundaries() {
        let query = "é".repeat(400);
        let truncated = truncate_query(&query);
        assert!(truncated.len() <= MAX_QUERY_LENGTH);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
