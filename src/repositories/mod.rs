//! Data access layer: SQL against the shared SQLite pool, nothing else.

pub mod sys_log_repository;
pub mod user_repository;

/// Row offset of a 1-based page. Saturates instead of overflowing, so an
/// out-of-range page reads as an empty one.
pub(crate) fn page_offset(page: i64, size: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(size.max(0))
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_saturates() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(i64::MAX, 100), i64::MAX);
        assert_eq!(page_offset(i64::MIN, 100), 0);
    }
}
