//! Storage limits and fixed sizes
//!
//! All limits use big-endian naming with units:
//! `CATEGORY_SPECIFICS_UNIT_LIMIT`, e.g. `SAVE_ALL_WORKERS_COUNT_MAX`
//! (not `MAX_WORKERS`).

// =============================================================================
// Batch Limits
// =============================================================================

/// Maximum workers for the parallel batch save path
pub const SAVE_ALL_WORKERS_COUNT_MAX: usize = 8;

/// Minimum workers for the parallel batch save path
pub const SAVE_ALL_WORKERS_COUNT_MIN: usize = 2;

// =============================================================================
// Relational Column Sizes
// =============================================================================

/// Column length for bounded text and unmapped kinds
pub const SQL_TEXT_LEN_DEFAULT: u32 = 255;

/// Column length for enumeration names
pub const SQL_ENUM_LEN: u32 = 64;

/// Column length for canonical identifier strings
pub const SQL_ID_LEN: u32 = 36;

/// Precision of fixed-precision decimal columns
pub const SQL_DECIMAL_PRECISION: u32 = 38;

/// Scale of fixed-precision decimal columns
pub const SQL_DECIMAL_SCALE: u32 = 10;

// =============================================================================
// Connection Limits
// =============================================================================

/// Default connection pool size for the relational backend
pub const SQL_POOL_CONNECTIONS_COUNT_DEFAULT: u32 = 10;

// =============================================================================
// Scan Limits
// =============================================================================

/// Limit used when a bounded scan needs an offset without a caller limit
/// (MySQL cannot express OFFSET alone)
pub const FIND_ALL_LIMIT_UNBOUNDED: i64 = i64::MAX;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_limits_valid() {
        assert!(SAVE_ALL_WORKERS_COUNT_MIN <= SAVE_ALL_WORKERS_COUNT_MAX);
        assert!(SAVE_ALL_WORKERS_COUNT_MIN > 0);
    }

    #[test]
    fn test_column_sizes_valid() {
        assert!(SQL_ID_LEN >= 36);
        assert!(SQL_ENUM_LEN <= SQL_TEXT_LEN_DEFAULT);
        assert!(SQL_DECIMAL_SCALE < SQL_DECIMAL_PRECISION);
    }
}
