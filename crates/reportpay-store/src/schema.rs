//! Collection names.
//!
//! The relational schema lives in `migrations/`; the document store indexes
//! are created by [`crate::MongoReportStore::ensure_indexes`].

/// MongoDB collections.
pub mod collection {
    /// Report documents.
    pub const REPORTS: &str = "reports";
}
