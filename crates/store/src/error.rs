/// Crate-wide result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed fingerprint-store errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store could not be reached or the query failed.
    ///
    /// Non-fatal at runtime: the pipeline maps this through its
    /// fail-open/fail-closed policy instead of crashing.
    #[error("fingerprint store unavailable: {source}")]
    Unavailable {
        #[from]
        source: sqlx::Error,
    },

    /// A stored row could not be decoded into a [`crate::DeliveryRecord`].
    #[error("corrupt delivery record for {identity}: {message}")]
    Corrupt { identity: String, message: String },
}
