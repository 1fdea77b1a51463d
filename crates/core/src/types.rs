/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Relevance scores as reported by the search engine.
pub type Score = f64;
