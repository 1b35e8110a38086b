/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Part counts reported by the machine. Negative means unknown.
pub type Quantity = i32;
