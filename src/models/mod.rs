use chrono::{DateTime, Utc};

/// A row of the `notes` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Never set by this service.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The fields a client submits; id and timestamps are assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub description: String,
}
