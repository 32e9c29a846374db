//! Wire-shape types for user edit events and the cell writes they produce

use serde::{Deserialize, Serialize};
use tx_core::types::CategoryId;

/// Where an edit came from
///
/// Distinguishing `User` from `SystemWrite` is what keeps this system's own
/// writes (an AI assignment, a previous override) from re-entering itself:
/// an event tagged `SystemWrite` is always ignored by [`crate::handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// A human edited the cell directly
    User,
    /// This system wrote the cell itself
    SystemWrite,
}

/// The cell range an edit touched
///
/// `start_row == end_row` for a single-cell edit; the batch variant spans a
/// wider range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    /// Canonical column name the edit landed in
    pub column: String,
    /// First affected row, inclusive
    pub start_row: u32,
    /// Last affected row, inclusive
    pub end_row: u32,
}

/// A single-cell edit, as reported by the spreadsheet adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditEvent {
    /// Cell the edit touched
    pub range: CellRange,
    /// Who made the edit
    pub source: EventSource,
    /// Value before the edit
    pub old_value: String,
    /// Value after the edit
    pub new_value: String,
}

/// A bulk edit across `range.start_row..=range.end_row`, one new value per row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEditEvent {
    /// Rows the edit touched
    pub range: CellRange,
    /// Who made the edit
    pub source: EventSource,
    /// New cell value per row, in row order
    pub new_values: Vec<String>,
}

/// What the handler wants written back for one row
///
/// The handler never writes this itself — whatever calls it is responsible
/// for applying the update through the Result Store / sheet adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellUpdate {
    /// Row this update applies to
    pub row: u32,
    /// New `category_manual_id`, `None` to clear it
    pub category_id: Option<CategoryId>,
    /// Normalized cell text to write back, if the resolver changed it
    pub normalized_value: Option<String>,
    /// A "custom category" warning to log, when the name didn't resolve
    pub warning: Option<String>,
}
