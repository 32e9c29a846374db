//! Manual Override Handler (spec component C11)
//!
//! Reacts to user edits in the "Manual Category" column and resolves the
//! typed name against the active category list, without re-entering the
//! normalization or AI categorization pipelines.

use crate::types::{BatchEditEvent, CellRange, CellUpdate, EditEvent, EventSource};
use tracing::warn;
use tx_categorization::resolver;
use tx_core::types::Category;

/// Resolves manual-category edits for one sheet/column configuration
pub struct OverrideHandler {
    manual_category_column: String,
    max_suggestions: usize,
}

impl OverrideHandler {
    /// Build a handler watching `manual_category_column`; suggestions
    /// offered by the resolver (not surfaced on `CellUpdate` itself, but
    /// available to a caller that wants them) are capped at `max_suggestions`
    pub fn new(manual_category_column: impl Into<String>, max_suggestions: usize) -> crate::Result<Self> {
        let manual_category_column = manual_category_column.into();
        if manual_category_column.trim().is_empty() {
            return Err(crate::Error::InvalidColumn);
        }
        Ok(Self { manual_category_column, max_suggestions })
    }

    /// Handle one single-cell edit
    ///
    /// Returns `None` when the event doesn't qualify: not user-sourced, or
    /// not in the manual-category column. Both guards must pass in order
    /// before anything is resolved.
    pub fn handle(&self, event: &EditEvent, active_categories: &[Category]) -> Option<CellUpdate> {
        if !self.qualifies(&event.source, &event.range) {
            return None;
        }
        Some(self.resolve_row(event.range.start_row, &event.new_value, active_categories))
    }

    /// Handle a bulk edit across `event.range.start_row..=end_row`
    ///
    /// Same guards as [`Self::handle`]; an empty vec means the event didn't
    /// qualify.
    pub fn handle_batch(&self, event: &BatchEditEvent, active_categories: &[Category]) -> Vec<CellUpdate> {
        if !self.qualifies(&event.source, &event.range) {
            return Vec::new();
        }
        event
            .new_values
            .iter()
            .enumerate()
            .map(|(offset, new_value)| {
                let row = event.range.start_row + offset as u32;
                self.resolve_row(row, new_value, active_categories)
            })
            .collect()
    }

    fn qualifies(&self, source: &EventSource, range: &CellRange) -> bool {
        *source == EventSource::User && range.column == self.manual_category_column
    }

    fn resolve_row(&self, row: u32, new_value: &str, active_categories: &[Category]) -> CellUpdate {
        if new_value.trim().is_empty() {
            return CellUpdate {
                row,
                category_id: None,
                normalized_value: Some(String::new()),
                warning: None,
            };
        }

        let result = resolver::resolve(new_value, active_categories, self.max_suggestions);
        if result.found {
            let category = result.category.expect("found implies category is Some");
            CellUpdate {
                row,
                category_id: Some(category.id),
                normalized_value: Some(new_value.trim().to_string()),
                warning: None,
            }
        } else {
            let warning = format!("custom category: {}", new_value.trim());
            warn!(row, new_value = new_value.trim(), "manual override did not resolve to an active category");
            CellUpdate {
                row,
                category_id: None,
                normalized_value: None,
                warning: Some(warning),
            }
        }
    }
}
