//! Category Resolver (spec component C7)
//!
//! Looks a user-typed or AI-returned category name up against the active
//! category list. Matching is case/whitespace tolerant since both manual
//! sheet edits and model output are free text.

use std::collections::HashMap;
use tx_core::types::Category;

/// Result of resolving one name against the active category list
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// Whether an active category matched exactly
    pub found: bool,
    /// The matched category, if any
    pub category: Option<Category>,
    /// Up to `max_suggestions` near-matches, ordered starts-with before
    /// contains
    pub suggestions: Vec<Category>,
    /// Set when the input could not be resolved at all (e.g. empty input)
    pub warning: Option<String>,
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Resolve one name against the active category list
pub fn resolve(name: &str, active_categories: &[Category], max_suggestions: usize) -> ResolveResult {
    let folded_input = fold(name);
    if folded_input.is_empty() {
        return ResolveResult {
            found: false,
            category: None,
            suggestions: Vec::new(),
            warning: Some("empty".to_string()),
        };
    }

    if let Some(category) = active_categories
        .iter()
        .filter(|c| c.is_active)
        .find(|c| fold(&c.name) == folded_input)
    {
        return ResolveResult {
            found: true,
            category: Some(category.clone()),
            suggestions: Vec::new(),
            warning: None,
        };
    }

    let mut starts_with: Vec<&Category> = Vec::new();
    let mut contains: Vec<&Category> = Vec::new();
    for category in active_categories.iter().filter(|c| c.is_active) {
        let folded_name = fold(&category.name);
        if folded_name.starts_with(&folded_input) {
            starts_with.push(category);
        } else if folded_name.contains(&folded_input) {
            contains.push(category);
        }
    }

    let suggestions = starts_with
        .into_iter()
        .chain(contains)
        .take(max_suggestions)
        .cloned()
        .collect();

    ResolveResult {
        found: false,
        category: None,
        suggestions,
        warning: None,
    }
}

/// Resolve each unique name in `names` against the active category list
pub fn resolve_many(
    names: &[String],
    active_categories: &[Category],
    max_suggestions: usize,
) -> HashMap<String, ResolveResult> {
    let mut results = HashMap::new();
    for name in names {
        results
            .entry(name.clone())
            .or_insert_with(|| resolve(name, active_categories, max_suggestions));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tx_core::types::CategoryId;

    fn category(name: &str, is_active: bool) -> Category {
        let now = Utc::now();
        Category {
            id: CategoryId::new(),
            name: name.to_string(),
            description: String::new(),
            examples: Vec::new(),
            is_active,
            created_at: now,
            modified_at: now,
        }
    }

    #[test]
    fn resolves_case_and_whitespace_insensitively() {
        let categories = vec![category("Groceries", true)];
        let result = resolve("  GROCERIES  ", &categories, 5);
        assert!(result.found);
        assert_eq!(result.category.unwrap().name, "Groceries");
    }

    #[test]
    fn never_matches_an_inactive_category() {
        let categories = vec![category("Groceries", false)];
        let result = resolve("groceries", &categories, 5);
        assert!(!result.found);
    }

    #[test]
    fn empty_input_returns_empty_warning() {
        let categories = vec![category("Groceries", true)];
        let result = resolve("   ", &categories, 5);
        assert!(!result.found);
        assert_eq!(result.warning.as_deref(), Some("empty"));
    }

    #[test]
    fn suggests_starts_with_before_contains() {
        let categories = vec![
            category("Home Groceries", true), // matches by "contains", not "starts_with"
            category("Groceries", false),     // inactive, never suggested
            category("Grocery Delivery", true), // matches by "starts_with"
        ];
        let result = resolve("Groc", &categories, 5);
        assert!(!result.found);
        assert_eq!(result.suggestions.len(), 2);
        assert_eq!(result.suggestions[0].name, "Grocery Delivery");
        assert_eq!(result.suggestions[1].name, "Home Groceries");
    }

    #[test]
    fn respects_max_suggestions() {
        let categories = vec![
            category("Groceries A", true),
            category("Groceries B", true),
            category("Groceries C", true),
        ];
        let result = resolve("Groceries", &categories, 2);
        assert_eq!(result.suggestions.len(), 2);
    }
}
