use lockbox_core::Lockbox;

/// Reserved category filter value selecting entries with no category. Distinct
/// from passing no filter at all.
pub const UNCATEGORIZED_FILTER: &str = "__uncategorized__";

/// Pure view over the canonical collection for search and category filtering.
///
/// Search text is trimmed and matched case-insensitively as a substring of the
/// name or category; empty search passes everything. `None` for the category
/// filter means no restriction. Output preserves canonical order.
pub fn filter_lockboxes<'a>(
    entries: &'a [Lockbox],
    search_text: &str,
    category_filter: Option<&str>,
) -> Vec<&'a Lockbox> {
    let query = search_text.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| {
            if !query.is_empty() {
                let name_hit = e.name.to_lowercase().contains(&query);
                let category_hit = e
                    .category
                    .as_ref()
                    .is_some_and(|c| c.to_lowercase().contains(&query));
                if !name_hit && !category_hit {
                    return false;
                }
            }
            match category_filter {
                None => true,
                Some(filter) if filter == UNCATEGORIZED_FILTER => e.category.is_none(),
                Some(filter) => e.category.as_deref() == Some(filter),
            }
        })
        .collect()
}
