//! Order compaction and id de-duplication.
//!
//! Every config is normalized before it is stored or handed out: `order`
//! becomes exactly `0..n-1` following a stable sort on the incoming order,
//! and ids are made pairwise distinct by appending the first free `-N`.

use std::collections::HashSet;

use crate::cards::{Card, SectionConfig};

/// Return a normalized copy of `items`. The input is left untouched.
#[must_use]
pub fn normalize_items<C: Card>(items: &[C]) -> Vec<C> {
    let mut sorted = items.to_vec();
    // Stable: equal orders keep their incoming relative position.
    sorted.sort_by(|a, b| a.order().total_cmp(&b.order()));

    let mut used: HashSet<String> = HashSet::with_capacity(sorted.len());
    for (index, item) in sorted.iter_mut().enumerate() {
        item.set_order(f64::from(u32::try_from(index).unwrap_or(u32::MAX)));

        if used.contains(item.id()) {
            let unique = with_free_suffix(item.id(), |candidate| used.contains(candidate));
            item.set_id(unique);
        }
        used.insert(item.id().to_owned());
    }

    sorted
}

/// Return `base` if `taken` rejects it, else `base-1`, `base-2`, … up to the
/// first candidate `taken` accepts.
pub(crate) fn with_free_suffix(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_owned();
    }
    (1_u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_owned())
}

impl<C: Card> SectionConfig<C> {
    /// Copy of this config with normalized items.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            section_title: self.section_title.clone(),
            section_subtitle: self.section_subtitle.clone(),
            items: normalize_items(&self.items),
            updated_at: self.updated_at.clone(),
        }
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
