//! Content cards: the typed units each section config manages.
//!
//! DESIGN
//! ======
//! Every section of the marketing site (solutions, markets, visual
//! solutions) is the same shape: section copy plus an ordered list of cards.
//! `SectionConfig<C>` captures that shape once; the `Card` trait is the seam
//! the validator and normalizer use to reach into a concrete card type.
//!
//! The JSON form uses camelCase field names so exported files and the remote
//! `content` column stay readable by the site's frontend.

pub mod markets;
pub mod solutions;
pub mod visual;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};

pub use markets::MarketTag;
pub use solutions::SolutionCard;
pub use visual::VisualSolutionCard;

// =============================================================================
// CARD
// =============================================================================

/// One content item inside a section config.
pub trait Card: Clone + std::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// JSON fields that must be present as strings.
    const TEXT_FIELDS: &'static [&'static str];
    /// JSON fields that may be absent, `null`, or a string.
    const OPTIONAL_TEXT_FIELDS: &'static [&'static str];

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Sort key. Editors may write any JSON number; normalization turns it
    /// back into a whole index.
    fn order(&self) -> f64;
    fn set_order(&mut self, order: f64);
    fn enabled(&self) -> bool;
}

/// Write whole orders as JSON integers so stored configs keep `"order": 0`.
#[allow(clippy::trivially_copy_pass_by_ref, clippy::cast_possible_truncation)]
pub(crate) fn serialize_order<S: Serializer>(order: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if order.fract() == 0.0 && order.abs() <= MAX_EXACT {
        serializer.serialize_i64(*order as i64)
    } else {
        serializer.serialize_f64(*order)
    }
}

// =============================================================================
// SECTION CONFIG
// =============================================================================

/// One named configuration: section copy plus the managed card list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig<C> {
    pub section_title: String,
    pub section_subtitle: String,
    pub items: Vec<C>,
    /// RFC 3339 timestamp of the last successful save. Empty for defaults.
    #[serde(default)]
    pub updated_at: String,
}

impl<C: Card> SectionConfig<C> {
    /// Enabled cards in display order. This is what public pages render.
    #[must_use]
    pub fn visible_items(&self) -> Vec<&C> {
        let mut visible: Vec<&C> = self.items.iter().filter(|item| item.enabled()).collect();
        visible.sort_by(|a, b| a.order().total_cmp(&b.order()));
        visible
    }

    /// Copy of this config that only carries enabled cards.
    #[must_use]
    pub fn published(&self) -> Self {
        Self {
            section_title: self.section_title.clone(),
            section_subtitle: self.section_subtitle.clone(),
            items: self.visible_items().into_iter().cloned().collect(),
            updated_at: self.updated_at.clone(),
        }
    }

    /// True when some card already uses `id`.
    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
