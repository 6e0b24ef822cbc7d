//! Market tags: the short labels in the "who we work with" strip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Card, SectionConfig, serialize_order};
use crate::store::StoreSpec;

pub type MarketsConfig = SectionConfig<MarketTag>;

pub const STORAGE_KEY: &str = "food-vision-markets-config";
pub const LOGICAL_NAME: &str = "markets";
pub const EVENT_PREFIX: &str = "markets";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTag {
    pub id: String,
    pub label: String,
    pub slug: String,
    pub enabled: bool,
    #[serde(serialize_with = "serialize_order")]
    pub order: f64,
    /// Fields this service does not model, kept so frontend additions
    /// survive a save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card for MarketTag {
    const TEXT_FIELDS: &'static [&'static str] = &["id", "label", "slug"];
    const OPTIONAL_TEXT_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn order(&self) -> f64 {
        self.order
    }

    fn set_order(&mut self, order: f64) {
        self.order = order;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[must_use]
pub fn default_config() -> MarketsConfig {
    let tags = [
        ("restaurants", "Restaurants"),
        ("cafes", "Cafes"),
        ("bakeries", "Bakeries"),
        ("hotels", "Hotels"),
        ("catering", "Catering"),
        ("dark-kitchens", "Dark kitchens"),
        ("food-trucks", "Food trucks"),
    ];

    SectionConfig {
        section_title: "Markets we serve".to_owned(),
        section_subtitle: "From neighbourhood cafes to national chains".to_owned(),
        items: tags
            .iter()
            .zip(0_u32..)
            .map(|((slug, label), order)| MarketTag {
                id: (*slug).to_owned(),
                label: (*label).to_owned(),
                slug: (*slug).to_owned(),
                enabled: true,
                order: f64::from(order),
                extra: Map::new(),
            })
            .collect(),
        updated_at: String::new(),
    }
}

#[must_use]
pub fn store_spec() -> StoreSpec<MarketTag> {
    StoreSpec {
        storage_key: STORAGE_KEY.to_owned(),
        logical_name: LOGICAL_NAME.to_owned(),
        event_prefix: EVENT_PREFIX.to_owned(),
        defaults: default_config(),
    }
}
