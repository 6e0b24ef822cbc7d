//! Business-solution cards shown in the "what we do" section.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Card, SectionConfig, serialize_order};
use crate::store::StoreSpec;

pub type SolutionsConfig = SectionConfig<SolutionCard>;

pub const STORAGE_KEY: &str = "aiMaster:solutions";
pub const LOGICAL_NAME: &str = "solutions";
pub const EVENT_PREFIX: &str = "solutions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionCard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_src: Option<String>,
    /// Portfolio filter token this card links to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_slug: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    pub enabled: bool,
    #[serde(serialize_with = "serialize_order")]
    pub order: f64,
    /// Fields this service does not model, kept so frontend additions
    /// survive a save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card for SolutionCard {
    const TEXT_FIELDS: &'static [&'static str] = &["id", "title"];
    const OPTIONAL_TEXT_FIELDS: &'static [&'static str] = &["imageSrc", "videoSrc", "tagSlug", "href"];

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

fn card(id: &str, title: &str, image: &str, tag_slug: &str, order: u32) -> SolutionCard {
    SolutionCard {
        id: id.to_owned(),
        title: title.to_owned(),
        image_src: Some(image.to_owned()),
        video_src: None,
        tag_slug: Some(tag_slug.to_owned()),
        href: Some(format!("/portfolio?tag={tag_slug}")),
        enabled: true,
        order: f64::from(order),
        extra: Map::new(),
    }
}

/// Compiled-in fallback used until an editor saves a custom config.
#[must_use]
pub fn default_config() -> SolutionsConfig {
    SectionConfig {
        section_title: "Solutions for every kitchen".to_owned(),
        section_subtitle: "Menu photography, delivery-app imagery and social content from one studio".to_owned(),
        items: vec![
            card("restaurants", "Restaurants", "/images/solutions/restaurants.jpg", "restaurants", 0),
            card("delivery-apps", "Delivery apps", "/images/solutions/delivery.jpg", "delivery", 1),
            card("catering", "Catering & events", "/images/solutions/catering.jpg", "catering", 2),
            card("food-brands", "Food brands", "/images/solutions/brands.jpg", "brands", 3),
            card("bakeries", "Bakeries & cafes", "/images/solutions/bakeries.jpg", "bakeries", 4),
        ],
        updated_at: String::new(),
    }
}

#[must_use]
pub fn store_spec() -> StoreSpec<SolutionCard> {
    StoreSpec {
        storage_key: STORAGE_KEY.to_owned(),
        logical_name: LOGICAL_NAME.to_owned(),
        event_prefix: EVENT_PREFIX.to_owned(),
        defaults: default_config(),
    }
}
