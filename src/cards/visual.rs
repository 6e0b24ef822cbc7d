//! Visual-solution cards: media-first tiles (stills, short loops, AI
//! retouching) in the showcase grid.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Card, SectionConfig, serialize_order};
use crate::store::StoreSpec;

pub type VisualSolutionsConfig = SectionConfig<VisualSolutionCard>;

pub const STORAGE_KEY: &str = "aiMaster:visualSolutions";
pub const LOGICAL_NAME: &str = "visual_solutions";
pub const EVENT_PREFIX: &str = "visualSolutions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSolutionCard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_src: Option<String>,
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

impl Card for VisualSolutionCard {
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

#[must_use]
pub fn default_config() -> VisualSolutionsConfig {
    SectionConfig {
        section_title: "Visual solutions".to_owned(),
        section_subtitle: "Stills, motion and retouching built for menus and feeds".to_owned(),
        items: vec![
            VisualSolutionCard {
                id: "menu-stills".to_owned(),
                title: "Menu stills".to_owned(),
                image_src: Some("/images/visual/menu-stills.jpg".to_owned()),
                video_src: None,
                tag_slug: Some("menu".to_owned()),
                href: None,
                enabled: true,
                order: 0.0,
                extra: Map::new(),
            },
            VisualSolutionCard {
                id: "short-loops".to_owned(),
                title: "Short video loops".to_owned(),
                image_src: Some("/images/visual/short-loops-poster.jpg".to_owned()),
                video_src: Some("/videos/visual/short-loops.mp4".to_owned()),
                tag_slug: Some("video".to_owned()),
                href: None,
                enabled: true,
                order: 1.0,
                extra: Map::new(),
            },
            VisualSolutionCard {
                id: "ai-retouching".to_owned(),
                title: "AI retouching".to_owned(),
                image_src: Some("/images/visual/retouching.jpg".to_owned()),
                video_src: None,
                tag_slug: Some("retouching".to_owned()),
                href: Some("/services/retouching".to_owned()),
                enabled: true,
                order: 2.0,
                extra: Map::new(),
            },
        ],
        updated_at: String::new(),
    }
}

#[must_use]
pub fn store_spec() -> StoreSpec<VisualSolutionCard> {
    StoreSpec {
        storage_key: STORAGE_KEY.to_owned(),
        logical_name: LOGICAL_NAME.to_owned(),
        event_prefix: EVENT_PREFIX.to_owned(),
        defaults: default_config(),
    }
}
