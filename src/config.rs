//! The persisted layout format.
//!
//! This is a JSON tree of `{type, size, minSize, id, content: [...]}` nodes, where
//! component nodes also carry `componentType` and `componentState`. Everything here is
//! plain data: turning it into a live tree (and validating it) happens in
//! [`crate::tree`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LayoutError};

/// Opaque JSON passed through verbatim (component types and states).
pub type JsonValue = serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Ground,
    Row,
    Column,
    Stack,
    Component,
}

impl ItemType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Row => "row",
            Self::Column => "column",
            Self::Stack => "stack",
            Self::Component => "component",
        }
    }

    pub fn is_row_or_column(self) -> bool {
        matches!(self, Self::Row | Self::Column)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Left,
    Right,
    Bottom,
}

impl Side {
    /// Left and right sides lay out along the horizontal axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// True for the sides where the new item goes before the existing one.
    pub fn is_leading(self) -> bool {
        matches!(self, Self::Left | Self::Top)
    }
}

/// Where (and whether) a stack shows its header: `false` or a side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HeaderShowRepr", into = "HeaderShowRepr")]
pub enum HeaderShow {
    Hidden,
    Side(Side),
}

impl Default for HeaderShow {
    fn default() -> Self {
        Self::Side(Side::Top)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum HeaderShowRepr {
    Bool(bool),
    Side(Side),
}

impl From<HeaderShowRepr> for HeaderShow {
    fn from(repr: HeaderShowRepr) -> Self {
        match repr {
            HeaderShowRepr::Bool(false) => Self::Hidden,
            HeaderShowRepr::Bool(true) => Self::Side(Side::Top),
            HeaderShowRepr::Side(side) => Self::Side(side),
        }
    }
}

impl From<HeaderShow> for HeaderShowRepr {
    fn from(show: HeaderShow) -> Self {
        match show {
            HeaderShow::Hidden => Self::Bool(false),
            HeaderShow::Side(side) => Self::Side(side),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderConfig {
    pub show: HeaderShow,
}

/// One node of the persisted tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConfig {
    #[serde(rename = "type")]
    pub item_type: ItemType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ItemConfig>,

    /// Size along the parent's axis, e.g. `"50%"`, `"1fr"` or `"200px"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Pixel floor, e.g. `"100px"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_closable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_state: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_item_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximised: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderConfig>,
}

impl ItemConfig {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            content: Vec::new(),
            size: None,
            min_size: None,
            id: None,
            is_closable: None,
            title: None,
            component_type: None,
            component_state: None,
            reorder_enabled: None,
            active_item_index: None,
            maximised: None,
            header: None,
        }
    }

    pub fn component(component_type: impl Into<JsonValue>) -> Self {
        Self {
            component_type: Some(component_type.into()),
            ..Self::new(ItemType::Component)
        }
    }

    pub fn stack(content: Vec<Self>) -> Self {
        Self {
            content,
            ..Self::new(ItemType::Stack)
        }
    }

    pub fn row(content: Vec<Self>) -> Self {
        Self {
            content,
            ..Self::new(ItemType::Row)
        }
    }

    pub fn column(content: Vec<Self>) -> Self {
        Self {
            content,
            ..Self::new(ItemType::Column)
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    #[must_use]
    pub fn with_min_size(mut self, min_size: impl Into<String>) -> Self {
        self.min_size = Some(min_size.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<JsonValue>) -> Self {
        self.component_state = Some(state.into());
        self
    }

    #[must_use]
    pub fn with_active_item_index(mut self, index: usize) -> Self {
        self.active_item_index = Some(index);
        self
    }

    #[must_use]
    pub fn maximised(mut self) -> Self {
        self.maximised = Some(true);
        self
    }

    /// Depth-first search for the first node carrying `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Self> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.content.iter().find_map(|child| child.find_by_id(id))
    }
}

/// Tab title shown for a component that was not given one.
pub fn title_for_component_type(component_type: &JsonValue) -> String {
    match component_type {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Whether items can be rearranged by dragging their tabs.
    pub reorder_enabled: bool,

    /// Popping out a stack takes the whole stack rather than only its active component.
    pub popout_whole_stack: bool,

    /// Whether a blocked popout is an error or silently ignored.
    pub blocked_popouts_throw_error: bool,

    /// Pop a popout's content back in when its window is closed.
    pub pop_in_on_close: bool,

    /// Maximum pixel overlap per tab before tabs spill into the dropdown.
    pub tab_overlap_allowance: f32,

    /// Move a tab picked from the dropdown to the front of the strip.
    pub reorder_on_tab_menu_click: bool,

    /// Space reserved at the end of the tab strip for header controls.
    pub tab_control_offset: f32,

    /// Dropping outside every target opens the dragged item in a new popout.
    pub popout_on_drop: bool,

    pub constrain_drag_to_container: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reorder_enabled: true,
            popout_whole_stack: false,
            blocked_popouts_throw_error: true,
            pop_in_on_close: false,
            tab_overlap_allowance: 0.0,
            reorder_on_tab_menu_click: true,
            tab_control_offset: 10.0,
            popout_on_drop: false,
            constrain_drag_to_container: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dimensions {
    /// Width of the splitters between row/column children.
    pub border_width: f32,
    pub border_grab_width: f32,
    pub header_height: f32,
    pub default_min_item_width: String,
    pub default_min_item_height: String,
    pub drag_proxy_width: f32,
    pub drag_proxy_height: f32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            border_width: 5.0,
            border_grab_width: 5.0,
            header_height: 20.0,
            default_min_item_width: "10px".to_owned(),
            default_min_item_height: "0px".to_owned(),
            drag_proxy_width: 300.0,
            drag_proxy_height: 200.0,
        }
    }
}

/// Position and size of a popout window, in screen pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PopoutWindowConfig {
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// A whole layout: the root item plus any popouts and settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default)]
    pub root: Option<ItemConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_popouts: Vec<PopoutLayoutConfig>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub dimensions: Dimensions,

    #[serde(default)]
    pub header: HeaderConfig,
}

impl LayoutConfig {
    pub fn with_root(root: ItemConfig) -> Self {
        Self {
            root: Some(root),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, LayoutError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Malformed(err.to_string()).into())
    }

    pub fn from_json_value(value: JsonValue) -> Result<Self, LayoutError> {
        serde_json::from_value(value).map_err(|err| ConfigError::Malformed(err.to_string()).into())
    }

    pub fn to_json_string(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), LayoutError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// A layout hosted in a popout window, plus how to pop it back in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopoutLayoutConfig {
    #[serde(flatten)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub window: PopoutWindowConfig,

    /// Config id of the item the content returns to on pop-in.
    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub index_in_parent: Option<usize>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_minimal_component_root() {
        let config = LayoutConfig::from_json_value(json!({
            "root": { "type": "component", "componentType": "X" }
        }))
        .unwrap();
        let root = config.root.unwrap();
        assert_eq!(root.item_type, ItemType::Component);
        assert_eq!(root.component_type, Some(json!("X")));
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn unknown_item_type_is_a_config_error() {
        let err = LayoutConfig::from_json_value(json!({
            "root": { "type": "grid", "content": [] }
        }))
        .unwrap_err();
        assert!(matches!(err, LayoutError::Config(ConfigError::Malformed(_))));
    }

    #[test]
    fn header_show_accepts_false_and_sides() {
        let hidden: HeaderConfig = serde_json::from_value(json!({ "show": false })).unwrap();
        assert_eq!(hidden.show, HeaderShow::Hidden);
        let left: HeaderConfig = serde_json::from_value(json!({ "show": "left" })).unwrap();
        assert_eq!(left.show, HeaderShow::Side(Side::Left));
        assert_eq!(
            serde_json::to_value(hidden).unwrap(),
            json!({ "show": false })
        );
    }

    #[test]
    fn find_by_id_searches_depth_first() {
        let root = ItemConfig::row(vec![
            ItemConfig::stack(vec![ItemConfig::component("a").with_id("a")]),
            ItemConfig::stack(vec![ItemConfig::component("b").with_id("b")]).with_id("s"),
        ]);
        assert_eq!(
            root.find_by_id("b").and_then(|c| c.component_type.clone()),
            Some(json!("b"))
        );
        assert_eq!(root.find_by_id("s").map(|c| c.item_type), Some(ItemType::Stack));
        assert!(root.find_by_id("zzz").is_none());
    }

    #[test]
    fn component_titles_fall_back_to_their_type() {
        assert_eq!(title_for_component_type(&json!("editor")), "editor");
        assert_eq!(title_for_component_type(&json!({ "k": 1 })), r#"{"k":1}"#);
    }
}
