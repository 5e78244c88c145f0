//! Docking layout core: a tree of rows, columns and tabbed stacks of components, with
//! size distribution, drag-to-dock, maximise and popout windows.
//!
//! The crate does no rendering. A host feeds a [`LayoutManager`] sizes, pointer input
//! and time, draws from the rectangles in [`LayoutManager::tree`], and binds component
//! widgets through a [`ComponentRegistry`].
//!
//! ```
//! use dock_layout::{ComponentRegistry, ItemConfig, LayoutConfig, LayoutManager};
//!
//! let config = LayoutConfig::with_root(ItemConfig::row(vec![
//!     ItemConfig::component("files"),
//!     ItemConfig::stack(vec![ItemConfig::component("editor"), ItemConfig::component("log")]),
//! ]));
//! let mut registry = ComponentRegistry::new();
//! for name in ["files", "editor", "log"] {
//!     registry.register_factory(name, |id, _state| dock_layout::ComponentHandle(id.as_u64()));
//! }
//! let mut manager = LayoutManager::new(config, registry, Default::default());
//! manager.set_size(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0)))?;
//! manager.init()?;
//! assert_eq!(manager.tree().all_of_type(dock_layout::ItemType::Stack).len(), 2);
//! # Ok::<(), dock_layout::LayoutError>(())
//! ```

#![forbid(unsafe_code)]

pub mod binding;
pub mod builder;
pub mod config;
pub mod drag;
pub mod error;
pub mod event;
pub mod manager;
pub mod popout;
pub mod size;
pub mod tabs;
pub mod timer;
pub mod tree;

pub use binding::{ComponentBinding, ComponentHandle, ComponentRegistry, SimpleComponentBinding};
pub use builder::{BuilderNodeId, LayoutBuilder, SplitDirection};
pub use config::{
    Dimensions, HeaderConfig, HeaderShow, ItemConfig, ItemType, JsonValue, LayoutConfig,
    PopoutLayoutConfig, PopoutWindowConfig, Settings, Side,
};
pub use drag::{DragHandle, DragPayload, DragSourceId};
pub use error::{ConfigError, LayoutError};
pub use event::LayoutEvent;
pub use manager::{
    AFTER_FOCUSED_ITEM_IF_POSSIBLE, DEFAULT_LOCATION_SELECTORS, LayoutManager,
    LayoutManagerOptions, LocationSelector, ManagerState, Mutation,
};
pub use popout::{BrowserPopout, PopoutHost, PopoutId, PopoutMessage, PopoutWindow};
pub use size::{SizeParseError, SizeUnit, SizeWithUnit};
pub use tabs::{FixedAdvanceMeasure, TabMeasure};
pub use tree::{ItemId, ItemLocation, LayoutTree};
