//! Popouts: parts of a layout hosted in separate windows.
//!
//! Opening and tracking windows is up to the host ([`PopoutHost`], [`PopoutWindow`]).
//! Each popout window runs its own [`crate::LayoutManager`]; parent and child only
//! exchange [`PopoutMessage`]s and configs, never shared state.

mod coordinator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ItemConfig, PopoutLayoutConfig, PopoutWindowConfig};

/// Identifies a popout of one parent layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PopoutId(pub(crate) u64);

impl PopoutId {
    pub const fn from_u64(n: u64) -> Self {
        Self(n)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PopoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popout-{}", self.0)
    }
}

impl fmt::Display for PopoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popout-{}", self.0)
    }
}

/// A window opened by a [`PopoutHost`].
pub trait PopoutWindow {
    /// Closed windows are dropped at the next reconciliation.
    fn is_closed(&self) -> bool;

    fn close(&mut self);

    /// Where the window currently is.
    fn window_config(&self) -> PopoutWindowConfig;

    /// The layout the child currently shows, if it can be read back.
    ///
    /// When `None`, the config the window was opened with is used.
    fn layout_config(&self) -> Option<PopoutLayoutConfig> {
        None
    }
}

/// Opens popout windows.
pub trait PopoutHost {
    /// Open a window that will run a child layout built from `config`.
    ///
    /// Returns `None` when the window could not be opened (e.g. a popup blocker).
    fn open_window(
        &mut self,
        id: PopoutId,
        config: &PopoutLayoutConfig,
    ) -> Option<Box<dyn PopoutWindow>>;
}

/// Sent from a popout's layout to its parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PopoutMessage {
    /// Put `config` back into the parent layout. The child has torn itself down.
    #[serde(rename_all = "camelCase")]
    PopIn {
        popout_id: PopoutId,
        config: Option<ItemConfig>,
    },

    /// The child window is going away without popping in.
    #[serde(rename_all = "camelCase")]
    Closing { popout_id: PopoutId },
}

/// Parent-side record of one open popout.
pub struct BrowserPopout {
    id: PopoutId,
    config: PopoutLayoutConfig,
    window: Box<dyn PopoutWindow>,
}

impl fmt::Debug for BrowserPopout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserPopout")
            .field("id", &self.id)
            .field("parent_id", &self.config.parent_id)
            .field("index_in_parent", &self.config.index_in_parent)
            .field("closed", &self.window.is_closed())
            .finish()
    }
}

impl BrowserPopout {
    pub(crate) fn new(id: PopoutId, config: PopoutLayoutConfig, window: Box<dyn PopoutWindow>) -> Self {
        Self { id, config, window }
    }

    pub fn id(&self) -> PopoutId {
        self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.config.parent_id.as_deref()
    }

    pub fn index_in_parent(&self) -> Option<usize> {
        self.config.index_in_parent
    }

    pub fn is_closed(&self) -> bool {
        self.window.is_closed()
    }

    /// The current config: the child's live layout if readable, at the window's current
    /// position, with the pop-in target kept.
    pub fn to_config(&self) -> PopoutLayoutConfig {
        let mut config = match self.window.layout_config() {
            Some(live) => PopoutLayoutConfig {
                parent_id: self.config.parent_id.clone(),
                index_in_parent: self.config.index_in_parent,
                ..live
            },
            None => self.config.clone(),
        };
        config.window = self.window.window_config();
        config
    }

    pub(crate) fn remember_root(&mut self, root: Option<ItemConfig>) {
        self.config.layout.root = root;
    }

    pub(crate) fn close(&mut self) {
        if !self.window.is_closed() {
            self.window.close();
        }
    }
}

/// Child-side link back to the parent layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PopoutContext {
    pub(crate) id: PopoutId,
}
