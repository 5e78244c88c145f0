//! The tab strip of one stack: tab order, overflow into a dropdown, and which tab is
//! active.
//!
//! Tabs mirror the stack's components but keep their own order. The strip is laid out
//! along one axis starting at `0.0`; the host maps that onto the header rectangle.

use crate::tree::ItemId;

/// Hints passed to [`TabMeasure::tab_width`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TabRenderFlags {
    pub is_active: bool,
    pub dropdown_active: bool,
    pub in_dropdown_menu: bool,
}

/// Measures rendered tabs. Implemented by whatever draws them.
pub trait TabMeasure {
    /// Rendered width of a tab whose title was given at most `max_width` to render into.
    ///
    /// Renderers that do not truncate may ignore `max_width`.
    fn tab_width(&mut self, title: &str, max_width: f32, flags: TabRenderFlags) -> f32;

    /// Gap after each tab.
    fn tab_margin_right(&self) -> f32 {
        0.0
    }
}

/// Measures titles with a fixed advance per character, never truncating.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceMeasure {
    pub char_width: f32,

    /// Room for the close button and padding.
    pub padding: f32,

    pub margin_right: f32,
}

impl Default for FixedAdvanceMeasure {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            padding: 24.0,
            margin_right: 2.0,
        }
    }
}

impl TabMeasure for FixedAdvanceMeasure {
    fn tab_width(&mut self, title: &str, _max_width: f32, _flags: TabRenderFlags) -> f32 {
        self.padding + self.char_width * title.chars().count() as f32
    }

    fn tab_margin_right(&self) -> f32 {
        self.margin_right
    }
}

/// The header affordance of one component.
#[derive(Clone, Debug, PartialEq)]
pub struct Tab {
    pub component: ItemId,
    pub title: String,
    pub closable: bool,
    pub is_active: bool,

    /// Offset of the tab along the strip, after overlap.
    pub left: f32,
    pub width: f32,

    /// Zero, or negative when tabs overlap.
    pub margin_left: f32,
    pub z_index: i32,
}

impl Tab {
    fn new(component: ItemId, title: String, closable: bool) -> Self {
        Self {
            component,
            title,
            closable,
            is_active: false,
            left: 0.0,
            width: 0.0,
            margin_left: 0.0,
            z_index: 0,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TabsContainer {
    tabs: Vec<Tab>,
    last_visible_tab_index: Option<usize>,
    dropdown_active: bool,
}

impl TabsContainer {
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Index of the last tab shown on the strip; later tabs live in the dropdown.
    pub fn last_visible_tab_index(&self) -> Option<usize> {
        self.last_visible_tab_index
    }

    pub fn dropdown_active(&self) -> bool {
        self.dropdown_active
    }

    /// A lone tab is styled differently.
    pub fn is_single(&self) -> bool {
        self.tabs.len() <= 1
    }

    /// Tabs pushed off the strip, in menu order.
    pub fn dropdown_tabs(&self) -> &[Tab] {
        if !self.dropdown_active {
            return &[];
        }
        let first_hidden = self.last_visible_tab_index.map_or(0, |i| i + 1);
        self.tabs.get(first_hidden..).unwrap_or(&[])
    }

    pub fn tab_index(&self, component: ItemId) -> Option<usize> {
        self.tabs.iter().position(|t| t.component == component)
    }

    pub fn tab(&self, component: ItemId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.component == component)
    }

    /// Add a tab for `component`, unless it already has one.
    pub fn create_tab(
        &mut self,
        component: ItemId,
        title: impl Into<String>,
        closable: bool,
        index: Option<usize>,
    ) {
        if self.tab_index(component).is_some() {
            return;
        }
        let index = index.unwrap_or(self.tabs.len()).min(self.tabs.len());
        self.tabs
            .insert(index, Tab::new(component, title.into(), closable));
    }

    /// Returns `false` if no tab belongs to `component`.
    pub fn remove_tab(&mut self, component: ItemId) -> bool {
        let Some(index) = self.tab_index(component) else {
            return false;
        };
        self.tabs.remove(index);
        if let Some(last) = self.last_visible_tab_index {
            if index <= last {
                self.last_visible_tab_index = last.checked_sub(1);
            }
        }
        if self.tabs.is_empty() {
            self.last_visible_tab_index = None;
        }
        true
    }

    pub fn set_title(&mut self, component: ItemId, title: impl Into<String>) {
        if let Some(tab) = self.tabs.iter_mut().find(|t| t.component == component) {
            tab.title = title.into();
        }
    }

    /// Move the tab of `component` to `index` (explicit drag reordering).
    pub fn move_tab(&mut self, component: ItemId, index: usize) {
        if let Some(from) = self.tab_index(component) {
            let tab = self.tabs.remove(from);
            let index = index.min(self.tabs.len());
            self.tabs.insert(index, tab);
        }
    }

    /// Sync the active flags with the stack's new active component.
    ///
    /// With `reorder_on_tab_menu_click`, a tab activated from the dropdown moves to the
    /// front so recently used tabs stay visible.
    ///
    /// # Panics
    /// If `active` has no tab here. The stack keeps one tab per component, so this is
    /// a broken invariant.
    pub fn process_active_component_changed(
        &mut self,
        active: ItemId,
        reorder_on_tab_menu_click: bool,
    ) {
        let mut active_index = None;
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            tab.is_active = tab.component == active;
            if tab.is_active {
                active_index = Some(i);
            }
        }
        let Some(active_index) = active_index else {
            panic!("active component {active} has no tab in its stack");
        };

        if reorder_on_tab_menu_click {
            if let Some(last_visible) = self.last_visible_tab_index {
                if active_index > last_visible {
                    let tab = self.tabs.remove(active_index);
                    self.tabs.insert(0, tab);
                }
            }
        }
    }

    /// Lay the tabs out in `available_width`, spilling into the dropdown if needed.
    ///
    /// The first pass tries without a dropdown, letting tabs overlap by at most the
    /// allowance. If that fails, the second pass enables the dropdown: the active tab
    /// gets a double share of the width, overlap is capped at the allowance and the
    /// trailing tabs that still do not fit are hidden behind `last_visible_tab_index`.
    ///
    /// Returns `true` if [`Self::dropdown_active`] changed.
    pub fn update_tab_sizes(
        &mut self,
        available_width: f32,
        active: Option<ItemId>,
        tab_overlap_allowance: f32,
        measure: &mut dyn TabMeasure,
    ) -> bool {
        let active_index = match active {
            Some(active) => self.tab_index(active).unwrap_or_else(|| {
                panic!("active component {active} has no tab in its stack")
            }),
            None => 0,
        };

        let mut dropdown_active = false;
        if !self.try_update_tab_sizes(
            false,
            available_width,
            active_index,
            tab_overlap_allowance,
            measure,
        ) {
            dropdown_active = true;
            self.try_update_tab_sizes(
                true,
                available_width,
                active_index,
                tab_overlap_allowance,
                measure,
            );
        }

        let changed = dropdown_active != self.dropdown_active;
        self.dropdown_active = dropdown_active;
        changed
    }

    fn try_update_tab_sizes(
        &mut self,
        dropdown_active: bool,
        available_width: f32,
        active_index: usize,
        tab_overlap_allowance: f32,
        measure: &mut dyn TabMeasure,
    ) -> bool {
        let num_tabs = self.tabs.len();
        if num_tabs == 0 {
            self.last_visible_tab_index = None;
            return true;
        }

        let allowance = if tab_overlap_allowance > 0.0 {
            tab_overlap_allowance
        } else if dropdown_active {
            6.0
        } else {
            0.0
        };
        let margin_right = measure.tab_margin_right();

        let (tab_avail, active_tab_avail) = if !dropdown_active || num_tabs <= 1 {
            let avail = available_width - margin_right;
            (avail, avail)
        } else {
            let avail =
                (available_width - num_tabs as f32 * margin_right) / (num_tabs as f32 + 1.0);
            (avail, 2.0 * avail)
        };

        self.last_visible_tab_index = Some(num_tabs - 1);
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            let is_active = i == active_index;
            tab.margin_left = 0.0;
            tab.z_index = 0;
            let flags = TabRenderFlags {
                is_active,
                dropdown_active,
                in_dropdown_menu: false,
            };
            let max_width = if is_active { active_tab_avail } else { tab_avail };
            tab.width = measure.tab_width(&tab.title, max_width, flags).max(0.0);
        }
        self.relayout(margin_right);

        let cumulative_width = self.tabs[num_tabs - 1].right() + margin_right;
        if cumulative_width <= available_width {
            return true;
        }
        if num_tabs <= 1 {
            return false;
        }

        let mut overlap = (cumulative_width - available_width) / (num_tabs - 1) as f32;
        if overlap >= allowance {
            if !dropdown_active {
                return false;
            }
            overlap = allowance;
        }

        for (j, tab) in self.tabs.iter_mut().enumerate() {
            let rank = if j <= active_index {
                j as i32 - active_index as i32
            } else {
                active_index as i32 - j as i32
            };
            tab.z_index = rank + num_tabs as i32;
            tab.margin_left = if j == 0 { 0.0 } else { -overlap };
        }
        self.relayout(margin_right);

        let active_width = self.tabs[active_index].width;
        if self.tabs[active_index].right() > available_width {
            if !dropdown_active {
                return false;
            }
            if active_index > 0 {
                // Shift the active tab and those before it left, as far as they can go.
                let max_prior = ((available_width - active_width) / active_index as f32).max(0.0);
                for j in 1..=active_index {
                    let right_excess = self.tabs[j].left - j as f32 * max_prior;
                    if right_excess > 0.0 {
                        self.tabs[j].margin_left = -(overlap + right_excess);
                        self.relayout(margin_right);
                    }
                }
            }
        }

        self.last_visible_tab_index = Some(active_index);
        for j in active_index + 1..num_tabs {
            if self.tabs[j].right() > available_width + allowance {
                break;
            }
            self.last_visible_tab_index = Some(j);
        }

        true
    }

    fn relayout(&mut self, margin_right: f32) {
        let mut cursor = 0.0;
        for tab in &mut self.tabs {
            tab.left = cursor + tab.margin_left;
            cursor = tab.right() + margin_right;
        }
    }

    /// Insertion index for a tab dropped at `offset` along the strip.
    pub fn insertion_index_at(&self, offset: f32) -> usize {
        let visible = self
            .last_visible_tab_index
            .map_or(self.tabs.len(), |last| (last + 1).min(self.tabs.len()));
        self.tabs[..visible]
            .iter()
            .position(|tab| offset < tab.left + tab.width * 0.5)
            .unwrap_or(visible)
    }

    /// Where along the strip a tab inserted at `index` would start.
    pub fn insertion_offset(&self, index: usize) -> f32 {
        match self.tabs.get(index) {
            Some(tab) => tab.left,
            None => self.tabs.last().map_or(0.0, Tab::right),
        }
    }
}
