use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use egui::{Pos2, Rect, pos2, vec2};

use super::*;
use crate::binding::{ComponentHandle, SimpleComponentBinding};
use crate::config::{JsonValue, PopoutLayoutConfig, PopoutWindowConfig};
use crate::drag::DragPayload;
use crate::error::ConfigError;
use crate::popout::{PopoutMessage, PopoutWindow};
use crate::tree::{DropPlan, ItemLocation};

#[derive(Clone, Default)]
struct Bindings {
    bound: Rc<Cell<usize>>,
    unbound: Rc<Cell<usize>>,
}

impl Bindings {
    fn registry(&self) -> ComponentRegistry {
        let (bound, unbound) = (self.bound.clone(), self.unbound.clone());
        ComponentRegistry::with_binding(SimpleComponentBinding::new(
            move |container: ItemId, _: &JsonValue, _: &JsonValue| {
                bound.set(bound.get() + 1);
                ComponentHandle(container.as_u64())
            },
            move |_: ItemId, _: ComponentHandle| unbound.set(unbound.get() + 1),
        ))
    }
}

type OpenedWindow = (PopoutId, PopoutLayoutConfig, Rc<Cell<bool>>);

#[derive(Clone, Default)]
struct MockHost {
    opened: Rc<RefCell<Vec<OpenedWindow>>>,
}

impl PopoutHost for MockHost {
    fn open_window(
        &mut self,
        id: PopoutId,
        config: &PopoutLayoutConfig,
    ) -> Option<Box<dyn PopoutWindow>> {
        let closed = Rc::new(Cell::new(false));
        self.opened
            .borrow_mut()
            .push((id, config.clone(), closed.clone()));
        Some(Box::new(MockWindow { closed }))
    }
}

struct MockWindow {
    closed: Rc<Cell<bool>>,
}

impl PopoutWindow for MockWindow {
    fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn close(&mut self) {
        self.closed.set(true);
    }

    fn window_config(&self) -> PopoutWindowConfig {
        PopoutWindowConfig::default()
    }
}

fn comp(name: &str) -> ItemConfig {
    ItemConfig::component(name).with_id(name)
}

fn screen(w: f32, h: f32) -> Rect {
    Rect::from_min_size(pos2(0.0, 0.0), vec2(w, h))
}

/// `row[stack[a, a2], stack[b]]`
fn two_stacks() -> LayoutConfig {
    LayoutConfig::with_root(ItemConfig::row(vec![
        ItemConfig::stack(vec![comp("a"), comp("a2")]),
        ItemConfig::stack(vec![comp("b")]),
    ]))
}

fn options() -> LayoutManagerOptions {
    LayoutManagerOptions {
        check_integrity: true,
        ..Default::default()
    }
}

fn started(config: LayoutConfig, registry: ComponentRegistry) -> LayoutManager {
    let mut manager = LayoutManager::new(config, registry, options());
    manager.set_size(screen(800.0, 600.0)).unwrap();
    manager.init().unwrap();
    manager
}

fn manager(config: LayoutConfig) -> LayoutManager {
    started(config, Bindings::default().registry())
}

fn id(manager: &LayoutManager, name: &str) -> ItemId {
    manager
        .find_first_component_by_id(name)
        .unwrap_or_else(|| panic!("no component {name:?} in {}", manager.tree().shape()))
}

fn assert_tree_ok(manager: &LayoutManager) {
    let issues = crate::tree::integrity::tree_integrity_issues(manager.tree());
    assert!(
        issues.is_empty(),
        "tree integrity failed:\n{}\n{}",
        issues.join("\n"),
        manager.tree().shape()
    );
}

/// Press on the tab of `component` at `from` and drag it to `to`.
fn drag_tab(manager: &mut LayoutManager, component: ItemId, from: Pos2, to: Pos2) {
    assert!(manager.pointer_down(Some(DragHandle::Tab(component)), from, Instant::now()));
    manager.pointer_move(from + vec2(20.0, 0.0));
    assert!(manager.is_dragging());
    manager.pointer_move(to);
}

// ----------------------------------------------------------------------------------------
// Lifecycle

#[test]
fn init_builds_and_binds_the_layout() {
    let bindings = Bindings::default();
    let mut m = started(two_stacks(), bindings.registry());
    assert_tree_ok(&m);
    assert_eq!(bindings.bound.get(), 3);
    assert!(m.tree().component(id(&m, "a")).unwrap().handle().is_some());

    let events = m.take_events();
    assert_eq!(events.first(), Some(&LayoutEvent::Initialised));
    assert!(events.contains(&LayoutEvent::StateChanged));
    assert!(matches!(m.init(), Err(LayoutError::InvalidState(_))));
}

#[test]
fn destroy_unbinds_everything_and_rejects_further_calls() {
    let bindings = Bindings::default();
    let mut m = started(two_stacks(), bindings.registry());
    let b = id(&m, "b");

    m.destroy();
    assert_eq!(m.state(), ManagerState::Destroyed);
    assert_eq!(bindings.unbound.get(), 3);
    assert!(m.tree().is_empty());
    assert!(matches!(m.remove_item(b), Err(LayoutError::InvalidState(_))));
    assert!(matches!(m.save_layout(), Err(LayoutError::InvalidState(_))));
    assert!(matches!(
        m.set_size(screen(10.0, 10.0)),
        Err(LayoutError::InvalidState(_))
    ));

    m.destroy();
    assert_eq!(
        m.take_events()
            .iter()
            .filter(|e| **e == LayoutEvent::Destroyed)
            .count(),
        1
    );
}

#[test]
fn unregistered_component_types_are_refused_up_front() {
    let mut registry = ComponentRegistry::new();
    for name in ["a", "a2", "b"] {
        registry.register_factory(name, |container, _| ComponentHandle(container.as_u64()));
    }
    let mut m = started(two_stacks(), registry);
    let before = m.tree().shape();

    let err = m.new_component("zzz", None, None).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::Config(ConfigError::UnregisteredComponentType(_))
    ));
    assert_eq!(m.tree().shape(), before);
}

#[test]
fn save_then_load_keeps_the_shape() {
    let mut m = manager(two_stacks());
    let a2 = id(&m, "a2");
    m.set_active_component(a2).unwrap();
    let saved = m.save_layout().unwrap();

    let mut other = manager(LayoutConfig::default());
    other.load_layout(saved).unwrap().applied().unwrap();
    assert_eq!(other.tree().shape(), m.tree().shape());
    assert_tree_ok(&other);
}

#[test]
fn component_as_root_has_no_header() {
    let mut m = manager(two_stacks());
    m.load_component_as_root(comp("solo")).unwrap().applied().unwrap();
    let solo = id(&m, "solo");
    let stack = m.tree().parent_of(solo).unwrap();
    assert_eq!(m.tree().root(), Some(stack));
    assert!(m.tree().stack(stack).unwrap().header_rect().is_none());
    assert_eq!(m.tree().get(solo).unwrap().rect(), screen(800.0, 600.0));
}

// ----------------------------------------------------------------------------------------
// Adding and locations

#[test]
fn component_added_to_an_empty_layout_gets_a_stack() {
    let mut m = manager(LayoutConfig::default());
    let x = m.new_component("x", None, Some("Ex")).unwrap().applied().unwrap();
    let stack = m.tree().parent_of(x).unwrap();
    assert_eq!(m.tree().root(), Some(stack));
    assert_eq!(m.tree().component(x).unwrap().title, "Ex");
    assert_tree_ok(&m);
}

#[test]
fn after_focused_item_goes_right_after_it() {
    let mut m = manager(two_stacks());
    let a2 = id(&m, "a2");
    let a_stack = m.tree().parent_of(a2).unwrap();
    m.focus_component(a2).unwrap();

    let location = m
        .add_component_at_location("c", None, None, AFTER_FOCUSED_ITEM_IF_POSSIBLE)
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(
        location,
        ItemLocation {
            parent: a_stack,
            index: 2
        }
    );
    assert_tree_ok(&m);
}

#[test]
fn no_matching_selector_is_an_error() {
    let mut m = manager(two_stacks());
    let before = m.tree().shape();
    let err = m
        .new_component_at_location("c", None, None, &[
            LocationSelector::FocusedStack(None),
            LocationSelector::Empty,
        ])
        .unwrap_err();
    assert!(matches!(err, LayoutError::NoValidLocation));
    assert_eq!(m.tree().shape(), before);
}

#[test]
fn row_added_to_a_stack_goes_beside_it() {
    let mut m = manager(LayoutConfig::with_root(ItemConfig::stack(vec![comp("a")])));
    let a_stack = m.tree().parent_of(id(&m, "a")).unwrap();

    let row = m
        .new_item_at_location(ItemConfig::column(vec![comp("c"), comp("d")]), &[
            LocationSelector::FirstStack(None),
        ])
        .unwrap()
        .applied()
        .unwrap();
    let root = m.tree().root().unwrap();
    assert_eq!(m.tree().item_type(root), Some(ItemType::Row));
    assert_eq!(m.tree().children(root), &[a_stack, row]);
    assert_tree_ok(&m);
}

#[test]
fn merged_stack_with_a_bad_active_index_activates_its_first_tab() {
    let mut m = manager(two_stacks());
    let a_stack = m.tree().parent_of(id(&m, "a")).unwrap();
    let config = ItemConfig::stack(vec![comp("x"), comp("y")]).with_active_item_index(5);

    let location = m
        .add_item_at_location(config, &[LocationSelector::FirstStack(None)])
        .unwrap()
        .applied()
        .unwrap();
    let x = id(&m, "x");
    assert_eq!(location.parent, a_stack);
    assert_eq!(m.tree().location_of(x), Some(location));
    assert_eq!(m.tree().children(a_stack).len(), 4);
    assert_eq!(m.tree().stack(a_stack).unwrap().active, Some(x));
    assert_tree_ok(&m);
}

#[test]
fn merging_an_empty_stack_changes_nothing() {
    let bindings = Bindings::default();
    let mut m = started(two_stacks(), bindings.registry());
    let before = m.tree().shape();
    let bound = bindings.bound.get();

    let err = m
        .add_item_at_location(ItemConfig::stack(vec![]), &[LocationSelector::FirstStack(None)])
        .unwrap_err();
    assert!(matches!(err, LayoutError::InvalidState(_)));
    assert_eq!(m.tree().shape(), before);
    assert_eq!(bindings.bound.get(), bound);
    assert!(m.tree().detached_items().is_empty());
    assert_tree_ok(&m);
}

#[test]
fn move_component_into_a_row_gets_its_own_stack() {
    let mut m = manager(two_stacks());
    let a = id(&m, "a");
    let row = m.tree().root().unwrap();
    m.move_item(a, row, Some(2)).unwrap().applied().unwrap();

    let stack = m.tree().parent_of(a).unwrap();
    assert_eq!(m.tree().item_type(stack), Some(ItemType::Stack));
    assert_eq!(m.tree().children(row).len(), 3);
    assert_eq!(m.tree().children(row)[2], stack);
    assert_tree_ok(&m);

    assert!(matches!(m.move_item(row, stack, None), Err(LayoutError::InvalidState(_))));
}

#[test]
fn removing_the_focused_component_blurs_it() {
    let mut m = manager(two_stacks());
    let b = id(&m, "b");
    m.focus_component(b).unwrap();
    m.take_events();

    m.remove_item(b).unwrap().applied().unwrap();
    assert_eq!(m.focused_component(), None);
    let events = m.take_events();
    assert!(events.contains(&LayoutEvent::Blur(b)));
    assert!(events.contains(&LayoutEvent::ItemDestroyed(b)));
    // The row collapsed into the remaining stack.
    assert_eq!(m.tree().item_type(m.tree().root().unwrap()), Some(ItemType::Stack));
    assert_tree_ok(&m);
}

// ----------------------------------------------------------------------------------------
// Maximise

#[test]
fn only_one_stack_is_maximised() {
    let mut m = manager(two_stacks());
    let a_stack = m.tree().parent_of(id(&m, "a")).unwrap();
    let b_stack = m.tree().parent_of(id(&m, "b")).unwrap();

    m.maximise_stack(a_stack).unwrap();
    m.take_events();
    m.maximise_stack(b_stack).unwrap();

    assert_eq!(m.tree().maximised_stack(), Some(b_stack));
    assert!(!m.tree().stack(a_stack).unwrap().maximised);
    assert_eq!(m.tree().get(b_stack).unwrap().rect(), screen(800.0, 600.0));
    let events = m.take_events();
    assert!(events.contains(&LayoutEvent::StackMinimised(a_stack)));
    assert!(events.contains(&LayoutEvent::StackMaximised(b_stack)));

    m.toggle_maximise(b_stack).unwrap();
    assert_eq!(m.tree().maximised_stack(), None);
}

#[test]
fn loading_two_maximised_stacks_keeps_the_first() {
    let config = LayoutConfig::with_root(ItemConfig::row(vec![
        ItemConfig::stack(vec![comp("a")]).maximised(),
        ItemConfig::stack(vec![comp("b")]).maximised(),
    ]));
    let m = manager(config);
    let a_stack = m.tree().parent_of(id(&m, "a")).unwrap();
    assert_eq!(m.tree().maximised_stack(), Some(a_stack));
    assert_eq!(
        m.tree().all_of_type(ItemType::Stack)
            .iter()
            .filter(|&&s| m.tree().stack(s).is_some_and(|s| s.maximised))
            .count(),
        1
    );
}

// ----------------------------------------------------------------------------------------
// Dragging

#[test]
fn dropping_a_tab_on_another_stack_moves_it() {
    let mut m = manager(two_stacks());
    let a = id(&m, "a");
    let a_stack = m.tree().parent_of(a).unwrap();
    let b_stack = m.tree().parent_of(id(&m, "b")).unwrap();
    m.take_events();

    drag_tab(&mut m, a, pos2(15.0, 10.0), pos2(700.0, 10.0));
    assert_eq!(m.dragged_item(), Some(a));
    assert_eq!(m.tree().parent_of(a), None);
    assert!(matches!(
        m.drop_indicator().map(|i| i.plan),
        Some(DropPlan::AddTab { stack, .. }) if stack == b_stack
    ));

    assert!(m.pointer_up(pos2(700.0, 10.0)));
    assert!(!m.is_dragging());
    assert_eq!(m.tree().parent_of(a), Some(b_stack));
    assert_eq!(m.tree().stack(b_stack).unwrap().active, Some(a));
    assert_eq!(m.tree().stack(a_stack).unwrap().tabs.tab_count(), 1);
    assert_eq!(m.tree().stack(b_stack).unwrap().tabs.tab_count(), 2);
    assert_tree_ok(&m);

    let events = m.take_events();
    assert!(events.contains(&LayoutEvent::DragStarted(a)));
    assert!(events.contains(&LayoutEvent::DragStopped {
        item: a,
        committed: true
    }));
    assert_eq!(
        events.iter().rev().find(|e| matches!(e, LayoutEvent::DropIndicatorChanged(_))),
        Some(&LayoutEvent::DropIndicatorChanged(None))
    );
}

#[test]
fn dropping_outside_every_area_restores_the_tab() {
    let mut m = manager(two_stacks());
    let a = id(&m, "a");
    let a_stack = m.tree().parent_of(a).unwrap();
    let before = m.tree().shape();

    drag_tab(&mut m, a, pos2(15.0, 10.0), pos2(-100.0, -100.0));
    assert_eq!(m.drop_indicator(), None);
    m.pointer_up(pos2(-100.0, -100.0));

    assert_eq!(m.tree().location_of(a), Some(ItemLocation {
        parent: a_stack,
        index: 0
    }));
    assert_eq!(m.tree().stack(a_stack).unwrap().tabs.tab_count(), 2);
    assert_eq!(m.tree().shape(), before);
    assert!(m.take_events().contains(&LayoutEvent::DragStopped {
        item: a,
        committed: false
    }));
    assert_tree_ok(&m);
}

#[test]
fn cancelled_drag_restores_the_tab() {
    let mut m = manager(two_stacks());
    let b = id(&m, "b");
    let b_stack = m.tree().parent_of(b).unwrap();

    drag_tab(&mut m, b, pos2(420.0, 10.0), pos2(100.0, 300.0));
    assert!(m.drop_indicator().is_some());
    m.cancel_drag();

    assert!(!m.is_dragging());
    assert_eq!(m.tree().parent_of(b), Some(b_stack));
    assert_eq!(m.tree().stack(b_stack).unwrap().active, Some(b));
    assert_tree_ok(&m);
}

#[test]
fn dragging_the_last_tab_out_removes_its_stack() {
    let mut m = manager(two_stacks());
    let b = id(&m, "b");
    let a_stack = m.tree().parent_of(id(&m, "a")).unwrap();

    drag_tab(&mut m, b, pos2(420.0, 10.0), pos2(100.0, 10.0));
    m.pointer_up(pos2(100.0, 10.0));

    assert_eq!(m.tree().parent_of(b), Some(a_stack));
    assert_eq!(m.tree().root(), Some(a_stack));
    assert_tree_ok(&m);
}

#[test]
fn reordering_a_tab_to_the_right_lands_where_indicated() {
    let mut m = manager(LayoutConfig::with_root(ItemConfig::stack(vec![
        comp("a"),
        comp("b"),
        comp("c"),
    ])));
    let (a, b, c) = (id(&m, "a"), id(&m, "b"), id(&m, "c"));
    let stack = m.tree().parent_of(a).unwrap();
    let header = m.tree().stack(stack).unwrap().header_rect().unwrap();
    let (a_mid, c_left) = {
        let tabs = &m.tree().stack(stack).unwrap().tabs;
        let a_tab = tabs.tab(a).unwrap();
        (
            header.min.x + a_tab.left + a_tab.width * 0.5,
            header.min.x + tabs.tab(c).unwrap().left,
        )
    };
    let y = header.center().y;

    // Just past the start of c: between b and c.
    let to = pos2(c_left + 1.0, y);
    drag_tab(&mut m, a, pos2(a_mid, y), to);
    let indicator = m.drop_indicator().unwrap();
    assert_eq!(indicator.plan, DropPlan::AddTab { stack, index: 1 });
    assert_eq!(indicator.rect.min.x, c_left);
    assert!(matches!(m.save_layout(), Err(LayoutError::InvalidState(_))));

    assert!(m.pointer_up(to));
    assert_eq!(m.tree().children(stack), &[b, a, c]);
    let tab_order: Vec<ItemId> = m
        .tree()
        .stack(stack)
        .unwrap()
        .tabs
        .tabs()
        .iter()
        .map(|tab| tab.component)
        .collect();
    assert_eq!(tab_order, vec![b, a, c]);
    assert_eq!(m.tree().stack(stack).unwrap().active, Some(a));
    assert_tree_ok(&m);
}

#[test]
fn mutations_during_a_drag_wait_for_it_to_end() {
    let mut m = manager(two_stacks());
    let a = id(&m, "a");
    let b = id(&m, "b");
    let a_stack = m.tree().parent_of(a).unwrap();

    drag_tab(&mut m, a, pos2(15.0, 10.0), pos2(100.0, 10.0));
    assert!(m.remove_item(b).unwrap().is_deferred());
    assert!(m.new_component("c", None, None).unwrap().is_deferred());
    assert!(m.tree().contains(b));
    assert!(matches!(m.save_layout(), Err(LayoutError::InvalidState(_))));

    m.pointer_up(pos2(100.0, 10.0));
    assert!(!m.tree().contains(b));
    assert_eq!(m.tree().parent_of(a), Some(a_stack));
    assert!(m.find_first_component_by_id("c").is_some());
    assert_tree_ok(&m);
}

#[test]
fn tabs_with_reordering_disabled_do_not_drag() {
    let mut config = two_stacks();
    config.settings.reorder_enabled = false;
    let mut m = manager(config);
    let a = id(&m, "a");
    assert!(!m.pointer_down(Some(DragHandle::Tab(a)), pos2(15.0, 10.0), Instant::now()));
    m.pointer_move(pos2(200.0, 200.0));
    assert!(!m.is_dragging());
}

#[test]
fn holding_still_starts_a_drag() {
    let mut m = manager(two_stacks());
    let a = id(&m, "a");
    let t0 = Instant::now();
    m.pointer_down(Some(DragHandle::Tab(a)), pos2(15.0, 10.0), t0);
    m.tick(t0 + Duration::from_millis(100));
    assert!(!m.is_dragging());
    m.tick(t0 + m.options.drag_hold_delay);
    assert!(m.is_dragging());
    m.cancel_drag();
    assert_tree_ok(&m);
}

#[test]
fn drag_sources_create_components() {
    let mut m = manager(two_stacks());
    let b_stack = m.tree().parent_of(id(&m, "b")).unwrap();
    let source = m.add_drag_source(|| comp("dragged"));

    assert!(m.pointer_down(Some(DragHandle::Source(source)), pos2(700.0, 300.0), Instant::now()));
    m.pointer_move(pos2(700.0, 10.0));
    m.pointer_up(pos2(700.0, 10.0));

    let dragged = id(&m, "dragged");
    assert_eq!(m.tree().parent_of(dragged), Some(b_stack));
    assert!(m.tree().component(dragged).unwrap().handle().is_some());
    assert_tree_ok(&m);

    // Released over nothing, the new component is thrown away.
    let items = m.tree().len();
    m.pointer_down(Some(DragHandle::Source(source)), pos2(700.0, 300.0), Instant::now());
    m.pointer_move(pos2(0.0, 0.0));
    m.pointer_up(pos2(0.0, 0.0));
    assert_eq!(m.tree().len(), items);

    assert!(m.remove_drag_source(source));
    assert!(!m.pointer_down(Some(DragHandle::Source(source)), pos2(1.0, 1.0), Instant::now()));
}

#[test]
fn drags_move_between_windows() {
    let mut source = manager(two_stacks());
    let mut target = LayoutManager::new(
        LayoutConfig::with_root(ItemConfig::stack(vec![comp("x")])),
        Bindings::default().registry(),
        LayoutManagerOptions {
            window_id: "second".to_owned(),
            ..options()
        },
    );
    target.set_size(screen(800.0, 600.0)).unwrap();
    target.init().unwrap();

    let a = id(&source, "a");
    drag_tab(&mut source, a, pos2(15.0, 10.0), pos2(-10.0, -10.0));
    let payload = source.drag_payload().unwrap();
    assert_eq!(payload.source_window, "main");
    let payload = DragPayload::from_json(&payload.to_json().unwrap()).unwrap();

    assert!(target.native_drag_enter());
    assert!(!target.native_drag_enter());
    assert!(!target.native_drag_leave());
    assert!(target.native_drag_over(pos2(300.0, 10.0)).is_some());
    let dropped = target.native_drop(&payload, pos2(300.0, 10.0)).unwrap().unwrap();
    source.dropped_in_other_window();

    assert_eq!(id(&target, "a"), dropped);
    assert!(source.find_first_component_by_id("a").is_none());
    assert!(!source.is_dragging());
    assert_tree_ok(&source);
    assert_tree_ok(&target);
}

// ----------------------------------------------------------------------------------------
// Resizing

#[test]
fn resizes_are_debounced() {
    let mut m = manager(two_stacks());
    let t0 = Instant::now();
    let ms = Duration::from_millis;

    m.notify_resize(screen(400.0, 300.0), t0);
    m.notify_resize(screen(500.0, 300.0), t0 + ms(60));
    m.tick(t0 + ms(120));
    assert_eq!(m.container_rect(), screen(800.0, 600.0));
    assert!(m.next_deadline().is_some());

    m.tick(t0 + ms(200));
    assert_eq!(m.container_rect(), screen(500.0, 300.0));
    let root = m.tree().root().unwrap();
    assert_eq!(m.tree().get(root).unwrap().rect(), screen(500.0, 300.0));
}

#[test]
fn splitter_drags_resize_neighbours() {
    let mut m = manager(two_stacks());
    let row = m.tree().root().unwrap();
    let [left, right] = m.tree().children(row) else {
        panic!("expected two children");
    };
    let (left, right) = (*left, *right);
    let before = m.tree().get(left).unwrap().rect().width();

    m.drag_splitter(row, 0, 100.0).unwrap();
    let after = m.tree().get(left).unwrap().rect().width();
    assert!((after - before - 100.0).abs() < 1.0, "{before} -> {after}");
    assert!(m.tree().get(right).unwrap().rect().width() < before);
}

// ----------------------------------------------------------------------------------------
// Popouts

fn with_host(config: LayoutConfig, host: &MockHost) -> LayoutManager {
    let mut m = LayoutManager::new(config, Bindings::default().registry(), options())
        .with_popout_host(host.clone());
    m.set_size(screen(800.0, 600.0)).unwrap();
    m.init().unwrap();
    m
}

#[test]
fn popout_and_pop_in_restore_the_position() {
    let host = MockHost::default();
    let mut m = with_host(two_stacks(), &host);
    let a2 = id(&m, "a2");
    let a_stack = m.tree().parent_of(a2).unwrap();

    let popout = m.create_popout(a2).unwrap().applied().flatten().unwrap();
    assert!(m.find_first_component_by_id("a2").is_none());
    assert!(m.take_events().contains(&LayoutEvent::PopoutOpened(popout)));
    assert_tree_ok(&m);

    let saved = m.save_layout().unwrap();
    assert_eq!(saved.open_popouts.len(), 1);
    assert_eq!(saved.open_popouts[0].index_in_parent, Some(1));
    assert!(saved.open_popouts[0].parent_id.is_some());

    let back = m.pop_in(popout).unwrap().applied().flatten().unwrap();
    assert_eq!(m.tree().location_of(back), Some(ItemLocation {
        parent: a_stack,
        index: 1
    }));
    assert!(host.opened.borrow()[0].2.get(), "pop-in closes the window");
    assert_eq!(m.popouts().count(), 0);
    assert_tree_ok(&m);
}

#[test]
fn blocked_popouts_fail_or_warn() {
    let mut m = manager(two_stacks());
    let a2 = id(&m, "a2");
    assert!(matches!(m.create_popout(a2), Err(LayoutError::PopoutBlocked)));
    assert!(m.tree().contains(a2));

    let mut config = two_stacks();
    config.settings.blocked_popouts_throw_error = false;
    let mut m = manager(config);
    let a2 = id(&m, "a2");
    assert_eq!(m.create_popout(a2).unwrap(), Mutation::Applied(None));
    assert!(m.tree().is_attached(a2));
}

/// A host whose windows never open.
#[derive(Clone, Default)]
struct RefusingHost {
    attempts: Rc<Cell<usize>>,
}

impl PopoutHost for RefusingHost {
    fn open_window(
        &mut self,
        _id: PopoutId,
        _config: &PopoutLayoutConfig,
    ) -> Option<Box<dyn PopoutWindow>> {
        self.attempts.set(self.attempts.get() + 1);
        None
    }
}

fn popping_out_on_drop() -> LayoutConfig {
    let mut config = two_stacks();
    config.settings.popout_on_drop = true;
    config.settings.constrain_drag_to_container = false;
    config
}

#[test]
fn dropping_outside_pops_the_tab_out() {
    let host = MockHost::default();
    let mut m = with_host(popping_out_on_drop(), &host);
    let a2 = id(&m, "a2");
    let a_stack = m.tree().parent_of(a2).unwrap();
    m.take_events();

    let outside = pos2(-100.0, -100.0);
    drag_tab(&mut m, a2, pos2(50.0, 10.0), outside);
    assert_eq!(m.drop_indicator(), None);
    assert!(m.pointer_up(outside));

    assert!(!m.tree().contains(a2));
    assert_eq!(m.tree().children(a_stack).len(), 1);
    assert_eq!(m.tree().stack(a_stack).unwrap().tabs.tab_count(), 1);
    assert_eq!(m.popouts().count(), 1);
    {
        let opened = host.opened.borrow();
        let (_, config, _) = &opened[0];
        assert_eq!(config.window.left, Some(-100.0));
        assert_eq!(config.window.top, Some(-100.0));
        assert_eq!(config.index_in_parent, Some(1));
        assert!(
            config
                .layout
                .root
                .as_ref()
                .and_then(|root| root.find_by_id("a2"))
                .is_some()
        );
    }
    assert!(m.take_events().contains(&LayoutEvent::DragStopped {
        item: a2,
        committed: true
    }));
    assert_tree_ok(&m);
}

#[test]
fn refused_popout_on_drop_restores_the_tab() {
    let host = RefusingHost::default();
    let mut m = LayoutManager::new(popping_out_on_drop(), Bindings::default().registry(), options())
        .with_popout_host(host.clone());
    m.set_size(screen(800.0, 600.0)).unwrap();
    m.init().unwrap();
    let a2 = id(&m, "a2");
    let a_stack = m.tree().parent_of(a2).unwrap();
    m.take_events();

    let outside = pos2(-100.0, -100.0);
    drag_tab(&mut m, a2, pos2(50.0, 10.0), outside);
    assert!(m.pointer_up(outside));

    assert_eq!(host.attempts.get(), 1);
    assert_eq!(m.tree().location_of(a2), Some(ItemLocation {
        parent: a_stack,
        index: 1
    }));
    assert_eq!(m.tree().stack(a_stack).unwrap().tabs.tab_count(), 2);
    assert_eq!(m.popouts().count(), 0);
    assert!(m.take_events().contains(&LayoutEvent::DragStopped {
        item: a2,
        committed: false
    }));
    assert_tree_ok(&m);
}

#[test]
fn failed_pop_in_keeps_the_popout() {
    let host = MockHost::default();
    let mut m = with_host(two_stacks(), &host);
    let a2 = id(&m, "a2");
    let popout = m.create_popout(a2).unwrap().applied().flatten().unwrap();
    let before = m.tree().shape();
    m.take_events();

    *m.registry_mut() = ComponentRegistry::new();
    assert!(matches!(
        m.pop_in(popout),
        Err(LayoutError::Config(ConfigError::UnregisteredComponentType(_)))
    ));
    assert_eq!(m.popouts().count(), 1);
    assert!(!host.opened.borrow()[0].2.get(), "the window stays open");
    assert_eq!(m.tree().shape(), before);

    let broken = PopoutMessage::PopIn {
        popout_id: popout,
        config: Some(ItemConfig::new(ItemType::Ground)),
    };
    assert!(m.handle_popout_message(broken).is_err());
    assert_eq!(m.popouts().count(), 1);
    assert!(
        !m.take_events()
            .iter()
            .any(|e| matches!(e, LayoutEvent::PopoutClosed(_)))
    );

    *m.registry_mut() = Bindings::default().registry();
    let saved = m.save_layout().unwrap();
    let root = saved.open_popouts[0].layout.root.as_ref().unwrap();
    assert!(root.find_by_id("a2").is_some());

    let back = m.pop_in(popout).unwrap().applied().flatten().unwrap();
    assert!(m.tree().is_attached(back));
    assert_eq!(m.popouts().count(), 0);
    assert!(host.opened.borrow()[0].2.get());
    assert_tree_ok(&m);
}

#[test]
fn closed_windows_pop_in_on_reconcile() {
    let host = MockHost::default();
    let mut config = two_stacks();
    config.settings.pop_in_on_close = true;
    let mut m = with_host(config, &host);
    let b = id(&m, "b");
    m.create_popout(b).unwrap().applied().flatten().unwrap();
    assert_eq!(m.tree().item_type(m.tree().root().unwrap()), Some(ItemType::Stack));

    let t0 = Instant::now();
    m.tick(t0);
    host.opened.borrow()[0].2.set(true);
    m.tick(t0 + m.options.popout_reconcile_interval + Duration::from_millis(1));

    assert_eq!(m.popouts().count(), 0);
    assert!(m.find_first_component_by_id("b").is_some());
    assert_tree_ok(&m);
}

#[test]
fn popout_child_pops_back_into_its_parent() {
    let host = MockHost::default();
    let mut parent = with_host(two_stacks(), &host);
    let a_stack = parent.tree().parent_of(id(&parent, "a")).unwrap();
    let a2 = id(&parent, "a2");
    parent.create_popout(a2).unwrap().applied().flatten().unwrap();

    let (popout_id, config, _) = host.opened.borrow()[0].clone();
    let mut child = LayoutManager::new_popout_child(
        config,
        popout_id,
        Bindings::default().registry(),
        options(),
    );
    child.set_size(screen(480.0, 360.0)).unwrap();
    child.init().unwrap();
    assert_eq!(child.popout_id(), Some(popout_id));
    assert!(child.find_first_component_by_id("a2").is_some());
    assert_eq!(
        child.closing_message(),
        Some(PopoutMessage::Closing { popout_id })
    );

    let message = child.request_pop_in().unwrap();
    assert_eq!(child.state(), ManagerState::Destroyed);

    let back = parent
        .handle_popout_message(message)
        .unwrap()
        .applied()
        .flatten()
        .unwrap();
    assert_eq!(parent.tree().parent_of(back), Some(a_stack));
    assert_eq!(parent.popouts().count(), 0);
    assert_tree_ok(&parent);
}

#[test]
fn saved_popouts_reopen_on_load() {
    let host = MockHost::default();
    let mut m = with_host(two_stacks(), &host);
    let b = id(&m, "b");
    m.create_popout(b).unwrap().applied().flatten().unwrap();
    let saved = m.save_layout().unwrap();

    let other_host = MockHost::default();
    let mut other = with_host(LayoutConfig::default(), &other_host);
    other.load_layout(saved).unwrap().applied().unwrap();
    assert_eq!(other.popouts().count(), 1);
    assert_eq!(other_host.opened.borrow().len(), 1);

    other.close_all_open_popouts();
    assert_eq!(other.popouts().count(), 0);
    assert!(other_host.opened.borrow()[0].2.get());
}
