//! Binding components to the widgets that render them.
//!
//! The layout never looks inside a widget. It asks a binding for an opaque
//! [`ComponentHandle`] when a component is created and hands the handle back when the
//! component is destroyed.

use crate::config::{JsonValue, title_for_component_type};
use crate::error::{ConfigError, LayoutError};
use crate::tree::ItemId;

/// Opaque reference to a rendered widget, chosen by the binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentHandle(pub u64);

/// Creates and destroys the widgets of components.
pub trait ComponentBinding {
    /// Create the widget for the component `container`.
    fn bind(
        &mut self,
        container: ItemId,
        component_type: &JsonValue,
        state: &JsonValue,
    ) -> ComponentHandle;

    /// Destroy a widget created by [`Self::bind`].
    fn unbind(&mut self, container: ItemId, handle: ComponentHandle);
}

/// Convenience helper: build a [`ComponentBinding`] from two closures.
pub struct SimpleComponentBinding<Bind, Unbind> {
    pub bind: Bind,
    pub unbind: Unbind,
}

impl<Bind, Unbind> SimpleComponentBinding<Bind, Unbind> {
    pub fn new(bind: Bind, unbind: Unbind) -> Self {
        Self { bind, unbind }
    }
}

impl<Bind, Unbind> ComponentBinding for SimpleComponentBinding<Bind, Unbind>
where
    Bind: FnMut(ItemId, &JsonValue, &JsonValue) -> ComponentHandle,
    Unbind: FnMut(ItemId, ComponentHandle),
{
    fn bind(
        &mut self,
        container: ItemId,
        component_type: &JsonValue,
        state: &JsonValue,
    ) -> ComponentHandle {
        (self.bind)(container, component_type, state)
    }

    fn unbind(&mut self, container: ItemId, handle: ComponentHandle) {
        (self.unbind)(container, handle);
    }
}

/// A widget constructor taking the container and the component state.
pub type FactoryFn = Box<dyn FnMut(ItemId, &JsonValue) -> ComponentHandle>;

/// How one registered component type is instantiated, decided once at registration.
pub enum Instantiator {
    /// A plain constructor. Its widgets need no explicit teardown.
    Factory(FactoryFn),

    /// A binding that also tears its widgets down.
    Binding(Box<dyn ComponentBinding>),
}

impl std::fmt::Debug for Instantiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory"),
            Self::Binding(_) => f.write_str("Binding"),
        }
    }
}

/// Component types known to a layout manager.
///
/// A type is looked up by its name (the component type as a string). Types with no
/// registration fall through to the application-wide binding, if one is set.
#[derive(Default)]
pub struct ComponentRegistry {
    by_type: ahash::HashMap<String, Instantiator>,
    fallback: Option<Box<dyn ComponentBinding>>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.registered_types())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where every type goes through `binding`.
    pub fn with_binding(binding: impl ComponentBinding + 'static) -> Self {
        let mut registry = Self::default();
        registry.set_fallback_binding(binding);
        registry
    }

    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl FnMut(ItemId, &JsonValue) -> ComponentHandle + 'static,
    ) {
        self.register(name, Instantiator::Factory(Box::new(factory)));
    }

    pub fn register_binding(
        &mut self,
        name: impl Into<String>,
        binding: impl ComponentBinding + 'static,
    ) {
        self.register(name, Instantiator::Binding(Box::new(binding)));
    }

    pub fn register(&mut self, name: impl Into<String>, instantiator: Instantiator) {
        let name = name.into();
        log::debug!("registered component type {name:?} ({instantiator:?})");
        self.by_type.insert(name, instantiator);
    }

    /// The binding used for types without their own registration.
    pub fn set_fallback_binding(&mut self, binding: impl ComponentBinding + 'static) {
        self.fallback = Some(Box::new(binding));
    }

    pub fn registered_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn can_bind(&self, component_type: &JsonValue) -> bool {
        self.fallback.is_some() || self.by_type.contains_key(&type_name(component_type))
    }

    /// Fails before binding anything if any of `types` is unknown.
    pub(crate) fn check_all<'a>(
        &self,
        types: impl IntoIterator<Item = &'a JsonValue>,
    ) -> Result<(), LayoutError> {
        for component_type in types {
            if !self.can_bind(component_type) {
                return Err(ConfigError::UnregisteredComponentType(type_name(component_type)).into());
            }
        }
        Ok(())
    }

    pub(crate) fn bind(
        &mut self,
        container: ItemId,
        component_type: &JsonValue,
        state: &JsonValue,
    ) -> Result<ComponentHandle, LayoutError> {
        let name = type_name(component_type);
        match self.by_type.get_mut(&name) {
            Some(Instantiator::Factory(factory)) => Ok(factory(container, state)),
            Some(Instantiator::Binding(binding)) => {
                Ok(binding.bind(container, component_type, state))
            }
            None => match &mut self.fallback {
                Some(binding) => Ok(binding.bind(container, component_type, state)),
                None => Err(ConfigError::UnregisteredComponentType(name).into()),
            },
        }
    }

    pub(crate) fn unbind(
        &mut self,
        container: ItemId,
        component_type: &JsonValue,
        handle: ComponentHandle,
    ) {
        match self.by_type.get_mut(&type_name(component_type)) {
            Some(Instantiator::Factory(_)) => {}
            Some(Instantiator::Binding(binding)) => binding.unbind(container, handle),
            None => {
                if let Some(binding) = &mut self.fallback {
                    binding.unbind(container, handle);
                }
            }
        }
    }
}

fn type_name(component_type: &JsonValue) -> String {
    title_for_component_type(component_type)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    #[test]
    fn factories_and_bindings_resolve_by_type() {
        let unbound: Rc<RefCell<Vec<ComponentHandle>>> = Rc::default();
        let mut registry = ComponentRegistry::new();
        registry.register_factory("editor", |_: ItemId, _: &JsonValue| ComponentHandle(1));
        let log = Rc::clone(&unbound);
        registry.register_binding(
            "terminal",
            SimpleComponentBinding::new(
                |_: ItemId, _: &JsonValue, _: &JsonValue| ComponentHandle(2),
                move |_: ItemId, handle: ComponentHandle| log.borrow_mut().push(handle),
            ),
        );

        let item = ItemId::from_u64(7);
        assert_eq!(
            registry.bind(item, &json!("editor"), &JsonValue::Null).unwrap(),
            ComponentHandle(1)
        );
        assert_eq!(
            registry.bind(item, &json!("terminal"), &JsonValue::Null).unwrap(),
            ComponentHandle(2)
        );
        registry.unbind(item, &json!("editor"), ComponentHandle(1));
        registry.unbind(item, &json!("terminal"), ComponentHandle(2));
        assert_eq!(*unbound.borrow(), vec![ComponentHandle(2)]);
        assert_eq!(registry.registered_types(), vec!["editor", "terminal"]);
    }

    #[test]
    fn unknown_types_are_rejected_without_a_fallback() {
        let mut registry = ComponentRegistry::new();
        assert!(!registry.can_bind(&json!("x")));
        let err = registry
            .bind(ItemId::from_u64(1), &json!("x"), &JsonValue::Null)
            .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::Config(ConfigError::UnregisteredComponentType(name)) if name == "x"
        ));
        assert!(registry.check_all([&json!("x")]).is_err());
    }

    #[test]
    fn fallback_binding_accepts_everything() {
        let registry = ComponentRegistry::with_binding(SimpleComponentBinding::new(
            |item: ItemId, _: &JsonValue, _: &JsonValue| ComponentHandle(item.as_u64()),
            |_: ItemId, _: ComponentHandle| {},
        ));
        assert!(registry.can_bind(&json!({ "kind": "anything" })));
    }
}
