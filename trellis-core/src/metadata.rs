//! Metadata store for declared services, controllers and routes.
//!
//! Declarations write typed *facets* against a [`Subject`]: either a type,
//! or a (type, method name) pair. The two subject shapes are independent
//! keyspaces, so a facet stored against a type is never visible when the same
//! facet is queried for one of its methods.
//!
//! Entries are written during declaration and only read afterwards.
//!
//! ```
//! use trellis_core::metadata::{facets, MetadataStore, Subject};
//!
//! struct UserController;
//!
//! let mut store = MetadataStore::new();
//! store.set::<facets::BasePath>(Subject::of::<UserController>(), "/users".to_string());
//!
//! assert_eq!(store.get::<facets::BasePath>(&Subject::of::<UserController>()), "/users");
//! assert!(store.get::<facets::BasePath>(&Subject::method::<UserController>("list")).is_empty());
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a Rust type for the lifetime of the process
#[derive(Clone, Copy)]
pub struct ServiceId {
    type_id: TypeId,
    name: &'static str,
}

impl ServiceId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for ServiceId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceId {}

impl Hash for ServiceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({})", self.name)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// What a piece of metadata is attached to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subject {
    Type(ServiceId),
    Method(ServiceId, Cow<'static, str>),
}

impl Subject {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Subject::Type(ServiceId::of::<T>())
    }

    pub fn method<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Subject::Method(ServiceId::of::<T>(), name.into())
    }

    /// The type this subject belongs to
    pub fn service(&self) -> ServiceId {
        match self {
            Subject::Type(id) | Subject::Method(id, _) => *id,
        }
    }
}

/// A typed metadata key
pub trait Facet: 'static {
    type Value: Clone + Default + Send + Sync + 'static;

    /// Name used in logs
    const NAME: &'static str;
}

/// Process-wide metadata keyed by (subject, facet)
#[derive(Default)]
pub struct MetadataStore {
    entries: HashMap<(Subject, TypeId), Box<dyn Any + Send + Sync>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the facet value for a subject
    pub fn set<F: Facet>(&mut self, subject: Subject, value: F::Value) {
        tracing::trace!(facet = F::NAME, subject = ?subject, "Setting metadata");
        self.entries
            .insert((subject, TypeId::of::<F>()), Box::new(value));
    }

    /// Append to a sequence facet, starting from an empty sequence
    pub fn append<F, T>(&mut self, subject: Subject, item: T)
    where
        F: Facet<Value = Vec<T>>,
        T: Clone + Send + Sync + 'static,
    {
        tracing::trace!(facet = F::NAME, subject = ?subject, "Appending metadata");
        let entry = self
            .entries
            .entry((subject, TypeId::of::<F>()))
            .or_insert_with(|| Box::new(Vec::<T>::new()));
        if let Some(items) = entry.downcast_mut::<Vec<T>>() {
            items.push(item);
        }
    }

    /// Read a facet value, or its default when absent
    pub fn get<F: Facet>(&self, subject: &Subject) -> F::Value {
        self.entries
            .get(&(subject.clone(), TypeId::of::<F>()))
            .and_then(|value| value.downcast_ref::<F::Value>())
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains<F: Facet>(&self, subject: &Subject) -> bool {
        self.entries
            .contains_key(&(subject.clone(), TypeId::of::<F>()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// The facets written by the declaration API
pub mod facets {
    use super::{Facet, ServiceId};
    use crate::container::ServiceFactory;
    use crate::declare::{ParameterBinding, RouteDescriptor};
    use crate::middleware::MiddlewareRef;

    /// Controller path prefix
    pub struct BasePath;
    impl Facet for BasePath {
        type Value = String;
        const NAME: &'static str = "base-path";
    }

    /// Routes declared on a controller, in declaration order
    pub struct Routes;
    impl Facet for Routes {
        type Value = Vec<RouteDescriptor>;
        const NAME: &'static str = "routes";
    }

    /// Middleware for a type or for one of its methods
    pub struct Middlewares;
    impl Facet for Middlewares {
        type Value = Vec<MiddlewareRef>;
        const NAME: &'static str = "middlewares";
    }

    pub struct BodyBindings;
    impl Facet for BodyBindings {
        type Value = Vec<ParameterBinding>;
        const NAME: &'static str = "body-bindings";
    }

    pub struct ParamBindings;
    impl Facet for ParamBindings {
        type Value = Vec<ParameterBinding>;
        const NAME: &'static str = "param-bindings";
    }

    pub struct QueryBindings;
    impl Facet for QueryBindings {
        type Value = Vec<ParameterBinding>;
        const NAME: &'static str = "query-bindings";
    }

    /// Ordered dependency descriptor of a service
    pub struct ConstructorParamTypes;
    impl Facet for ConstructorParamTypes {
        type Value = Vec<ServiceId>;
        const NAME: &'static str = "constructor-param-types";
    }

    /// How to build a service once its dependencies exist
    pub struct Factory;
    impl Facet for Factory {
        type Value = Option<ServiceFactory>;
        const NAME: &'static str = "factory";
    }

    pub struct Injectable;
    impl Facet for Injectable {
        type Value = bool;
        const NAME: &'static str = "injectable";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    struct Counter;
    impl Facet for Counter {
        type Value = Vec<u32>;
        const NAME: &'static str = "counter";
    }

    struct Label;
    impl Facet for Label {
        type Value = String;
        const NAME: &'static str = "label";
    }

    #[test]
    fn test_get_absent_returns_default() {
        let store = MetadataStore::new();
        assert!(store.get::<Counter>(&Subject::of::<Alpha>()).is_empty());
        assert!(!store.contains::<Counter>(&Subject::of::<Alpha>()));
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = MetadataStore::new();
        store.set::<Label>(Subject::of::<Alpha>(), "one".to_string());
        store.set::<Label>(Subject::of::<Alpha>(), "two".to_string());
        assert_eq!(store.get::<Label>(&Subject::of::<Alpha>()), "two");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = MetadataStore::new();
        for n in [3, 1, 2] {
            store.append::<Counter, _>(Subject::of::<Alpha>(), n);
        }
        assert_eq!(store.get::<Counter>(&Subject::of::<Alpha>()), vec![3, 1, 2]);
    }

    #[test]
    fn test_type_and_method_keyspaces_are_independent() {
        let mut store = MetadataStore::new();
        store.append::<Counter, _>(Subject::of::<Alpha>(), 1);
        store.append::<Counter, _>(Subject::method::<Alpha>("run"), 2);

        assert_eq!(store.get::<Counter>(&Subject::of::<Alpha>()), vec![1]);
        assert_eq!(store.get::<Counter>(&Subject::method::<Alpha>("run")), vec![2]);
        assert!(store.get::<Counter>(&Subject::method::<Alpha>("other")).is_empty());
    }

    #[test]
    fn test_subjects_of_different_types_do_not_alias() {
        let mut store = MetadataStore::new();
        store.set::<Label>(Subject::of::<Alpha>(), "alpha".to_string());
        assert!(store.get::<Label>(&Subject::of::<Beta>()).is_empty());
    }

    #[test]
    fn test_facets_do_not_alias() {
        let mut store = MetadataStore::new();
        store.set::<Label>(Subject::of::<Alpha>(), "alpha".to_string());
        assert!(store.get::<Counter>(&Subject::of::<Alpha>()).is_empty());
    }

    #[test]
    fn test_service_id_names() {
        let id = ServiceId::of::<Alpha>();
        assert_eq!(id.short_name(), "Alpha");
        assert!(id.name().ends_with("Alpha"));
        assert_eq!(id, ServiceId::of::<Alpha>());
        assert_ne!(id, ServiceId::of::<Beta>());
    }
}
