// Dependency injection container

use crate::Error;
use crate::metadata::{MetadataStore, ServiceId, Subject, facets};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A type-erased singleton instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds a service from the container once its dependencies are registered
pub type ServiceFactory = Arc<dyn Fn(&Container) -> Result<Instance, Error> + Send + Sync>;

/// The dependency injection container.
///
/// Holds at most one instance per [`ServiceId`]. The first registration wins;
/// later attempts are logged and ignored. Cloning shares the same registry.
#[derive(Clone)]
pub struct Container {
    instances: Arc<RwLock<HashMap<ServiceId, Instance>>>,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new DI container");
        Self {
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register an externally constructed instance.
    ///
    /// Returns `false` (and leaves the existing instance in place) if the
    /// type is already registered.
    pub fn register_instance<T: Send + Sync + 'static>(&self, instance: T) -> bool {
        self.register_arc(Arc::new(instance))
    }

    /// Register an `Arc`-wrapped instance
    pub fn register_arc<T: Send + Sync + 'static>(&self, instance: Arc<T>) -> bool {
        self.register_instance_by_id(ServiceId::of::<T>(), instance)
    }

    /// Register a type-erased instance under an explicit id
    pub fn register_instance_by_id(&self, id: ServiceId, instance: Instance) -> bool {
        let mut instances = self.instances.write();
        if instances.contains_key(&id) {
            warn!(service = %id, "Service already registered");
            return false;
        }
        instances.insert(id, instance);
        debug!(service = %id, "Registered service with provided instance");
        true
    }

    /// Register a service declared in `metadata`, building its dependencies
    /// first (depth-first, in declared order).
    ///
    /// Registering an already registered service is a warned no-op.
    pub fn register(&self, metadata: &MetadataStore, id: ServiceId) -> Result<(), Error> {
        if self.has_id(&id) {
            warn!(service = %id, "Service already registered");
            return Ok(());
        }
        let mut resolving = Vec::new();
        self.resolve(metadata, id, &mut resolving)
    }

    fn resolve(
        &self,
        metadata: &MetadataStore,
        id: ServiceId,
        resolving: &mut Vec<ServiceId>,
    ) -> Result<(), Error> {
        if let Some(start) = resolving.iter().position(|pending| *pending == id) {
            let chain = resolving[start..]
                .iter()
                .chain(std::iter::once(&id))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Error::CyclicDependency(chain));
        }

        let subject = Subject::Type(id);
        let factory = metadata.get::<facets::Factory>(&subject).ok_or_else(|| {
            Error::InvalidService(format!(
                "{} is not injectable and no instance was provided",
                id.name()
            ))
        })?;

        resolving.push(id);
        for dependency in metadata.get::<facets::ConstructorParamTypes>(&subject) {
            if self.has_id(&dependency) {
                trace!(service = %id, dependency = %dependency, "Dependency already resolved");
                continue;
            }
            trace!(service = %id, dependency = %dependency, "Resolving dependency");
            self.resolve(metadata, dependency, resolving)?;
        }

        // The lock is not held while the factory runs; it reads the registry.
        let instance = factory(self)?;
        resolving.pop();

        self.instances.write().entry(id).or_insert(instance);
        debug!(service = %id, "Registered service");
        Ok(())
    }

    /// Resolve a registered service by type
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        let id = ServiceId::of::<T>();
        self.get_by_id(id)?.downcast::<T>().map_err(|_| {
            Error::ServiceNotFound(format!("{} is registered with a different type", id.name()))
        })
    }

    /// Resolve a registered service by id
    pub fn get_by_id(&self, id: ServiceId) -> Result<Instance, Error> {
        let instances = self.instances.read();
        let result = instances
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound(id.name().to_string()));

        match &result {
            Ok(_) => trace!(service = %id, "Service resolved"),
            Err(_) => debug!(service = %id, "Service not found in container"),
        }
        result
    }

    /// Check if a service is registered
    pub fn has<T: 'static>(&self) -> bool {
        self.has_id(&ServiceId::of::<T>())
    }

    pub fn has_id(&self, id: &ServiceId) -> bool {
        self.instances.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.len())
            .finish()
    }
}
