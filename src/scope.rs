//! Named channel scopes: the lookup surface a process network uses to
//! resolve a logical channel name to a concrete [`Channel`] handle.
//!
//! This is an externally-facing interface (`Lookup(name) -> channel handle
//! or NotFound`) without mandating a transport; only the in-process
//! `LocalScope` implementation ships here, since wiring a distributed
//! directory service is out of scope.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::channel::Channel;

/// The minimal interface a process needs to resolve named channels, kept as
/// a trait so an out-of-process implementation (backed by a directory
/// service, say) can be dropped in without touching call sites.
pub trait ChannelScope: Send + Sync {
    /// Registers a channel under `name`. Returns `false` if the name is
    /// already bound to a channel of any type.
    fn register<T: Clone + Send + Sync + 'static>(&self, name: &str, channel: Arc<Channel<T>>) -> bool;

    /// Resolves `name` to a channel of type `T`. Returns `None` if unbound,
    /// or bound to a channel of a different element type.
    fn lookup<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<Channel<T>>>;

    /// Removes a binding, returning whether one existed.
    fn unregister(&self, name: &str) -> bool;
}

struct Binding {
    type_id: TypeId,
    value: Arc<dyn Any + Send + Sync>,
}

/// An in-process [`ChannelScope`] backed by a name-to-channel map. Channels
/// are stored type-erased (`Any`) so a single scope can host channels of
/// different element types under different names.
#[derive(Default)]
pub struct LocalScope {
    bindings: RwLock<HashMap<String, Binding>>,
}

impl LocalScope {
    pub fn new() -> Self {
        LocalScope {
            bindings: RwLock::new(HashMap::new()),
        }
    }
}

impl ChannelScope for LocalScope {
    fn register<T: Clone + Send + Sync + 'static>(&self, name: &str, channel: Arc<Channel<T>>) -> bool {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(name) {
            return false;
        }
        bindings.insert(
            name.to_string(),
            Binding {
                type_id: TypeId::of::<T>(),
                value: channel,
            },
        );
        true
    }

    fn lookup<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<Channel<T>>> {
        let bindings = self.bindings.read();
        let binding = bindings.get(name)?;
        if binding.type_id != TypeId::of::<T>() {
            return None;
        }
        binding.value.clone().downcast::<Channel<T>>().ok()
    }

    fn unregister(&self, name: &str) -> bool {
        self.bindings.write().remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelConfig;

    #[test]
    fn register_then_lookup_round_trips() {
        let scope = LocalScope::new();
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        assert!(scope.register("events", ch.clone()));
        let resolved: Arc<Channel<i32>> = scope.lookup("events").unwrap();
        assert!(Arc::ptr_eq(&resolved, &ch));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let scope = LocalScope::new();
        let a = Channel::<i32>::new(ChannelConfig::new(0));
        let b = Channel::<i32>::new(ChannelConfig::new(0));
        assert!(scope.register("events", a));
        assert!(!scope.register("events", b));
    }

    #[test]
    fn lookup_with_wrong_type_returns_none() {
        let scope = LocalScope::new();
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        scope.register("events", ch);
        assert!(scope.lookup::<String>("events").is_none());
    }

    #[test]
    fn unregister_removes_binding() {
        let scope = LocalScope::new();
        let ch = Channel::<i32>::new(ChannelConfig::new(0));
        scope.register("events", ch);
        assert!(scope.unregister("events"));
        assert!(scope.lookup::<i32>("events").is_none());
        assert!(!scope.unregister("events"));
    }
}
