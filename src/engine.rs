// -------------------------------------------------------------------------------------------------
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Pluggable transport engines and their registry.
//!
//! `Engine` is a small `{subscribe, unsubscribe, publish}` interface realized as a trait
//! object, so a publish can be routed through the in-process local engine, a cluster-transport
//! stub, or any third-party transport registered at runtime, all behind the same call site.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{error::BrokerError, message::Payload, name::Name};

/// A pluggable transport deciding where published messages actually go.
///
/// `subscribe`/`unsubscribe` are notifications only, invoked with the broker lock held;
/// implementations must not re-enter broker APIs synchronously from them. `publish` runs
/// without the broker lock held.
pub trait Engine: Send + Sync {
    fn subscribe(&self, name: Name, use_pattern: bool);
    fn unsubscribe(&self, name: Name, use_pattern: bool);
    fn publish(&self, channel: Name, payload: Payload) -> Result<(), BrokerError>;
}

/// The built-in local-process engine: `subscribe`/`unsubscribe` are no-ops because all state
/// already lives in the broker's own indexes; `publish` delegates to the closure the broker
/// wires up at construction time, which runs the match-and-fan-out algorithm under the broker
/// lock and returns after submitting delivery tasks.
pub struct LocalEngine {
    publish_fn: Arc<dyn Fn(Name, Payload) -> Result<(), BrokerError> + Send + Sync>,
}

impl LocalEngine {
    pub(crate) fn new(
        publish_fn: Arc<dyn Fn(Name, Payload) -> Result<(), BrokerError> + Send + Sync>,
    ) -> Self {
        Self { publish_fn }
    }
}

impl Engine for LocalEngine {
    fn subscribe(&self, _name: Name, _use_pattern: bool) {}

    fn unsubscribe(&self, _name: Name, _use_pattern: bool) {}

    fn publish(&self, channel: Name, payload: Payload) -> Result<(), BrokerError> {
        (self.publish_fn)(channel, payload)
    }
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine").finish()
    }
}

/// A placeholder satisfying the engine interface with no real transport.
///
/// Exists so the default-fallback chain (explicit engine → process default → cluster)
/// terminates in a well-defined object even before any real cluster transport is registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterEngine;

impl Engine for ClusterEngine {
    fn subscribe(&self, _name: Name, _use_pattern: bool) {}

    fn unsubscribe(&self, _name: Name, _use_pattern: bool) {}

    fn publish(&self, _channel: Name, _payload: Payload) -> Result<(), BrokerError> {
        Err(BrokerError::ClusterTransportUnconfigured)
    }
}

/// The reserved name of the built-in local engine, always present in the registry.
pub const LOCAL_ENGINE_NAME: &str = "local";
/// The reserved name of the built-in cluster stub, always present in the registry.
pub const CLUSTER_ENGINE_NAME: &str = "cluster";

/// The `engines` index: a map of engine name to engine, plus the current process default.
/// Always contains at least the built-in local and cluster engines. Every mutation and every
/// notification iteration happens under the broker lock, by construction — this type carries
/// no lock of its own.
pub(crate) struct EngineRegistry {
    engines: IndexMap<String, Arc<dyn Engine>>,
    default_name: String,
}

impl EngineRegistry {
    pub(crate) fn new(local: Arc<LocalEngine>, cluster: Arc<ClusterEngine>) -> Self {
        let mut engines: IndexMap<String, Arc<dyn Engine>> = IndexMap::new();
        engines.insert(LOCAL_ENGINE_NAME.to_string(), local as Arc<dyn Engine>);
        engines.insert(CLUSTER_ENGINE_NAME.to_string(), cluster as Arc<dyn Engine>);
        Self {
            engines,
            default_name: LOCAL_ENGINE_NAME.to_string(),
        }
    }

    pub(crate) fn register(
        &mut self,
        name: impl Into<String>,
        engine: Arc<dyn Engine>,
    ) -> Result<(), BrokerError> {
        let name = name.into();
        if self.engines.contains_key(&name) {
            return Err(BrokerError::EngineAlreadyRegistered(name));
        }
        self.engines.insert(name, engine);
        Ok(())
    }

    pub(crate) fn deregister(&mut self, name: &str) -> Result<(), BrokerError> {
        if self.engines.shift_remove(name).is_none() {
            return Err(BrokerError::EngineNotFound(name.to_string()));
        }
        if self.default_name == name {
            self.default_name = CLUSTER_ENGINE_NAME.to_string();
        }
        Ok(())
    }

    /// Resolves the engine to publish through: explicit name, else the process default.
    pub(crate) fn resolve(&self, explicit: Option<&str>) -> Result<Arc<dyn Engine>, BrokerError> {
        let name = explicit.unwrap_or(self.default_name.as_str());
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::EngineNotFound(name.to_string()))
    }

    /// All registered engines, in registration order, for subscribe/unsubscribe notification
    /// fan-out.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<dyn Engine>> {
        self.engines.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_local_and_cluster() {
        let registry = EngineRegistry::new(
            Arc::new(LocalEngine::new(Arc::new(|_, _| Ok(())))),
            Arc::new(ClusterEngine),
        );
        assert_eq!(registry.iter().count(), 2);
        assert!(registry.resolve(None).is_ok());
        assert!(registry.resolve(Some("cluster")).is_ok());
        assert!(matches!(
            registry.resolve(Some("missing")),
            Err(BrokerError::EngineNotFound(_))
        ));
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut registry = EngineRegistry::new(
            Arc::new(LocalEngine::new(Arc::new(|_, _| Ok(())))),
            Arc::new(ClusterEngine),
        );
        let err = registry.register("local", Arc::new(ClusterEngine)).unwrap_err();
        assert!(matches!(err, BrokerError::EngineAlreadyRegistered(_)));
    }

    #[test]
    fn test_deregister_default_falls_back_to_cluster() {
        let mut registry = EngineRegistry::new(
            Arc::new(LocalEngine::new(Arc::new(|_, _| Ok(())))),
            Arc::new(ClusterEngine),
        );
        registry.deregister(LOCAL_ENGINE_NAME).unwrap();
        let resolved = registry.resolve(None).unwrap();
        assert!(resolved.publish(Name::new("x"), Payload::new()).is_err());
    }
}
