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

//! The `Broker`: the single mutual-exclusion primitive guarding the three routing indexes and
//! the engine registry, plus the subscribe/unsubscribe/publish/defer operations built on them.
//!
//! All routing state (the exact-channel index, the pattern index, the dedup index, and the
//! engine registry) lives behind one lock, exposed through a lazily-initialized process-wide
//! singleton. The broker is `Arc`-shared and internally synchronized with a
//! `parking_lot::Mutex` so its callbacks can safely run on a multi-threaded task runner.

use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    channel::Channel,
    client::{compute_client_hash, Client, Subscription},
    config::BrokerConfig,
    correctness,
    engine::{ClusterEngine, Engine, EngineRegistry, LocalEngine},
    error::BrokerError,
    handler::{ShareableMessageHandler, ShareableUnsubscribeHandler, UserData},
    message::{Envelope, MessageWrapper, Payload},
    name::Name,
    runner::{SharedTaskRunner, Task, TokioTaskRunner},
};

/// Composite index key: `(symbol_id, Name)` — equality checks the `u64` first, then falls
/// back to `Name`'s own value-equality, which `derive(PartialEq, Eq, Hash)` on the tuple
/// already gives us for free since both components implement those traits.
type IndexKey = (u64, Name);

struct BrokerInner {
    channels: IndexMap<IndexKey, Arc<Channel>>,
    patterns: IndexMap<IndexKey, Arc<Channel>>,
    clients: IndexMap<IndexKey, Arc<Client>>,
    engines: EngineRegistry,
}

/// The process-wide publish/subscribe routing broker.
pub struct Broker {
    config: BrokerConfig,
    inner: Mutex<BrokerInner>,
    task_runner: SharedTaskRunner,
}

impl Broker {
    /// Builds a new broker with its own indexes and engine registry, wired to `task_runner`
    /// for every deferred delivery and unsubscribe-callback task.
    #[must_use]
    pub fn new(config: BrokerConfig, task_runner: SharedTaskRunner) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Broker>| {
            let weak_for_local = weak.clone();
            let local = Arc::new(LocalEngine::new(Arc::new(move |channel, payload| {
                let broker = weak_for_local
                    .upgrade()
                    .expect("broker dropped while a publish was in flight");
                broker.route_publish(channel, payload)
            })));
            let engines = EngineRegistry::new(local, Arc::new(ClusterEngine));
            let channels_capacity = config.channels_capacity_hint;
            let patterns_capacity = config.patterns_capacity_hint;
            Self {
                config,
                inner: Mutex::new(BrokerInner {
                    channels: IndexMap::with_capacity(channels_capacity),
                    patterns: IndexMap::with_capacity(patterns_capacity),
                    clients: IndexMap::with_capacity(channels_capacity),
                    engines,
                }),
                task_runner,
            }
        })
    }

    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Registers a subscription, deduping by `(client_hash, channel)`: an identical
    /// `(channel, callbacks, udata1, udata2)` registration returns the existing handle rather
    /// than creating a new one. Creates the Channel on first subscriber, notifying every
    /// registered engine, then attaches the Client and returns its handle. Returns `None` if
    /// `channel` is empty, invoking `on_unsubscribe` once first if supplied.
    #[must_use]
    pub fn subscribe(
        &self,
        channel: Name,
        use_pattern: bool,
        on_message: ShareableMessageHandler,
        on_unsubscribe: Option<ShareableUnsubscribeHandler>,
        udata1: UserData,
        udata2: UserData,
    ) -> Option<Subscription> {
        if channel.as_str().is_empty() {
            log::error!(target: "pubsub_broker::broker", "rejected subscribe: empty channel name");
            if let Some(cb) = &on_unsubscribe {
                cb.0.on_unsubscribe(&udata1.0, &udata2.0);
            }
            return None;
        }

        let client_hash = compute_client_hash(&on_message, on_unsubscribe.as_ref(), &udata1, &udata2);
        let clients_key = (client_hash, channel);

        let mut inner = self.inner.lock();
        if let Some(existing) = inner.clients.get(&clients_key) {
            log::debug!(target: "pubsub_broker::broker", "subscribe to '{channel}' deduped to an existing subscription");
            return Some(existing.clone());
        }

        let client = Client::new(channel, use_pattern, on_message, on_unsubscribe, udata1, udata2);
        inner.clients.insert(clients_key, client.clone());

        let index_key = (channel.symbol_id(), channel);
        let (channel_obj, created) = if use_pattern {
            if let Some(ch) = inner.patterns.get(&index_key) {
                (ch.clone(), false)
            } else {
                let ch = Channel::new(channel, use_pattern);
                inner.patterns.insert(index_key, ch.clone());
                (ch, true)
            }
        } else if let Some(ch) = inner.channels.get(&index_key) {
            (ch.clone(), false)
        } else {
            let ch = Channel::new(channel, use_pattern);
            inner.channels.insert(index_key, ch.clone());
            (ch, true)
        };

        if created {
            log::debug!(target: "pubsub_broker::broker", "created channel '{channel}' (use_pattern={use_pattern}), notifying {} engine(s)", inner.engines.iter().count());
            for engine in inner.engines.iter() {
                engine.subscribe(channel, use_pattern);
            }
        }

        channel_obj.attach(client.clone());
        client.set_parent(&channel_obj);
        log::debug!(target: "pubsub_broker::broker", "subscribed to '{channel}' (use_pattern={use_pattern})");
        Some(client)
    }

    /// A read-only lookup of the `clients` index, taking the same arguments as `subscribe` so
    /// a caller can check for an existing registration without creating one. `use_pattern` is
    /// accepted for signature symmetry with `subscribe` but does not participate in the lookup
    /// key — the `clients` index is keyed by `(client_hash, channel)` alone, so a caller must
    /// still pass the same `use_pattern` it originally subscribed with for the result to mean
    /// anything.
    #[must_use]
    pub fn find_subscription(
        &self,
        channel: Name,
        _use_pattern: bool,
        on_message: ShareableMessageHandler,
        on_unsubscribe: Option<ShareableUnsubscribeHandler>,
        udata1: UserData,
        udata2: UserData,
    ) -> Option<Subscription> {
        let client_hash = compute_client_hash(&on_message, on_unsubscribe.as_ref(), &udata1, &udata2);
        self.inner.lock().clients.get(&(client_hash, channel)).cloned()
    }

    /// Removes a subscription. Returns `0` on success, `-1` if `subscription` is `None`.
    pub fn unsubscribe(&self, subscription: Option<Subscription>) -> i32 {
        let Some(client) = subscription else {
            return -1;
        };

        let channel_obj = {
            let mut inner = self.inner.lock();
            let parent = client
                .parent()
                .expect("a live subscription's parent channel must still exist");
            let became_empty = parent.detach(&client);

            let clients_key = (client.client_hash(), client.channel);
            let removed = inner.clients.shift_remove(&clients_key);
            if removed.is_none() {
                log::error!(target: "pubsub_broker::broker", "clients index missing entry for '{}' on unsubscribe", client.channel);
            }
            correctness::check_predicate_true(removed.is_some(), correctness::FAILED);

            if became_empty {
                let index_key = (client.channel.symbol_id(), client.channel);
                let target = if client.use_pattern {
                    &mut inner.patterns
                } else {
                    &mut inner.channels
                };
                let removed_channel = target.shift_remove(&index_key);
                let matches_parent = removed_channel.as_ref().is_some_and(|c| Arc::ptr_eq(c, &parent));
                if !matches_parent {
                    log::error!(target: "pubsub_broker::broker", "removed channel for '{}' did not match the expected allocation", client.channel);
                }
                correctness::check_predicate_true(matches_parent, correctness::FAILED);
                log::debug!(target: "pubsub_broker::broker", "channel '{}' emptied, notifying {} engine(s)", client.channel, inner.engines.iter().count());
                for engine in inner.engines.iter() {
                    engine.unsubscribe(client.channel, client.use_pattern);
                }
            }
            parent
        };
        // `channel_obj` (and the broker's own index entry, just dropped above) were the last
        // owners of the Channel's allocation; it is freed here when this binding drops, with
        // no separate "free the Channel object" step to write by hand.
        drop(channel_obj);

        if let Some(cb) = client.on_unsubscribe.clone() {
            let udata1 = client.udata1.0.clone();
            let udata2 = client.udata2.0.clone();
            self.task_runner.defer_task(Box::new(move || {
                cb.0.on_unsubscribe(&udata1, &udata2);
            }));
        }

        0
    }

    /// Publishes `payload` to `channel`. Resolves the engine to publish through (an explicit
    /// name, else the process default) and dispatches to it. Returns `0` if at least one
    /// delivery was scheduled, `-1` otherwise (including engine-resolution failure, logged at
    /// `warn`).
    pub fn publish(&self, channel: Name, payload: Payload, engine: Option<&str>) -> i32 {
        let resolved = self.inner.lock().engines.resolve(engine);
        let engine = match resolved {
            Ok(engine) => engine,
            Err(err) => {
                log::warn!(target: "pubsub_broker::broker", "{err}");
                return -1;
            }
        };
        match engine.publish(channel, payload) {
            Ok(()) => 0,
            Err(err) => {
                log::debug!(target: "pubsub_broker::broker", "publish to '{channel}' did not deliver: {err}");
                -1
            }
        }
    }

    /// The local engine's routing algorithm, invoked through the `LocalEngine` trait object
    /// wired up in [`Broker::new`]. Matches `channel` against the exact-channel and pattern
    /// indexes, then submits one delivery task per matched Client.
    fn route_publish(&self, channel: Name, payload: Payload) -> Result<(), BrokerError> {
        log::trace!(target: "pubsub_broker::broker", "publishing to '{channel}'");
        let wrapper = MessageWrapper::new(channel, payload);

        let mut matched: Vec<Arc<Client>> = Vec::new();
        {
            let inner = self.inner.lock();
            let exact_key = (channel.symbol_id(), channel);
            if let Some(ch) = inner.channels.get(&exact_key) {
                matched.extend(ch.snapshot());
            }
            for pattern_channel in inner.patterns.values() {
                if crate::glob::match_glob(channel.as_bytes(), pattern_channel.name.as_bytes()) {
                    log::trace!(target: "pubsub_broker::broker", "'{channel}' matched pattern '{}'", pattern_channel.name);
                    matched.extend(pattern_channel.snapshot());
                }
            }
        }

        log::trace!(target: "pubsub_broker::broker", "matched {} subscriber(s) for '{channel}'", matched.len());
        if matched.is_empty() {
            return Err(BrokerError::NoMatchingSubscribers(channel.to_string()));
        }

        for client in matched {
            submit_delivery(&self.task_runner, client, wrapper.clone());
        }
        Ok(())
    }

    /// Re-queues the same `(Client, Wrapper)` delivery for another round of invocation. Valid
    /// only from inside an `on_message` callback; the caller is expected to return promptly
    /// after calling this.
    pub fn defer(&self, envelope: &Envelope) {
        envelope.subscription.record_redelivery();
        submit_delivery(
            &self.task_runner,
            envelope.subscription.clone(),
            envelope.wrapper.clone(),
        );
    }

    /// Registers a transport engine under `name`.
    pub fn engine_register(&self, name: impl Into<String>, engine: Arc<dyn Engine>) -> Result<(), BrokerError> {
        let name = name.into();
        log::debug!(target: "pubsub_broker::broker", "registering engine '{name}'");
        self.inner.lock().engines.register(name, engine)
    }

    /// Deregisters the engine registered under `name`, resetting the process default to the
    /// cluster engine if the removed engine was the default.
    pub fn engine_deregister(&self, name: &str) -> Result<(), BrokerError> {
        log::debug!(target: "pubsub_broker::broker", "deregistering engine '{name}'");
        self.inner.lock().engines.deregister(name)
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker").field("config", &self.config).finish()
    }
}

/// Submits one delivery task: outside the broker lock, the task builds a transient envelope
/// and invokes `on_message` synchronously, then drops its `Arc` clones of the Client and the
/// wrapper, releasing one wrapper reference and one Client reference simply by going out of
/// scope.
fn submit_delivery(task_runner: &SharedTaskRunner, client: Arc<Client>, wrapper: Arc<MessageWrapper>) {
    let task: Task = Box::new(move || {
        let envelope = Envelope::new(client.clone(), wrapper);
        client.on_message.0.on_message(&envelope);
    });
    task_runner.defer_task(task);
}

static BROKER: OnceLock<Arc<Broker>> = OnceLock::new();

/// Installs the process-wide broker. Panics if one has already been installed, treating a
/// double-initialization as a programming error.
pub fn set_broker(broker: Arc<Broker>) {
    if BROKER.set(broker).is_err() {
        panic!("failed to set broker: a broker has already been installed");
    }
}

/// Returns the process-wide broker, lazily initializing it with a default configuration and a
/// `tokio`-backed task runner on first access.
#[must_use]
pub fn get_broker() -> Arc<Broker> {
    if BROKER.get().is_none() {
        let broker = Broker::new(BrokerConfig::default(), Arc::new(TokioTaskRunner));
        let _ = BROKER.set(broker.clone());
        broker
    } else {
        BROKER.get().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use super::*;
    use crate::{
        handler::ShareableMessageHandler,
        runner::SynchronousTaskRunner,
        stubs::{CallCheckHandler, CountingHandler},
    };

    fn test_broker() -> Arc<Broker> {
        Broker::new(BrokerConfig::default(), Arc::new(SynchronousTaskRunner))
    }

    #[test]
    fn test_exact_delivery() {
        let broker = test_broker();
        let handler = StdArc::new(CountingHandler::default());
        let sub = broker
            .subscribe(
                Name::new("news"),
                false,
                ShareableMessageHandler(handler.clone() as StdArc<dyn crate::handler::MessageHandler>),
                None,
                UserData::none(),
                UserData::none(),
            )
            .unwrap();

        let rc = broker.publish(Name::new("news"), Payload::from_static(b"hi"), None);
        assert_eq!(rc, 0);
        assert_eq!(handler.count(), 1);
        assert_eq!(broker.unsubscribe(Some(sub)), 0);
    }

    #[test]
    fn test_pattern_delivery_is_selective() {
        let broker = test_broker();
        let handler = StdArc::new(CountingHandler::default());
        broker.subscribe(
            Name::new("user.*"),
            true,
            ShareableMessageHandler(handler.clone() as StdArc<dyn crate::handler::MessageHandler>),
            None,
            UserData::none(),
            UserData::none(),
        );

        assert_eq!(broker.publish(Name::new("user.42"), Payload::new(), None), 0);
        assert_eq!(broker.publish(Name::new("users.42"), Payload::new(), None), -1);
        assert_eq!(handler.count(), 1);
    }

    #[test]
    fn test_dedup_subscribe_returns_same_handle() {
        let broker = test_broker();
        let handler: StdArc<dyn crate::handler::MessageHandler> = StdArc::new(CountingHandler::default());

        let a = broker
            .subscribe(
                Name::new("news"),
                false,
                ShareableMessageHandler(handler.clone()),
                None,
                UserData::none(),
                UserData::none(),
            )
            .unwrap();
        let b = broker
            .subscribe(
                Name::new("news"),
                false,
                ShareableMessageHandler(handler),
                None,
                UserData::none(),
                UserData::none(),
            )
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(broker.publish(Name::new("news"), Payload::new(), None), 0);
        assert_eq!(broker.unsubscribe(Some(a)), 0);
    }

    #[test]
    fn test_unsubscribe_invokes_callback_once() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let broker = test_broker();
        let on_message: StdArc<dyn crate::handler::MessageHandler> = StdArc::new(CallCheckHandler::default());
        let called = StdArc::new(AtomicBool::new(false));
        let called_for_cb = called.clone();
        let on_unsubscribe: StdArc<dyn crate::handler::UnsubscribeHandler> =
            StdArc::new(move |_udata1: &StdArc<dyn std::any::Any + Send + Sync>,
                              _udata2: &StdArc<dyn std::any::Any + Send + Sync>| {
                called_for_cb.store(true, Ordering::SeqCst);
            });

        let sub = broker
            .subscribe(
                Name::new("news"),
                false,
                ShareableMessageHandler(on_message),
                Some(crate::handler::ShareableUnsubscribeHandler(on_unsubscribe)),
                UserData::none(),
                UserData::none(),
            )
            .unwrap();

        assert_eq!(broker.unsubscribe(Some(sub)), 0);
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unsubscribing_last_subscriber_tears_down_channel() {
        let broker = test_broker();
        let handler: StdArc<dyn crate::handler::MessageHandler> = StdArc::new(CountingHandler::default());
        let sub = broker
            .subscribe(
                Name::new("news"),
                false,
                ShareableMessageHandler(handler),
                None,
                UserData::none(),
                UserData::none(),
            )
            .unwrap();
        broker.unsubscribe(Some(sub));

        // Now a fresh subscribe must create a brand new Channel rather than reuse a stale one.
        let handler2: StdArc<dyn crate::handler::MessageHandler> = StdArc::new(CountingHandler::default());
        broker.subscribe(
            Name::new("news"),
            false,
            ShareableMessageHandler(handler2),
            None,
            UserData::none(),
            UserData::none(),
        );
        assert_eq!(broker.publish(Name::new("news"), Payload::new(), None), 0);
    }

    #[test]
    fn test_defer_invokes_handler_twice() {
        let broker = test_broker();
        let handler = StdArc::new(crate::stubs::DeferOnceHandler {
            deferred: broker.clone(),
            invocations: std::sync::atomic::AtomicU64::new(0),
        });

        broker.subscribe(
            Name::new("news"),
            false,
            ShareableMessageHandler(handler.clone() as StdArc<dyn crate::handler::MessageHandler>),
            None,
            UserData::none(),
            UserData::none(),
        );
        broker.publish(Name::new("news"), Payload::from_static(b"hi"), None);

        assert_eq!(handler.invocations.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_publish_with_no_subscribers_is_a_no_op() {
        let broker = test_broker();
        assert_eq!(broker.publish(Name::new("news"), Payload::new(), None), -1);
    }

    #[test]
    fn test_engine_register_and_deregister() {
        let broker = test_broker();
        struct Noop;
        impl Engine for Noop {
            fn subscribe(&self, _name: Name, _use_pattern: bool) {}
            fn unsubscribe(&self, _name: Name, _use_pattern: bool) {}
            fn publish(&self, _channel: Name, _payload: Payload) -> Result<(), BrokerError> {
                Ok(())
            }
        }
        broker.engine_register("test", StdArc::new(Noop)).unwrap();
        assert!(matches!(
            broker.engine_register("test", StdArc::new(Noop)),
            Err(BrokerError::EngineAlreadyRegistered(_))
        ));
        broker.engine_deregister("test").unwrap();
        assert!(matches!(
            broker.engine_deregister("test"),
            Err(BrokerError::EngineNotFound(_))
        ));
    }
}
