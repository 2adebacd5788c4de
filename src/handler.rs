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

//! Callback traits invoked by delivery tasks, and the shareable, hashable handles that wrap
//! them for storage on a [`Client`](crate::client::Client).
//!
//! The core never calls a raw closure directly — it stores `Arc<dyn MessageHandler>` handles
//! so the same handler can be supplied to more than one `subscribe` call and compared by
//! identity for the subscription dedup rule. Handlers are `Arc`-shared (rather than, say,
//! `Rc`-shared) because this broker's callbacks run on a multi-threaded task runner rather
//! than a single-threaded executor.

use std::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};

use crate::message::Envelope;

/// Invoked once per delivery, outside the broker lock.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, envelope: &Envelope);
}

impl<F> MessageHandler for F
where
    F: Fn(&Envelope) + Send + Sync,
{
    fn on_message(&self, envelope: &Envelope) {
        (self)(envelope)
    }
}

/// Invoked exactly once per accepted subscription, after `unsubscribe` has linearized.
pub trait UnsubscribeHandler: Send + Sync {
    fn on_unsubscribe(&self, udata1: &Arc<dyn Any + Send + Sync>, udata2: &Arc<dyn Any + Send + Sync>);
}

impl<F> UnsubscribeHandler for F
where
    F: Fn(&Arc<dyn Any + Send + Sync>, &Arc<dyn Any + Send + Sync>) + Send + Sync,
{
    fn on_unsubscribe(&self, udata1: &Arc<dyn Any + Send + Sync>, udata2: &Arc<dyn Any + Send + Sync>) {
        (self)(udata1, udata2)
    }
}

/// An `Arc<dyn MessageHandler>` compared and hashed by pointer identity.
///
/// Two subscriptions supplying *the same* `Arc` (a clone of one handle, not two separately
/// constructed equivalent closures) are the "same callback" for the `client_hash` dedup key.
#[derive(Clone)]
pub struct ShareableMessageHandler(pub Arc<dyn MessageHandler>);

impl ShareableMessageHandler {
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl PartialEq for ShareableMessageHandler {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ShareableMessageHandler {}

impl Hash for ShareableMessageHandler {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ShareableMessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShareableMessageHandler")
            .field(&self.identity())
            .finish()
    }
}

/// An `Arc<dyn UnsubscribeHandler>` compared and hashed by pointer identity.
#[derive(Clone)]
pub struct ShareableUnsubscribeHandler(pub Arc<dyn UnsubscribeHandler>);

impl ShareableUnsubscribeHandler {
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl PartialEq for ShareableUnsubscribeHandler {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ShareableUnsubscribeHandler {}

impl Hash for ShareableUnsubscribeHandler {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ShareableUnsubscribeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShareableUnsubscribeHandler")
            .field(&self.identity())
            .finish()
    }
}

/// Opaque user data, compared and hashed by pointer identity rather than content — two
/// separately allocated `Arc`s holding equal values are still distinct `udata`, mirroring
/// `void *udata1/udata2` pointer-identity semantics.
#[derive(Clone)]
pub struct UserData(pub Arc<dyn Any + Send + Sync>);

impl UserData {
    /// The "no user data" value. Returns a clone of one process-wide sentinel `Arc` rather
    /// than allocating a fresh one on every call, so that two subscriptions that both pass
    /// `UserData::none()` compare equal (required for `subscribe`'s dedup rule to treat
    /// "same channel, same callbacks, no user data" as a single registration).
    #[must_use]
    pub fn none() -> Self {
        static NONE: OnceLock<Arc<dyn Any + Send + Sync>> = OnceLock::new();
        Self(NONE.get_or_init(|| Arc::new(()) as Arc<dyn Any + Send + Sync>).clone())
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl PartialEq for UserData {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for UserData {}

impl Hash for UserData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserData").field(&self.identity()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl MessageHandler for Noop {
        fn on_message(&self, _envelope: &Envelope) {}
    }

    #[test]
    fn test_same_arc_clone_is_identical_handler() {
        let handler: Arc<dyn MessageHandler> = Arc::new(Noop);
        let a = ShareableMessageHandler(handler.clone());
        let b = ShareableMessageHandler(handler);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_handlers_are_not_identical() {
        let a = ShareableMessageHandler(Arc::new(Noop) as Arc<dyn MessageHandler>);
        let b = ShareableMessageHandler(Arc::new(Noop) as Arc<dyn MessageHandler>);
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_udata_are_not_equal() {
        let a = UserData(Arc::new(1_i32));
        let b = UserData(Arc::new(1_i32));
        assert_ne!(a, b);
    }

    #[test]
    fn test_none_udata_is_always_equal() {
        let a = UserData::none();
        let b = UserData::none();
        assert_eq!(a, b);
    }
}
