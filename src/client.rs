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

//! The client (subscription) model, and the dedup hash used to key the `clients` index.

use std::{
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use ahash::AHasher;
use parking_lot::Mutex;

use crate::{
    channel::Channel,
    handler::{ShareableMessageHandler, ShareableUnsubscribeHandler, UserData},
    name::Name,
};

/// A handle to a registered subscription. `subscribe`/`find_subscription` both hand back a
/// `Subscription`; `Arc`'s strong count is the subscription's reference count — one strong
/// reference for channel membership, plus one per in-flight delivery or pending
/// unsubscribe-callback task, released by simply dropping the `Arc`.
pub type Subscription = Arc<Client>;

/// One registered handler bound to one channel.
pub struct Client {
    pub channel: Name,
    pub use_pattern: bool,
    pub on_message: ShareableMessageHandler,
    pub on_unsubscribe: Option<ShareableUnsubscribeHandler>,
    pub udata1: UserData,
    pub udata2: UserData,
    client_hash: u64,
    /// Back-pointer to the owning channel, used only under the broker lock — a `Weak` so it
    /// never extends the Channel's lifetime.
    parent: Mutex<Weak<Channel>>,
    /// Bumped on every `defer`, purely so tests can observe redelivery counts without
    /// threading extra state through the callback.
    redeliveries: AtomicU64,
}

impl Client {
    #[must_use]
    pub fn new(
        channel: Name,
        use_pattern: bool,
        on_message: ShareableMessageHandler,
        on_unsubscribe: Option<ShareableUnsubscribeHandler>,
        udata1: UserData,
        udata2: UserData,
    ) -> Arc<Self> {
        let client_hash = compute_client_hash(&on_message, on_unsubscribe.as_ref(), &udata1, &udata2);
        Arc::new(Self {
            channel,
            use_pattern,
            on_message,
            on_unsubscribe,
            udata1,
            udata2,
            client_hash,
            parent: Mutex::new(Weak::new()),
            redeliveries: AtomicU64::new(0),
        })
    }

    /// The dedup key's non-Name half: `(client_hash, channel)` is the full `clients` index key.
    #[must_use]
    pub fn client_hash(&self) -> u64 {
        self.client_hash
    }

    pub(crate) fn set_parent(&self, channel: &Arc<Channel>) {
        *self.parent.lock() = Arc::downgrade(channel);
    }

    pub(crate) fn parent(&self) -> Option<Arc<Channel>> {
        self.parent.lock().upgrade()
    }

    pub(crate) fn record_redelivery(&self) {
        self.redeliveries.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn redeliveries(&self) -> u64 {
        self.redeliveries.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("channel", &self.channel)
            .field("use_pattern", &self.use_pattern)
            .field("client_hash", &self.client_hash)
            .finish()
    }
}

/// Mixes `(on_message, on_unsubscribe, udata1, udata2)` identities into the `client_hash` used
/// for dedup: two subscriptions supplying the same callbacks and user data to the same
/// channel must collide.
pub(crate) fn compute_client_hash(
    on_message: &ShareableMessageHandler,
    on_unsubscribe: Option<&ShareableUnsubscribeHandler>,
    udata1: &UserData,
    udata2: &UserData,
) -> u64 {
    let mut hasher = AHasher::default();
    on_message.hash(&mut hasher);
    on_unsubscribe.hash(&mut hasher);
    udata1.hash(&mut hasher);
    udata2.hash(&mut hasher);
    hasher.finish()
}
