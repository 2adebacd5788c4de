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

//! The channel model: a named routing endpoint owning its clients.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{client::Client, name::Name};

/// A named routing endpoint: either an exact-match channel or a pattern.
///
/// The client list is the Channel's sole ownership edge; a Client's back-pointer to its
/// Channel never extends the Channel's lifetime. All mutation of the list happens under the
/// broker lock, so the list itself uses a plain `Mutex<Vec<_>>`, which gives stable iteration
/// order for deterministic fan-out ordering on publish.
pub struct Channel {
    pub name: Name,
    pub use_pattern: bool,
    clients: Mutex<Vec<Arc<Client>>>,
}

impl Channel {
    #[must_use]
    pub fn new(name: Name, use_pattern: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            use_pattern,
            clients: Mutex::new(Vec::new()),
        })
    }

    /// Appends a client to this channel's list. Caller holds the broker lock.
    pub(crate) fn attach(&self, client: Arc<Client>) {
        self.clients.lock().push(client);
    }

    /// Removes a client by identity, returning whether the list became empty. Caller holds
    /// the broker lock.
    pub(crate) fn detach(&self, client: &Arc<Client>) -> bool {
        let mut clients = self.clients.lock();
        clients.retain(|c| !Arc::ptr_eq(c, client));
        clients.is_empty()
    }

    /// A snapshot of the current client list, for fan-out. Caller holds the broker lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Client>> {
        self.clients.lock().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("use_pattern", &self.use_pattern)
            .field("clients", &self.clients.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use super::*;
    use crate::{
        client::Client,
        handler::{MessageHandler, ShareableMessageHandler, UserData},
        message::Envelope,
    };

    struct Noop;
    impl MessageHandler for Noop {
        fn on_message(&self, _envelope: &Envelope) {}
    }

    fn client(channel: Name) -> Arc<Client> {
        Client::new(
            channel,
            false,
            ShareableMessageHandler(StdArc::new(Noop) as StdArc<dyn MessageHandler>),
            None,
            UserData::none(),
            UserData::none(),
        )
    }

    #[test]
    fn test_attach_detach_tracks_emptiness() {
        let channel = Channel::new(Name::new("news"), false);
        assert!(channel.is_empty());

        let c1 = client(Name::new("news"));
        channel.attach(c1.clone());
        assert!(!channel.is_empty());

        let became_empty = channel.detach(&c1);
        assert!(became_empty);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let channel = Channel::new(Name::new("news"), false);
        let c1 = client(Name::new("news"));
        let c2 = client(Name::new("news"));
        channel.attach(c1.clone());
        channel.attach(c2.clone());

        let snapshot = channel.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(Arc::ptr_eq(&snapshot[0], &c1));
        assert!(Arc::ptr_eq(&snapshot[1], &c2));
    }
}
