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

//! The payload contract, the transient delivery envelope, and the in-flight message wrapper.

use std::sync::Arc;

use crate::{client::Client, name::Name};

/// The payload object the core routes.
///
/// `Bytes` is already an immutable, refcounted byte buffer — `Clone`/`Drop` realize the
/// "duplicate"/"release" operations of the payload contract with zero copies.
pub type Payload = bytes::Bytes;

/// A transient view handed to a subscriber's `on_message` callback.
///
/// The envelope borrows its channel/payload from the publish's [`MessageWrapper`] and its
/// user data from the matched [`Client`]; it only lives for the duration of the callback
/// unless the callback calls [`crate::broker::Broker::defer`].
#[derive(Clone)]
pub struct Envelope {
    /// The channel the publish targeted.
    pub channel: Name,
    /// The published payload.
    pub payload: Payload,
    /// The subscription this delivery is for.
    pub subscription: Arc<Client>,
    /// The in-flight publish this delivery belongs to, kept so [`crate::broker::Broker::defer`]
    /// can resubmit the same `(Client, Wrapper)` pair without the caller needing to know about
    /// wrappers at all.
    pub(crate) wrapper: Arc<MessageWrapper>,
}

impl Envelope {
    pub(crate) fn new(subscription: Arc<Client>, wrapper: Arc<MessageWrapper>) -> Self {
        Self {
            channel: wrapper.channel,
            payload: wrapper.payload.clone(),
            subscription,
            wrapper,
        }
    }
}

/// One per in-flight local publish, shared across every matched delivery.
///
/// The wrapper's own `Arc` strong count is its reference count: 1 publisher hold plus one per
/// delivery task submitted for it. The publisher holds one clone for the duration of fan-out,
/// each submitted delivery task holds its own clone, and the wrapper's backing allocation is
/// freed when the last clone drops.
pub(crate) struct MessageWrapper {
    pub channel: Name,
    pub payload: Payload,
}

impl MessageWrapper {
    pub fn new(channel: Name, payload: Payload) -> Arc<Self> {
        Arc::new(Self { channel, payload })
    }
}
