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

//! Test-only message handlers: a counting handler, a call-check handler, and a message-saving
//! handler, all built on `Arc`/`Mutex` because this broker's handlers must be `Send + Sync`.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use crate::{handler::MessageHandler, message::Envelope};

/// Counts invocations of `on_message`.
#[derive(Debug, Default)]
pub struct CountingHandler {
    count: AtomicU64,
}

impl CountingHandler {
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl MessageHandler for CountingHandler {
    fn on_message(&self, _envelope: &Envelope) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records only whether it was ever called.
#[derive(Debug, Default)]
pub struct CallCheckHandler {
    called: std::sync::atomic::AtomicBool,
}

impl CallCheckHandler {
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

impl MessageHandler for CallCheckHandler {
    fn on_message(&self, _envelope: &Envelope) {
        self.called.store(true, Ordering::SeqCst);
    }
}

/// Saves every envelope's payload bytes it receives, in delivery order.
#[derive(Debug, Default)]
pub struct MessageSavingHandler {
    payloads: Mutex<Vec<bytes::Bytes>>,
}

impl MessageSavingHandler {
    #[must_use]
    pub fn payloads(&self) -> Vec<bytes::Bytes> {
        self.payloads.lock().expect(crate::correctness::FAILED).clone()
    }
}

impl MessageHandler for MessageSavingHandler {
    fn on_message(&self, envelope: &Envelope) {
        self.payloads
            .lock()
            .expect(crate::correctness::FAILED)
            .push(envelope.payload.clone());
    }
}

/// A handler that calls `defer` exactly once per delivery it receives for the first time,
/// then records every subsequent (redelivered) invocation — used to test that a single
/// deferred redelivery results in exactly one extra invocation.
pub struct DeferOnceHandler {
    pub deferred: Arc<crate::broker::Broker>,
    pub invocations: AtomicU64,
}

impl MessageHandler for DeferOnceHandler {
    fn on_message(&self, envelope: &Envelope) {
        let call_number = self.invocations.fetch_add(1, Ordering::SeqCst);
        if call_number == 0 {
            self.deferred.defer(envelope);
        }
    }
}
