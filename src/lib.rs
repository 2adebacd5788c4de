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

//! A concurrency-safe in-process publish/subscribe routing broker.
//!
//! The broker accepts subscriptions on named channels (exact or glob-pattern matched),
//! accepts publications, and delivers each publication to every matching subscriber exactly
//! once per subscription, asynchronously, with zero-copy payload sharing. It is designed to
//! be embedded: one process-wide broker shared by cooperating producers, consumers, and
//! pluggable transport [`Engine`](engine::Engine) implementations (local, cluster, or an
//! external bus).
//!
//! Out of scope for this crate (treated as external collaborators):
//! - the concrete cluster transport, only its plug-in contract is implemented here;
//! - durable persistence, ordered delivery across independent publishes, back-pressure
//!   beyond refcount-bounded queueing, subscriber authentication/authorization, and
//!   delivery acknowledgements.

pub mod broker;
pub mod channel;
pub mod client;
pub mod config;
pub mod correctness;
pub mod engine;
pub mod error;
pub mod glob;
pub mod handler;
pub mod message;
pub mod name;
pub mod runner;

#[cfg(any(test, feature = "test-util"))]
pub mod stubs;

pub use broker::{Broker, get_broker, set_broker};
pub use client::Subscription;
pub use config::BrokerConfig;
pub use error::BrokerError;
pub use message::{Envelope, Payload};
pub use name::Name;
