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

//! Error types returned by the broker's public, recoverable-failure surface.
//!
//! Most of the broker's API expresses failure through `Option`/`i32`-style sentinels, as
//! spec'd (`subscribe` returns `None`, `publish` returns `-1`). `BrokerError` is reserved for
//! the smaller set of operations — engine registration and the cluster engine stub — where a
//! typed error communicates more than a sentinel would.

use thiserror::Error;

/// Errors returned by broker operations that have more than one failure mode.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// An engine with the given name is already registered.
    #[error("engine '{0}' is already registered")]
    EngineAlreadyRegistered(String),

    /// No engine is registered under the given name.
    #[error("no engine registered under '{0}'")]
    EngineNotFound(String),

    /// The cluster engine has no real transport configured; `publish` always fails.
    #[error("cluster engine has no transport configured")]
    ClusterTransportUnconfigured,

    /// A local-engine publish matched no exact-channel or pattern subscribers.
    #[error("no subscribers matched channel '{0}'")]
    NoMatchingSubscribers(String),
}
