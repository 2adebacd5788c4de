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

//! Configuration for [`Broker`](crate::broker::Broker) instances.

use serde::{Deserialize, Serialize};

/// Configuration for a cluster (or other external) engine.
///
/// The cluster engine shipped with this crate is a stub — it carries no transport of its own —
/// but a configured `ClusterConfig` is what a real implementation
/// plugged in via `engine_register` would consume to establish its transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Logical name under which the cluster engine is registered.
    pub engine_name: String,
    /// Address of the external bus/cluster transport, if any.
    pub address: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            engine_name: "cluster".to_string(),
            address: None,
        }
    }
}

/// Configuration for a [`Broker`](crate::broker::Broker) instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// A human-readable name for the broker instance, used only in logging.
    pub name: String,
    /// Configuration for the built-in cluster engine stub.
    pub cluster: ClusterConfig,
    /// Capacity hint for the exact-channel index, to avoid early reallocation.
    pub channels_capacity_hint: usize,
    /// Capacity hint for the pattern index, to avoid early reallocation.
    pub patterns_capacity_hint: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            name: stringify!(Broker).to_owned(),
            cluster: ClusterConfig::default(),
            channels_capacity_hint: 64,
            patterns_capacity_hint: 16,
        }
    }
}
