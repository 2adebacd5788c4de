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

//! The task-runner contract the broker defers delivery onto: `defer_task(fn)` queues `fn` for
//! asynchronous execution, with no ordering guarantee beyond "eventually runs exactly once".
//!
//! The production implementation below spawns onto `tokio`, the same runtime used elsewhere in
//! this crate's embedding applications for off-lock async handoff.

use std::sync::Arc;

/// A deferred unit of work submitted by the broker, outside the broker lock.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queues closures for asynchronous execution. Implementations must eventually run every
/// submitted task exactly once; no ordering between tasks is required.
pub trait TaskRunner: Send + Sync {
    fn defer_task(&self, task: Task);
}

/// Runs every task on the ambient `tokio` runtime via `tokio::spawn`.
///
/// Requires a runtime context to be entered when `defer_task` is called (i.e. inside
/// `#[tokio::main]` or a `tokio::test`), matching how the broker is expected to be embedded.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTaskRunner;

impl TaskRunner for TokioTaskRunner {
    fn defer_task(&self, task: Task) {
        tokio::task::spawn_blocking(task);
    }
}

/// Runs each task inline, synchronously, at the point of submission.
///
/// Useful for tests that want deterministic delivery ordering without spinning up a runtime —
/// a test double for the task-runner collaborator, the same role the handler stubs play for
/// message handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynchronousTaskRunner;

impl TaskRunner for SynchronousTaskRunner {
    fn defer_task(&self, task: Task) {
        task();
    }
}

/// A shared handle to any [`TaskRunner`] implementation.
pub type SharedTaskRunner = Arc<dyn TaskRunner>;
