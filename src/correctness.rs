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

//! Functions for correctness checks similar to the *design by contract* philosophy.
//!
//! A condition is a predicate which must be true just prior to the execution of some
//! section of code for correct behavior as per the design specification. These helpers are
//! used at the broker's fatal-error boundary (index corruption) rather than for recoverable
//! validation, which is expressed directly through `Option`/`Result` returns.

/// A message prefix used alongside `expect`/`assert` calls to keep panic messages uniform.
pub const FAILED: &str = "Condition failed";

/// Checks that `predicate` is true, panicking with `fail_msg` otherwise.
///
/// Used only for conditions that indicate a bug in the broker itself (e.g. an index that
/// no longer matches the state it is supposed to mirror) — never for recoverable,
/// caller-triggerable failures.
#[inline(always)]
#[track_caller]
pub fn check_predicate_true(predicate: bool, fail_msg: &str) {
    assert!(predicate, "{FAILED}: {fail_msg}");
}
