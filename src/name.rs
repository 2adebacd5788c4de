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

//! The immutable channel/pattern name type consumed by the routing core.
//!
//! The core treats names opaquely except for equality, a stable symbol id, and a byte-view
//! accessor — exactly the operations spec'd for the Name/Payload contract. `Ustr` already
//! interns its backing bytes, so content-equal names share one allocation and `Clone`/`Drop`
//! are the "duplicate"/"release" refcount operations called for by that contract.

use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use ustr::Ustr;

/// An immutable, interned channel or pattern name with a cached 64-bit symbol identity.
///
/// Value equality is byte-equality (delegated to the interned string); the symbol id is a
/// stable hash of the intern pointer, suitable as the `u64` half of the composite index keys
/// described in the routing spec (`(symbol_id, Name)`).
#[derive(Copy, Clone, Eq)]
pub struct Name {
    value: Ustr,
    symbol_id: u64,
}

impl Name {
    /// Creates a new [`Name`] from any string-like value.
    #[must_use]
    pub fn new<T: AsRef<str>>(value: T) -> Self {
        let value = Ustr::from(value.as_ref());
        let symbol_id = symbol_id_of(&value);
        Self { value, symbol_id }
    }

    /// Returns the stable 64-bit symbol identity of this name.
    #[must_use]
    pub const fn symbol_id(&self) -> u64 {
        self.symbol_id
    }

    /// Returns the raw UTF-8 bytes backing this name.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Returns this name as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.value.as_str()
    }
}

/// Derives a stable symbol id from the interning pointer of an already-interned string.
///
/// `Ustr` guarantees that equal byte sequences are interned to the same address for the
/// lifetime of the process, so hashing the pointer gives an identity that is both stable
/// and O(1) to compute — the "symbol id" required by the Name contract.
fn symbol_id_of(value: &Ustr) -> u64 {
    let ptr = value.as_char_ptr() as u64;
    // Mix the pointer so that sequential allocations don't collide in the low bits of a
    // hash map bucket index.
    ptr.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Name").field(&self.value.as_str()).finish()
    }
}

impl<T: AsRef<str>> From<T> for Name {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_names_share_symbol_id() {
        let a = Name::new("orders.filled");
        let b = Name::new("orders.filled");
        assert_eq!(a, b);
        assert_eq!(a.symbol_id(), b.symbol_id());
    }

    #[test]
    fn test_distinct_names_are_not_equal() {
        let a = Name::new("orders.filled");
        let b = Name::new("orders.cancelled");
        assert_ne!(a, b);
    }

    #[test]
    fn test_as_bytes_roundtrip() {
        let name = Name::new("news");
        assert_eq!(name.as_bytes(), b"news");
    }
}
