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

//! A pure, byte-level glob matcher for channel patterns.
//!
//! Supports the tokens used by shell-style wildcards:
//! - `?` matches exactly one byte.
//! - `*` matches zero or more bytes; only the most recent `*` is ever backtracked into — a
//!   single backtrack point is provably sufficient here, so nested `*` never needs a full
//!   backtracking stack.
//! - `[...]` matches a character class: a leading `^` inverts the class, `a-b` denotes an
//!   inclusive byte range (endpoints are swapped if `a > b`), and a `]` as the first member
//!   of the class is literal rather than closing it.
//! - `\x` escapes the next byte, matching it literally.
//! - any other byte matches itself.
//!
//! A match succeeds iff the pattern and the data are both fully consumed.

/// Matches `data` against `pattern`, both given as raw bytes.
///
/// # Examples
///
/// ```
/// use pubsub_broker::glob::match_glob;
///
/// assert!(match_glob(b"user.42", b"user.*"));
/// assert!(!match_glob(b"users.42", b"user.*"));
/// assert!(match_glob(b"log-7.txt", b"log-[0-9].txt"));
/// assert!(!match_glob(b"log-a.txt", b"log-[0-9].txt"));
/// ```
#[must_use]
pub fn match_glob(data: &[u8], pattern: &[u8]) -> bool {
    let mut di = 0usize;
    let mut pi = 0usize;
    // The single remembered backtrack point: (pattern index just after the last `*`,
    // data index the `*` last tried to consume up to).
    let mut star_pi: Option<usize> = None;
    let mut star_di = 0usize;

    while di < data.len() {
        if pi < pattern.len() && pattern[pi] == b'*' {
            // A trailing `*` short-circuits: it can absorb the remainder of `data`.
            star_pi = Some(pi + 1);
            star_di = di;
            pi += 1;
            continue;
        }

        if pi < pattern.len() && token_matches(pattern, &mut pi, data[di]) {
            di += 1;
            continue;
        }

        // Mismatch: retry by having the last `*` absorb one more byte, if one was seen.
        if let Some(resume_pi) = star_pi {
            star_di += 1;
            di = star_di;
            pi = resume_pi;
            continue;
        }

        return false;
    }

    // Consume any trailing run of `*` — each matches zero bytes.
    while pi < pattern.len() && pattern[pi] == b'*' {
        pi += 1;
    }

    pi == pattern.len()
}

/// Attempts to match a single pattern token (literal, `?`, `\x`, or `[...]`) at `pattern[*pi]`
/// against `byte`, advancing `*pi` past the token on success. `*pi` is always advanced past
/// the token it attempted, whether or not it matched, except for an unterminated `[...]`
/// class (see below).
fn token_matches(pattern: &[u8], pi: &mut usize, byte: u8) -> bool {
    match pattern[*pi] {
        b'?' => {
            *pi += 1;
            true
        }
        b'\\' if *pi + 1 < pattern.len() => {
            let literal = pattern[*pi + 1];
            *pi += 2;
            literal == byte
        }
        b'[' => match_class(pattern, pi, byte),
        literal => {
            *pi += 1;
            literal == byte
        }
    }
}

/// Matches a `[...]` character class starting at `pattern[*pi] == '['`.
///
/// An unterminated class (no closing `]` found) is treated as a mismatch of the opening `[`
/// and advances `*pi` to the end of the pattern, so the caller's loop terminates cleanly
/// rather than looping forever re-scanning the same unterminated class.
fn match_class(pattern: &[u8], pi: &mut usize, byte: u8) -> bool {
    let start = *pi + 1; // just after '['
    let mut i = start;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }
    // `]` as the first member (after an optional `^`) is a literal class member, not the
    // closing bracket.
    let first_is_literal_bracket = i;

    let end = loop {
        match pattern.get(i) {
            None => {
                // Unterminated class: no match, consume the rest of the pattern.
                *pi = pattern.len();
                return false;
            }
            Some(b']') if i != first_is_literal_bracket => break i,
            Some(_) => i += 1,
        }
    };

    let class = &pattern[(if negate { start + 1 } else { start })..end];
    let matched = class_contains(class, byte);

    *pi = end + 1;
    matched != negate
}

/// Whether `byte` is a member of the class body (no leading `^`, ranges already raw).
fn class_contains(class: &[u8], byte: u8) -> bool {
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == b'-' {
            let (mut lo, mut hi) = (class[i], class[i + 2]);
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
            }
            if byte >= lo && byte <= hi {
                return true;
            }
            i += 3;
        } else {
            if class[i] == byte {
                return true;
            }
            i += 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("news", "news", true)]
    #[case("news", "new", false)]
    #[case("user.42", "user.*", true)]
    #[case("users.42", "user.*", false)]
    #[case("a", "*", true)]
    #[case("", "*", true)]
    #[case("a", "?", true)]
    #[case("ab", "?", false)]
    #[case("comp", "comp*", true)]
    #[case("complete", "comp*", true)]
    #[case("computer", "comp*", true)]
    #[case("camp", "c?mp", true)]
    #[case("comp", "c?mp", true)]
    #[case("coop", "c??p", true)]
    #[case("data.trades.BINANCE.ETHUSDT", "data.*.BINANCE.*", true)]
    #[case("data.trades.BINANCE.ETHUSDT", "data.*.BINANCE.ETH*", true)]
    #[case("data.trades.BINANCE.ETHUSDT", "data.*.BINANCE.ETH???", false)]
    #[case("data.trades.BINANCE.ETHUSD", "data.*.BINANCE.ETH???", true)]
    #[case("log-7.txt", "log-[0-9].txt", true)]
    #[case("log-a.txt", "log-[0-9].txt", false)]
    #[case("log-a.txt", "log-[^0-9].txt", true)]
    #[case("log-7.txt", "log-[^0-9].txt", false)]
    #[case("]abc.txt", "[]abc].txt", false)]
    #[case("a.txt", "file[]abc].txt", false)]
    fn test_match_glob(#[case] data: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(
            match_glob(data.as_bytes(), pattern.as_bytes()),
            expected,
            "data={data:?} pattern={pattern:?}"
        );
    }

    #[test]
    fn test_literal_bracket_as_first_class_member() {
        // `]` right after `[` (or `[^`) is a literal member, not the closing bracket. The
        // class `[]abc]` matches exactly one of `]`, `a`, `b`, or `c`.
        assert!(match_glob(b"file].txt", b"file[]abc].txt"));
        assert!(match_glob(b"filea.txt", b"file[]abc].txt"));
        assert!(!match_glob(b"filez.txt", b"file[]abc].txt"));
    }

    #[test]
    fn test_unterminated_class_is_no_match() {
        assert!(!match_glob(b"abc", b"a[bc"));
    }

    #[test]
    fn test_escape_matches_literal_wildcard_byte() {
        assert!(match_glob(b"a*b", br"a\*b"));
        assert!(!match_glob(b"axb", br"a\*b"));
    }

    #[test]
    fn test_star_doubling_law() {
        // Stable under `*`-doubling: match(d, "a*b") <=> match(d, "a**b").
        for data in ["ab", "axb", "axxxb", "b", "a"] {
            assert_eq!(
                match_glob(data.as_bytes(), b"a*b"),
                match_glob(data.as_bytes(), b"a**b"),
                "data={data:?}"
            );
        }
    }

    proptest::proptest! {
        #[test]
        fn test_star_doubling_law_proptest(s in "[a-zA-Z0-9]{0,12}") {
            let once = match_glob(format!("a{s}b").as_bytes(), b"a*b");
            let doubled = match_glob(format!("a{s}b").as_bytes(), b"a**b");
            proptest::prop_assert_eq!(once, doubled);
        }
    }
}
