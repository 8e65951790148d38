//! Grammar checks for the two identifier formats used as keys.
//!
//! A title reference looks like `CUSA00001`. A content key embeds one:
//! `UP0001-CUSA00001_00-ABCDEFGHIJKLMNOP`. Key positions other than the
//! title reference may hold the `?` wildcard so that partially known keys
//! can still be matched.

use lazy_static::lazy_static;
use regex::Regex;

/// Placeholder accepted in the variable positions of a key.
pub const KEY_WILDCARD: char = '?';

/// Byte offset of the title reference inside a key.
pub const TITLE_REF_OFFSET: usize = 7;
pub const TITLE_REF_LEN: usize = 9;

lazy_static! {
    static ref TITLE_REF_RE: Regex = Regex::new(r"^[A-Z]{4}[0-9]{5}$").unwrap();
    static ref KEY_RE: Regex = Regex::new(
        r"^[A-Z?]{2}[0-9?]{4}-[A-Z]{4}[0-9]{5}_[0-9?]{2}-[A-Za-z0-9?]{16}$"
    )
    .unwrap();
}

/// `true` for exactly four uppercase letters followed by five digits.
pub fn validate_title_ref(title_ref: Option<&str>) -> bool {
    title_ref.is_some_and(|s| TITLE_REF_RE.is_match(s))
}

/// `true` for a well formed content key.
pub fn validate_key(key: Option<&str>) -> bool {
    key.is_some_and(|s| KEY_RE.is_match(s))
}

/// Title reference segment of a valid key.
pub fn title_ref_of(key: &str) -> Option<&str> {
    if !validate_key(Some(key)) {
        return None;
    }
    key.get(TITLE_REF_OFFSET..TITLE_REF_OFFSET + TITLE_REF_LEN)
}

/// Platform family marker of an identifier: the first character of its
/// title reference segment.
pub fn platform_marker(id: &str) -> Option<char> {
    id.chars().nth(TITLE_REF_OFFSET)
}
