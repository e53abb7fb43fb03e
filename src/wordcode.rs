// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Word codes: a content hash rendered as three dictionary words.
//!
//! Each word indexes a 1024-entry dictionary, so a code carries 30 bits:
//! the low-order bits of the hash (its last four bytes read big-endian).
//! That is a *suffix* of the hash, not the hash itself, so a decoded code
//! only narrows the search. Whatever a peer offers for a suffix must be
//! validated before it is trusted.
//!
//! ```
//! use parlor::key::hash;
//! use parlor::wordcode::{self, Suffix};
//!
//! let h = hash(b"some room");
//! let words = wordcode::encode(&h);
//! let suffix = wordcode::decode(&words).unwrap();
//! assert!(suffix.matches(&h));
//! assert_eq!(suffix, Suffix::of(&h));
//! ```

use crate::error::FormatError;
use crate::key::Hash;
use crate::words::WORDS;

/// Bits carried by one word.
pub const WORD_BITS: u32 = 10;

/// Words in a join code.
pub const CODE_WORDS: usize = 3;

/// Bits of the hash a code pins down.
pub const SUFFIX_BITS: u32 = WORD_BITS * CODE_WORDS as u32;

const WORD_MASK: u32 = (1 << WORD_BITS) - 1;
const SUFFIX_MASK: u32 = (1 << SUFFIX_BITS) - 1;

/// The low-order `SUFFIX_BITS` of a content hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Suffix(u32);

impl Suffix {
    /// The suffix of a full hash.
    pub fn of(hash: &Hash) -> Suffix {
        let bytes = hash.as_bytes();
        let tail = [bytes[28], bytes[29], bytes[30], bytes[31]];
        return Suffix(u32::from_be_bytes(tail) & SUFFIX_MASK);
    }

    /// Build a suffix from raw bits, discarding anything above `SUFFIX_BITS`.
    pub fn from_bits(bits: u32) -> Suffix {
        return Suffix(bits & SUFFIX_MASK);
    }

    /// The raw bits.
    pub fn bits(&self) -> u32 {
        return self.0;
    }

    /// True if the hash ends in this suffix.
    pub fn matches(&self, hash: &Hash) -> bool {
        return Suffix::of(hash) == *self;
    }
}

/// Render the suffix of a hash as three words.
pub fn encode(hash: &Hash) -> [&'static str; CODE_WORDS] {
    return encode_suffix(Suffix::of(hash));
}

/// Render a suffix as three words, most significant group first.
pub fn encode_suffix(suffix: Suffix) -> [&'static str; CODE_WORDS] {
    let mut words = [""; CODE_WORDS];
    for (i, word) in words.iter_mut().enumerate() {
        let shift = WORD_BITS * (CODE_WORDS - 1 - i) as u32;
        let index = (suffix.0 >> shift) & WORD_MASK;
        *word = WORDS[index as usize];
    }
    return words;
}

/// Turn three words back into the suffix they encode.
pub fn decode<S: AsRef<str>>(words: &[S]) -> Result<Suffix, FormatError> {
    if words.len() != CODE_WORDS {
        return Err(FormatError::WordCount(words.len()));
    }

    let mut bits = 0u32;
    for word in words {
        let word = word.as_ref();
        let index = WORDS
            .binary_search(&word)
            .map_err(|_| FormatError::UnknownWord(word.to_string()))?;
        bits = (bits << WORD_BITS) | index as u32;
    }
    return Ok(Suffix(bits));
}

/// Parse a join token: three words separated by spaces, case-insensitive.
pub fn parse(token: &str) -> Result<Suffix, FormatError> {
    let lowered = token.trim().to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    return decode(&words);
}

/// Render a join token for a hash.
pub fn token(hash: &Hash) -> String {
    return encode(hash).join(" ");
}
