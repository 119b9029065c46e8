//! Deterministic cache keys.
//!
//! Every key has the shape `{prefix}:{tier}:{identifier}`. The identifier is
//! the text itself, or `{component}::{limit}` for compound lookups, replaced
//! by its SHA-256 hex digest when longer than [`HASH_THRESHOLD`] characters.
//! Vectors are always digested.

use sha2::{Digest, Sha256};

use crate::tier::CacheTier;

/// Identifiers longer than this many characters are replaced by their digest
pub const HASH_THRESHOLD: usize = 100;

/// Separator between a key component and its result limit
pub const COMPOUND_SEPARATOR: &str = "::";

/// Default root namespace
pub const DEFAULT_PREFIX: &str = "hsai";

/// Input a key is derived from
#[derive(Debug, Clone, Copy)]
pub enum KeyPayload<'a> {
    Text(&'a str),
    Vector(&'a [f32]),
}

impl<'a> From<&'a str> for KeyPayload<'a> {
    fn from(text: &'a str) -> Self {
        KeyPayload::Text(text)
    }
}

impl<'a> From<&'a [f32]> for KeyPayload<'a> {
    fn from(vector: &'a [f32]) -> Self {
        KeyPayload::Vector(vector)
    }
}

/// Builds keys under one root namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derive the key for `payload` in `tier`, optionally scoped by a result limit.
    ///
    /// Pure and infallible; empty text and empty vectors produce valid keys.
    pub fn derive(&self, tier: CacheTier, payload: KeyPayload<'_>, extra: Option<usize>) -> String {
        let component = match payload {
            KeyPayload::Text(text) => text.to_string(),
            KeyPayload::Vector(vector) => hash_vector(vector),
        };

        let identifier = match extra {
            Some(limit) => format!("{}{}{}", component, COMPOUND_SEPARATOR, limit),
            None => component,
        };

        format!("{}:{}:{}", self.prefix, tier, bounded(identifier))
    }

    /// Glob matching every key of one namespace segment, or of the whole root
    pub fn pattern(&self, segment: Option<&str>) -> String {
        match segment {
            Some(segment) => format!("{}:{}:*", self.prefix, segment),
            None => format!("{}:*", self.prefix),
        }
    }

    pub fn tier_pattern(&self, tier: CacheTier) -> String {
        self.pattern(Some(tier.as_str()))
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Canonical text form of a vector: components in their original order,
/// shortest round-trip decimal form, comma separated, in brackets.
pub fn canonical_vector(vector: &[f32]) -> String {
    let body = vector
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("[{}]", body)
}

/// SHA-256 hex digest of [`canonical_vector`]
pub fn hash_vector(vector: &[f32]) -> String {
    digest(&canonical_vector(vector))
}

fn digest(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

fn bounded(identifier: String) -> String {
    if identifier.chars().count() > HASH_THRESHOLD {
        digest(&identifier)
    } else {
        identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeyBuilder {
        KeyBuilder::default()
    }

    #[test]
    fn test_short_text_used_verbatim() {
        let key = keys().derive(CacheTier::Embedding, "hammer".into(), None);
        assert_eq!(key, "hsai:embedding:hammer");
    }

    #[test]
    fn test_text_at_threshold_not_hashed() {
        let text = "a".repeat(HASH_THRESHOLD);
        let key = keys().derive(CacheTier::Embedding, text.as_str().into(), None);
        assert_eq!(key, format!("hsai:embedding:{}", text));
    }

    #[test]
    fn test_long_text_hashed_to_fixed_length() {
        let text = "b".repeat(HASH_THRESHOLD + 1);
        let key = keys().derive(CacheTier::Embedding, text.as_str().into(), None);

        let identifier = key.strip_prefix("hsai:embedding:").unwrap();
        assert_eq!(identifier.len(), 64);
        assert!(identifier.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // 60 two-byte characters: 120 bytes, 60 chars
        let text = "é".repeat(60);
        let key = keys().derive(CacheTier::Search, text.as_str().into(), None);
        assert_eq!(key, format!("hsai:search:{}", text));
    }

    #[test]
    fn test_compound_key_includes_limit() {
        let k5 = keys().derive(CacheTier::Search, "drill".into(), Some(5));
        let k10 = keys().derive(CacheTier::Search, "drill".into(), Some(10));

        assert_eq!(k5, "hsai:search:drill::5");
        assert_ne!(k5, k10);
    }

    #[test]
    fn test_compound_is_hashed_when_long() {
        let query = "c".repeat(99);
        let key = keys().derive(CacheTier::Search, query.as_str().into(), Some(5));
        // 99 + "::5" exceeds the threshold
        assert_eq!(key.len(), "hsai:search:".len() + 64);
    }

    #[test]
    fn test_vector_key_is_stable() {
        let v = [0.1f32, -0.25, 3.0];
        let a = keys().derive(CacheTier::Vector, v.as_slice().into(), Some(5));
        let b = keys().derive(CacheTier::Vector, v.as_slice().into(), Some(5));

        assert_eq!(a, b);
        assert_eq!(a, format!("hsai:vector:{}::5", hash_vector(&v)));
    }

    #[test]
    fn test_vector_order_matters() {
        assert_ne!(hash_vector(&[1.0, 2.0]), hash_vector(&[2.0, 1.0]));
    }

    #[test]
    fn test_empty_inputs_are_valid() {
        assert_eq!(
            keys().derive(CacheTier::Embedding, "".into(), None),
            "hsai:embedding:"
        );
        assert_eq!(canonical_vector(&[]), "[]");
        let key = keys().derive(CacheTier::Vector, (&[] as &[f32]).into(), None);
        assert_eq!(key.len(), "hsai:vector:".len() + 64);
    }

    #[test]
    fn test_canonical_vector_format() {
        assert_eq!(canonical_vector(&[0.5, -1.0, 0.1]), "[0.5,-1,0.1]");
    }

    #[test]
    fn test_known_digest() {
        // sha256("[]")
        assert_eq!(
            hash_vector(&[]),
            "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );
    }

    #[test]
    fn test_tiers_do_not_collide() {
        let e = keys().derive(CacheTier::Embedding, "x".into(), None);
        let s = keys().derive(CacheTier::Search, "x".into(), None);
        assert_ne!(e, s);
    }

    #[test]
    fn test_patterns() {
        let keys = KeyBuilder::new("shop");
        assert_eq!(keys.pattern(None), "shop:*");
        assert_eq!(keys.tier_pattern(CacheTier::Search), "shop:search:*");
        assert_eq!(keys.pattern(Some("embedding")), "shop:embedding:*");
    }
}
