//! Dataset title normalization.
//!
//! The same dataset is titled slightly differently across systems: Unicode
//! composition, letter case, whitespace runs, and spacing around punctuation
//! all vary. [`normalize_title`] canonicalizes a title so that equality on
//! the output is a fair cross-system comparison. The transform never alters
//! semantic content (no stemming, no stop-word removal) and every set or
//! equality operation in this crate goes through it; raw-string comparison
//! of titles is forbidden.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Whitespace immediately surrounding `, . : ; ( )`, the hyphen, or the
/// en-dash is dropped.
static PUNCT_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([,.:;()\-–])\s*").expect("punctuation regex"));

/// Canonicalize a dataset title into a comparable key.
///
/// Empty input yields the empty string. Otherwise the title is composed to
/// NFC, lowercased, whitespace runs are collapsed to single spaces,
/// whitespace around the fixed punctuation set is removed, and the result is
/// trimmed. Idempotent: `normalize_title(&normalize_title(x)) ==
/// normalize_title(x)`.
pub fn normalize_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }

    let composed: String = title.nfc().collect();
    let lowered = composed.to_lowercase();
    let collapsed = WHITESPACE_RUN.replace_all(&lowered, " ");
    let tightened = PUNCT_SPACING.replace_all(&collapsed, "$1");
    tightened.trim().to_string()
}
