// i18n.rs
//
// Runtime i18n with the translation table compiled into the binary:
// - assets/i18n.json, format: { "<lang>": { "key": "value" } }
// - Lookup: tr("key") / tr_with("key", [("name", "...")]) with {name} placeholders
// - Fallback chain: selected lang -> zh-Hans -> the key itself
//
// Language selection:
// - CLI: --lang <code> (zh-Hans, en)
// - Env: LENS_LANG
// - Default: zh-Hans

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::RwLock;

const FALLBACK_LANG: &str = "zh-Hans";

static TABLE: Lazy<HashMap<String, HashMap<String, String>>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../assets/i18n.json"))
        .unwrap_or_else(|e| panic!("assets/i18n.json is malformed: {e}"))
});

static CURRENT_LANG: OnceCell<RwLock<String>> = OnceCell::new();

/// Select a language. Safe to call again to switch at runtime.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    if let Some(lock) = CURRENT_LANG.get() {
        if let Ok(mut w) = lock.write() {
            *w = lang;
        }
    } else {
        let _ = CURRENT_LANG.set(RwLock::new(lang));
    }
}

pub fn current_lang() -> String {
    CURRENT_LANG
        .get()
        .and_then(|l| l.read().ok())
        .map(|l| l.clone())
        .unwrap_or_else(|| FALLBACK_LANG.to_string())
}

/// Get localized text by key. If key missing everywhere, returns the key itself.
pub fn tr(key: &str) -> String {
    let lang = current_lang();
    if let Some(v) = TABLE.get(&lang).and_then(|m| m.get(key)) {
        return v.clone();
    }
    if let Some(v) = TABLE.get(FALLBACK_LANG).and_then(|m| m.get(key)) {
        return v.clone();
    }
    key.to_string()
}

/// Get localized text and substitute `{name}` placeholders.
/// Any placeholder not provided is kept as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        let placeholder = format!("{{{}}}", k);
        s = s.replace(&placeholder, v);
    }
    s
}

/// Choose language from CLI/env.
pub fn resolve_lang_from_args() -> String {
    let mut it = std::env::args();
    while let Some(a) = it.next() {
        if a == "--lang" {
            if let Some(v) = it.next() {
                return v;
            }
        }
    }

    if let Ok(v) = std::env::var("LENS_LANG") {
        if !v.trim().is_empty() {
            return v;
        }
    }

    FALLBACK_LANG.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses_and_covers_both_langs() {
        assert!(TABLE.contains_key("zh-Hans"));
        assert!(TABLE.contains_key("en"));
        // 两种语言键集合保持一致
        for k in TABLE["zh-Hans"].keys() {
            assert!(TABLE["en"].contains_key(k), "en missing key {k}");
        }
        for k in TABLE["en"].keys() {
            assert!(TABLE["zh-Hans"].contains_key(k), "zh-Hans missing key {k}");
        }
    }

    #[test]
    fn missing_key_returns_key() {
        init(FALLBACK_LANG);
        assert_eq!(tr("no.such.key"), "no.such.key");
    }

    #[test]
    fn placeholder_substitution_keeps_unknown_placeholders() {
        init(FALLBACK_LANG);
        let s = tr_with("no.such.key {x} {y}", &[("x", "1".to_string())]);
        assert_eq!(s, "no.such.key 1 {y}");
    }
}
