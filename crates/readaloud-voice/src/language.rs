//! Page language resolution.
//!
//! Walks the page's language hints in priority order and returns the first
//! usable one as a lowercase primary subtag (`"es-MX"` → `"es"`):
//!
//! 1. document `lang`, body `lang`, content-language meta
//! 2. URL: `?lang=` query, `#lang=xx` or `#/xx/` hash, `/xx/` path segment
//! 3. visible multilang marker, first `[lang]` inside the content, form field
//! 4. `lang=` cookie, stored preference (`lang`, `preferredLang`, `siteLang`)
//! 5. browser language list
//! 6. the configured default

use std::sync::LazyLock;

use readaloud_core::PageLanguageSources;
use regex::Regex;
use url::Url;

static HASH_PARAM: LazyLock<Regex> = LazyLock::new(|| compile(r"lang=([a-zA-Z-]+)"));
static HASH_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^/?([a-z]{2}(?:-[a-z]{2})?)(?:/|$)"));
static PATH_SEGMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"/([a-z]{2})(?:[/\-]|$)"));
static COOKIE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:^|;\s*)lang=([^;]+)"));

const STORAGE_KEYS: [&str; 3] = ["lang", "preferredLang", "siteLang"];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("static pattern {pattern}: {e}"))
}

/// Resolve the page language, falling back to `default`.
pub fn resolve(sources: &PageLanguageSources, default: &str) -> String {
    let candidates: [(&str, Option<String>); 12] = [
        ("html", sources.html_lang.clone()),
        ("body", sources.body_lang.clone()),
        ("meta", sources.meta_language.clone()),
        ("query", sources.url.as_deref().and_then(from_query)),
        ("hash", sources.url.as_deref().and_then(from_hash)),
        ("path", sources.url.as_deref().and_then(from_path)),
        ("multilang", sources.visible_multilang.clone()),
        ("content", sources.content_lang.clone()),
        ("form", sources.form_language.clone()),
        ("cookie", sources.cookie.as_deref().and_then(from_cookie)),
        ("storage", from_storage(&sources.stored)),
        (
            "browser",
            sources
                .browser_languages
                .iter()
                .find_map(|l| normalize(l)),
        ),
    ];

    for (source, value) in candidates {
        if let Some(lang) = value.as_deref().and_then(normalize) {
            tracing::debug!(source, lang = %lang, "Resolved page language");
            return lang;
        }
    }

    let lang = normalize(default).unwrap_or_else(|| readaloud_core::DEFAULT_LANGUAGE.to_string());
    tracing::debug!(lang = %lang, "Using default page language");
    lang
}

/// Lowercase primary subtag, or `None` if `tag` does not look like one.
pub fn normalize(tag: &str) -> Option<String> {
    let primary = tag.trim().split(['-', '_']).next()?;
    let valid = (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic());
    valid.then(|| primary.to_ascii_lowercase())
}

fn from_query(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "lang")
        .map(|(_, v)| v.into_owned())
}

fn from_hash(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let fragment = url.fragment()?;
    HASH_PARAM
        .captures(fragment)
        .or_else(|| HASH_ROUTE.captures(fragment))
        .map(|c| c[1].to_string())
}

fn from_path(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    PATH_SEGMENT
        .captures(url.path())
        .map(|c| c[1].to_string())
}

fn from_cookie(cookie: &str) -> Option<String> {
    COOKIE.captures(cookie).map(|c| c[1].trim().to_string())
}

fn from_storage(stored: &[(String, String)]) -> Option<String> {
    STORAGE_KEYS.iter().find_map(|key| {
        stored
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.clone())
    })
}
