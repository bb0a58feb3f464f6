//! Locale parsing and negotiation
//!
//! The display language of a request is picked in priority order from an
//! explicit query override, the persisted locale cookie, the browser's
//! `Accept-Language` header, and finally the tenant's default locale. A
//! candidate only wins if the tenant supports it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result, TenantProfile};

/// Normalized language tag (`ll` or `ll-CC`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Parse a language tag, accepting `_` or `-` separators.
    ///
    /// Script and variant subtags are dropped; only the primary language and
    /// an optional region survive (`zh-Hant-TW` becomes `zh-TW`).
    pub fn parse(tag: &str) -> Result<Self> {
        let normalized = tag.trim().replace('_', "-");
        let mut parts = normalized.split('-').filter(|p| !p.is_empty());

        let primary = parts
            .next()
            .ok_or_else(|| Error::InvalidLocale(tag.to_string()))?;
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidLocale(tag.to_string()));
        }

        let region = parts.find(|p| {
            (p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()))
                || (p.len() == 3 && p.chars().all(|c| c.is_ascii_digit()))
        });

        Ok(match region {
            Some(region) => Self(format!(
                "{}-{}",
                primary.to_ascii_lowercase(),
                region.to_ascii_uppercase()
            )),
            None => Self(primary.to_ascii_lowercase()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    pub fn region(&self) -> Option<&str> {
        self.0.split_once('-').map(|(_, region)| region)
    }

    /// Whether numbers in this locale use `,` as the decimal separator
    pub fn uses_comma_decimal(&self) -> bool {
        matches!(
            self.language(),
            "de" | "fr" | "es" | "it" | "pt" | "nl" | "tr" | "pl" | "ru" | "sv" | "da" | "nb"
                | "fi" | "cs" | "ro" | "el" | "hu" | "uk" | "bg" | "hr" | "sk" | "sl"
        )
    }

    /// Text direction for the `dir` attribute of rendered pages
    pub fn direction(&self) -> &'static str {
        match self.language() {
            "ar" | "he" | "fa" | "ur" => "rtl",
            _ => "ltr",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

/// Where the resolved locale came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleSource {
    Query,
    Cookie,
    AcceptLanguage,
    TenantDefault,
}

impl LocaleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocaleSource::Query => "query",
            LocaleSource::Cookie => "cookie",
            LocaleSource::AcceptLanguage => "accept_language",
            LocaleSource::TenantDefault => "tenant_default",
        }
    }
}

/// Raw per-request locale signals
#[derive(Debug, Clone, Default)]
pub struct LocaleInputs<'a> {
    pub query: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

/// Parse an `Accept-Language` header into tags ordered by quality.
///
/// Entries with `q=0`, the `*` wildcard and malformed tags are skipped. Equal
/// weights keep header order.
pub fn parse_accept_language(header: &str) -> Vec<Locale> {
    let mut weighted: Vec<(f32, usize, Locale)> = header
        .split(',')
        .enumerate()
        .filter_map(|(index, part)| {
            let mut pieces = part.trim().split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }

            let mut quality = 1.0f32;
            for param in pieces {
                if let Some(value) = param.trim().strip_prefix("q=") {
                    quality = value.trim().parse().ok()?;
                }
            }
            if quality <= 0.0 {
                return None;
            }

            Locale::parse(tag).ok().map(|locale| (quality, index, locale))
        })
        .collect();

    weighted.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    weighted.into_iter().map(|(_, _, locale)| locale).collect()
}

/// Match a candidate against the supported set: exact tag first, then a
/// supported tag that is the bare language, then any supported tag sharing
/// the primary language.
pub fn negotiate(candidate: &Locale, supported: &[Locale]) -> Option<Locale> {
    if let Some(exact) = supported.iter().find(|s| *s == candidate) {
        return Some(exact.clone());
    }

    let language = candidate.language();
    supported
        .iter()
        .find(|s| s.as_str() == language)
        .or_else(|| supported.iter().find(|s| s.language() == language))
        .cloned()
}

/// Resolve the display locale for a request.
pub fn resolve_locale(inputs: &LocaleInputs<'_>, profile: &TenantProfile) -> (Locale, LocaleSource) {
    let supported = &profile.supported_locales;

    let explicit = [
        (inputs.query, LocaleSource::Query),
        (inputs.cookie, LocaleSource::Cookie),
    ];
    for (raw, source) in explicit {
        if let Some(raw) = raw
            && let Ok(candidate) = Locale::parse(raw)
            && let Some(locale) = negotiate(&candidate, supported)
        {
            return (locale, source);
        }
    }

    if let Some(header) = inputs.accept_language {
        for candidate in parse_accept_language(header) {
            if let Some(locale) = negotiate(&candidate, supported) {
                return (locale, LocaleSource::AcceptLanguage);
            }
        }
    }

    (profile.default_locale.clone(), LocaleSource::TenantDefault)
}

/// Whether the locale cookie needs to be (re)written after resolution
pub fn needs_persist(cookie: Option<&str>, resolved: &Locale) -> bool {
    match cookie.and_then(|c| Locale::parse(c).ok()) {
        Some(existing) => existing != *resolved,
        None => true,
    }
}
