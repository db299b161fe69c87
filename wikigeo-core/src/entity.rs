//! Typed identifiers for Wikidata entities, properties, and wiki languages.

use std::{collections::BTreeSet, fmt, str::FromStr};

use thiserror::Error;

/// Identifier of a Wikidata item such as `Q64`.
///
/// The numeric part is stored directly so the identifier is cheap to hash and
/// copy across worker threads.
///
/// # Examples
/// ```
/// use wikigeo_core::EntityId;
///
/// let berlin: EntityId = "https://www.wikidata.org/wiki/Q64".parse()?;
/// assert_eq!(berlin, EntityId::new(64));
/// assert_eq!(berlin.to_string(), "Q64");
/// # Ok::<(), wikigeo_core::EntityIdError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

/// Errors returned when parsing an [`EntityId`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{input:?} is not a Wikidata item identifier")]
pub struct EntityIdError {
    /// The rejected input.
    pub input: String,
}

impl EntityId {
    /// Wrap a numeric item identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric part of the identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Parse `Q64`, `q64`, `wd:Q64`, or a Wikidata entity URL.
    pub fn parse(input: &str) -> Result<Self, EntityIdError> {
        parse_prefixed(input, &['Q', 'q'])
            .map(Self)
            .ok_or_else(|| EntityIdError {
                input: input.to_owned(),
            })
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

/// Identifier of a Wikidata property such as `P625`.
///
/// # Examples
/// ```
/// use wikigeo_core::PropertyId;
///
/// let property: PropertyId = "P625".parse()?;
/// assert_eq!(property, PropertyId::COORDINATE_LOCATION);
/// # Ok::<(), wikigeo_core::PropertyIdError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u64);

/// Errors returned when parsing a [`PropertyId`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{input:?} is not a Wikidata property identifier")]
pub struct PropertyIdError {
    /// The rejected input.
    pub input: String,
}

impl PropertyId {
    /// The "coordinate location" property carrying globe coordinates.
    pub const COORDINATE_LOCATION: Self = Self(625);

    /// Wrap a numeric property identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Parse `P625`, `p625`, or a Wikidata property URL.
    pub fn parse(input: &str) -> Result<Self, PropertyIdError> {
        parse_prefixed(input, &['P', 'p'])
            .map(Self)
            .ok_or_else(|| PropertyIdError {
                input: input.to_owned(),
            })
    }
}

impl FromStr for PropertyId {
    type Err = PropertyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

fn parse_prefixed(input: &str, prefixes: &[char]) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let last_segment = trimmed.rsplit(['/', '#']).next().unwrap_or(trimmed);
    let final_segment = last_segment
        .rsplit(':')
        .next()
        .unwrap_or(last_segment)
        .trim();
    let digits = final_segment.strip_prefix(prefixes)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lower-case wiki language code such as `en` or `zh-yue`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language(String);

/// Errors raised when building languages or language sets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LanguageError {
    /// The code contained characters other than ASCII letters and `-`.
    #[error("{code:?} is not a valid language code")]
    InvalidCode {
        /// The rejected code.
        code: String,
    },
    /// A language scope must name at least one language.
    #[error("language scope must contain at least one language")]
    EmptyScope,
}

impl Language {
    /// Validate and normalise a language code.
    pub fn new(code: &str) -> Result<Self, LanguageError> {
        let normalised = code.trim().to_ascii_lowercase().replace('_', "-");
        let valid = !normalised.is_empty()
            && !normalised.starts_with('-')
            && !normalised.ends_with('-')
            && normalised
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-');
        if valid {
            Ok(Self(normalised))
        } else {
            Err(LanguageError::InvalidCode {
                code: code.to_owned(),
            })
        }
    }

    /// The normalised language code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-empty set of languages that scopes an ingestion run.
///
/// # Examples
/// ```
/// use wikigeo_core::{Language, LanguageSet};
///
/// let scope: LanguageSet = "en, de".parse()?;
/// assert!(scope.contains(&Language::new("DE")?));
/// assert_eq!(scope.len(), 2);
/// # Ok::<(), wikigeo_core::LanguageError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet(BTreeSet<Language>);

impl LanguageSet {
    /// Build a scope from one or more languages.
    pub fn new<I>(languages: I) -> Result<Self, LanguageError>
    where
        I: IntoIterator<Item = Language>,
    {
        let set: BTreeSet<Language> = languages.into_iter().collect();
        if set.is_empty() {
            return Err(LanguageError::EmptyScope);
        }
        Ok(Self(set))
    }

    /// Report whether `language` is part of the scope.
    #[must_use]
    pub fn contains(&self, language: &Language) -> bool {
        self.0.contains(language)
    }

    /// Number of languages in the scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with standard collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the languages in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.0.iter()
    }
}

impl FromStr for LanguageSet {
    type Err = LanguageError;

    /// Parse a comma-separated list such as `en,de,fr`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let languages = s
            .split(',')
            .filter(|code| !code.trim().is_empty())
            .map(Language::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(languages)
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.0.iter().map(Language::as_str).collect();
        f.write_str(&codes.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Q64", 64)]
    #[case("q9259", 9259)]
    #[case("wd:Q42", 42)]
    #[case("http://www.wikidata.org/entity/Q2", 2)]
    #[case("  Q7  ", 7)]
    fn parses_entity_ids(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(EntityId::parse(input), Ok(EntityId::new(expected)));
    }

    #[rstest]
    #[case("")]
    #[case("Q")]
    #[case("P625")]
    #[case("Q12a")]
    #[case("not-an-id")]
    fn rejects_malformed_entity_ids(#[case] input: &str) {
        assert!(EntityId::parse(input).is_err());
    }

    #[rstest]
    fn property_round_trips_through_display() {
        let property = PropertyId::parse("p625").expect("property should parse");
        assert_eq!(property.to_string(), "P625");
        assert!(PropertyId::parse("Q625").is_err());
    }

    #[rstest]
    #[case("EN", "en")]
    #[case("zh_yue", "zh-yue")]
    fn normalises_language_codes(#[case] input: &str, #[case] expected: &str) {
        let language = Language::new(input).expect("language should parse");
        assert_eq!(language.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("en1")]
    #[case("-en")]
    fn rejects_invalid_language_codes(#[case] input: &str) {
        assert!(matches!(
            Language::new(input),
            Err(LanguageError::InvalidCode { .. })
        ));
    }

    #[rstest]
    fn empty_language_scope_is_rejected() {
        assert_eq!(" , ".parse::<LanguageSet>(), Err(LanguageError::EmptyScope));
    }

    #[rstest]
    fn language_scope_displays_sorted_codes() {
        let scope: LanguageSet = "fr,en,de,en".parse().expect("scope should parse");
        assert_eq!(scope.to_string(), "de,en,fr");
    }
}
