//! Entity resolver
//!
//! Stories are referenced inconsistently: by issue number (`12`, `#12`,
//! `US-12`, `GH-0012`, ...) or by a team-assigned custom ID such as
//! `MS-005`. The resolver maps every accepted spelling of a story onto a set
//! of canonical keys and matches free-text references against that set.
//!
//! ## Canonical form
//!
//! Trimmed, uppercased, with leading zeros removed from the numeric part of
//! `N`, `#N` and `PREFIX-N`. `ms-005`, `MS-5` and ` MS-0005 ` are all `MS-5`.
//!
//! ## Digit fallback
//!
//! Besides exact key matches, a reference's first run of digits is compared
//! with the issue number. The fallback is disabled for stories that
//! carry a custom ID, so `5` never resolves to the story titled `MS-005`.

use std::collections::{BTreeSet, HashMap};

use tally_core::Story;

use crate::issue::{header_fields, STORY_ID_FIELDS};

/// Allowed custom ID prefix length
pub const CUSTOM_PREFIX_LEN: std::ops::RangeInclusive<usize> = 2..=10;

/// Allowed custom ID digit count
pub const CUSTOM_DIGITS_LEN: std::ops::RangeInclusive<usize> = 1..=9;

/// Prefixes a bare issue number is also known by
pub const NUMBER_ALIASES: &[&str] = &["US", "STORY", "ISSUE", "GH"];

/// Canonical form of a reference, `None` when blank
pub fn canonicalize(raw: &str) -> Option<String> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    if is_digits(&upper) {
        return Some(strip_zeros(&upper).to_string());
    }
    if let Some(digits) = upper.strip_prefix('#') {
        if is_digits(digits) {
            return Some(format!("#{}", strip_zeros(digits)));
        }
    }
    if let Some((prefix, digits)) = upper.split_once('-') {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_alphabetic()) && is_digits(digits)
        {
            return Some(format!("{}-{}", prefix, strip_zeros(digits)));
        }
    }
    Some(upper)
}

/// Canonical custom ID if `token` matches `PREFIX-DIGITS`
pub fn parse_custom_id(token: &str) -> Option<String> {
    let token = token
        .trim()
        .trim_start_matches('[')
        .trim_end_matches([']', ':', ',', '.'].as_slice());
    let (prefix, digits) = token.split_once('-')?;
    if !CUSTOM_PREFIX_LEN.contains(&prefix.len()) || !prefix.bytes().all(|b| b.is_ascii_alphabetic())
    {
        return None;
    }
    if !CUSTOM_DIGITS_LEN.contains(&digits.len()) || !is_digits(digits) {
        return None;
    }
    canonicalize(token)
}

/// Custom ID of a story
///
/// Taken from the leading token of the title (`MS-005: Login`,
/// `[MS-005] Login`, `MS-005 Login`), otherwise from the first body header
/// field whose value starts with one.
pub fn extract_custom_id(title: &str, body: &str) -> Option<String> {
    let title = title.trim_start();
    let leading = match title.strip_prefix('[') {
        Some(rest) => rest.split(']').next().unwrap_or(""),
        None => title
            .split(|c: char| c.is_whitespace() || c == ':')
            .next()
            .unwrap_or(""),
    };
    if let Some(id) = parse_custom_id(leading) {
        return Some(id);
    }

    header_fields(body, STORY_ID_FIELDS)
        .iter()
        .filter_map(|value| value.split_whitespace().next())
        .find_map(parse_custom_id)
}

/// Every canonical key a story answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryKeys {
    number: u64,
    custom_id: Option<String>,
    keys: BTreeSet<String>,
}

impl StoryKeys {
    /// Keys for a story
    pub fn for_story(story: &Story) -> Self {
        Self::new(story.number, extract_custom_id(&story.title, &story.body))
    }

    /// Keys for an issue number and optional canonical custom ID
    pub fn new(number: u64, custom_id: Option<String>) -> Self {
        let mut keys = BTreeSet::new();
        keys.insert(number.to_string());
        keys.insert(format!("#{}", number));
        for alias in NUMBER_ALIASES {
            keys.insert(format!("{}-{}", alias, number));
        }
        if let Some(id) = &custom_id {
            keys.insert(id.clone());
        }
        Self {
            number,
            custom_id,
            keys,
        }
    }

    /// Issue number
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Canonical custom ID
    pub fn custom_id(&self) -> Option<&str> {
        self.custom_id.as_deref()
    }

    /// Canonical keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Whether `reference` names this story
    pub fn matches(&self, reference: &str) -> bool {
        let Some(canonical) = canonicalize(reference) else {
            return false;
        };
        if self.keys.contains(&canonical) {
            return true;
        }
        self.custom_id.is_none() && first_number(reference) == Some(self.number)
    }
}

/// Matches references against a fixed list of stories
///
/// A reference belongs to every story whose key set it matches, so the
/// result does not depend on story order. Canonical keys and fallback
/// numbers are indexed up front; each lookup canonicalizes once.
#[derive(Debug, Clone)]
pub struct StoryIndex {
    stories: Vec<StoryKeys>,
    by_key: HashMap<String, Vec<usize>>,
    by_number_without_custom: HashMap<u64, Vec<usize>>,
}

impl StoryIndex {
    /// Index over `stories`
    pub fn new(stories: &[Story]) -> Self {
        let stories: Vec<StoryKeys> = stories.iter().map(StoryKeys::for_story).collect();
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_number_without_custom: HashMap<u64, Vec<usize>> = HashMap::new();
        for (position, keys) in stories.iter().enumerate() {
            for key in keys.keys() {
                by_key.entry(key.to_string()).or_default().push(position);
            }
            if keys.custom_id.is_none() {
                by_number_without_custom
                    .entry(keys.number)
                    .or_default()
                    .push(position);
            }
        }
        Self {
            stories,
            by_key,
            by_number_without_custom,
        }
    }

    /// Positions of every story `reference` names, ascending
    pub fn matching(&self, reference: &str) -> Vec<usize> {
        let Some(canonical) = canonicalize(reference) else {
            return Vec::new();
        };
        let mut positions: BTreeSet<usize> = BTreeSet::new();
        if let Some(exact) = self.by_key.get(&canonical) {
            positions.extend(exact);
        }
        if let Some(fallback) = first_number(reference).and_then(|n| self.by_number_without_custom.get(&n)) {
            positions.extend(fallback);
        }
        positions.into_iter().collect()
    }

    /// Whether `reference` names any story
    pub fn resolves(&self, reference: &str) -> bool {
        !self.matching(reference).is_empty()
    }

    /// Keys of the story at `position`
    pub fn keys(&self, position: usize) -> Option<&StoryKeys> {
        self.stories.get(position)
    }

    /// Number of indexed stories
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// True when no stories are indexed
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn strip_zeros(digits: &str) -> &str {
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() {
        "0"
    } else {
        stripped
    }
}

fn first_number(reference: &str) -> Option<u64> {
    let start = reference.find(|c: char| c.is_ascii_digit())?;
    let rest = &reference[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize(" 007 ").as_deref(), Some("7"));
        assert_eq!(canonicalize("#0012").as_deref(), Some("#12"));
        assert_eq!(canonicalize("ms-005").as_deref(), Some("MS-5"));
        assert_eq!(canonicalize("US-000").as_deref(), Some("US-0"));
        assert_eq!(canonicalize("login page").as_deref(), Some("LOGIN PAGE"));
        assert_eq!(canonicalize("   "), None);
    }

    #[test]
    fn test_custom_id_grammar() {
        assert_eq!(parse_custom_id("MS-005").as_deref(), Some("MS-5"));
        assert_eq!(parse_custom_id("[PAY-12]").as_deref(), Some("PAY-12"));
        assert_eq!(parse_custom_id("ABCDEFGHIJ-1").as_deref(), Some("ABCDEFGHIJ-1"));
        assert_eq!(parse_custom_id("M-5"), None);
        assert_eq!(parse_custom_id("ABCDEFGHIJK-1"), None);
        assert_eq!(parse_custom_id("MS-1234567890"), None);
        assert_eq!(parse_custom_id("MS5"), None);
        assert_eq!(parse_custom_id("M2-5"), None);
    }

    #[test]
    fn test_extract_from_title_forms() {
        for title in ["MS-005: Login", "[MS-005] Login", "MS-005 Login", "ms-005"] {
            assert_eq!(
                extract_custom_id(title, "").as_deref(),
                Some("MS-5"),
                "{}",
                title
            );
        }
        assert_eq!(extract_custom_id("Login MS-005", ""), None);
    }

    #[test]
    fn test_extract_from_body() {
        assert_eq!(
            extract_custom_id("Login", "**Story ID:** AB-0042 (legacy)").as_deref(),
            Some("AB-42")
        );
        assert_eq!(
            extract_custom_id("Login", "### Custom ID\n\nQA-7").as_deref(),
            Some("QA-7")
        );
        assert_eq!(extract_custom_id("Login", "Story: #12"), None);
    }

    #[test]
    fn test_extract_skips_prose_story_field() {
        let body = "Story: As a user I want to log in\nStory ID: MS-5\n";
        assert_eq!(extract_custom_id("Login", body).as_deref(), Some("MS-5"));

        let form = "### Story\n\nAs a shopper I pay\n\n### Story ID\n\nPAY-0003\n";
        assert_eq!(extract_custom_id("Pay", form).as_deref(), Some("PAY-3"));
    }

    #[test]
    fn test_key_set() {
        let keys = StoryKeys::new(12, Some("MS-5".to_string()));
        let all: Vec<&str> = keys.keys().collect();
        assert_eq!(
            all,
            vec!["#12", "12", "GH-12", "ISSUE-12", "MS-5", "STORY-12", "US-12"]
        );
    }

    #[test]
    fn test_custom_id_disables_digit_fallback() {
        let story = Story::new(12, "MS-005: Login");
        let keys = StoryKeys::for_story(&story);
        assert!(keys.matches("MS-005"));
        assert!(keys.matches("ms-5"));
        assert!(keys.matches("#12"));
        assert!(keys.matches("US-0012"));
        assert!(!keys.matches("5"));
        assert!(!keys.matches("see issue 12 please"));
    }

    #[test]
    fn test_digit_fallback_without_custom_id() {
        let keys = StoryKeys::for_story(&Story::new(12, "Login"));
        assert!(keys.matches("12"));
        assert!(keys.matches("Story 12"));
        assert!(keys.matches("REQ-0012"));
        assert!(!keys.matches("13"));
        assert!(!keys.matches(""));
    }

    #[test]
    fn test_index_matches_every_named_story() {
        let stories = vec![
            Story::new(5, "Checkout"),
            Story::new(12, "MS-005: Login"),
            Story::new(7, "US-5: Conflicting custom id"),
        ];
        let index = StoryIndex::new(&stories);
        // Story 5 by digit fallback, story 12 by its custom id
        assert_eq!(index.matching("MS-005"), vec![0, 1]);
        assert_eq!(index.matching("5"), vec![0]);
        // Story 5's alias and story 7's custom id
        assert_eq!(index.matching("US-5"), vec![0, 2]);
        assert_eq!(index.matching("#7"), vec![2]);
        assert!(index.matching("nothing").is_empty());
        assert!(!index.resolves("  "));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_index_agrees_with_story_keys() {
        let stories = vec![
            Story::new(5, "Checkout"),
            Story::new(12, "MS-005: Login"),
            Story::new(7, "US-5: Conflicting custom id"),
            Story::new(3, "Profile"),
        ];
        let index = StoryIndex::new(&stories);
        for reference in ["5", "MS-005", "us-05", "#7", "ticket 3", "ticket 12", "GH-12", "7"] {
            let expected: Vec<usize> = (0..stories.len())
                .filter(|&i| index.keys(i).unwrap().matches(reference))
                .collect();
            assert_eq!(index.matching(reference), expected, "{}", reference);
        }
    }

    #[test]
    fn test_index_fallback_skips_stories_with_custom_id() {
        let stories = vec![Story::new(12, "MS-005: Login"), Story::new(3, "Profile")];
        let index = StoryIndex::new(&stories);
        assert!(index.matching("ticket 12").is_empty());
        assert_eq!(index.matching("ticket 3"), vec![1]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn canonical_form_is_idempotent(raw in "[ #a-zA-Z0-9-]{0,16}") {
                if let Some(once) = canonicalize(&raw) {
                    prop_assert_eq!(canonicalize(&once), Some(once.clone()));
                }
            }

            #[test]
            fn leading_zeros_never_matter(prefix in "[A-Z]{2,10}", n in 0u32..1_000_000, zeros in 0usize..4) {
                let padded = format!("{}-{}{}", prefix, "0".repeat(zeros), n);
                let plain = format!("{}-{}", prefix, n);
                prop_assert_eq!(canonicalize(&padded), canonicalize(&plain));
            }

            #[test]
            fn story_always_matches_its_number_forms(number in 1u64..100_000, custom in proptest::option::of("[A-Z]{2,5}-[0-9]{1,4}")) {
                let title = match &custom {
                    Some(id) => format!("{}: Title", id),
                    None => "Title".to_string(),
                };
                let keys = StoryKeys::for_story(&Story::new(number, title));
                prop_assert!(keys.matches(&number.to_string()));
                let hash_form = format!("#{}", number);
                prop_assert!(keys.matches(&hash_form));
                let gh_form = format!("gh-{}", number);
                prop_assert!(keys.matches(&gh_form));
            }
        }
    }
}
