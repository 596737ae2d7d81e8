use crate::records::ImageRecord;
use icu_collator::{Collator, CollatorOptions};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Articles dropped from the front of the first tag before alphabetical comparison
const LEADING_ARTICLES: &[&str] = &["a", "an", "the"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "oldest")]
    Oldest,
    #[serde(rename = "a-z")]
    AToZ,
    #[serde(rename = "z-a")]
    ZToA,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Random,
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::AToZ,
        SortOrder::ZToA,
    ];

    /// Value used by the sort selector
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Random => "random",
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::AToZ => "a-z",
            SortOrder::ZToA => "z-a",
        }
    }

    /// Text shown for the option
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Random => "Random",
            SortOrder::Newest => "Newest to Oldest",
            SortOrder::Oldest => "Oldest to Newest",
            SortOrder::AToZ => "A-Z",
            SortOrder::ZToA => "Z-A",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("Unknown sort order: {}", s))
    }
}

/// First comma-delimited tag, trimmed and lowercased, with one leading
/// article ("a", "an", "the" followed by whitespace) removed.
pub fn normalized_first_tag(tags: &str) -> String {
    let first = tags.split(',').next().unwrap_or("").trim().to_lowercase();

    for article in LEADING_ARTICLES {
        if let Some(rest) = first.strip_prefix(article) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start().to_string();
            }
        }
    }
    first
}

/// Accent- and case-folded key, used only when no collation data is available
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: String,
    tertiary: String,
}

impl CollationKey {
    pub fn new(s: &str) -> Self {
        let primary = s
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();
        Self {
            primary,
            tertiary: s.to_string(),
        }
    }
}

/// Root-locale collation: CLDR root order at tertiary strength, with
/// punctuation and symbols weighted below digits and letters.
pub struct LocaleCollator {
    collator: Option<Collator>,
}

impl LocaleCollator {
    pub fn root() -> Self {
        let collator = match Collator::try_new(&Default::default(), CollatorOptions::new()) {
            Ok(collator) => Some(collator),
            Err(e) => {
                log::warn!("[Search] Collation data unavailable, folding accents only: {}", e);
                None
            }
        };
        Self { collator }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => CollationKey::new(a).cmp(&CollationKey::new(b)),
        }
    }
}

pub fn locale_compare(a: &str, b: &str) -> Ordering {
    LocaleCollator::root().compare(a, b)
}

/// Reorder `records` in place. Every order except `Random` is a stable sort,
/// so equal keys keep their current relative order.
pub fn sort_records<R: Rng + ?Sized>(records: &mut [ImageRecord], order: SortOrder, rng: &mut R) {
    match order {
        SortOrder::Random => records.shuffle(rng),
        SortOrder::Newest => records.sort_by(|a, b| b.date.cmp(&a.date)),
        SortOrder::Oldest => records.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOrder::AToZ | SortOrder::ZToA => {
            let collator = LocaleCollator::root();
            let mut keyed: Vec<(String, ImageRecord)> = records
                .iter()
                .map(|r| (normalized_first_tag(&r.tags), r.clone()))
                .collect();
            if order == SortOrder::AToZ {
                keyed.sort_by(|a, b| collator.compare(&a.0, &b.0));
            } else {
                keyed.sort_by(|a, b| collator.compare(&b.0, &a.0));
            }
            for (slot, (_, record)) in records.iter_mut().zip(keyed) {
                *slot = record;
            }
        }
    }
}
