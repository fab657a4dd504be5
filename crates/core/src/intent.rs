//! Message classification: decides whether a chat message is about the business records
//! or a general question that should be answered with public lookups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const BUSINESS_KEYWORDS: [&str; 11] = [
    "booking",
    "vip",
    "customer",
    "revenue",
    "bargainer",
    "earnings",
    "completed",
    "cancelled",
    "review",
    "visitor",
    "report",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Business,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a non-empty message. Callers reject blank messages before getting here.
pub fn classify(message: &str) -> Intent {
    let normalized = message.to_lowercase();
    if BUSINESS_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
        Intent::Business
    } else {
        Intent::General
    }
}

/// External lookup source, listed in the order sections appear in a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    News,
    Sports,
    Wikipedia,
    Web,
}

impl LookupSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::News => "News",
            Self::Sports => "Sports",
            Self::Wikipedia => "Wikipedia",
            Self::Web => "Web",
        }
    }
}

impl FromStr for LookupSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(Self::News),
            "sports" => Ok(Self::Sports),
            "wikipedia" | "wiki" => Ok(Self::Wikipedia),
            "web" | "duck" | "duckduckgo" => Ok(Self::Web),
            other => Err(format!(
                "unsupported lookup source `{other}` (expected news|sports|wikipedia|web)"
            )),
        }
    }
}

/// Caller-supplied override of the lookup path (the request's `type` field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupSelector {
    Only(LookupSource),
    /// Answer straight from the completion service with no lookups.
    Direct,
}

impl FromStr for LookupSelector {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "general" | "direct" => Ok(Self::Direct),
            other => other.parse::<LookupSource>().map(Self::Only),
        }
    }
}

/// How a single request will be answered once classification and the selector are combined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Business,
    Lookup(Vec<LookupSource>),
    Direct,
}

impl Route {
    pub fn intent(&self) -> Intent {
        match self {
            Self::Business => Intent::Business,
            Self::Lookup(_) | Self::Direct => Intent::General,
        }
    }
}

/// A selector always wins over free-text classification.
pub fn route(
    message: &str,
    selector: Option<LookupSelector>,
    default_sources: &[LookupSource],
) -> Route {
    match selector {
        Some(LookupSelector::Only(source)) => Route::Lookup(vec![source]),
        Some(LookupSelector::Direct) => Route::Direct,
        None => match classify(message) {
            Intent::Business => Route::Business,
            Intent::General if default_sources.is_empty() => Route::Direct,
            Intent::General => Route::Lookup(default_sources.to_vec()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, route, Intent, LookupSelector, LookupSource, Route};

    #[test]
    fn business_keywords_classify_as_business() {
        let cases = [
            "Show me today's bookings",
            "who are the VIP customers?",
            "What was our REVENUE last week",
            "tag that bargainer",
            "total earnings please",
            "how many completed rentals",
            "list cancelled ones",
            "delete review R42",
            "visitors who didn't book",
        ];
        for case in cases {
            assert_eq!(classify(case), Intent::Business, "expected business: {case}");
        }
    }

    #[test]
    fn other_messages_classify_as_general() {
        for case in ["who won the match yesterday?", "what is a PS5", "hello there"] {
            assert_eq!(classify(case), Intent::General, "expected general: {case}");
        }
    }

    #[test]
    fn selector_overrides_classification() {
        let defaults = [LookupSource::News, LookupSource::Wikipedia];

        assert_eq!(
            route("booking revenue", Some(LookupSelector::Only(LookupSource::Sports)), &defaults),
            Route::Lookup(vec![LookupSource::Sports])
        );
        assert_eq!(route("booking revenue", Some(LookupSelector::Direct), &defaults), Route::Direct);
        assert_eq!(route("booking revenue", None, &defaults), Route::Business);
        assert_eq!(route("weather", None, &defaults), Route::Lookup(defaults.to_vec()));
        assert_eq!(route("weather", None, &[]), Route::Direct);
    }

    #[test]
    fn selector_parses_request_type_values() {
        assert_eq!("duck".parse::<LookupSelector>(), Ok(LookupSelector::Only(LookupSource::Web)));
        assert_eq!(
            "Wikipedia".parse::<LookupSelector>(),
            Ok(LookupSelector::Only(LookupSource::Wikipedia))
        );
        assert_eq!("gemini".parse::<LookupSelector>(), Ok(LookupSelector::Direct));
        assert!("weather".parse::<LookupSelector>().is_err());
    }
}
