//! Scanner for the imperative directives a reply may carry.
//!
//! Replies are free text, so the scanner walks a cleaned token stream rather than matching
//! the raw string. Each kind is recognised at most once (its first occurrence) and results
//! come back in a fixed priority order regardless of where they appear in the text.

use serde::Serialize;

use rentdesk_core::{BookingId, ReviewId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    ChangeBookingStatus { booking_id: BookingId, requested_status: String },
    DeleteReview { review_id: ReviewId },
    TagBargainer { phone: String },
    VisitorReport,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    StatusChange,
    DeleteReview,
    TagBargainer,
    VisitorReport,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChange => "status_change",
            Self::DeleteReview => "delete_review",
            Self::TagBargainer => "tag_bargainer",
            Self::VisitorReport => "visitor_report",
        }
    }
}

impl Directive {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::ChangeBookingStatus { .. } => DirectiveKind::StatusChange,
            Self::DeleteReview { .. } => DirectiveKind::DeleteReview,
            Self::TagBargainer { .. } => DirectiveKind::TagBargainer,
            Self::VisitorReport => DirectiveKind::VisitorReport,
        }
    }
}

const VISITOR_PHRASES: [&str; 3] =
    ["visitors who didn't book", "visitors who did not book", "visitors who didnt book"];

pub fn parse_directives(reply: &str) -> Vec<Directive> {
    let tokens = tokenize(reply);
    let mut directives = Vec::new();

    if let Some(directive) = find_status_change(&tokens) {
        directives.push(directive);
    }
    if let Some(directive) = find_review_deletion(&tokens) {
        directives.push(directive);
    }
    if let Some(directive) = find_bargainer_tag(&tokens) {
        directives.push(directive);
    }
    if mentions_unbooked_visitors(&tokens) {
        directives.push(Directive::VisitorReport);
    }

    directives
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Token {
    raw: String,
    lower: String,
}

impl Token {
    fn is(&self, word: &str) -> bool {
        self.lower == word
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .map(clean_token)
        .filter(|raw| !raw.is_empty())
        .map(|raw| Token { lower: raw.to_lowercase(), raw })
        .collect()
}

/// Strips markdown and quoting around a word, plus trailing sentence punctuation.
fn clean_token(word: &str) -> String {
    let normalized = word.replace(['\u{2018}', '\u{2019}'], "'");
    let wrapped = |c: char| {
        matches!(c, '"' | '\'' | '`' | '*' | '_' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>')
            || c == '\u{201C}'
            || c == '\u{201D}'
    };
    normalized
        .trim_matches(|c: char| wrapped(c) || matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
        .to_string()
}

/// Reads a record id at `index`, skipping an optional `id` label. Returns the id and the
/// index just past it.
fn record_id(tokens: &[Token], index: usize) -> Option<(String, usize)> {
    let first = tokens.get(index)?;
    let (token, next) = if first.is("id") && tokens.len() > index + 1 {
        (tokens.get(index + 1)?, index + 2)
    } else {
        (first, index + 1)
    };
    let id = token.raw.trim_start_matches('#');
    (!id.is_empty()).then(|| (id.to_string(), next))
}

// change booking <ID> status to <status>
fn find_status_change(tokens: &[Token]) -> Option<Directive> {
    (0..tokens.len()).find_map(|start| {
        if !(tokens[start].is("change") && tokens.get(start + 1)?.is("booking")) {
            return None;
        }
        let (booking_id, next) = record_id(tokens, start + 2)?;
        if !(tokens.get(next)?.is("status") && tokens.get(next + 1)?.is("to")) {
            return None;
        }
        let requested_status = tokens.get(next + 2)?.raw.clone();
        Some(Directive::ChangeBookingStatus { booking_id: BookingId(booking_id), requested_status })
    })
}

// delete review <ID>
fn find_review_deletion(tokens: &[Token]) -> Option<Directive> {
    (0..tokens.len()).find_map(|start| {
        if !(tokens[start].is("delete") && tokens.get(start + 1)?.is("review")) {
            return None;
        }
        let (review_id, _) = record_id(tokens, start + 2)?;
        Some(Directive::DeleteReview { review_id: ReviewId(review_id) })
    })
}

// tag customer <phone> as bargainer
fn find_bargainer_tag(tokens: &[Token]) -> Option<Directive> {
    tokens.windows(5).find_map(|window| {
        let [tag, customer, phone, as_word, bargainer] = window else {
            return None;
        };
        let matches = tag.is("tag")
            && customer.is("customer")
            && as_word.is("as")
            && bargainer.is("bargainer")
            && is_phone(&phone.raw);
        matches.then(|| Directive::TagBargainer { phone: phone.raw.clone() })
    })
}

fn is_phone(candidate: &str) -> bool {
    let digits = candidate.strip_prefix('+').unwrap_or(candidate);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn mentions_unbooked_visitors(tokens: &[Token]) -> bool {
    let normalized = tokens.iter().map(|token| token.lower.as_str()).collect::<Vec<_>>().join(" ");
    VISITOR_PHRASES.iter().any(|phrase| normalized.contains(phrase))
}
