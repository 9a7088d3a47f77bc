//! Alert predicate port and the default term matcher.

use crate::models::{AlertMatch, Message};

/// Decides whether a message matches the operator's alert terms.
pub trait AlertMatcher: Send + Sync {
    fn evaluate(&self, message: &Message) -> AlertMatch;
}

/// Matcher for deployments without alert terms.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAlerts;

impl AlertMatcher for NoAlerts {
    fn evaluate(&self, _message: &Message) -> AlertMatch {
        AlertMatch::none()
    }
}

/// Case-insensitive term matcher.
///
/// A term matches the body as a whole word (or as a phrase when it contains
/// spaces), or equals the flight, tail or ICAO hex exactly. Any ignore term
/// present in the body suppresses the match.
#[derive(Debug, Default, Clone)]
pub struct TermAlertMatcher {
    terms: Vec<String>,
    ignore: Vec<String>,
}

impl TermAlertMatcher {
    pub fn new<I, J>(terms: I, ignore: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        Self {
            terms: normalize_terms(terms),
            ignore: normalize_terms(ignore),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl AlertMatcher for TermAlertMatcher {
    fn evaluate(&self, message: &Message) -> AlertMatch {
        if self.terms.is_empty() {
            return AlertMatch::none();
        }

        let body = message.text.as_deref().unwrap_or("").to_ascii_uppercase();
        let words: Vec<&str> = body
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let in_body = |term: &str| {
            if term.contains(' ') {
                body.contains(term)
            } else {
                words.contains(&term)
            }
        };

        if self.ignore.iter().any(|t| in_body(t.as_str())) {
            return AlertMatch::none();
        }

        let identifiers = message.identifiers();
        let matched: Vec<String> = self
            .terms
            .iter()
            .filter(|term| {
                in_body(term.as_str()) || identifiers.iter().any(|id| id.value() == term.as_str())
            })
            .cloned()
            .collect();

        AlertMatch::matched(matched)
    }
}

fn normalize_terms<I>(terms: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for term in terms {
        let term = term.as_ref().trim().to_ascii_uppercase();
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}
