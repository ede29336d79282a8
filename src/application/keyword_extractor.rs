//! Keyword extraction and niche inference
//!
//! Keywords are lower-case and limited to `[a-z0-9 ]`. Candidates are gathered
//! in a fixed order (known keywords, single words, bigrams, curated phrases
//! found anywhere in the normalized title), de-duplicated, then capped. Niche inference is ordered first-match over the
//! configured rules; the order is configuration, not a ranking.

use std::collections::HashSet;

use crate::infrastructure::config::{KeywordConfig, NicheRule};

/// Keywords and inferred niche for one title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    pub keywords: Vec<String>,
    pub niche: String,
}

pub struct KeywordExtractor {
    config: KeywordConfig,
    stopwords: HashSet<String>,
}

/// Lower-case, replace anything outside `[a-z0-9 ]` with a space, collapse runs
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl KeywordExtractor {
    pub fn new(config: KeywordConfig) -> Self {
        let stopwords = config.stopwords.iter().map(|w| normalize(w)).collect();
        Self { config, stopwords }
    }

    pub fn niche_rules(&self) -> &[NicheRule] {
        &self.config.niche_rules
    }

    fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Extract up to `max_keywords` keywords, keeping `existing` ones first
    pub fn extract(&self, title: &str, existing: &[String]) -> Vec<String> {
        let text = normalize(title);
        let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

        let known = existing.iter().map(|k| normalize(k));
        let singles = words
            .iter()
            .filter(|w| w.len() >= self.config.min_word_len && !self.is_stopword(w))
            .map(|w| (*w).to_string());
        let bigrams = words
            .windows(2)
            .filter(|pair| pair.iter().all(|w| w.len() >= self.config.min_bigram_word_len))
            .map(|pair| format!("{} {}", pair[0], pair[1]));
        let phrases = self
            .config
            .known_phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty() && text.contains(p.as_str()));

        let mut seen = HashSet::new();
        known
            .chain(singles)
            .chain(bigrams)
            .chain(phrases)
            .filter(|k| !k.is_empty())
            .filter(|k| k.contains(' ') || !self.is_stopword(k))
            .filter(|k| seen.insert(k.clone()))
            .take(self.config.max_keywords)
            .collect()
    }

    /// First rule with a pattern present in title + keywords, else the fallback niche
    pub fn infer_niche(&self, title: &str, keywords: &[String]) -> String {
        let haystack = format!(" {} {} ", normalize(title), normalize(&keywords.join(" ")));

        self.config
            .niche_rules
            .iter()
            .find(|rule| {
                rule.patterns.iter().map(|p| normalize(p)).any(|p| {
                    !p.is_empty() && haystack.contains(&format!(" {p} "))
                })
            })
            .map_or_else(|| self.config.fallback_niche.clone(), |rule| rule.niche.clone())
    }

    /// Keywords plus niche; an explicit niche is kept, an empty one is inferred
    pub fn enrich(&self, title: &str, existing: &[String], niche: &str) -> KeywordSet {
        let keywords = self.extract(title, existing);
        let niche = if niche.trim().is_empty() {
            self.infer_niche(title, &keywords)
        } else {
            niche.trim().to_lowercase()
        };
        KeywordSet { keywords, niche }
    }
}
