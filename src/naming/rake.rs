//! RAKE phrase extraction.
//!
//! Candidate phrases are maximal runs of non-stopword words inside a sentence
//! fragment. Each word is scored by degree over frequency and a phrase scores the
//! sum of its words. Scoring is done by `keyword_extraction`, fed with the run's
//! lexicon; this module bounds phrase length and fixes the ranking order.

use std::cmp::Ordering;

use keyword_extraction::rake::{Rake, RakeParams};

use crate::lexicon::Lexicon;

/// A candidate phrase and its RAKE score.
#[derive(Debug, Clone, PartialEq)]
pub struct RakePhrase {
    pub phrase: String,
    pub score: f64,
}

impl RakePhrase {
    pub fn word_count(&self) -> usize {
        self.phrase.split_whitespace().count()
    }
}

/// Ranked distinct phrases of at most `max_words` words found in `text`.
///
/// Ordered by descending score, then by phrase.
pub fn rake_phrases(text: &str, lexicon: &Lexicon, max_words: usize) -> Vec<RakePhrase> {
    let words = text.split_whitespace().count();
    if words == 0 || max_words == 0 {
        return Vec::new();
    }
    let stopwords = lexicon.stopword_list();
    let rake = Rake::new(RakeParams::WithDefaultsAndPhraseLength(
        text,
        &stopwords,
        Some(max_words),
    ));

    let mut ranked: Vec<RakePhrase> = rake
        .get_ranked_phrases_scores(words)
        .into_iter()
        .filter(|(phrase, score)| !phrase.trim().is_empty() && score.is_finite())
        .map(|(phrase, score)| RakePhrase {
            phrase: phrase.split_whitespace().collect::<Vec<_>>().join(" "),
            score: f64::from(score),
        })
        .filter(|p| p.word_count() <= max_words)
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.phrase.cmp(&b.phrase))
    });
    ranked.dedup_by(|a, b| a.phrase == b.phrase);
    ranked
}
