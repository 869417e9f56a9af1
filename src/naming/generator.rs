//! Composing a descriptive name for each cluster.

use serde::Serialize;
use tracing::debug;

use super::boilerplate::Boilerplate;
use super::keywords::{select_terms, tfidf_terms};
use super::rake::rake_phrases;
use crate::lexicon::Lexicon;
use crate::pipeline::{lookup, CappedCluster};
use crate::remark::{Remark, RemarkId};
use crate::text::clean_category_name;

/// Longest n-gram scored by TF-IDF.
const MAX_TFIDF_NGRAM: usize = 3;
/// RAKE candidates examined before picking the best.
const RAKE_CANDIDATES: usize = 5;

/// Which extractor produced a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    Tfidf,
    Rake,
    Fallback,
}

/// A name with the keywords behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedName {
    pub name: String,
    pub keywords: Vec<String>,
    pub source: NameSource,
}

/// A capped cluster with its generated name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCluster {
    pub cluster: CappedCluster,
    pub name: String,
    pub keywords: Vec<String>,
    pub source: NameSource,
}

impl NamedCluster {
    pub fn id(&self) -> usize {
        self.cluster.id
    }

    pub fn members(&self) -> &[RemarkId] {
        &self.cluster.members
    }
}

/// Builds names from a cluster's normalized remark texts.
#[derive(Debug, Clone)]
pub struct NameGenerator<'a> {
    lexicon: &'a Lexicon,
    boilerplate: &'a Boilerplate,
    target_words: usize,
    max_phrase_words: usize,
}

impl<'a> NameGenerator<'a> {
    pub fn new(
        lexicon: &'a Lexicon,
        boilerplate: &'a Boilerplate,
        target_words: usize,
        max_phrase_words: usize,
    ) -> Self {
        Self {
            lexicon,
            boilerplate,
            target_words: target_words.max(1),
            max_phrase_words: max_phrase_words.max(1),
        }
    }

    fn rejects(&self, term: &str) -> bool {
        self.boilerplate.blocks(term) || term.split(' ').all(|w| self.lexicon.is_blocked_in_name(w))
    }

    fn finish(&self, raw: &str) -> String {
        let cleaned = clean_category_name(raw, self.lexicon);
        cleaned
            .split(' ')
            .filter(|w| !w.is_empty())
            .take(self.target_words)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Name for a set of texts, or `None` when no term survives filtering.
    ///
    /// TF-IDF terms are tried first. When they cover fewer than half of the target
    /// word count, the best RAKE phrase of two or more words is used instead.
    pub fn generate<S: AsRef<str>>(&self, texts: &[S]) -> Option<GeneratedName> {
        let scored = tfidf_terms(texts, self.lexicon, MAX_TFIDF_NGRAM);
        let picked = select_terms(&scored, self.target_words, |t| self.rejects(t));
        let keywords: Vec<String> = picked.iter().map(|t| t.to_string()).collect();
        let tfidf_name = self.finish(&picked.join(" "));
        let needed = (self.target_words / 2).max(1);
        if word_count(&tfidf_name) >= needed {
            return Some(GeneratedName {
                name: tfidf_name,
                keywords,
                source: NameSource::Tfidf,
            });
        }

        let joined = texts
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join(". ");
        let ranked: Vec<_> = rake_phrases(&joined, self.lexicon, self.max_phrase_words)
            .into_iter()
            .filter(|p| !self.boilerplate.blocks(&p.phrase))
            .collect();

        let mut best: Option<(f64, String)> = None;
        let mut examined = 0usize;
        for phrase in ranked.iter().filter(|p| p.word_count() >= 2) {
            if examined >= RAKE_CANDIDATES {
                break;
            }
            let name = self.finish(&phrase.phrase);
            if name.is_empty() {
                continue;
            }
            examined += 1;
            let better = best.as_ref().is_none_or(|(score, current)| {
                phrase.score > *score
                    || (phrase.score == *score && word_count(&name) > word_count(current))
            });
            if better {
                best = Some((phrase.score, name));
            }
        }
        let rake_name = best
            .map(|(_, name)| name)
            .or_else(|| ranked.first().map(|p| self.finish(&p.phrase)))
            .filter(|n| !n.is_empty());

        match rake_name {
            Some(name) => {
                let keywords = if keywords.is_empty() {
                    name.split(' ').map(str::to_lowercase).collect()
                } else {
                    keywords
                };
                Some(GeneratedName {
                    name,
                    keywords,
                    source: NameSource::Rake,
                })
            }
            None if !tfidf_name.is_empty() => Some(GeneratedName {
                name: tfidf_name,
                keywords,
                source: NameSource::Tfidf,
            }),
            None => None,
        }
    }

    /// Name every cluster from its members' normalized texts. `remarks` must be
    /// sorted by id.
    pub fn name_clusters(&self, clusters: Vec<CappedCluster>, remarks: &[Remark]) -> Vec<NamedCluster> {
        clusters
            .into_iter()
            .map(|cluster| {
                let texts: Vec<&str> = cluster
                    .members
                    .iter()
                    .filter_map(|&id| lookup(remarks, id))
                    .map(|r| r.normalized_text.as_str())
                    .collect();
                let generated = self.generate(&texts).unwrap_or_else(|| GeneratedName {
                    name: fallback_name(cluster.id),
                    keywords: Vec::new(),
                    source: NameSource::Fallback,
                });
                debug!(
                    cluster = cluster.id,
                    remarks = cluster.members.len(),
                    name = %generated.name,
                    source = ?generated.source,
                    "named cluster"
                );
                NamedCluster {
                    cluster,
                    name: generated.name,
                    keywords: generated.keywords,
                    source: generated.source,
                }
            })
            .collect()
    }
}

/// Generic label for a cluster whose texts produced no usable term.
pub fn fallback_name(cluster_id: usize) -> String {
    format!("Cluster {}", cluster_id + 1)
}

fn word_count(name: &str) -> usize {
    name.split_whitespace().count()
}
