//! The end-to-end categorization run.
//!
//! Stages run strictly forward, each consuming the previous stage's output:
//!
//! 1. language gate and translation
//! 2. normalization and boilerplate stripping
//! 3. embedding, in batches
//! 4. density clustering ([`DensityClusterer`])
//! 5. cluster capping ([`ClusterCapper`])
//! 6. noise reassignment ([`NoiseReassigner`])
//! 7. naming ([`NameGenerator`](crate::naming::NameGenerator))
//! 8. name merging ([`NameMerger`](crate::naming::NameMerger))
//! 9. output layout ([`OutputBuilder`])
//!
//! Configuration and input-column problems are reported before any embedding call.
//! Per-remark collaborator failures never abort a run: the remark goes to the
//! uncategorized column with its reason.

pub mod capper;
pub mod density;
pub mod noise;
pub mod output;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use capper::{CappedCluster, ClusterCapper};
pub use density::{DensityClusterer, DensityClustering, RawCluster};
pub use noise::{NoiseDecision, NoiseReassigner};
pub use output::{ColumnKind, LongRow, OutputBuilder, OutputColumn, OutputTable};

use crate::cluster::util::normalize_in_place;
use crate::config::{NameSimilarity, PipelineConfig, ShortTextPolicy};
use crate::embedding::{check_vector, CollaboratorError, Embedder};
use crate::error::{Error, Result};
use crate::language::{LanguageDetector, NoTranslation, Translator};
use crate::lexicon::Lexicon;
use crate::naming::{
    keyword_vectors, name_embeddings, Boilerplate, FinalCategory, NameGenerator, NameMerger,
    NamedCluster,
};
use crate::remark::{Assignment, InputTable, Remark, RemarkId, UncategorizedReason};
use crate::text::{collapse_whitespace, normalize, PhraseStripper};

/// Word counts of the phrases stripped before embedding.
const STRIP_NGRAMS: std::ops::RangeInclusive<usize> = 2..=5;
/// Word counts of the terms kept out of category names.
const NAME_BOILERPLATE_NGRAMS: std::ops::RangeInclusive<usize> = 1..=3;
/// Language label for remarks set aside without detection.
const UNDETECTED_LANGUAGE: &str = "Undetected";

/// Remark with id `id` in a slice sorted by id.
pub(crate) fn lookup(remarks: &[Remark], id: RemarkId) -> Option<&Remark> {
    remarks
        .binary_search_by_key(&id, |r| r.id)
        .ok()
        .map(|i| &remarks[i])
}

/// Non-fatal conditions collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Density clustering marked every embedded remark as noise.
    DegenerateClustering { remarks: usize },
    /// The name cap can never bind because it exceeds the cluster cap.
    NameLimitExceedsClusterLimit { name_limit: usize, cluster_limit: usize },
    /// Remarks lost to embedding or translation failures.
    CollaboratorFailures { count: usize },
    /// Names could not be embedded; keyword vectors were used instead.
    NameEmbeddingFallback { message: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::DegenerateClustering { remarks } => write!(
                f,
                "density clustering found no clusters among {remarks} remarks; all are uncategorized"
            ),
            PipelineWarning::NameLimitExceedsClusterLimit {
                name_limit,
                cluster_limit,
            } => write!(
                f,
                "max_name_clusters_limit ({name_limit}) exceeds max_remark_clusters_limit ({cluster_limit})"
            ),
            PipelineWarning::CollaboratorFailures { count } => {
                write!(f, "{count} remarks could not be embedded or translated")
            }
            PipelineWarning::NameEmbeddingFallback { message } => {
                write!(f, "name embedding failed ({message}); merged by keywords instead")
            }
        }
    }
}

/// Everything a run produced, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct Categorization {
    /// Remarks that were embedded, sorted by id.
    pub remarks: Vec<Remark>,
    pub density: DensityClustering,
    pub noise_decisions: Vec<NoiseDecision>,
    /// Capped clusters with final membership and their names.
    pub named_clusters: Vec<NamedCluster>,
    pub categories: Vec<FinalCategory>,
    /// Final state of every non-empty input remark.
    pub assignments: BTreeMap<RemarkId, Assignment>,
    pub table: OutputTable,
    pub warnings: Vec<PipelineWarning>,
}

impl Categorization {
    /// Final state of remark `id`; `None` for blank or out-of-range rows.
    pub fn assignment(&self, id: RemarkId) -> Option<&Assignment> {
        self.assignments.get(&id)
    }

    /// Category id of remark `id`, if it was categorized.
    pub fn category_of(&self, id: RemarkId) -> Option<usize> {
        self.assignment(id).and_then(Assignment::cluster_id)
    }

    /// Remarks outside every category, in id order, with the reason.
    pub fn uncategorized(&self) -> impl Iterator<Item = (RemarkId, &UncategorizedReason)> {
        self.assignments.iter().filter_map(|(&id, a)| match a {
            Assignment::Uncategorized { reason } => Some((id, reason)),
            _ => None,
        })
    }
}

/// A configured categorization pipeline.
///
/// ```rust
/// use remark_clusters::{HashingEmbedder, Pipeline, PipelineConfig};
///
/// let pipeline = Pipeline::new(PipelineConfig::default(), HashingEmbedder::default()).unwrap();
/// let result = pipeline
///     .run_texts(&["meter not working", "meter is not working", "bill too high"])
///     .unwrap();
/// assert_eq!(result.table.total_remarks(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline<E, T = NoTranslation> {
    config: PipelineConfig,
    embedder: E,
    translator: T,
    lexicon: Lexicon,
}

impl<E: Embedder> Pipeline<E> {
    /// Validate `config` and build a pipeline with the English lexicon and no translator.
    pub fn new(config: PipelineConfig, embedder: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            embedder,
            translator: NoTranslation,
            lexicon: Lexicon::english(),
        })
    }
}

impl<E: Embedder, T: Translator> Pipeline<E, T> {
    /// Replace the translator used for remarks detected as non-English.
    pub fn with_translator<U: Translator>(self, translator: U) -> Pipeline<E, U> {
        Pipeline {
            config: self.config,
            embedder: self.embedder,
            translator,
            lexicon: self.lexicon,
        }
    }

    /// Replace the stopwords and name blocklist used for cleaning and naming.
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Run over a list of texts, treated as the configured text column.
    pub fn run_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<Categorization> {
        let table = InputTable::single_column(
            self.config.text_column_name.clone(),
            texts.iter().map(|t| Some(t.as_ref().to_string())).collect(),
        );
        self.run(&table)
    }

    /// Categorize every non-empty cell of the configured text column.
    pub fn run(&self, table: &InputTable) -> Result<Categorization> {
        let cfg = &self.config;
        let column = table.column(&cfg.text_column_name)?;
        let rows = column.len();
        let raw_texts: BTreeMap<RemarkId, String> = column
            .into_iter()
            .enumerate()
            .filter_map(|(id, cell)| {
                cell.filter(|t| !t.trim().is_empty())
                    .map(|t| (id, t.to_string()))
            })
            .collect();
        if raw_texts.is_empty() {
            return Err(Error::EmptyInput);
        }
        info!(
            rows,
            remarks = raw_texts.len(),
            column = %cfg.text_column_name,
            "input loaded"
        );

        let mut warnings = Vec::new();
        if cfg.name_limit_exceeds_cluster_limit() {
            let w = PipelineWarning::NameLimitExceedsClusterLimit {
                name_limit: cfg.max_name_clusters_limit,
                cluster_limit: cfg.max_remark_clusters_limit,
            };
            warn!("{w}");
            warnings.push(w);
        }

        let mut uncategorized: Vec<(RemarkId, UncategorizedReason)> = Vec::new();
        let english = self.translate(&raw_texts, &mut uncategorized);
        let cleaned = self.clean(english);
        let remarks = self.embed(cleaned, &raw_texts, &mut uncategorized);

        let failures = uncategorized
            .iter()
            .filter(|(_, r)| {
                matches!(
                    r,
                    UncategorizedReason::EmbeddingFailed { .. }
                        | UncategorizedReason::TranslationFailed { .. }
                )
            })
            .count();
        if failures > 0 {
            let w = PipelineWarning::CollaboratorFailures { count: failures };
            warn!("{w}");
            warnings.push(w);
        }

        let density = if remarks.is_empty() {
            DensityClustering::default()
        } else {
            DensityClusterer::from_config(cfg).cluster(&remarks)?
        };
        if density.is_degenerate() && !remarks.is_empty() {
            let w = PipelineWarning::DegenerateClustering {
                remarks: remarks.len(),
            };
            warn!("{w}");
            warnings.push(w);
        }

        let capped = ClusterCapper::from_config(cfg).cap(&density.clusters, &remarks)?;
        let noise_decisions =
            NoiseReassigner::from_config(cfg).reassign(&density.noise, &capped, &remarks);
        for d in &noise_decisions {
            if let Assignment::Uncategorized { reason } = &d.assignment {
                uncategorized.push((d.remark_id, reason.clone()));
            }
        }
        let capped = noise::apply(capped, &noise_decisions);

        let naming_texts: Vec<&str> = remarks.iter().map(|r| r.normalized_text.as_str()).collect();
        let name_boilerplate = Boilerplate::detect(
            &naming_texts,
            cfg.embedding_boilerplate_min_df,
            NAME_BOILERPLATE_NGRAMS,
            &self.lexicon,
        );
        debug!(terms = name_boilerplate.len(), "naming boilerplate detected");
        let generator = NameGenerator::new(
            &self.lexicon,
            &name_boilerplate,
            cfg.target_column_name_words,
            cfg.naming.max_phrase_words,
        );
        let named_clusters = generator.name_clusters(capped, &remarks);

        let merger = NameMerger::from_config(cfg);
        let vectors = if merger.needs_merge(named_clusters.len()) {
            self.name_vectors(&named_clusters, &mut warnings)
        } else {
            Vec::new()
        };
        let mut categories = merger.merge(&named_clusters, &vectors)?;
        if cfg.naming.rename_merged_categories {
            for cat in categories.iter_mut().filter(|c| c.is_merged()) {
                let texts: Vec<&str> = cat
                    .members
                    .iter()
                    .filter_map(|&id| lookup(&remarks, id))
                    .map(|r| r.normalized_text.as_str())
                    .collect();
                if let Some(generated) = generator.generate(&texts) {
                    debug!(category = cat.id, from = %cat.name, to = %generated.name, "renamed merged category");
                    cat.name = generated.name;
                }
            }
        }

        let mut assignments = BTreeMap::new();
        for cat in &categories {
            for &id in &cat.members {
                assignments.insert(id, Assignment::clustered(cat.id));
            }
        }
        for (id, reason) in &uncategorized {
            assignments.insert(*id, Assignment::uncategorized(reason.clone()));
        }

        let table = OutputBuilder::new(&cfg.output).build(&categories, &uncategorized, &raw_texts);
        info!(
            remarks = raw_texts.len(),
            categories = categories.len(),
            uncategorized = uncategorized.len(),
            warnings = warnings.len(),
            "categorization complete"
        );

        Ok(Categorization {
            remarks,
            density,
            noise_decisions,
            named_clusters,
            categories,
            assignments,
            table,
            warnings,
        })
    }

    /// English text per remark; remarks that cannot be made English are set aside.
    fn translate(
        &self,
        raw_texts: &BTreeMap<RemarkId, String>,
        uncategorized: &mut Vec<(RemarkId, UncategorizedReason)>,
    ) -> Vec<(RemarkId, String)> {
        if !self.config.language.detect {
            return raw_texts.iter().map(|(&id, t)| (id, t.clone())).collect();
        }
        let detector = LanguageDetector::new(self.config.language.min_text_for_detection);
        let mut out = Vec::with_capacity(raw_texts.len());
        let mut other = 0usize;
        let set_aside_short = self.config.language.short_text_policy == ShortTextPolicy::OtherLanguage;
        for (&id, text) in raw_texts {
            let collapsed = collapse_whitespace(text);
            if set_aside_short && detector.is_undetectable(&collapsed) {
                other += 1;
                uncategorized.push((
                    id,
                    UncategorizedReason::OtherLanguage {
                        language: UNDETECTED_LANGUAGE.to_string(),
                    },
                ));
                continue;
            }
            let Some(language) = detector.detect(&collapsed) else {
                out.push((id, text.clone()));
                continue;
            };
            match self.translator.translate(text, language) {
                Ok(translated) if !translated.trim().is_empty() => out.push((id, translated)),
                Ok(_) => {
                    warn!(remark = id, language = language.name, "translation returned empty text");
                    uncategorized.push((
                        id,
                        UncategorizedReason::TranslationFailed {
                            message: "empty translation".to_string(),
                        },
                    ));
                }
                Err(CollaboratorError::Unsupported { .. }) => {
                    other += 1;
                    uncategorized.push((
                        id,
                        UncategorizedReason::OtherLanguage {
                            language: language.name.to_string(),
                        },
                    ));
                }
                Err(err) => {
                    warn!(remark = id, language = language.name, error = %err, "translation failed");
                    uncategorized.push((
                        id,
                        UncategorizedReason::TranslationFailed {
                            message: err.to_string(),
                        },
                    ));
                }
            }
        }
        info!(english = out.len(), other_language = other, "language gate complete");
        out
    }

    /// Normalize and, when enabled, strip corpus-wide boilerplate phrases.
    fn clean(&self, texts: Vec<(RemarkId, String)>) -> Vec<(RemarkId, String)> {
        let normalized: Vec<(RemarkId, String)> =
            texts.into_iter().map(|(id, t)| (id, normalize(&t))).collect();
        if !self.config.embedding.strip_boilerplate || normalized.len() < 2 {
            return normalized;
        }
        let docs: Vec<&str> = normalized.iter().map(|(_, t)| t.as_str()).collect();
        let boilerplate = Boilerplate::detect(
            &docs,
            self.config.embedding_boilerplate_min_df,
            STRIP_NGRAMS,
            &self.lexicon,
        );
        if boilerplate.is_empty() {
            return normalized;
        }
        let phrases: Vec<&str> = boilerplate.terms().collect();
        let stripper = match PhraseStripper::new(&phrases) {
            Ok(s) => s,
            Err(err) => {
                warn!(phrases = phrases.len(), error = %err, "boilerplate pattern rejected; keeping texts as-is");
                return normalized;
            }
        };
        info!(phrases = boilerplate.len(), "stripping boilerplate phrases");
        normalized
            .into_iter()
            .map(|(id, text)| {
                let stripped = stripper.strip(&text);
                if stripped.is_empty() {
                    (id, text)
                } else {
                    (id, stripped)
                }
            })
            .collect()
    }

    /// Embed in batches. Failed or malformed vectors send the remark to uncategorized.
    fn embed(
        &self,
        texts: Vec<(RemarkId, String)>,
        raw_texts: &BTreeMap<RemarkId, String>,
        uncategorized: &mut Vec<(RemarkId, UncategorizedReason)>,
    ) -> Vec<Remark> {
        let dimension = self.embedder.dimension();
        let mut remarks = Vec::with_capacity(texts.len());
        let mut batches = 0usize;
        for chunk in texts.chunks(self.config.embedding.batch_size) {
            batches += 1;
            let batch: Vec<&str> = chunk.iter().map(|(_, t)| t.as_str()).collect();
            let mut results = self.embedder.embed_batch(&batch);
            if results.len() != chunk.len() {
                warn!(expected = chunk.len(), got = results.len(), "embedder batch size mismatch");
            }
            results.resize_with(chunk.len(), || {
                Err(CollaboratorError::failed("no vector returned for this text"))
            });
            for ((id, text), result) in chunk.iter().zip(results) {
                match result.and_then(|v| check_vector(&v, dimension).map(|()| v)) {
                    Ok(mut embedding) => {
                        if self.config.clustering.normalize_embeddings {
                            normalize_in_place(&mut embedding);
                        }
                        remarks.push(Remark {
                            id: *id,
                            raw_text: raw_texts.get(id).cloned().unwrap_or_default(),
                            normalized_text: text.clone(),
                            embedding,
                        });
                    }
                    Err(err) => {
                        warn!(remark = *id, error = %err, "embedding failed");
                        uncategorized.push((
                            *id,
                            UncategorizedReason::EmbeddingFailed {
                                message: err.to_string(),
                            },
                        ));
                    }
                }
            }
        }
        info!(embedded = remarks.len(), batches, dimension, "embedding complete");
        remarks
    }

    fn name_vectors(&self, named: &[NamedCluster], warnings: &mut Vec<PipelineWarning>) -> Vec<Vec<f32>> {
        match self.config.naming.name_similarity {
            NameSimilarity::Keywords => keyword_vectors(named),
            NameSimilarity::Embedding => match name_embeddings(named, &self.embedder) {
                Ok(vectors) => vectors,
                Err(err) => {
                    let w = PipelineWarning::NameEmbeddingFallback {
                        message: err.to_string(),
                    };
                    warn!("{w}");
                    warnings.push(w);
                    keyword_vectors(named)
                }
            },
        }
    }
}
