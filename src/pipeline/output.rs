//! Building the wide output table.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::config::OutputOptions;
use crate::naming::FinalCategory;
use crate::remark::{RemarkId, UncategorizedReason};
use crate::text::column_base_name;

/// What a column holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Category { category_id: usize },
    Uncategorized,
    OtherLanguage,
}

/// One output column with its remarks in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputColumn {
    pub name: String,
    pub kind: ColumnKind,
    pub remark_ids: Vec<RemarkId>,
    /// Raw remark texts, aligned with `remark_ids`.
    pub texts: Vec<String>,
}

impl OutputColumn {
    pub fn len(&self) -> usize {
        self.remark_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remark_ids.is_empty()
    }
}

/// One remark and the column it landed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongRow {
    pub remark_id: RemarkId,
    pub text: String,
    pub column: String,
}

/// Category columns first (by category id), then the uncategorized column, then
/// the other-language column when it has remarks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputTable {
    pub columns: Vec<OutputColumn>,
}

impl OutputTable {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of category (non-uncategorized, non-other-language) columns.
    pub fn category_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| matches!(c.kind, ColumnKind::Category { .. }))
            .count()
    }

    /// Length of the longest column.
    pub fn height(&self) -> usize {
        self.columns.iter().map(OutputColumn::len).max().unwrap_or(0)
    }

    pub fn total_remarks(&self) -> usize {
        self.columns.iter().map(OutputColumn::len).sum()
    }

    /// Row-major wide view; shorter columns are padded with `None`.
    pub fn wide_rows(&self) -> Vec<Vec<Option<&str>>> {
        (0..self.height())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.texts.get(row).map(String::as_str))
                    .collect()
            })
            .collect()
    }

    /// One row per remark, ordered by remark id.
    pub fn long_rows(&self) -> Vec<LongRow> {
        let mut rows: Vec<LongRow> = self
            .columns
            .iter()
            .flat_map(|c| {
                c.remark_ids.iter().zip(&c.texts).map(|(&remark_id, text)| LongRow {
                    remark_id,
                    text: text.clone(),
                    column: c.name.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|r| r.remark_id);
        rows
    }
}

/// Suffix for the `attempt`-th collision: `A`..`Z`, then `A1`..`Z1`, `A2`, ...
fn collision_suffix(attempt: usize) -> String {
    let letter = |i: usize| char::from(b'A' + (i % 26) as u8);
    if attempt < 26 {
        letter(attempt).to_string()
    } else {
        let k = attempt - 26;
        format!("{}{}", letter(k), k / 26 + 1)
    }
}

/// Make `name` unique against `used` (case-insensitive) and record it.
pub fn unique_column_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = column_base_name(name);
    let mut candidate = base.clone();
    let mut attempt = 0usize;
    while used.contains(&candidate.to_lowercase()) {
        candidate = format!("{base} {}", collision_suffix(attempt));
        attempt += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

/// Lays out final categories and set-aside remarks as named output columns.
pub struct OutputBuilder<'a> {
    options: &'a OutputOptions,
}

impl<'a> OutputBuilder<'a> {
    pub fn new(options: &'a OutputOptions) -> Self {
        Self { options }
    }

    fn goes_to_other_language(&self, reason: &UncategorizedReason) -> bool {
        self.options.separate_other_language
            && matches!(reason, UncategorizedReason::OtherLanguage { .. })
    }

    /// Lay out `categories` and `uncategorized` remarks. `raw_texts` holds every
    /// remark's input text.
    pub fn build(
        &self,
        categories: &[FinalCategory],
        uncategorized: &[(RemarkId, UncategorizedReason)],
        raw_texts: &BTreeMap<RemarkId, String>,
    ) -> OutputTable {
        let text_of = |id: RemarkId| raw_texts.get(&id).cloned().unwrap_or_default();
        let column = |name: String, kind: ColumnKind, mut ids: Vec<RemarkId>| {
            ids.sort_unstable();
            let texts = ids.iter().map(|&id| text_of(id)).collect();
            OutputColumn {
                name,
                kind,
                remark_ids: ids,
                texts,
            }
        };

        let mut used: HashSet<String> = [
            &self.options.uncategorized_column_name,
            &self.options.other_language_column_name,
        ]
        .iter()
        .map(|n| n.to_lowercase())
        .collect();

        let mut columns: Vec<OutputColumn> = categories
            .iter()
            .map(|cat| {
                column(
                    unique_column_name(&cat.name, &mut used),
                    ColumnKind::Category {
                        category_id: cat.id,
                    },
                    cat.members.clone(),
                )
            })
            .collect();

        let (other, rest): (Vec<_>, Vec<_>) = uncategorized
            .iter()
            .partition(|(_, reason)| self.goes_to_other_language(reason));
        columns.push(column(
            self.options.uncategorized_column_name.clone(),
            ColumnKind::Uncategorized,
            rest.iter().map(|(id, _)| *id).collect(),
        ));
        if !other.is_empty() {
            columns.push(column(
                self.options.other_language_column_name.clone(),
                ColumnKind::OtherLanguage,
                other.iter().map(|(id, _)| *id).collect(),
            ));
        }
        OutputTable { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(n: usize) -> BTreeMap<RemarkId, String> {
        (0..n).map(|i| (i, format!("remark {i}"))).collect()
    }

    fn category(id: usize, name: &str, members: &[RemarkId]) -> FinalCategory {
        FinalCategory {
            id,
            name: name.to_string(),
            named_cluster_ids: vec![id],
            members: members.to_vec(),
        }
    }

    #[test]
    fn suffixes_follow_letters_then_numbers() {
        assert_eq!(collision_suffix(0), "A");
        assert_eq!(collision_suffix(25), "Z");
        assert_eq!(collision_suffix(26), "A1");
        assert_eq!(collision_suffix(27), "B1");
        assert_eq!(collision_suffix(52), "A2");
    }

    #[test]
    fn colliding_names_are_suffixed_case_insensitively() {
        let mut used = HashSet::new();
        assert_eq!(unique_column_name("Meter Fault", &mut used), "Meter Fault");
        assert_eq!(unique_column_name("meter fault", &mut used), "meter fault A");
        assert_eq!(unique_column_name("Meter  Fault!", &mut used), "Meter Fault B");
        assert_eq!(unique_column_name("", &mut used), "Generic Category");
    }

    #[test]
    fn wide_table_pads_and_covers_every_remark() {
        let options = OutputOptions::default();
        let table = OutputBuilder::new(&options).build(
            &[category(0, "Billing", &[3, 0, 1]), category(1, "Uncategorized", &[2])],
            &[
                (4, UncategorizedReason::Noise),
                (
                    5,
                    UncategorizedReason::OtherLanguage {
                        language: "Spanish".into(),
                    },
                ),
            ],
            &texts(6),
        );
        assert_eq!(
            table.headers(),
            vec!["Billing", "Uncategorized A", "Uncategorized", "Other Language Remarks"]
        );
        assert_eq!(table.columns[0].remark_ids, vec![0, 1, 3]);
        assert_eq!(table.total_remarks(), 6);
        assert_eq!(table.category_count(), 2);
        let rows = table.wide_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Some("remark 0"));
        assert_eq!(rows[1][1], None);
        let long = table.long_rows();
        assert_eq!(long.len(), 6);
        assert_eq!(long[5].column, "Other Language Remarks");
    }

    #[test]
    fn uncategorized_column_is_always_present() {
        let options = OutputOptions::default();
        let table = OutputBuilder::new(&options).build(&[category(0, "A", &[0])], &[], &texts(1));
        assert_eq!(table.headers(), vec!["A", "Uncategorized"]);
        assert!(table.column("Uncategorized").unwrap().is_empty());
    }

    #[test]
    fn other_language_can_share_the_uncategorized_column() {
        let options = OutputOptions {
            separate_other_language: false,
            ..OutputOptions::default()
        };
        let table = OutputBuilder::new(&options).build(
            &[],
            &[(
                0,
                UncategorizedReason::OtherLanguage {
                    language: "French".into(),
                },
            )],
            &texts(1),
        );
        assert_eq!(table.headers(), vec!["Uncategorized"]);
        assert_eq!(table.columns[0].remark_ids, vec![0]);
    }
}
