//! Case records consumed from the ingestion pipeline
//!
//! Records arrive already normalised by the upstream pipeline. This module
//! validates them, and can load them from JSON exports on disk.

use crate::legal;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Malformed input. Never fatal: the record is skipped and reported.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IngestionError {
    #[error("record #{index} has no case id")]
    MissingId { index: usize },
}

pub type IngestionResult<T> = Result<T, IngestionError>;

/// Errors while reading case files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A precomputed similar-case pair supplied with a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    #[serde(alias = "decision_id")]
    pub case_id: String,
    pub similarity: f64,
}

/// One normalised court decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(alias = "decision_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "full_summary")]
    pub summary: String,
    #[serde(default)]
    pub judges: Vec<String>,
    #[serde(default)]
    pub case_type: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub articles: Vec<String>,
    /// Statute sections grouped by law; each becomes a `"<law> <section>"` article.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub related_sections: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default, alias = "similar_cases")]
    pub precomputed_similar_cases: Vec<SimilarCase>,
}

impl CaseRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_case_type(mut self, case_type: impl Into<String>) -> Self {
        self.case_type = case_type.into();
        self
    }

    pub fn with_judge(mut self, judge: impl Into<String>) -> Self {
        self.judges.push(judge.into());
        self
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concepts.push(concept.into());
        self
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        self.articles.push(article.into());
        self
    }

    pub fn with_similar(mut self, case_id: impl Into<String>, similarity: f64) -> Self {
        self.precomputed_similar_cases.push(SimilarCase {
            case_id: case_id.into(),
            similarity,
        });
        self
    }

    /// Normalised case id, or an error when the record has none.
    pub fn validate(&self, index: usize) -> IngestionResult<String> {
        let id = legal::normalize_case_number(&self.id);
        if id.is_empty() || self.id.trim() == legal::UNSPECIFIED_CASE_TYPE {
            return Err(IngestionError::MissingId { index });
        }
        Ok(id)
    }

    /// Case type with the "unspecified" marker treated as empty.
    pub fn effective_case_type(&self) -> Option<String> {
        let label = legal::normalize_label(&self.case_type);
        if label.is_empty() || label == legal::UNSPECIFIED_CASE_TYPE {
            None
        } else {
            Some(label)
        }
    }

    /// Year from the record, falling back to the case-number suffix.
    pub fn effective_year(&self) -> Option<i32> {
        self.year.or_else(|| legal::case_year(&self.id))
    }

    pub fn with_section(mut self, law: impl Into<String>, section: impl Into<String>) -> Self {
        self.related_sections.entry(law.into()).or_default().push(section.into());
        self
    }

    /// `articles` followed by every `related_sections` entry as `"<law> <section>"`.
    pub fn article_labels(&self) -> Vec<String> {
        let sections = self.related_sections.iter().flat_map(|(law, sections)| {
            sections
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(move |section| format!("{} {}", law.trim(), section.trim()))
        });
        self.articles.iter().cloned().chain(sections).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Many(Vec<CaseRecord>),
    One(Box<CaseRecord>),
}

/// Load case records from a JSON file, or from every `*.json` file in a folder.
///
/// Each file holds a single record or an array. Files that fail to parse are
/// logged and skipped when loading a folder; a single explicit file must parse.
pub fn load_cases_from_path(path: impl AsRef<Path>) -> Result<Vec<CaseRecord>, LoadError> {
    let path = path.as_ref();
    if path.is_file() {
        return read_case_file(path);
    }

    let mut files: Vec<_> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut cases = Vec::new();
    for file in files {
        match read_case_file(&file) {
            Ok(mut records) => {
                debug!("Loaded {} records from {:?}", records.len(), file);
                cases.append(&mut records);
            }
            Err(e) => warn!("Skipping case file {:?}: {}", file, e),
        }
    }
    Ok(cases)
}

fn read_case_file(path: &Path) -> Result<Vec<CaseRecord>, LoadError> {
    let raw = std::fs::read_to_string(path)?;
    let parsed: RecordFile = serde_json::from_str(&raw).map_err(|source| LoadError::Json {
        path: path.display().to_string(),
        source,
    })?;

    Ok(match parsed {
        RecordFile::Many(records) => records,
        RecordFile::One(record) => vec![*record],
    })
}
