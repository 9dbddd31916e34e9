//! Skill and qualification extraction.
//!
//! Extraction is an optional enrichment: its output is attached to ranked
//! candidates but never feeds into the similarity score.

use std::{collections::HashMap, path::Path};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The two entity categories kept from a NER model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityLabel {
    Skill,
    Qualification,
}

impl EntityLabel {
    /// Map a raw model label onto a kept category. Any other label is
    /// dropped.
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label {
            "SKILL" => Some(Self::Skill),
            "QUALIFICATION" => Some(Self::Qualification),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: EntityLabel,
}

/// Extracts labelled spans from resume text.
///
/// Implementations must be side-effect free. Spans are returned in
/// document order and are not deduplicated.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Keep the SKILL and QUALIFICATION spans of a generic `(text, label)` NER
/// output, preserving order.
pub fn filter_model_spans<I, S, L>(raw: I) -> Vec<EntitySpan>
where
    I: IntoIterator<Item = (S, L)>,
    S: Into<String>,
    L: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|(text, label)| {
            EntityLabel::from_model_label(label.as_ref()).map(|label| {
                EntitySpan {
                    text: text.into(),
                    label,
                }
            })
        })
        .collect()
}

/// Skills and qualifications of one candidate, split by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub skills: Vec<String>,
    pub qualifications: Vec<String>,
}

impl EntitySummary {
    pub fn from_spans(spans: &[EntitySpan]) -> Self {
        let mut summary = Self::default();
        for span in spans {
            match span.label {
                EntityLabel::Skill => summary.skills.push(span.text.clone()),
                EntityLabel::Qualification => {
                    summary.qualifications.push(span.text.clone())
                }
            }
        }
        summary
    }
}

/// Term lists for the dictionary extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gazetteer {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
}

const DEFAULT_SKILLS: &[&str] = &[
    "Python",
    "Django",
    "Flask",
    "FastAPI",
    "Rust",
    "Go",
    "Java",
    "JavaScript",
    "TypeScript",
    "C++",
    "C#",
    "SQL",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Redis",
    "Docker",
    "Kubernetes",
    "AWS",
    "Azure",
    "GCP",
    "Linux",
    "Git",
    "React",
    "Node.js",
    "REST",
    "GraphQL",
    "Machine Learning",
    "Deep Learning",
    "Data Analysis",
    "Project Management",
];

const DEFAULT_QUALIFICATIONS: &[&str] = &[
    "PhD",
    "Ph.D.",
    "MBA",
    "Master's degree",
    "Bachelor's degree",
    "Master of Science",
    "Bachelor of Science",
    "BSc",
    "MSc",
    "B.Sc.",
    "M.Sc.",
    "PMP",
    "CPA",
    "AWS Certified",
    "Certified Kubernetes Administrator",
];

impl Default for Gazetteer {
    fn default() -> Self {
        Self {
            skills: DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect(),
            qualifications: DEFAULT_QUALIFICATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Gazetteer {
    /// Load term lists from a JSON file of the form
    /// `{"skills": [...], "qualifications": [...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Dictionary-based extractor: case-insensitive whole-term matches against
/// a [`Gazetteer`].
pub struct GazetteerExtractor {
    pattern: Option<Regex>,
    labels: HashMap<String, EntityLabel>,
}

impl Default for GazetteerExtractor {
    fn default() -> Self {
        // The built-in term list always compiles.
        Self::new(&Gazetteer::default()).unwrap_or(Self {
            pattern: None,
            labels: HashMap::new(),
        })
    }
}

impl GazetteerExtractor {
    pub fn new(gazetteer: &Gazetteer) -> Result<Self> {
        let mut labels = HashMap::new();
        let entries = gazetteer
            .skills
            .iter()
            .map(|t| (t, EntityLabel::Skill))
            .chain(
                gazetteer
                    .qualifications
                    .iter()
                    .map(|t| (t, EntityLabel::Qualification)),
            );
        for (term, label) in entries {
            let term = term.trim();
            if !term.is_empty() {
                labels.entry(term.to_lowercase()).or_insert(label);
            }
        }

        if labels.is_empty() {
            return Ok(Self {
                pattern: None,
                labels,
            });
        }

        // Longest first, so "JavaScript" wins over "Java" in the alternation.
        let mut terms: Vec<&String> = labels.keys().collect();
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&format!("(?:{alternation})"))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                Error::Config(format!("invalid gazetteer term list: {e}"))
            })?;

        Ok(Self {
            pattern: Some(pattern),
            labels,
        })
    }

    pub fn term_count(&self) -> usize {
        self.labels.len()
    }
}

impl EntityExtractor for GazetteerExtractor {
    fn extract(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let Some(pattern) = &self.pattern else {
            return Ok(Vec::new());
        };

        let spans = pattern
            .find_iter(text)
            .filter(|m| is_term_boundary(text, m.start(), m.end()))
            .filter_map(|m| {
                let matched = m.as_str();
                self.labels.get(&matched.to_lowercase()).map(|&label| {
                    EntitySpan {
                        text: matched.to_string(),
                        label,
                    }
                })
            })
            .collect();
        Ok(spans)
    }
}

fn is_term_boundary(text: &str, start: usize, end: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}
