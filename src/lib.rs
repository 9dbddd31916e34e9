//! resumerank - rank candidate resumes against a job description.
//!
//! Resumes (`.docx`) are read into plain text, embedded into fixed-length
//! vectors, compared with the job description by cosine similarity, and
//! returned best first. Unreadable resumes are skipped and reported rather
//! than silently scored as zero.
//!
//! # Quick start
//!
//! ```no_run
//! use std::{path::PathBuf, sync::Arc};
//!
//! use resumerank::{ModelManager, RankingConfig, RankingPipeline, RankingRequest};
//!
//! let pipeline = RankingPipeline::new(
//!     Arc::new(ModelManager::new()),
//!     RankingConfig::default(),
//! )
//! .unwrap();
//!
//! let request = RankingRequest {
//!     job_description: "Python developer with Django experience".to_string(),
//!     uploads: Vec::new(),
//!     folder: Some(PathBuf::from("resumes")),
//! };
//!
//! let outcome = pipeline.rank(&request).unwrap();
//! for r in &outcome.ranked {
//!     println!("{}. {} (score: {:.3})", r.rank, r.candidate.name, r.score);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod entities;
pub mod error;
pub mod mcp;
pub mod model_manager;
pub mod pipeline;
pub mod report;
pub mod similarity;
pub mod staging;
pub mod walker;

pub use config::RankingConfig;
pub use document::DocumentSource;
pub use embedding::{Embedding, EmbeddingProvider};
pub use entities::{EntityExtractor, EntityLabel, EntitySpan, GazetteerExtractor};
pub use error::{Error, Result};
pub use model_manager::ModelManager;
pub use pipeline::{RankingOutcome, RankingPipeline, RankingRequest};
