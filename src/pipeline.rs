//! Resume ranking: ingestion, scoring and top-K selection.
//!
//! A request moves through `Idle → Ingesting → Scoring → Ranked → Done`.
//! Only a request without any candidate source ends in `Failed`; a bad
//! resume is recorded as a skip and the batch carries on.

use std::{fmt, path::PathBuf, sync::Arc};

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    config::RankingConfig,
    document::{DocumentSource, read_document_within},
    embedding::{Embedding, EmbeddingProvider, embed_isolated, ensure_non_empty},
    entities::{EntityExtractor, EntitySpan},
    error::{Error, Result},
    similarity::Reference,
    walker,
};

/// One ranking request as submitted by the user.
#[derive(Debug, Clone, Default)]
pub struct RankingRequest {
    pub job_description: String,
    /// Uploaded resumes. Takes precedence over `folder` when non-empty.
    pub uploads: Vec<DocumentSource>,
    /// Folder scanned for `.docx` resumes.
    pub folder: Option<PathBuf>,
}

/// The resolved origin of a request's candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum CandidateOrigin {
    Uploads,
    Folder(PathBuf),
}

impl RankingRequest {
    /// Pick the candidate source: uploads first, then the folder.
    pub fn origin(&self) -> Result<CandidateOrigin> {
        if !self.uploads.is_empty() {
            if self.folder.is_some() {
                tracing::info!("uploads supplied, ignoring folder path");
            }
            return Ok(CandidateOrigin::Uploads);
        }
        match &self.folder {
            Some(folder) if !folder.as_os_str().is_empty() => {
                Ok(CandidateOrigin::Folder(folder.clone()))
            }
            _ => Err(Error::NoCandidateSource),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Ingesting,
    Scoring,
    Ranked,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Ingesting => "ingesting",
            Self::Scoring => "scoring",
            Self::Ranked => "ranked",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl PipelineState {
    fn can_advance_to(self, next: Self) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Ingesting)
                | (Idle, Failed)
                | (Ingesting, Scoring)
                | (Ingesting, Done)
                | (Ingesting, Failed)
                | (Scoring, Ranked)
                | (Scoring, Failed)
                | (Ranked, Done)
        )
    }
}

/// A resume that made it through ingestion.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub resume_text: String,
    /// Set exactly once, during scoring.
    pub similarity_score: Option<f64>,
}

/// A ranked candidate.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub candidate: Candidate,
    pub score: f64,
    /// Present only when entity extraction is enabled.
    pub entities: Option<Vec<EntitySpan>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipStage {
    Ingesting,
    Scoring,
}

/// A candidate left out of the ranking, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedCandidate {
    pub name: String,
    pub stage: SkipStage,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStatus {
    Ranked,
    /// The source resolved but yielded no scoreable resume.
    NoCandidates,
}

#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub origin: CandidateOrigin,
    pub status: RankingStatus,
    /// Number of resume sources found.
    pub considered: usize,
    /// Number of candidates that received a score.
    pub scored: usize,
    /// The top-K candidates, best first.
    pub ranked: Vec<ScoredCandidate>,
    pub skipped: Vec<SkippedCandidate>,
}

impl RankingOutcome {
    pub fn names(&self) -> Vec<&str> {
        self.ranked
            .iter()
            .map(|r| r.candidate.name.as_str())
            .collect()
    }

    /// "3 of 12 resumes could not be used", or `None` when nothing was
    /// skipped.
    pub fn skip_summary(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        let noun = if self.considered == 1 {
            "resume"
        } else {
            "resumes"
        };
        Some(format!(
            "{} of {} {noun} could not be used",
            self.skipped.len(),
            self.considered
        ))
    }
}

/// Ranks resumes against a job description.
///
/// Providers are injected so the pipeline runs with stub models in tests
/// and several model configurations can coexist in one process.
pub struct RankingPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Option<Arc<dyn EntityExtractor>>,
    config: RankingConfig,
    pool: rayon::ThreadPool,
}

impl RankingPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        config: RankingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("resumerank-worker-{i}"))
            .build()
            .map_err(|e| {
                Error::Config(format!("failed to build worker pool: {e}"))
            })?;

        Ok(Self {
            embedder,
            extractor: None,
            config,
            pool,
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn extractor(&self) -> Option<&dyn EntityExtractor> {
        self.extractor.as_deref()
    }

    /// Run a full ranking request with the configured K.
    pub fn rank(&self, request: &RankingRequest) -> Result<RankingOutcome> {
        self.rank_with(
            request,
            self.config.top_k,
            self.config.extract_entities,
        )
    }

    /// Run a full ranking request, overriding K and entity enrichment.
    pub fn rank_with(
        &self,
        request: &RankingRequest,
        top_k: usize,
        extract_entities: bool,
    ) -> Result<RankingOutcome> {
        let mut run = Run::default();
        if top_k == 0 {
            run.advance(PipelineState::Failed);
            return Err(Error::Config("top-k must be at least 1".into()));
        }

        let origin = match request.origin() {
            Ok(origin) => origin,
            Err(e) => {
                run.advance(PipelineState::Failed);
                return Err(e);
            }
        };
        if let Err(e) = ensure_non_empty(&request.job_description) {
            run.advance(PipelineState::Failed);
            return Err(e);
        }

        run.advance(PipelineState::Ingesting);
        let sources = match &origin {
            CandidateOrigin::Uploads => request.uploads.clone(),
            CandidateOrigin::Folder(folder) => {
                match walker::discover_files(folder) {
                    Ok(files) => files
                        .into_iter()
                        .map(|f| DocumentSource::File(f.absolute_path))
                        .collect(),
                    Err(e) => {
                        run.advance(PipelineState::Failed);
                        return Err(e);
                    }
                }
            }
        };
        let considered = sources.len();
        let mut skipped = Vec::new();
        let candidates = self.ingest(&sources, &mut skipped);
        tracing::info!(
            considered,
            readable = candidates.len(),
            "ingested resumes"
        );

        if candidates.is_empty() {
            run.advance(PipelineState::Done);
            return Ok(RankingOutcome {
                origin,
                status: RankingStatus::NoCandidates,
                considered,
                scored: 0,
                ranked: Vec::new(),
                skipped,
            });
        }

        run.advance(PipelineState::Scoring);
        let scored = match self.score(
            &request.job_description,
            candidates,
            &mut skipped,
        ) {
            Ok(scored) => scored,
            Err(e) => {
                run.advance(PipelineState::Failed);
                return Err(e);
            }
        };
        let scored_count = scored.len();

        run.advance(PipelineState::Ranked);
        let ranked = self.select_top_k(scored, top_k, extract_entities);

        run.advance(PipelineState::Done);
        let status = if ranked.is_empty() {
            RankingStatus::NoCandidates
        } else {
            RankingStatus::Ranked
        };
        Ok(RankingOutcome {
            origin,
            status,
            considered,
            scored: scored_count,
            ranked,
            skipped,
        })
    }

    /// Read every source on the worker pool, keeping input order.
    fn ingest(
        &self,
        sources: &[DocumentSource],
        skipped: &mut Vec<SkippedCandidate>,
    ) -> Vec<Candidate> {
        let timeout = self.config.read_timeout;
        let read: Vec<(String, Result<String>)> = self.pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    (source.candidate_name(), read_document_within(source, timeout))
                })
                .collect()
        });

        let mut candidates = Vec::with_capacity(read.len());
        for (name, result) in read {
            match result.and_then(|text| ensure_non_empty(&text).map(|_| text)) {
                Ok(resume_text) => candidates.push(Candidate {
                    name,
                    resume_text,
                    similarity_score: None,
                }),
                Err(e) => skip(skipped, name, SkipStage::Ingesting, &e),
            }
        }
        candidates
    }

    /// Embed the job description once, then every candidate in batches.
    fn score(
        &self,
        job_description: &str,
        candidates: Vec<Candidate>,
        skipped: &mut Vec<SkippedCandidate>,
    ) -> Result<Vec<Candidate>> {
        let job_embedding = self.embedder.embed(job_description)?;
        let reference = Reference::new(&job_embedding)?;
        tracing::debug!(
            model = self.embedder.model_id(),
            dimension = reference.dimension(),
            "embedded job description"
        );

        let texts: Vec<String> =
            candidates.iter().map(|c| c.resume_text.clone()).collect();
        let batch_size = self.config.batch_size;
        let embedder = self.embedder.as_ref();
        let embeddings: Vec<Result<Embedding>> = self.pool.install(|| {
            texts
                .par_chunks(batch_size)
                .map(|chunk| embed_isolated(embedder, chunk))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        });

        let mut scored = Vec::with_capacity(candidates.len());
        for (mut candidate, embedding) in candidates.into_iter().zip(embeddings)
        {
            match embedding.and_then(|v| reference.score(&v)) {
                Ok(score) => {
                    tracing::debug!(name = %candidate.name, score, "scored");
                    candidate.similarity_score = Some(score);
                    scored.push(candidate);
                }
                Err(e) => {
                    skip(skipped, candidate.name, SkipStage::Scoring, &e)
                }
            }
        }
        Ok(scored)
    }

    /// Stable sort by score descending, truncate to K, then enrich.
    fn select_top_k(
        &self,
        scored: Vec<Candidate>,
        top_k: usize,
        extract_entities: bool,
    ) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<(Candidate, f64)> = scored
            .into_iter()
            .filter_map(|c| {
                let score = c.similarity_score?;
                Some((c, score))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_k);

        let extractor = self.extractor().filter(|_| extract_entities);

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, (candidate, score))| {
                let entities = extractor.and_then(|ex| {
                    ex.extract(&candidate.resume_text)
                        .map_err(|e| {
                            tracing::warn!(
                                name = %candidate.name,
                                "entity extraction failed: {e}"
                            );
                        })
                        .ok()
                });
                ScoredCandidate {
                    rank: i + 1,
                    candidate,
                    score,
                    entities,
                }
            })
            .collect()
    }
}

#[derive(Debug)]
struct Run {
    state: PipelineState,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
        }
    }
}

impl Run {
    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid pipeline transition {} -> {next}",
            self.state
        );
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }
}

fn skip(
    skipped: &mut Vec<SkippedCandidate>,
    name: String,
    stage: SkipStage,
    error: &Error,
) {
    tracing::warn!(%name, "skipping candidate: {error}");
    skipped.push(SkippedCandidate {
        name,
        stage,
        reason: error.to_string(),
    });
}
