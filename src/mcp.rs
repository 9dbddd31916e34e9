use std::{path::PathBuf, sync::Arc};

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    document::{DocumentSource, read_document},
    entities::{EntitySpan, EntitySummary},
    error::{self, Error},
    pipeline::{RankingOutcome, RankingPipeline, RankingRequest, RankingStatus},
    report::RankingReport,
};

struct ResumeRankState {
    pipeline: RankingPipeline,
}

#[derive(Clone)]
pub struct ResumeRankMcpServer {
    state: Arc<ResumeRankState>,
    tool_router: ToolRouter<Self>,
}

impl ResumeRankMcpServer {
    pub fn new(pipeline: RankingPipeline) -> Self {
        Self {
            state: Arc::new(ResumeRankState { pipeline }),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl ResumeRankMcpServer {
    /// Rank resumes against a job description.
    #[tool(
        name = "rank_resumes",
        description = "Rank .docx resumes against a job description by semantic similarity. Pass either a list of resume files or a folder; files take precedence."
    )]
    pub async fn rank_resumes(
        &self,
        params: Parameters<RankParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let pipeline = &self.state.pipeline;

        let request = RankingRequest {
            job_description: params.job_description,
            uploads: params
                .files
                .unwrap_or_default()
                .into_iter()
                .map(|f| DocumentSource::UploadedFile(PathBuf::from(f)))
                .collect(),
            folder: params.folder.map(PathBuf::from),
        };
        let top_k = params.top_k.unwrap_or(pipeline.config().top_k);
        let include_entities = params
            .include_entities
            .unwrap_or(pipeline.config().extract_entities);

        let outcome =
            match pipeline.rank_with(&request, top_k, include_entities) {
                Ok(outcome) => outcome,
                Err(e) if is_user_error(&e) => return Ok(tool_error(&e)),
                Err(e) => return Err(mcp_error("ranking failed", e)),
            };

        let summary = format_rank_summary(&outcome);
        let structured = serde_json::to_value(RankingReport::new(&outcome))
            .map_err(|e| mcp_error("failed to serialize ranking", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Extract skills and qualifications from a resume.
    #[tool(
        name = "extract_entities",
        description = "List the SKILL and QUALIFICATION terms found in a .docx resume, in document order."
    )]
    pub async fn extract_entities(
        &self,
        params: Parameters<EntitiesParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let Some(extractor) = self.state.pipeline.extractor() else {
            return Err(rmcp::ErrorData::internal_error(
                "entity extraction is not configured",
                None,
            ));
        };

        let source = DocumentSource::File(PathBuf::from(&params.0.file));
        let spans = match read_document(&source) {
            Ok(text) => extractor
                .extract(&text)
                .map_err(|e| mcp_error("entity extraction failed", e))?,
            Err(e) => return Ok(tool_error(&e)),
        };

        let summary = EntitySummary::from_spans(&spans);
        let text = format!(
            "Skills: {}\nQualifications: {}",
            summary.skills.join(", "),
            summary.qualifications.join(", ")
        );
        let structured = serde_json::to_value(EntitiesResponse {
            name: source.candidate_name(),
            entities: spans,
            summary,
        })
        .map_err(|e| mcp_error("failed to serialize entities", e))?;

        let mut result = CallToolResult::success(vec![Content::text(text)]);
        result.structured_content = Some(structured);
        Ok(result)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for ResumeRankMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("resumerank", env!("CARGO_PKG_VERSION"))
                    .with_title("resumerank MCP"),
            )
            .with_instructions(
                "Use rank_resumes to order candidates for a job description. Use extract_entities to list a resume's skills and qualifications.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankParams {
    /// Job description to rank against.
    pub job_description: String,
    /// Resume files (.docx). Take precedence over `folder`.
    pub files: Option<Vec<String>>,
    /// Folder scanned for .docx resumes.
    pub folder: Option<String>,
    /// Number of candidates to return (default: server setting).
    pub top_k: Option<usize>,
    /// Attach skills and qualifications to each candidate.
    pub include_entities: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesParams {
    /// Path of the .docx resume.
    pub file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntitiesResponse {
    name: String,
    entities: Vec<EntitySpan>,
    summary: EntitySummary,
}

fn format_rank_summary(outcome: &RankingOutcome) -> String {
    let mut lines = Vec::with_capacity(outcome.ranked.len() + 2);

    match outcome.status {
        RankingStatus::NoCandidates => {
            lines.push("No candidates could be ranked.".to_string())
        }
        RankingStatus::Ranked => {
            lines.push(format!(
                "Top {} of {} candidate(s):",
                outcome.ranked.len(),
                outcome.scored
            ));
            for r in &outcome.ranked {
                lines.push(format!(
                    "{}. {} {:.3}",
                    r.rank, r.candidate.name, r.score
                ));
            }
        }
    }
    if let Some(skips) = outcome.skip_summary() {
        lines.push(skips);
    }

    lines.join("\n")
}

/// Errors the caller can fix by changing the request.
fn is_user_error(e: &Error) -> bool {
    matches!(
        e,
        Error::NoCandidateSource
            | Error::EmptyInput
            | Error::Config(_)
            | Error::UnreadableDocument { .. }
    )
}

fn tool_error(e: &Error) -> CallToolResult {
    CallToolResult::error(vec![Content::text(e.to_string())])
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(pipeline: RankingPipeline) -> error::Result<()> {
    let server = ResumeRankMcpServer::new(pipeline);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            Error::Config(format!("MCP server initialization failed: {e}"))
        })?;
        running
            .waiting()
            .await
            .map_err(|e| Error::Config(format!("MCP server error: {e}")))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use docx_rs::{Docx, Paragraph, Run};

    use super::*;
    use crate::{
        config::RankingConfig,
        embedding::{Embedding, EmbeddingProvider},
        entities::GazetteerExtractor,
    };

    struct StubProvider;

    impl EmbeddingProvider for StubProvider {
        fn model_id(&self) -> &str {
            "stub"
        }

        fn embed_batch(&self, texts: &[String]) -> error::Result<Vec<Embedding>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("Rust") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.2, 1.0]
                    }
                })
                .collect())
        }
    }

    fn server() -> ResumeRankMcpServer {
        let config = RankingConfig {
            workers: 1,
            ..RankingConfig::default()
        };
        let pipeline = RankingPipeline::new(Arc::new(StubProvider), config)
            .unwrap()
            .with_extractor(Arc::new(GazetteerExtractor::default()));
        ResumeRankMcpServer::new(pipeline)
    }

    fn write_docx(path: &std::path::Path, paragraphs: &[&str]) {
        let mut docx = Docx::new();
        for p in paragraphs {
            docx =
                docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*p)));
        }
        let file = std::fs::File::create(path).unwrap();
        docx.build().pack(file).unwrap();
    }

    #[tokio::test]
    async fn rank_tool_returns_structured_results() {
        let tmp = tempfile::tempdir().unwrap();
        write_docx(&tmp.path().join("ferris.docx"), &["Rust", "PhD"]);
        write_docx(&tmp.path().join("gopher.docx"), &["Go services"]);

        let params = RankParams {
            job_description: "Rust engineer".to_string(),
            files: None,
            folder: Some(tmp.path().to_string_lossy().to_string()),
            top_k: Some(5),
            include_entities: Some(true),
        };

        let result = server().rank_resumes(Parameters(params)).await.unwrap();
        assert_eq!(result.is_error, Some(false));

        let structured = result.structured_content.expect("structured");
        let candidates = structured
            .get("candidates")
            .and_then(|v| v.as_array())
            .expect("candidates array");
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].get("name").and_then(|v| v.as_str()),
            Some("ferris")
        );
        assert_eq!(candidates[0]["entities"]["qualifications"][0], "PhD");

        let summary = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default();
        assert!(summary.contains("Top 2 of 2 candidate(s)"));
        assert!(summary.contains("1. ferris 1.000"));
    }

    #[tokio::test]
    async fn rank_tool_reports_missing_source() {
        let params = RankParams {
            job_description: "Rust engineer".to_string(),
            files: Some(vec![]),
            folder: None,
            top_k: None,
            include_entities: None,
        };

        let result = server().rank_resumes(Parameters(params)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default();
        assert!(text.contains("no candidate source"));
    }

    #[tokio::test]
    async fn entities_tool_lists_terms() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ferris.docx");
        write_docx(&path, &["Rust and Docker", "MSc"]);

        let params = EntitiesParams {
            file: path.to_string_lossy().to_string(),
        };
        let result = server().extract_entities(Parameters(params)).await.unwrap();

        let structured = result.structured_content.expect("structured");
        assert_eq!(structured["name"], "ferris");
        assert_eq!(structured["summary"]["skills"], json!(["Rust", "Docker"]));
        assert_eq!(structured["entities"][2]["label"], "QUALIFICATION");
    }
}
