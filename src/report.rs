use serde::Serialize;

use crate::{
    entities::EntitySummary,
    error::Result,
    pipeline::{
        CandidateOrigin,
        RankingOutcome,
        RankingStatus,
        SkippedCandidate,
    },
};

/// Serializable view of a [`RankingOutcome`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingReport<'a> {
    pub status: RankingStatus,
    pub origin: &'a CandidateOrigin,
    pub considered: usize,
    pub scored: usize,
    pub summary: Option<String>,
    pub candidates: Vec<CandidateItem<'a>>,
    pub skipped: &'a [SkippedCandidate],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem<'a> {
    pub rank: usize,
    pub name: &'a str,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntitySummary>,
}

impl<'a> RankingReport<'a> {
    pub fn new(outcome: &'a RankingOutcome) -> Self {
        let candidates = outcome
            .ranked
            .iter()
            .map(|r| CandidateItem {
                rank: r.rank,
                name: &r.candidate.name,
                score: r.score,
                entities: r.entities.as_deref().map(EntitySummary::from_spans),
            })
            .collect();

        Self {
            status: outcome.status,
            origin: &outcome.origin,
            considered: outcome.considered,
            scored: outcome.scored,
            summary: outcome.skip_summary(),
            candidates,
            skipped: &outcome.skipped,
        }
    }
}

/// Render an outcome for the terminal.
pub fn render_human(outcome: &RankingOutcome) -> String {
    let mut out = String::new();

    match outcome.status {
        RankingStatus::NoCandidates => {
            out.push_str(match outcome.origin {
                CandidateOrigin::Folder(_) if outcome.considered == 0 => {
                    "No candidates: the folder contains no .docx resumes.\n"
                }
                _ => "No candidates: none of the resumes could be used.\n",
            });
        }
        RankingStatus::Ranked => {
            out.push_str("Top candidates for the job:\n");
            for r in &outcome.ranked {
                out.push_str(&format!(
                    "{:>3}. [{:.3}] {}\n",
                    r.rank, r.score, r.candidate.name
                ));
                if let Some(spans) = &r.entities {
                    let summary = EntitySummary::from_spans(spans);
                    if !summary.skills.is_empty() {
                        out.push_str(&format!(
                            "     skills: {}\n",
                            summary.skills.join(", ")
                        ));
                    }
                    if !summary.qualifications.is_empty() {
                        out.push_str(&format!(
                            "     qualifications: {}\n",
                            summary.qualifications.join(", ")
                        ));
                    }
                }
            }
            out.push_str(&format!(
                "\n{} of {} candidate(s) shown\n",
                outcome.ranked.len(),
                outcome.scored
            ));
        }
    }

    if let Some(summary) = outcome.skip_summary() {
        out.push_str(&format!("\n{summary}:\n"));
        for s in &outcome.skipped {
            out.push_str(&format!("  - {}: {}\n", s.name, s.reason));
        }
    }

    out
}

pub fn render_json(outcome: &RankingOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(&RankingReport::new(outcome))?)
}

/// Format results for human-readable terminal output.
pub fn format_human(outcome: &RankingOutcome) {
    print!("{}", render_human(outcome));
}

/// Format results as JSON output.
pub fn format_json(outcome: &RankingOutcome) -> Result<()> {
    println!("{}", render_json(outcome)?);
    Ok(())
}
