use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use docx_rs::{Docx, Paragraph, Run};
use resumerank::{
    Embedding,
    EmbeddingProvider,
    Error,
    GazetteerExtractor,
    RankingConfig,
    RankingPipeline,
    RankingRequest,
    pipeline::RankingStatus,
    report,
};

/// Topic vectors: [python/django, cooking].
struct TopicProvider {
    calls: AtomicUsize,
}

impl EmbeddingProvider for TopicProvider {
    fn model_id(&self) -> &str {
        "topic-stub"
    }

    fn embed_batch(&self, texts: &[String]) -> resumerank::Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let tech = ["python", "django", "flask"]
                    .iter()
                    .filter(|w| t.contains(*w))
                    .count() as f32;
                let food = ["cooking", "pastry", "kitchen"]
                    .iter()
                    .filter(|w| t.contains(*w))
                    .count() as f32;
                vec![tech, food]
            })
            .collect())
    }
}

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let mut docx = Docx::new();
    for p in paragraphs {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*p)));
    }
    docx.build().pack(std::fs::File::create(path).unwrap()).unwrap();
}

fn pipeline_with(top_k: usize, provider: Arc<TopicProvider>) -> RankingPipeline {
    let config = RankingConfig {
        top_k,
        workers: 3,
        batch_size: 2,
        extract_entities: true,
        ..RankingConfig::default()
    };
    RankingPipeline::new(provider, config)
        .unwrap()
        .with_extractor(Arc::new(GazetteerExtractor::default()))
}

fn pipeline(top_k: usize) -> RankingPipeline {
    pipeline_with(
        top_k,
        Arc::new(TopicProvider {
            calls: AtomicUsize::new(0),
        }),
    )
}

#[test]
fn ranks_a_folder_of_resumes() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    write_docx(&dir.join("ada.docx"), &["Ada", "Python, Django and Flask"]);
    write_docx(&dir.join("bruno.docx"), &["Bruno", "Pastry and cooking, kitchen lead"]);
    write_docx(&dir.join("cleo.docx"), &["Cleo", "Python scripting", "Home cooking"]);
    std::fs::write(dir.join("broken.docx"), b"not a document").unwrap();
    std::fs::write(dir.join("cover-letter.txt"), "Python Django").unwrap();

    let request = RankingRequest {
        job_description: "Python developer with Django experience".to_string(),
        uploads: Vec::new(),
        folder: Some(dir.to_path_buf()),
    };
    let provider = Arc::new(TopicProvider {
        calls: AtomicUsize::new(0),
    });
    let outcome = pipeline_with(10, provider.clone()).rank(&request).unwrap();

    assert_eq!(outcome.status, RankingStatus::Ranked);
    assert_eq!(outcome.names(), vec!["ada", "cleo", "bruno"]);
    // One call for the job description, then three resumes in batches of two.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.considered, 4);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].name, "broken");

    let ada = &outcome.ranked[0];
    let skills: Vec<_> = ada
        .entities
        .as_ref()
        .unwrap()
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(skills, vec!["Python", "Django", "Flask"]);

    let json: serde_json::Value =
        serde_json::from_str(&report::render_json(&outcome).unwrap()).unwrap();
    assert_eq!(json["candidates"].as_array().unwrap().len(), 3);
    assert_eq!(json["summary"], "1 of 4 resumes could not be used");
}

#[test]
fn top_k_never_exceeds_valid_candidates() {
    let tmp = tempfile::tempdir().unwrap();
    write_docx(&tmp.path().join("ada.docx"), &["Python"]);
    write_docx(&tmp.path().join("bruno.docx"), &["cooking"]);

    let request = RankingRequest {
        job_description: "Python".to_string(),
        uploads: Vec::new(),
        folder: Some(tmp.path().to_path_buf()),
    };

    assert_eq!(pipeline(1).rank(&request).unwrap().ranked.len(), 1);
    assert_eq!(pipeline(5).rank(&request).unwrap().ranked.len(), 2);
}

#[test]
fn missing_source_differs_from_empty_folder() {
    let tmp = tempfile::tempdir().unwrap();

    let empty = RankingRequest {
        job_description: "Python".to_string(),
        uploads: Vec::new(),
        folder: Some(tmp.path().to_path_buf()),
    };
    let outcome = pipeline(5).rank(&empty).unwrap();
    assert_eq!(outcome.status, RankingStatus::NoCandidates);

    let missing = RankingRequest {
        job_description: "Python".to_string(),
        ..RankingRequest::default()
    };
    assert!(matches!(
        pipeline(5).rank(&missing),
        Err(Error::NoCandidateSource)
    ));
}
