//! End-to-end pipeline tests: PDF/page texts in, graded prompt out, with
//! deterministic mock adapters.

use std::sync::Arc;

use gradesmith::embeddings::MockEmbeddingProvider;
use gradesmith::generation::MockGenerator;
use gradesmith::grader::Grader;
use gradesmith::ingestion::split::ChunkIdStrategy;
use gradesmith::prompt::GradingRequest;
use gradesmith::stores::ChunkStore;
use gradesmith::stores::sqlite::SqliteCollection;
use gradesmith::types::GradingError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tempfile::tempdir;

fn echo_grader(top_k: usize) -> Grader {
    Grader::builder()
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .generator(Arc::new(MockGenerator::echo()))
        .top_k(top_k)
        .build()
}

const PARA_ONE: &str = "The first law of thermodynamics states that energy is conserved.";
const PARA_TWO: &str = "Entropy of an isolated system never decreases over time.";

fn two_paragraph_page() -> Vec<String> {
    vec![format!("{PARA_ONE}\n\n{PARA_TWO}")]
}

#[tokio::test]
async fn one_page_two_paragraphs_indexes_two_documents() {
    let dir = tempdir().unwrap();
    let grader = echo_grader(1);

    let summary = grader
        .index_pages(
            &two_paragraph_page(),
            "thermo.pdf",
            dir.path(),
            "thermo",
            ChunkIdStrategy::Flat,
        )
        .await
        .unwrap();
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.chunks, 2);

    let collection = SqliteCollection::open(
        dir.path(),
        "thermo",
        Arc::new(MockEmbeddingProvider::new()),
    )
    .await
    .unwrap();
    assert_eq!(collection.count().await.unwrap(), 2);

    // Querying with paragraph one's text retrieves paragraph one.
    let results = collection.query(PARA_ONE, 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.content, PARA_ONE);
}

#[tokio::test]
async fn per_page_strategy_assigns_composite_ids() {
    let dir = tempdir().unwrap();
    let grader = echo_grader(1);

    grader
        .index_pages(
            &two_paragraph_page(),
            "thermo.pdf",
            dir.path(),
            "thermo",
            ChunkIdStrategy::PerPage,
        )
        .await
        .unwrap();

    let collection = SqliteCollection::open(
        dir.path(),
        "thermo",
        Arc::new(MockEmbeddingProvider::new()),
    )
    .await
    .unwrap();
    let first = collection.get("page_0_para_0").await.unwrap().unwrap();
    assert_eq!(first.content, PARA_ONE);
    let second = collection.get("page_0_para_1").await.unwrap().unwrap();
    assert_eq!(second.content, PARA_TWO);
}

#[tokio::test]
async fn check_answer_embeds_inputs_into_the_prompt() {
    let dir = tempdir().unwrap();
    let grader = echo_grader(2);

    grader
        .index_pages(
            &two_paragraph_page(),
            "thermo.pdf",
            dir.path(),
            "thermo",
            ChunkIdStrategy::Flat,
        )
        .await
        .unwrap();

    let request = GradingRequest::new(
        "State the first law of thermodynamics.",
        10,
        "Energy cannot be created or destroyed.",
    )
    .with_ideal_answer("Energy is conserved;\nit only changes form.");

    // The echo generator returns the prompt itself, so the assembled prompt
    // is observable end to end.
    let prompt = grader
        .check_answer(dir.path(), "thermo", &request)
        .await
        .unwrap();

    assert!(prompt.contains("QUESTION: 'State the first law of thermodynamics.'"));
    assert!(prompt.contains("Student's Answer: 'Energy cannot be created or destroyed.'"));
    assert!(prompt.contains("Ideal Answer: 'Energy is conserved; it only changes form.'"));
    assert!(prompt.contains("Full Marks: 10"));
    // Both stored paragraphs fit in top_k = 2, so the reference block holds
    // retrieved passage text.
    let reference_line = prompt
        .lines()
        .find(|line| line.starts_with("Relevant Reference Text:"))
        .unwrap();
    assert!(reference_line.len() > "Relevant Reference Text: ''".len());
}

#[tokio::test]
async fn check_answer_on_missing_collection_is_not_found() {
    let dir = tempdir().unwrap();
    let grader = echo_grader(3);
    let request = GradingRequest::new("q", 5, "a");

    let err = grader
        .check_answer(dir.path(), "nonexistent", &request)
        .await
        .unwrap_err();
    assert!(matches!(err, GradingError::NotFound(_)));
}

#[tokio::test]
async fn canned_generator_output_is_returned_verbatim() {
    let dir = tempdir().unwrap();
    let grader = Grader::builder()
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .generator(Arc::new(MockGenerator::with_reply("GRADE: 7/10")))
        .build();

    grader
        .index_pages(
            &two_paragraph_page(),
            "thermo.pdf",
            dir.path(),
            "thermo",
            ChunkIdStrategy::Flat,
        )
        .await
        .unwrap();

    let request = GradingRequest::new("q", 10, "a");
    let grade = grader
        .check_answer(dir.path(), "thermo", &request)
        .await
        .unwrap();
    assert_eq!(grade, "GRADE: 7/10");
}

#[tokio::test]
async fn index_pdf_runs_the_full_ingestion_path() {
    let dir = tempdir().unwrap();
    let pdf_path = dir.path().join("exam_reference.pdf");
    write_single_page_pdf(&pdf_path, "Energy is conserved in every closed system.");

    let grader = echo_grader(1);
    let summary = grader
        .index_pdf(&pdf_path, dir.path(), "reference", ChunkIdStrategy::Flat)
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert!(summary.chunks >= 1);

    let collection = SqliteCollection::open(
        dir.path(),
        "reference",
        Arc::new(MockEmbeddingProvider::new()),
    )
    .await
    .unwrap();
    assert_eq!(collection.count().await.unwrap(), summary.chunks);
}

fn write_single_page_pdf(path: &std::path::Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content stream"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save test PDF");
}
