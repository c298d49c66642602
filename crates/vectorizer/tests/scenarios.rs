//! End-to-end ingestion and retrieval scenarios against the in-memory collection

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use vectorizer::error::{Error, Stage};
use vectorizer::providers::{HashingEmbedder, MemoryCollection};
use vectorizer::{DocumentPipeline, IngestionCoordinator, Scope, ScopedStore};

fn coordinator() -> IngestionCoordinator {
    let collection = MemoryCollection::new("pdf_chunks", Arc::new(HashingEmbedder::new(256)));
    let store = ScopedStore::new(Arc::new(collection));
    let pipeline = Arc::new(DocumentPipeline::new(1000, 200).unwrap());
    IngestionCoordinator::new(pipeline, store)
}

fn scope(user: &str, chat: &str, file: &str) -> Scope {
    Scope::new(user, chat, file).unwrap()
}

fn words(range: std::ops::Range<usize>) -> String {
    range
        .map(|i| format!("w{:08}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Three form-feed separated pages that split into 2, 2 and 1 chunks
fn three_page_document() -> String {
    [words(0..150), words(150..300), words(300..330)].join("\x0c")
}

/// A PDF with one line of Courier text per page
fn build_pdf(pages: &[String]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![36.into(), 750.into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn policy_document() -> String {
    [
        "Refund policy: purchases can be returned within 30 days for a full refund.",
        "Shipping is free for orders above 50 dollars.",
        "Total Amount Due is payable on receipt of the invoice.",
        "Warranty claims require the original receipt and serial number.",
        "Support is available on weekdays between 9 and 5.",
    ]
    .join("\x0c")
}

async fn ids(store: &ScopedStore, scope: &Scope) -> HashSet<String> {
    store
        .query(scope, &["w".to_string(), "policy".to_string()], 1000)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.scoped_id)
        .collect()
}

#[tokio::test]
async fn test_three_pages_five_chunks() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");

    let outcome = coord
        .ingest_document(s.clone(), "report.txt", three_page_document())
        .await
        .unwrap();

    assert_eq!(outcome.chunk_count, 5);
    assert_eq!(coord.store().count(&s).await.unwrap(), 5);
}

#[tokio::test]
async fn test_three_page_pdf_five_chunks() {
    let pdf = build_pdf(&[words(0..150), words(150..300), words(300..330)]);

    let pipeline = DocumentPipeline::new(1000, 200).unwrap();
    let records = pipeline.process(&pdf, "report.pdf").unwrap();
    let pages: Vec<u32> = records.iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![1, 1, 2, 2, 3]);
    assert!(records[0].text.starts_with("w00000000"));
    assert!(records[4].text.ends_with("w00000329"));

    let coord = coordinator();
    let s = scope("u1", "c1", "f1");
    let outcome = coord.ingest_document(s.clone(), "report.pdf", pdf).await.unwrap();
    assert_eq!(outcome.chunk_count, 5);
    assert_eq!(coord.store().count(&s).await.unwrap(), 5);

    let results = coord
        .store()
        .query(&s, &["w00000160".to_string()], 10)
        .await
        .unwrap();
    let mut per_page: HashMap<u32, usize> = HashMap::new();
    for r in &results {
        assert_eq!(r.source_name, "report.pdf");
        *per_page.entry(r.page).or_default() += 1;
    }
    assert_eq!(per_page, HashMap::from([(1, 2), (2, 2), (3, 1)]));
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");

    coord
        .ingest_document(s.clone(), "report.txt", three_page_document())
        .await
        .unwrap();
    let first = ids(coord.store(), &s).await;

    let outcome = coord
        .ingest_document(s.clone(), "report.txt", three_page_document())
        .await
        .unwrap();
    let second = ids(coord.store(), &s).await;

    assert_eq!(outcome.chunk_count, 5);
    assert_eq!(first, second);
    assert_eq!(coord.store().count(&s).await.unwrap(), 5);
}

#[tokio::test]
async fn test_query_never_crosses_scopes() {
    let coord = coordinator();
    let scopes = [
        scope("u1", "c1", "f1"),
        scope("u1", "c1", "f2"),
        scope("u1", "c2", "f1"),
        scope("u2", "c1", "f1"),
    ];
    for s in &scopes {
        coord
            .ingest_document(s.clone(), "policy.txt", policy_document())
            .await
            .unwrap();
    }

    for s in &scopes {
        let results = coord
            .store()
            .query(s, &["refund policy".to_string()], 100)
            .await
            .unwrap();
        assert_eq!(results.len(), 5);

        let own = ids(coord.store(), s).await;
        assert!(results.iter().all(|r| own.contains(&r.scoped_id)));
        for other in scopes.iter().filter(|o| *o != s) {
            let foreign = ids(coord.store(), other).await;
            assert!(results.iter().all(|r| !foreign.contains(&r.scoped_id)));
        }
    }
}

#[tokio::test]
async fn test_results_sorted_and_unique() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");
    coord
        .ingest_document(s.clone(), "policy.txt", policy_document())
        .await
        .unwrap();

    let texts = vec![
        "refund policy".to_string(),
        "refund".to_string(),
        "receipt".to_string(),
    ];
    let results = coord.store().query(&s, &texts, 10).await.unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    let unique: HashSet<_> = results.iter().map(|r| &r.scoped_id).collect();
    assert_eq!(unique.len(), results.len());
}

#[tokio::test]
async fn test_top_k_two() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");
    coord
        .ingest_document(s.clone(), "policy.txt", policy_document())
        .await
        .unwrap();

    let results = coord
        .store()
        .query(&s, &["refund policy".to_string()], 2)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].distance <= results[1].distance);
    assert!(results.iter().all(|r| r.source_name == "policy.txt"));
    assert!(results[0].content.contains("Refund policy"));
}

#[tokio::test]
async fn test_count_matches_full_query() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");
    coord
        .ingest_document(s.clone(), "report.txt", three_page_document())
        .await
        .unwrap();

    let count = coord.store().count(&s).await.unwrap();
    let results = coord
        .store()
        .query(&s, &["w00000042".to_string()], count as i64 + 10)
        .await
        .unwrap();

    assert_eq!(results.len(), count);
}

#[tokio::test]
async fn test_delete_then_count_is_zero() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");
    coord
        .ingest_document(s.clone(), "policy.txt", policy_document())
        .await
        .unwrap();

    coord.store().delete(&s).await.unwrap();
    assert_eq!(coord.store().count(&s).await.unwrap(), 0);

    coord.store().delete(&s).await.unwrap();
    coord.store().delete(&scope("nobody", "none", "nothing")).await.unwrap();
}

#[tokio::test]
async fn test_zero_byte_upload_leaves_count_unchanged() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");
    coord
        .ingest_document(s.clone(), "policy.txt", policy_document())
        .await
        .unwrap();

    let err = coord
        .ingest_document(s.clone(), "empty.pdf", Vec::<u8>::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Processing);
    assert!(matches!(err.error, Error::EmptyDocument(_)));
    assert_eq!(coord.store().count(&s).await.unwrap(), 5);
}

#[tokio::test]
async fn test_identical_text_in_two_files_persists_independently() {
    let coord = coordinator();
    let f1 = scope("u1", "c1", "f1");
    let f2 = scope("u1", "c1", "f2");

    coord
        .ingest_document(f1.clone(), "invoice-a.txt", "Total Amount Due")
        .await
        .unwrap();
    coord
        .ingest_document(f2.clone(), "invoice-b.txt", "Total Amount Due")
        .await
        .unwrap();

    assert_eq!(coord.store().count(&f1).await.unwrap(), 1);
    assert_eq!(coord.store().count(&f2).await.unwrap(), 1);

    let a = ids(coord.store(), &f1).await;
    let b = ids(coord.store(), &f2).await;
    assert!(a.is_disjoint(&b));

    coord.store().delete(&f1).await.unwrap();
    assert_eq!(coord.store().count(&f1).await.unwrap(), 0);
    assert_eq!(coord.store().count(&f2).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unsupported_type_is_rejected() {
    let coord = coordinator();
    let s = scope("u1", "c1", "f1");

    let err = coord
        .ingest_document(s.clone(), "photo.png", vec![0x89, b'P', b'N', b'G'])
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Processing);
    assert_eq!(err.error.kind(), "unsupported_type");
    assert_eq!(coord.store().count(&s).await.unwrap(), 0);
}
