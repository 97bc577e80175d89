//! End-to-end tests: materialize a corpus, train on it, export and upload.
//!
//! The network test against the public rows API is ignored by default.
//! Run with: cargo test --test pipeline -- --ignored

use futures::stream::{self, StreamExt};
use imdb_forge::corpus::{
    count_reviews, label_dir, load_corpus, materialize, CorpusTargets, ExampleStream,
    HfRowsSource, Label, LabeledExample, ReviewSource, Split, SplitTargets,
};
use imdb_forge::export::ModelArtifact;
use imdb_forge::pipeline::{fit_and_evaluate, run, PipelineConfig, RunError, RunEvent};
use imdb_forge::CorpusError;
use std::path::Path;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const GOOD: &[&str] = &["wonderful", "brilliant", "moving", "superb", "charming"];
const BAD: &[&str] = &["dreadful", "boring", "tedious", "awful", "clumsy"];

/// In-memory source producing alternating positive and negative reviews.
struct SyntheticSource {
    per_label: usize,
}

fn review(words: &[&str], i: usize) -> String {
    format!(
        "the film was {} and {}<br />the {} acting felt {}",
        words[i % words.len()],
        words[(i + 1) % words.len()],
        words[(i + 2) % words.len()],
        words[(i + 3) % words.len()]
    )
}

impl ReviewSource for SyntheticSource {
    fn stream(&self, split: Split) -> ExampleStream<'_> {
        let offset = match split {
            Split::Train => 0,
            Split::Test => 1,
        };
        let examples: Vec<_> = (0..self.per_label)
            .flat_map(|i| {
                [
                    Ok(LabeledExample::new(review(GOOD, i + offset), Label::Pos)),
                    Ok(LabeledExample::new(review(BAD, i + offset), Label::Neg)),
                ]
            })
            .collect();
        stream::iter(examples).boxed()
    }
}

async fn build_corpus(base: &Path) {
    let targets = CorpusTargets {
        train: SplitTargets::new(20, 20),
        test: SplitTargets::new(5, 5),
    };
    materialize(base, targets, &SyntheticSource { per_label: 30 })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_materialize_then_train() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("aclImdb");
    build_corpus(&base).await;

    assert_eq!(count_reviews(&label_dir(&base, Split::Train, Label::Pos)).unwrap(), 20);
    assert_eq!(count_reviews(&label_dir(&base, Split::Test, Label::Neg)).unwrap(), 5);

    let corpus = load_corpus(&base).unwrap();
    assert_eq!(corpus.train.len(), 40);
    assert_eq!(corpus.test.len(), 10);
    assert!(corpus.train.texts.iter().all(|t| !t.contains("<br")));

    let config = PipelineConfig::new(&base, "http://127.0.0.1/upload");
    let outcome = fit_and_evaluate(corpus, &config).await.unwrap();
    assert_eq!(outcome.report.accuracy, 1.0);
}

#[tokio::test]
async fn test_same_seed_same_weights_from_disk() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("aclImdb");
    build_corpus(&base).await;

    let config = PipelineConfig::new(&base, "http://127.0.0.1/upload")
        .with_seed(1337)
        .with_max_features(50);
    let a = fit_and_evaluate(load_corpus(&base).unwrap(), &config).await.unwrap();
    let b = fit_and_evaluate(load_corpus(&base).unwrap(), &config).await.unwrap();

    assert_eq!(
        a.pipeline.vectorizer.vocabulary(),
        b.pipeline.vectorizer.vocabulary()
    );
    assert!(a.pipeline.vectorizer.n_features() <= 50);
    assert_eq!(a.pipeline.classifier.weights(), b.pipeline.classifier.weights());
}

#[tokio::test]
async fn test_missing_test_neg_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("aclImdb");
    build_corpus(&base).await;
    let missing = label_dir(&base, Split::Test, Label::Neg);
    std::fs::remove_dir_all(&missing).unwrap();

    match load_corpus(&base) {
        Err(err @ CorpusError::MissingDirectory(_)) => {
            assert!(err.is_not_found());
            assert!(err.to_string().contains(&missing.display().to_string()));
        }
        other => panic!("expected MissingDirectory, got {:?}", other.map(|c| c.train.len())),
    }
}

/// Accepts one upload, replies with `status` and a JSON body, returns the request.
async fn one_shot_server(status: &'static str) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/upload", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.ends_with(b"--\r\n") {
                break;
            }
        }
        let body = r#"{"score":0.97,"accepted":true}"#;
        let reply = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        request
    });
    (url, handle)
}

#[tokio::test]
async fn test_full_run_uploads_artifact() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("aclImdb");
    build_corpus(&base).await;
    let model_out = tmp.path().join("model.joblib");

    let (url, server) = one_shot_server("200 OK").await;
    let config = PipelineConfig::new(&base, url).with_model_out(&model_out);
    let mut stages = Vec::new();
    let summary = run(config, |event| {
        stages.push(match event {
            RunEvent::Loading { .. } => "loading",
            RunEvent::Training => "training",
            RunEvent::Evaluated { .. } => "evaluated",
            RunEvent::Saved { .. } => "saved",
            RunEvent::Uploading { .. } => "uploading",
            RunEvent::Uploaded { .. } => "uploaded",
        })
    })
    .await
    .unwrap();
    assert_eq!(
        stages,
        ["loading", "training", "evaluated", "saved", "uploading", "uploaded"]
    );

    assert_eq!(summary.upload_status, 200);
    assert_eq!(summary.accuracy, 1.0);
    assert_eq!(summary.artifact_sha256.len(), 64);

    let request = server.await.unwrap();
    let on_disk = std::fs::read(&model_out).unwrap();
    assert_eq!(on_disk.len() as u64, summary.artifact_bytes);
    assert!(request
        .windows(on_disk.len())
        .any(|w| w == on_disk.as_slice()));

    let artifact = ModelArtifact::load(&model_out).unwrap();
    assert_eq!(artifact.metadata.train_size, 40);
    assert_eq!(artifact.metadata.test_accuracy, Some(1.0));
}

#[tokio::test]
async fn test_rejected_upload_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("aclImdb");
    build_corpus(&base).await;

    let (url, server) = one_shot_server("422 Unprocessable Entity").await;
    let config = PipelineConfig::new(&base, url).with_model_out(tmp.path().join("model.joblib"));
    let mut reply = None;
    let err = run(config, |event| {
        if let RunEvent::Uploaded { response } = event {
            reply = Some((response.status.as_u16(), response.rendered_body()));
        }
    })
    .await
    .unwrap_err();
    let _ = server.await;

    assert!(matches!(
        err,
        RunError::Export(imdb_forge::ExportError::HttpStatus { status: 422 })
    ));
    // The rejection body is reported before the run fails.
    let (status, body) = reply.expect("rejected reply reported");
    assert_eq!(status, 422);
    assert!(body.contains("\"accepted\": true"));
}

#[tokio::test]
#[ignore] // Run with: cargo test --test pipeline -- --ignored
async fn test_materialize_from_huggingface() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("aclImdb");
    let source = HfRowsSource::new().unwrap();
    let targets = CorpusTargets {
        train: SplitTargets::new(2, 2),
        test: SplitTargets::new(0, 0),
    };

    let reports = materialize(&base, targets, &source).await.unwrap();
    assert_eq!(reports[0].after, SplitTargets::new(2, 2));
    assert!(reports[1].is_noop());
}
