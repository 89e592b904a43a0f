//! Shared test fixtures: fake engines, test state, request builders

use axum::async_trait;
use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use scribe::engines::{Diarizer, EngineError, Transcriber};
use scribe::models::{
    Diarization, DiarizationSegment, Transcript, TranscriptSegment,
};
use scribe::services::{ArtifactStore, WebhookDispatcher};
use scribe::AppState;

/// Canned transcription engine
pub struct FakeTranscriber {
    pub transcript: Transcript,
    pub ready: bool,
    /// When set, transcribe() fails with this message
    pub fail_with: Option<String>,
}

impl FakeTranscriber {
    pub fn returning(transcript: Transcript) -> Self {
        Self {
            transcript,
            ready: true,
            fail_with: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            transcript: empty_transcript(),
            ready: true,
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(
        &self,
        _audio_path: &Path,
        _language: &str,
    ) -> Result<Transcript, EngineError> {
        match &self.fail_with {
            Some(message) => Err(EngineError::Api(500, message.clone())),
            None => Ok(self.transcript.clone()),
        }
    }

    async fn ready(&self) -> bool {
        self.ready
    }
}

/// Canned diarization engine
pub struct FakeDiarizer {
    pub diarization: Diarization,
    pub ready: bool,
    pub fail_with: Option<String>,
}

impl FakeDiarizer {
    pub fn returning(diarization: Diarization) -> Self {
        Self {
            diarization,
            ready: true,
            fail_with: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            diarization: Diarization { segments: vec![] },
            ready: true,
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl Diarizer for FakeDiarizer {
    async fn diarize(&self, _audio_path: &Path) -> Result<Diarization, EngineError> {
        match &self.fail_with {
            Some(message) => Err(EngineError::Api(500, message.clone())),
            None => Ok(self.diarization.clone()),
        }
    }

    async fn ready(&self) -> bool {
        self.ready
    }
}

pub fn empty_transcript() -> Transcript {
    Transcript {
        text: String::new(),
        segments: vec![],
        language: "en".to_string(),
    }
}

/// Transcript used by most pipeline tests: two segments, two speakers
pub fn sample_transcript() -> Transcript {
    Transcript {
        text: "hello there general kenobi".to_string(),
        segments: vec![
            TranscriptSegment {
                start: 0.0,
                end: 3.0,
                text: "hello there".to_string(),
            },
            TranscriptSegment {
                start: 3.0,
                end: 6.0,
                text: "general kenobi".to_string(),
            },
        ],
        language: "en".to_string(),
    }
}

pub fn sample_diarization() -> Diarization {
    Diarization {
        segments: vec![
            DiarizationSegment {
                start: 0.0,
                end: 2.5,
                speaker: "SPEAKER_00".to_string(),
            },
            DiarizationSegment {
                start: 2.5,
                end: 6.0,
                speaker: "SPEAKER_01".to_string(),
            },
        ],
    }
}

/// Test app plus the handles the assertions need.
/// The TempDir holds both the database and the artifact store; keep it alive.
pub struct TestApp {
    pub router: axum::Router,
    pub db: SqlitePool,
    pub artifacts: ArtifactStore,
    #[allow(dead_code)]
    pub scratch: TempDir,
}

/// Build a test app with the supplied engines
pub async fn setup_app(
    transcriber: FakeTranscriber,
    diarizer: FakeDiarizer,
) -> TestApp {
    let scratch = TempDir::new().expect("tempdir");
    let db_path = scratch.path().join("scribe_test.db");
    let db = scribe::db::init_database_pool(&db_path)
        .await
        .expect("test database");
    let default_user_id = scribe::db::users::ensure_default_user(&db)
        .await
        .expect("default user");

    let artifacts = ArtifactStore::new(scratch.path().join("output"));
    let webhook = WebhookDispatcher::new(Duration::from_secs(2)).expect("dispatcher");

    let state = AppState::new(
        db.clone(),
        Arc::new(transcriber),
        Arc::new(diarizer),
        artifacts.clone(),
        webhook,
        default_user_id,
    );

    TestApp {
        router: scribe::build_router(state),
        db,
        artifacts,
        scratch,
    }
}

/// Default test app: sample engines, everything ready
pub async fn setup_default_app() -> TestApp {
    setup_app(
        FakeTranscriber::returning(sample_transcript()),
        FakeDiarizer::returning(sample_diarization()),
    )
    .await
}

const BOUNDARY: &str = "scribe-test-boundary";

/// Build a multipart /process request
pub fn process_request(
    filename: &str,
    content_type: &str,
    language: Option<&str>,
    webhook_url: Option<&str>,
) -> Request<Body> {
    let mut body = String::new();
    body.push_str(&format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {ct}\r\n\r\nfake-audio-bytes\r\n",
        b = BOUNDARY,
        f = filename,
        ct = content_type,
    ));
    if let Some(language) = language {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\n{v}\r\n",
            b = BOUNDARY,
            v = language,
        ));
    }
    if let Some(url) = webhook_url {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"webhook_url\"\r\n\r\n{v}\r\n",
            b = BOUNDARY,
            v = url,
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a bodyless request
pub fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Extract JSON body from a response body
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Spawn a throwaway webhook receiver answering every POST with `status`.
/// Returns its URL and a counter of received requests.
pub async fn spawn_webhook_receiver(
    status: axum::http::StatusCode,
) -> (String, Arc<std::sync::atomic::AtomicUsize>) {
    use axum::routing::post;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    let app = axum::Router::new().route(
        "/hook",
        post(move || {
            let hits = hits_clone.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (status, "receiver response")
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind receiver");
    let addr = listener.local_addr().expect("receiver addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{}/hook", addr), hits)
}
