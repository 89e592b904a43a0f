//! End-to-end pipeline tests: processing, artifacts, state machine, webhook
//! delivery and audit

mod helpers;

use axum::http::StatusCode;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use helpers::*;
use scribe::db::{jobs, webhook_log};
use scribe::models::JobStatus;
use scribe::services::storage::ArtifactKind;

fn job_id_from(body: &serde_json::Value) -> Uuid {
    Uuid::parse_str(body["job_id"].as_str().unwrap()).unwrap()
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_process_completes_and_persists_artifacts() {
    let app = setup_default_app().await;

    let request = process_request("meeting.wav", "audio/wav", Some("en"), None);
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["webhook_sent"], false);
    assert_eq!(body["file_info"]["original_name"], "meeting.wav");
    assert_eq!(body["file_info"]["content_type"], "audio/wav");

    // Merge output embedded in the response: first segment overlaps
    // SPEAKER_00 for 2.5s vs SPEAKER_01 for 0.5s
    let segments = body["merged_file"]["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["speaker"], "SPEAKER_00");
    assert_eq!(segments[1]["speaker"], "SPEAKER_01");
    assert_eq!(body["merged_file"]["language"], "en");

    // Job row is terminal and fully timestamped
    let job_id = job_id_from(&body);
    let job = jobs::get_job(&app.db, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert!(job.error_message.is_none());
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.upload_at.is_some());
    assert!(job.transcribed_at.is_some());
    assert!(job.diarized_at.is_some());
    assert!(job.merged_at.is_some());
    // No webhook requested: stage never ran
    assert!(job.webhook_at.is_none());
    assert_eq!(job.webhook_attempts, 0);

    // Stage timestamps are monotone in pipeline order
    let upload = job.upload_at.unwrap();
    let transcribed = job.transcribed_at.unwrap();
    let diarized = job.diarized_at.unwrap();
    let merged = job.merged_at.unwrap();
    assert!(upload <= transcribed);
    assert!(transcribed <= diarized);
    assert!(diarized <= merged);

    // All three artifacts exist on disk at their recorded paths
    for (kind, field) in [
        (ArtifactKind::Transcript, &job.transcript_path),
        (ArtifactKind::Diarization, &job.diarization_path),
        (ArtifactKind::Merged, &job.merged_path),
    ] {
        let relative = field.as_ref().expect("artifact path set");
        let path = app.artifacts.absolute_path(std::path::Path::new(relative));
        assert!(path.exists(), "{} artifact missing", kind.as_str());
    }
}

#[tokio::test]
async fn test_download_roundtrip_after_processing() {
    let app = setup_default_app().await;

    let request = process_request("meeting.wav", "audio/wav", None, None);
    let response = app.router.clone().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let job_id = job_id_from(&body);

    let uri = format!("/admin/download/{}/merged", job_id);
    let response = app.router.oneshot(test_request("GET", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json"
    );

    let artifact = extract_json(response.into_body()).await;
    assert_eq!(artifact["segments"][0]["speaker"], "SPEAKER_00");
}

// =============================================================================
// Stage failure
// =============================================================================

#[tokio::test]
async fn test_transcription_failure_marks_job_failed() {
    let app = setup_app(
        FakeTranscriber::failing("model exploded"),
        FakeDiarizer::returning(sample_diarization()),
    )
    .await;

    let request = process_request("meeting.wav", "audio/wav", None, None);
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "PROCESSING_FAILED");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("Transcription failed"));
    assert!(message.contains("model exploded"));

    // The failure is durably recorded; later stages never ran
    let rows = jobs::list_jobs(&app.db, &Default::default(), 10, 0)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let job = &rows[0].job;
    assert_eq!(job.status(), Some(JobStatus::Failed));
    assert_eq!(
        job.error_message.as_deref().unwrap(),
        message
    );
    assert!(job.completed_at.is_some());
    assert!(job.transcribed_at.is_none());
    assert!(job.diarized_at.is_none());
    assert!(job.transcript_path.is_none());
}

#[tokio::test]
async fn test_diarization_failure_aborts_before_merge() {
    let app = setup_app(
        FakeTranscriber::returning(sample_transcript()),
        FakeDiarizer::failing("no speakers"),
    )
    .await;

    let request = process_request("meeting.wav", "audio/wav", None, None);
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let rows = jobs::list_jobs(&app.db, &Default::default(), 10, 0)
        .await
        .unwrap();
    let job = &rows[0].job;
    assert_eq!(job.status(), Some(JobStatus::Failed));
    assert!(job.error_message.as_deref().unwrap().contains("Diarization failed"));
    // Transcription finished, merge never happened
    assert!(job.transcribed_at.is_some());
    assert!(job.merged_at.is_none());
    assert!(job.merged_path.is_none());
}

// =============================================================================
// Webhook delivery and audit
// =============================================================================

#[tokio::test]
async fn test_webhook_success_delivers_and_audits() {
    let app = setup_default_app().await;
    let (url, hits) = spawn_webhook_receiver(StatusCode::OK).await;

    let request = process_request("meeting.wav", "audio/wav", None, Some(&url));
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["webhook_sent"], true);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);

    let job_id = job_id_from(&body);
    let job = jobs::get_job(&app.db, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert!(job.webhook_delivered);
    assert_eq!(job.webhook_attempts, 1);
    assert!(job.webhook_last_attempt.is_some());
    assert!(job.webhook_error.is_none());
    assert!(job.webhook_at.is_some());

    let attempts = webhook_log::attempts_for_job(&app.db, job_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status_code, Some(200));
    assert_eq!(attempts[0].attempt_number, 1);
    assert_eq!(attempts[0].response_body.as_deref(), Some("receiver response"));
    assert!(attempts[0].error_message.is_none());
}

#[tokio::test]
async fn test_webhook_500_completes_job_with_audit_row() {
    let app = setup_default_app().await;
    let (url, _hits) = spawn_webhook_receiver(StatusCode::INTERNAL_SERVER_ERROR).await;

    let request = process_request("meeting.wav", "audio/wav", None, Some(&url));
    let response = app.router.oneshot(request).await.unwrap();
    // Delivery failure is best-effort: the request still succeeds
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["webhook_sent"], false);

    let job_id = job_id_from(&body);
    let job = jobs::get_job(&app.db, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert!(!job.webhook_delivered);
    assert_eq!(job.webhook_attempts, 1);
    assert_eq!(job.webhook_error.as_deref(), Some("HTTP 500"));

    // Exactly one audit row: completed exchange, so status code and no error
    let attempts = webhook_log::attempts_for_job(&app.db, job_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status_code, Some(500));
    assert!(attempts[0].error_message.is_none());
}

#[tokio::test]
async fn test_webhook_transport_failure_still_audited() {
    let app = setup_default_app().await;

    // Grab a port that nothing is listening on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    drop(listener);

    let request = process_request("meeting.wav", "audio/wav", None, Some(&url));
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["webhook_sent"], false);

    let job_id = job_id_from(&body);
    let job = jobs::get_job(&app.db, job_id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert!(!job.webhook_delivered);
    assert!(job.webhook_error.is_some());

    // Transport failure: no status code, error text recorded
    let attempts = webhook_log::attempts_for_job(&app.db, job_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].status_code.is_none());
    assert!(attempts[0].error_message.is_some());
}

// =============================================================================
// State machine guards at the db layer
// =============================================================================

#[tokio::test]
async fn test_terminal_job_rejects_further_transitions() {
    let app = setup_default_app().await;

    let job = jobs::create_job(&app.db, 1, "a.wav", 1, "audio/wav", "en", None)
        .await
        .unwrap();
    jobs::mark_processing(&app.db, job.id).await.unwrap();
    jobs::mark_completed(&app.db, job.id).await.unwrap();

    // completed is terminal
    assert!(jobs::mark_completed(&app.db, job.id).await.is_err());
    assert!(jobs::mark_failed(&app.db, job.id, "late failure").await.is_err());
    assert!(jobs::mark_processing(&app.db, job.id).await.is_err());

    let job = jobs::get_job(&app.db, job.id).await.unwrap().unwrap();
    assert_eq!(job.status(), Some(JobStatus::Completed));
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn test_pending_cannot_complete_directly() {
    let app = setup_default_app().await;

    let job = jobs::create_job(&app.db, 1, "a.wav", 1, "audio/wav", "en", None)
        .await
        .unwrap();
    assert!(jobs::mark_completed(&app.db, job.id).await.is_err());
    assert!(jobs::mark_failed(&app.db, job.id, "boom").await.is_err());
}

#[tokio::test]
async fn test_stage_timestamp_set_only_once() {
    let app = setup_default_app().await;

    let job = jobs::create_job(&app.db, 1, "a.wav", 1, "audio/wav", "en", None)
        .await
        .unwrap();
    jobs::mark_stage_done(&app.db, job.id, scribe::models::Stage::Upload)
        .await
        .unwrap();
    // Second write refused, timestamp unchanged
    let first = jobs::get_job(&app.db, job.id).await.unwrap().unwrap().upload_at;
    assert!(jobs::mark_stage_done(&app.db, job.id, scribe::models::Stage::Upload)
        .await
        .is_err());
    let second = jobs::get_job(&app.db, job.id).await.unwrap().unwrap().upload_at;
    assert_eq!(first, second);
}

// =============================================================================
// Deletion removes artifacts with the record
// =============================================================================

#[tokio::test]
async fn test_delete_removes_artifacts_and_record() {
    let app = setup_default_app().await;

    let request = process_request("meeting.wav", "audio/wav", None, None);
    let response = app.router.clone().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let job_id = job_id_from(&body);

    let job = jobs::get_job(&app.db, job_id).await.unwrap().unwrap();
    let merged = app
        .artifacts
        .absolute_path(std::path::Path::new(job.merged_path.as_deref().unwrap()));
    assert!(merged.exists());

    let uri = format!("/admin/jobs/{}", job_id);
    let response = app
        .router
        .clone()
        .oneshot(test_request("DELETE", &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!merged.exists());
    assert!(jobs::get_job(&app.db, job_id).await.unwrap().is_none());

    // Deleting again reports not-found
    let response = app.router.oneshot(test_request("DELETE", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
