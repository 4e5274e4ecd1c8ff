//! Integration tests for `/api/v1/stories`.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_body, create_job, delete, get, success, token_for,
    StubAnalysis, TestApp, ADMIN, OWNER, STRANGER,
};
use serde_json::json;

/// Run one job to completion and return `(job_id, story_id)`.
async fn completed_story(test: &TestApp) -> (String, String) {
    let job_id = create_job(test, OWNER, create_body()).await;
    test.settle().await;
    let view = body_json(
        get(
            test.app(),
            &format!("/api/v1/jobs/{job_id}"),
            Some(&token_for(OWNER)),
        )
        .await,
    )
    .await;
    let story_id = view["data"]["storyId"].as_str().unwrap().to_string();
    (job_id, story_id)
}

// ---------------------------------------------------------------------------
// Test: the story of a completed job is readable by its owner
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_story_returns_narrative_and_charts() {
    let test = build_test_app(StubAnalysis::scripted([Ok(success())]));
    let (job_id, story_id) = completed_story(&test).await;

    let response = get(
        test.app(),
        &format!("/api/v1/stories/{story_id}"),
        Some(&token_for(OWNER)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let story = body_json(response).await["data"].clone();
    assert_eq!(story["storyId"], story_id.as_str());
    assert_eq!(story["jobId"], job_id.as_str());
    assert_eq!(story["title"], "q3 revenue");
    assert_eq!(
        story["narrative"]["summary"],
        "Revenue grew 12% quarter over quarter."
    );
    assert_eq!(story["charts"].as_array().unwrap().len(), 1);
    assert_eq!(story["charts"][0]["type"], "line");
    assert_eq!(story["statistics"]["rowCount"], 1200);
}

#[tokio::test]
async fn list_stories_is_scoped_to_caller() {
    let test = build_test_app(StubAnalysis::scripted([Ok(success())]));
    let (_, story_id) = completed_story(&test).await;

    let mine = body_json(get(test.app(), "/api/v1/stories", Some(&token_for(OWNER))).await).await;
    let mine = mine["data"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["storyId"], story_id.as_str());

    let theirs =
        body_json(get(test.app(), "/api/v1/stories", Some(&token_for(STRANGER))).await).await;
    assert_eq!(theirs["data"], json!([]));
}

// ---------------------------------------------------------------------------
// Test: ownership is enforced on read and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn foreign_story_is_forbidden() {
    let test = build_test_app(StubAnalysis::scripted([Ok(success())]));
    let (_, story_id) = completed_story(&test).await;
    let uri = format!("/api/v1/stories/{story_id}");

    let response = get(test.app(), &uri, Some(&token_for(STRANGER))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete(test.app(), &uri, Some(&token_for(STRANGER))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(test.app(), &uri, Some(&token_for(ADMIN))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: deleting a story leaves the job's record alone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_story_keeps_job_record() {
    let test = build_test_app(StubAnalysis::scripted([Ok(success())]));
    let (job_id, story_id) = completed_story(&test).await;
    let uri = format!("/api/v1/stories/{story_id}");
    let token = token_for(OWNER);

    let response = delete(test.app(), &uri, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(test.app(), &uri, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(test.app(), &uri, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let job = body_json(get(test.app(), &format!("/api/v1/jobs/{job_id}"), Some(&token)).await).await;
    assert_eq!(job["data"]["status"], "completed");
    assert_eq!(job["data"]["storyId"], story_id.as_str());
}
