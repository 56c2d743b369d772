mod common;

use std::sync::Arc;
use std::time::Duration;

use quiz_invite_backend::routes;
use serde_json::json;

use common::{
    bearer, call, database, fresh_code, linkage_count, online_state, seed_assessment,
    seed_question, seed_token, seed_user, RecordingNotifier,
};

#[tokio::test]
async fn invitation_to_graded_attempt() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let code = fresh_code();
    let recruiter = seed_user(&pool, "recruiter", Some(&code)).await;
    let student = seed_user(&pool, "student", None).await;
    let assessment = seed_assessment(&pool, recruiter, "Algebra").await;
    let (q1, q1_right, _) = seed_question(&pool, assessment, 9).await;
    let (q2, _, q2_wrong) = seed_question(&pool, assessment, 6).await;
    let token = seed_token(&pool, assessment, chrono::Duration::days(7), false).await;

    let (status, preview) = call(&app, "GET", &format!("/api/invites/validate/{}", token), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(preview["title"], "Algebra");
    assert_eq!(preview["questions"].as_array().map(Vec::len), Some(2));

    let student_auth = bearer(student, "student");
    let (status, redeemed) = call(&app, "POST", &format!("/api/invites/accept/{}", token), Some(&student_auth), None).await;
    assert_eq!(status, 200);
    assert_eq!(redeemed["outcome"], "linked");
    assert_eq!(redeemed["status"], "INVITED");
    assert_eq!(redeemed["recruiter_id"], recruiter.to_string());

    let (status, again) = call(&app, "POST", &format!("/api/invites/accept/{}", token), Some(&student_auth), None).await;
    assert_eq!(status, 200);
    assert_eq!(again["outcome"], "already_linked");
    assert_eq!(again["linkage_id"], redeemed["linkage_id"]);
    assert_eq!(linkage_count(&pool, student, assessment).await, 1);

    let (status, body) = call(&app, "POST", "/api/recruiter-code/link", Some(&student_auth), Some(json!({ "recruiter_code": code }))).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "already_linked");
    assert_eq!(linkage_count(&pool, student, assessment).await, 1);

    let (_, polled) = call(&app, "GET", &format!("/api/invites/status/{}", token), None, None).await;
    assert_eq!(polled["status"], "used");

    let (status, mine) = call(&app, "GET", "/api/user-assessments/students/me/assessments", Some(&student_auth), None).await;
    assert_eq!(status, 200);
    assert_eq!(mine[0]["assessment_id"], assessment);
    assert_eq!(mine[0]["status"], "INVITED");

    let (status, started) = call(
        &app,
        "POST",
        "/api/user-assessments/start",
        Some(&student_auth),
        Some(json!({ "assessment_id": assessment })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(started["user_assessment_id"], redeemed["linkage_id"]);

    let (status, result) = call(
        &app,
        "POST",
        &format!("/api/user-assessments/{}/submit", started["user_assessment_id"]),
        Some(&student_auth),
        Some(json!({ "answers": [
            { "question_id": q1, "selected_choice_id": q1_right },
            { "question_id": q2, "selected_choice_id": q2_wrong }
        ] })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(result["score"], 9);
    assert_eq!(result["total_marks"], 15);
    assert_eq!(result["percentage"], 60.0);

    let (_, mine) = call(&app, "GET", "/api/user-assessments/students/me/assessments", Some(&student_auth), None).await;
    assert_eq!(mine[0]["status"], "COMPLETED");
    assert_eq!(mine[0]["score_percentage"], 60.0);

    let recruiter_auth = bearer(recruiter, "recruiter");
    let (status, stats) = call(&app, "GET", "/api/user-assessments/recruiter/stats", Some(&recruiter_auth), None).await;
    assert_eq!(status, 200);
    assert_eq!(stats["total_assigned"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["passed"], 1);
    assert_eq!(stats["not_attempted"], 0);

    let (_, students) = call(&app, "GET", "/api/user-assessments/recruiter/students", Some(&recruiter_auth), None).await;
    assert_eq!(students[0]["student_id"], student.to_string());
    assert_eq!(students[0]["average_score"], 9.0);

    let answers_uri = format!("/api/user-assessments/{}/answers", started["user_assessment_id"]);
    let (status, answers) = call(&app, "GET", &answers_uri, Some(&student_auth), None).await;
    assert_eq!(status, 200);
    let answers = answers.as_array().expect("answers");
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0]["question_id"], q1);
    assert_eq!(answers[0]["is_correct"], true);
    assert_eq!(answers[1]["selected_choice_id"], q2_wrong);
    assert_eq!(answers[1]["is_correct"], false);

    let (status, _) = call(&app, "GET", &answers_uri, Some(&recruiter_auth), None).await;
    assert_eq!(status, 200);
    let stranger = seed_user(&pool, "student", None).await;
    let (status, body) = call(&app, "GET", &answers_uri, Some(&bearer(stranger, "student")), None).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "forbidden");
    let (status, _) = call(&app, "GET", "/api/user-assessments/999999999/answers", Some(&student_auth), None).await;
    assert_eq!(status, 404);

    let (status, stats) = call(&app, "GET", "/api/user-assessments/statistics", Some(&recruiter_auth), None).await;
    assert_eq!(status, 200);
    let total = stats["total_assessments_taken"].as_i64().expect("total");
    let completed = stats["completed_assessments"].as_i64().expect("completed");
    assert!(completed >= 1 && total >= completed);
    let rate = stats["completion_rate"].as_f64().expect("rate");
    assert!(rate > 0.0 && rate <= 100.0);
    let (status, _) = call(&app, "GET", "/api/user-assessments/statistics", Some(&student_auth), None).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn fresh_token_for_held_linkage_is_consumed() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let code = fresh_code();
    let recruiter = seed_user(&pool, "recruiter", Some(&code)).await;
    let student = seed_user(&pool, "student", None).await;
    let assessment = seed_assessment(&pool, recruiter, "Physics").await;
    let auth = bearer(student, "student");

    let (status, _) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": code }))).await;
    assert_eq!(status, 200);

    let token = seed_token(&pool, assessment, chrono::Duration::days(7), false).await;
    let (status, body) = call(&app, "POST", &format!("/api/invites/accept/{}", token), Some(&auth), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["outcome"], "already_linked");

    let used = sqlx::query_scalar::<_, bool>("SELECT used FROM invite_tokens WHERE token = $1")
        .bind(&token)
        .fetch_one(&pool)
        .await
        .expect("token row");
    assert!(used);
    assert_eq!(linkage_count(&pool, student, assessment).await, 1);
}

#[tokio::test]
async fn concurrent_links_by_one_student_link_once() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let code = fresh_code();
    let recruiter = seed_user(&pool, "recruiter", Some(&code)).await;
    let student = seed_user(&pool, "student", None).await;
    let assessment = seed_assessment(&pool, recruiter, "Chemistry").await;
    let auth = bearer(student, "student");
    let body = json!({ "recruiter_code": code });

    let ((first, _), (second, _)) = tokio::join!(
        call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(body.clone())),
        call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(body.clone())),
    );
    let mut statuses = [first, second];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);
    assert_eq!(linkage_count(&pool, student, assessment).await, 1);
}

#[tokio::test]
async fn used_token_is_refused_to_someone_else() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let recruiter = seed_user(&pool, "recruiter", Some(&fresh_code())).await;
    let first = seed_user(&pool, "student", None).await;
    let second = seed_user(&pool, "student", None).await;
    let assessment = seed_assessment(&pool, recruiter, "History").await;
    let token = seed_token(&pool, assessment, chrono::Duration::days(1), false).await;

    let (status, _) = call(&app, "POST", &format!("/api/invites/accept/{}", token), Some(&bearer(first, "student")), None).await;
    assert_eq!(status, 200);
    let (status, body) = call(&app, "POST", &format!("/api/invites/accept/{}", token), Some(&bearer(second, "student")), None).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "invite_already_used");
    assert_eq!(linkage_count(&pool, second, assessment).await, 0);
}

#[tokio::test]
async fn concurrent_redemptions_link_once() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let recruiter = seed_user(&pool, "recruiter", Some(&fresh_code())).await;
    let a = seed_user(&pool, "student", None).await;
    let b = seed_user(&pool, "student", None).await;
    let assessment = seed_assessment(&pool, recruiter, "Race").await;
    let token = seed_token(&pool, assessment, chrono::Duration::days(1), false).await;
    let uri = format!("/api/invites/accept/{}", token);
    let auth_a = bearer(a, "student");
    let auth_b = bearer(b, "student");

    let ((status_a, _), (status_b, _)) = tokio::join!(
        call(&app, "POST", &uri, Some(&auth_a), None),
        call(&app, "POST", &uri, Some(&auth_b), None),
    );
    let mut statuses = [status_a, status_b];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);

    let total = linkage_count(&pool, a, assessment).await + linkage_count(&pool, b, assessment).await;
    assert_eq!(total, 1);
}

#[tokio::test]
async fn expiry_and_use_precedence() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let recruiter = seed_user(&pool, "recruiter", Some(&fresh_code())).await;
    let student = seed_user(&pool, "student", None).await;
    let assessment = seed_assessment(&pool, recruiter, "Stale").await;
    let expired = seed_token(&pool, assessment, chrono::Duration::hours(-1), false).await;
    let used_and_expired = seed_token(&pool, assessment, chrono::Duration::hours(-1), true).await;
    let auth = bearer(student, "student");

    let (status, body) = call(&app, "POST", &format!("/api/invites/accept/{}", expired), Some(&auth), None).await;
    assert_eq!(status, 410);
    assert_eq!(body["error"], "invite_expired");
    let (status, _) = call(&app, "GET", &format!("/api/invites/validate/{}", expired), None, None).await;
    assert_eq!(status, 410);
    let (_, polled) = call(&app, "GET", &format!("/api/invites/status/{}", expired), None, None).await;
    assert_eq!(polled["status"], "expired");

    let (status, body) = call(&app, "POST", &format!("/api/invites/accept/{}", used_and_expired), Some(&auth), None).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "invite_already_used");

    let (status, body) = call(&app, "POST", "/api/invites/accept/does-not-exist", Some(&auth), None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "invite_not_found");
    let (_, polled) = call(&app, "GET", "/api/invites/status/does-not-exist", None, None).await;
    assert_eq!(polled["status"], "not_found");
    assert_eq!(linkage_count(&pool, student, assessment).await, 0);
}

#[tokio::test]
async fn linking_by_code_is_idempotent() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let code = fresh_code();
    let recruiter = seed_user(&pool, "recruiter", Some(&code)).await;
    let student = seed_user(&pool, "student", None).await;
    let first = seed_assessment(&pool, recruiter, "One").await;
    let second = seed_assessment(&pool, recruiter, "Two").await;
    let auth = bearer(student, "student");

    let (status, body) = call(
        &app,
        "POST",
        "/api/recruiter-code/validate",
        None,
        Some(json!({ "recruiter_code": format!("  {}  ", code.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["recruiter_id"], recruiter.to_string());

    let (status, linked) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": code }))).await;
    assert_eq!(status, 200);
    assert_eq!(linked["linked_assessment_count"], 2);
    assert_eq!(linked["linked_assessments"][0]["id"], first);
    assert_eq!(linked["linked_assessments"][1]["id"], second);

    let (status, body) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": code }))).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "already_linked");
    assert_eq!(linkage_count(&pool, student, first).await, 1);

    let (_, mine) = call(&app, "GET", "/api/recruiter-code/my-recruiter", Some(&auth), None).await;
    assert_eq!(mine["recruiter"]["id"], recruiter.to_string());
    let (_, listed) = call(&app, "GET", "/api/recruiter-code/recruiter-assessments", Some(&auth), None).await;
    assert_eq!(listed["assessments"].as_array().map(Vec::len), Some(2));

    let (status, body) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": "ZZZZ-ZZZ" }))).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_recruiter_code");
}

#[tokio::test]
async fn second_recruiter_keeps_primary_link() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let first_code = fresh_code();
    let second_code = fresh_code();
    let first = seed_user(&pool, "recruiter", Some(&first_code)).await;
    let second = seed_user(&pool, "recruiter", Some(&second_code)).await;
    seed_assessment(&pool, first, "First").await;
    seed_assessment(&pool, second, "Second").await;
    let student = seed_user(&pool, "student", None).await;
    let auth = bearer(student, "student");

    let (status, _) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": first_code }))).await;
    assert_eq!(status, 200);
    let (status, _) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": second_code }))).await;
    assert_eq!(status, 200);

    let (_, mine) = call(&app, "GET", "/api/recruiter-code/my-recruiter", Some(&auth), None).await;
    assert_eq!(mine["recruiter"]["id"], first.to_string());
    let (_, all) = call(&app, "GET", "/api/user-assessments/students/me/assessments", Some(&auth), None).await;
    assert_eq!(all.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn direct_and_recruiter_linkages_merge() {
    let Some(pool) = database().await else { return };
    let app = routes::router(online_state(pool.clone(), Arc::new(RecordingNotifier::default())));

    let code = fresh_code();
    let recruiter = seed_user(&pool, "recruiter", Some(&code)).await;
    let student = seed_user(&pool, "student", None).await;
    let shared = seed_assessment(&pool, recruiter, "Shared").await;
    seed_assessment(&pool, recruiter, "Only via code").await;
    sqlx::query("INSERT INTO user_assessments (user_id, assessment_id, status) VALUES ($1, $2, 'pending')")
        .bind(student)
        .bind(shared)
        .execute(&pool)
        .await
        .expect("direct linkage");
    let auth = bearer(student, "student");

    let (status, _) = call(&app, "POST", "/api/recruiter-code/link", Some(&auth), Some(json!({ "recruiter_code": code }))).await;
    assert_eq!(status, 200);
    assert_eq!(linkage_count(&pool, student, shared).await, 2);

    let (_, mine) = call(&app, "GET", "/api/user-assessments/students/me/assessments", Some(&auth), None).await;
    let entries = mine.as_array().expect("list");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["assessment_id"], shared);
    assert_eq!(entries[0]["status"], "PENDING");
}

#[tokio::test]
async fn sending_invites_assigns_code_and_reports_failures() {
    let Some(pool) = database().await else { return };
    let notifier = Arc::new(RecordingNotifier::default());
    let app = routes::router(online_state(pool.clone(), notifier.clone()));

    let recruiter = seed_user(&pool, "recruiter", None).await;
    let outsider = seed_user(&pool, "recruiter", None).await;
    let assessment = seed_assessment(&pool, recruiter, "Geometry").await;
    let auth = bearer(recruiter, "recruiter");

    let (status, summary) = call(
        &app,
        "POST",
        "/api/invites/send",
        Some(&auth),
        Some(json!({ "assessment_id": assessment, "emails": ["pupil@example.com", "not-an-email"] })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(summary["successful_count"], 1);
    assert_eq!(summary["failed_count"], 1);
    assert_eq!(summary["failed_invites"][0]["email"], "not-an-email");
    assert!(summary["warning"].is_string());

    let (_, first) = call(&app, "GET", "/api/recruiter-code/me", Some(&auth), None).await;
    let (_, second) = call(&app, "GET", "/api/recruiter-code/me", Some(&auth), None).await;
    let code = first["recruiter_code"].as_str().expect("code").to_string();
    assert_eq!(code.len(), 8);
    assert_eq!(second["recruiter_code"], code.as_str());

    let mut delivered = Vec::new();
    for _ in 0..50 {
        delivered = notifier.sent.lock().await.clone();
        if !delivered.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].to, "pupil@example.com");
    assert!(delivered[0].html.contains(&code));

    let (created_at, expires_at) = sqlx::query_as::<_, (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)>(
        "SELECT created_at, expires_at FROM invite_tokens WHERE assessment_id = $1",
    )
    .bind(assessment)
    .fetch_one(&pool)
    .await
    .expect("issued token");
    assert_eq!(expires_at - created_at, chrono::Duration::days(7));
    assert!(expires_at > chrono::Utc::now() + chrono::Duration::days(6));

    let (status, _) = call(
        &app,
        "POST",
        "/api/invites/send",
        Some(&bearer(outsider, "recruiter")),
        Some(json!({ "assessment_id": assessment, "emails": ["pupil@example.com"] })),
    )
    .await;
    assert_eq!(status, 404);
}
