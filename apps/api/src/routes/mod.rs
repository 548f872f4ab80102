pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::{handle_auth, require_auth};
use crate::resumes::handlers::{handle_get_file, handle_get_resume, handle_list_resumes};
use crate::state::AppState;
use crate::workflow::handlers::{handle_upload, handle_upload_status, MAX_UPLOAD_BYTES};

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/v1/uploads",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/uploads/:submission_id", get(handle_upload_status))
        .route("/api/v1/resumes", get(handle_list_resumes))
        .route("/api/v1/resumes/:id", get(handle_get_resume))
        .route("/api/v1/files/*path", get(handle_get_file))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth", get(handle_auth))
        .merge(protected)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::StaticTokenAuth;
    use crate::resumes::repository::ResumeRepository;
    use crate::submissions::SubmissionTracker;
    use crate::testing::{
        MemoryBlobStore, MemoryKvStore, Reply, ScriptedFeedback, StaticConverter,
    };
    use crate::workflow::UploadWorkflow;

    const BOUNDARY: &str = "resumind-test-boundary";
    const TOKEN: &str = "Bearer tok-a";

    fn app_with(ai: ScriptedFeedback) -> Router {
        let resumes = ResumeRepository::new(Arc::new(MemoryKvStore::default()));
        let blobs = Arc::new(MemoryBlobStore::default());
        let workflow = UploadWorkflow::new(
            blobs.clone(),
            Arc::new(StaticConverter::producing_png()),
            resumes.clone(),
            Arc::new(ai),
        );
        build_router(AppState {
            workflow: Arc::new(workflow),
            resumes,
            blobs,
            submissions: Arc::new(SubmissionTracker::default()),
            auth: Arc::new(StaticTokenAuth::from_config("alice:tok-a").unwrap()),
        })
    }

    fn app() -> Router {
        app_with(ScriptedFeedback::text(
            "Here is the result: {\"overallScore\": 82} Thanks",
        ))
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::from(body))
            .unwrap()
    }

    fn authed_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn resume_form() -> Vec<u8> {
        multipart_body(
            &[
                ("company-name", "Acme"),
                ("job-title", "Platform Engineer"),
                ("job-description", "Rust and Kubernetes"),
            ],
            Some(("resume.pdf", "application/pdf", b"%PDF-1.7 body")),
        )
    }

    async fn wait_for_terminal(app: &Router, submission_id: &str) -> Value {
        for _ in 0..100 {
            let response = app
                .clone()
                .oneshot(authed_get(&format!("/api/v1/uploads/{submission_id}")))
                .await
                .unwrap();
            let status = json_body(response).await;
            if status["stage"] == "complete" || status["stage"] == "failed" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("submission {submission_id} never finished");
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_protected_route_redirects_to_login() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/resumes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth?next=%2Fapi%2Fv1%2Fresumes"
        );
    }

    #[tokio::test]
    async fn test_invalid_token_redirects_to_login() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/resumes")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_auth_forwards_authenticated_user_to_next() {
        let response = app()
            .oneshot(authed_get("/auth?next=%2Fupload"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/upload");
    }

    #[tokio::test]
    async fn test_auth_ignores_offsite_next() {
        let response = app()
            .oneshot(authed_get("/auth?next=https%3A%2F%2Fevil.example"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_auth_without_token_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/auth").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_upload_runs_workflow_to_completion() {
        let app = app();

        let response = app.clone().oneshot(upload_request(resume_form())).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let accepted = json_body(response).await;
        let submission_id = accepted["submissionId"].as_str().unwrap().to_string();

        let status = wait_for_terminal(&app, &submission_id).await;
        assert_eq!(status["stage"], "complete");
        assert_eq!(status["statusText"], "Analysis Complete");
        let resume_id = status["resumeId"].as_str().unwrap().to_string();
        assert_eq!(status["redirectTo"], format!("/resume/{resume_id}"));

        let response = app
            .clone()
            .oneshot(authed_get(&format!("/api/v1/resumes/{resume_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = json_body(response).await;
        assert_eq!(record["companyName"], "Acme");
        assert_eq!(record["resumePath"], "blob/1/resume.pdf");
        assert_eq!(record["imagePath"], "blob/2/resume.png");
        assert_eq!(record["feedback"], json!({"overallScore": 82}));

        let response = app.oneshot(authed_get("/api/v1/resumes")).await.unwrap();
        let list = json_body(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["overallScore"], json!(82.0));
        assert_eq!(list[0]["jobTitle"], "Platform Engineer");
    }

    #[tokio::test]
    async fn test_failed_analysis_reports_error_and_allows_resubmission() {
        let app = app_with(ScriptedFeedback::text("no json here"));

        let response = app.clone().oneshot(upload_request(resume_form())).await.unwrap();
        let submission_id = json_body(response).await["submissionId"]
            .as_str()
            .unwrap()
            .to_string();

        let status = wait_for_terminal(&app, &submission_id).await;
        assert_eq!(status["stage"], "failed");
        assert_eq!(status["statusText"], "Error: AI did not return a JSON object");

        let response = app.oneshot(upload_request(resume_form())).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_crashed_analysis_fails_and_frees_the_user() {
        let app = app_with(ScriptedFeedback::new(Reply::Panic));

        let response = app.clone().oneshot(upload_request(resume_form())).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let submission_id = json_body(response).await["submissionId"]
            .as_str()
            .unwrap()
            .to_string();

        let status = wait_for_terminal(&app, &submission_id).await;
        assert_eq!(status["stage"], "failed");
        assert_eq!(status["statusText"], "Error: Analysis stopped unexpectedly");

        let response = app.oneshot(upload_request(resume_form())).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_preview_image_is_served_from_its_record_path() {
        let app = app();

        let response = app.clone().oneshot(upload_request(resume_form())).await.unwrap();
        let submission_id = json_body(response).await["submissionId"]
            .as_str()
            .unwrap()
            .to_string();
        let status = wait_for_terminal(&app, &submission_id).await;
        let resume_id = status["resumeId"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(authed_get(&format!("/api/v1/resumes/{resume_id}")))
            .await
            .unwrap();
        let image_path = json_body(response).await["imagePath"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(authed_get(&format!("/api/v1/files/{image_path}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_unknown_file_is_not_found() {
        let response = app()
            .oneshot(authed_get("/api/v1/files/blob/9/missing.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_files_require_authentication() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/files/blob/1/resume.pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let body = multipart_body(&[("company-name", "Acme")], None);
        let response = app().oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "Please select a file to analyze."
        );
    }

    #[tokio::test]
    async fn test_upload_of_non_pdf_is_rejected() {
        let body = multipart_body(&[], Some(("cv.docx", "application/msword", b"PK\x03\x04")));
        let response = app().oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_resume_is_not_found() {
        let response = app()
            .oneshot(authed_get(&format!("/api/v1/resumes/{}", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_submission_is_not_found() {
        let response = app()
            .oneshot(authed_get(&format!("/api/v1/uploads/{}", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
