mod common;

use axum::http::StatusCode;
use common::{MultipartBody, TestSite, body_text, location};
use pilabs_site::{
    ContentApi, MemoryContentApi,
    editor::{PostForm, SaveError, SaveRequest, save_post},
    models::{LoginRequest, MediaType, Post, PostPayload, PostStatus, PostType, UploadFile},
};

fn pdf(name: &str) -> UploadFile {
    UploadFile {
        filename: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4".to_vec(),
    }
}

async fn researcher_token(api: &MemoryContentApi) -> String {
    api.login(&LoginRequest {
        email: "researcher@example.com".to_string(),
        password: "password".to_string(),
    })
    .await
    .unwrap()
    .token
}

fn form(title: &str) -> PostForm {
    PostForm {
        title: title.to_string(),
        content: "Body text".to_string(),
        post_type: "field_study".to_string(),
        ..PostForm::default()
    }
}

// --- save_post directly ---

#[tokio::test]
async fn test_new_post_with_attachments_is_saved() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;

    let post = save_post(
        &api,
        &token,
        None,
        SaveRequest {
            form: form("Water Commons"),
            status: PostStatus::Submitted,
            featured_image: Some(UploadFile {
                filename: "cover.jpg".into(),
                content_type: "image/jpeg".into(),
                bytes: vec![1, 2, 3],
            }),
            attachments: vec![pdf("a.pdf"), pdf("b.pdf")],
        },
    )
    .await
    .unwrap();

    assert_eq!(post.status, PostStatus::Submitted);
    assert_eq!(post.post_type, PostType::FieldStudy);
    assert!(
        post.featured_image_url
            .as_deref()
            .is_some_and(|url| url.ends_with("/cover.jpg"))
    );

    let stored = api.post(&post.id).await.unwrap();
    let documents: Vec<_> = stored.documents().map(|m| m.title.clone()).collect();
    assert_eq!(documents, vec!["a.pdf", "b.pdf"]);
}

#[tokio::test]
async fn test_failed_attachment_removes_new_post_and_uploads() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;
    api.fail_uploads_after(2).await;

    let err = save_post(
        &api,
        &token,
        None,
        SaveRequest {
            form: form("Half Saved"),
            status: PostStatus::Draft,
            featured_image: Some(pdf("cover.jpg")),
            attachments: vec![pdf("a.pdf"), pdf("b.pdf")],
        },
    )
    .await
    .unwrap_err();

    match &err {
        SaveError::Upload { file, .. } => assert_eq!(file, "b.pdf"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.post_count().await, 0);
    assert!(api.all_media().await.is_empty());
}

#[tokio::test]
async fn test_failed_attachment_restores_updated_post() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;
    let original = api
        .insert_post(Post {
            title: "Original title".into(),
            content: "Original body".into(),
            status: PostStatus::Draft,
            author_id: Some("researcher-1".into()),
            ..Post::default()
        })
        .await;
    api.fail_uploads_after(0).await;

    let result = save_post(
        &api,
        &token,
        Some(&original),
        SaveRequest {
            form: form("Changed title"),
            status: PostStatus::Submitted,
            featured_image: None,
            attachments: vec![pdf("appendix.pdf")],
        },
    )
    .await;

    assert!(matches!(result, Err(SaveError::Upload { .. })));
    let stored = api.post(&original.id).await.unwrap();
    assert_eq!(stored.title, "Original title");
    assert_eq!(stored.content, "Original body");
    assert_eq!(stored.status, PostStatus::Draft);
}

#[tokio::test]
async fn test_failed_attachment_restores_rejected_post() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;
    let original = api
        .insert_post(Post {
            title: "Original title".into(),
            content: "Original body".into(),
            status: PostStatus::Rejected,
            feedback: Some("Cite your sources".into()),
            author_id: Some("researcher-1".into()),
            ..Post::default()
        })
        .await;
    api.fail_uploads_after(0).await;

    let err = save_post(
        &api,
        &token,
        Some(&original),
        SaveRequest {
            form: form("Changed title"),
            status: PostStatus::Submitted,
            featured_image: None,
            attachments: vec![pdf("appendix.pdf")],
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        SaveError::Upload {
            rolled_back: true,
            ..
        }
    ));
    assert!(err.user_message().contains("Nothing was saved"));
    let stored = api.post(&original.id).await.unwrap();
    assert_eq!(stored.title, "Original title");
    assert_eq!(stored.content, "Original body");
    assert_eq!(stored.status, PostStatus::Rejected);
    assert_eq!(stored.feedback.as_deref(), Some("Cite your sources"));
}

#[tokio::test]
async fn test_authors_cannot_set_rejected_status_outside_a_restore() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;
    let original = api
        .insert_post(Post {
            title: "Draft".into(),
            status: PostStatus::Draft,
            author_id: Some("researcher-1".into()),
            ..Post::default()
        })
        .await;

    let mut payload = PostPayload::from_post(&original);
    payload.status = PostStatus::Rejected;
    assert!(api.update_post(&token, &original.id, &payload).await.is_err());

    let restored = api
        .update_post(&token, &original.id, &PostPayload::restoring(&original))
        .await
        .unwrap();
    assert_eq!(restored.status, PostStatus::Draft);
}

#[tokio::test]
async fn test_failed_featured_image_saves_nothing() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;
    api.fail_uploads_after(0).await;

    let err = save_post(
        &api,
        &token,
        None,
        SaveRequest {
            form: form("Never Created"),
            status: PostStatus::Draft,
            featured_image: Some(pdf("cover.jpg")),
            attachments: vec![],
        },
    )
    .await
    .unwrap_err();

    assert!(err.user_message().contains("cover.jpg"));
    assert_eq!(api.post_count().await, 0);
}

#[tokio::test]
async fn test_blank_title_is_rejected_before_any_call() {
    let api = MemoryContentApi::new();

    let err = save_post(
        &api,
        "no-token-needed",
        None,
        SaveRequest {
            form: form("   "),
            status: PostStatus::Draft,
            ..SaveRequest::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SaveError::Invalid(_)));
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn test_only_draft_or_submitted_can_be_saved() {
    let api = MemoryContentApi::new();
    let token = researcher_token(&api).await;

    let err = save_post(
        &api,
        &token,
        None,
        SaveRequest {
            form: form("Self Published"),
            status: PostStatus::Published,
            ..SaveRequest::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SaveError::Invalid(_)));
    assert_eq!(api.post_count().await, 0);
}

#[tokio::test]
async fn test_expired_token_is_reported_as_unauthorized() {
    let api = MemoryContentApi::new();

    let err = save_post(
        &api,
        "expired",
        None,
        SaveRequest {
            form: form("Too Late"),
            status: PostStatus::Draft,
            ..SaveRequest::default()
        },
    )
    .await
    .unwrap_err();

    assert!(err.is_unauthorized());
}

// --- Through the editor routes ---

#[tokio::test]
async fn test_editor_creates_post_and_redirects() {
    let site = TestSite::new();
    let cookie = site.researcher().await;

    let body = MultipartBody::new()
        .text("title", "Seed Libraries")
        .text("type", "research")
        .text("category_id", "cat-3")
        .text("content", "Notes")
        .text("status", "submitted")
        .file("attachments", "report.pdf", "application/pdf", b"%PDF");
    let response = site
        .post_multipart("/dashboard/new-post", &cookie, body)
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    assert!(
        common::set_cookies(&response)
            .iter()
            .any(|c| c.contains("submitted%20for%20review"))
    );
    assert_eq!(site.api.post_count().await, 1);

    let dashboard = body_text(site.get("/dashboard", Some(&cookie)).await).await;
    assert!(dashboard.contains("Seed Libraries"));
}

#[tokio::test]
async fn test_editor_rerenders_input_when_an_upload_fails() {
    let site = TestSite::new();
    let cookie = site.researcher().await;
    site.api.fail_uploads_after(1).await;

    let body = MultipartBody::new()
        .text("title", "Grain Banks")
        .text("excerpt", "Keep this excerpt")
        .text("status", "draft")
        .file("attachments", "first.pdf", "application/pdf", b"%PDF")
        .file("attachments", "second.pdf", "application/pdf", b"%PDF");
    let response = site
        .post_multipart("/dashboard/new-post", &cookie, body)
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("second.pdf"));
    assert!(html.contains("Grain Banks"));
    assert!(html.contains("Keep this excerpt"));

    assert_eq!(site.api.post_count().await, 0);
    assert!(
        site.api
            .all_media()
            .await
            .iter()
            .all(|m| m.media_type != MediaType::Pdf)
    );
}

#[tokio::test]
async fn test_editing_someone_elses_post_is_not_found() {
    let site = TestSite::new();
    let foreign = site
        .api
        .insert_post(Post {
            title: "Admin Draft".into(),
            status: PostStatus::Draft,
            author_id: Some("admin-1".into()),
            ..Post::default()
        })
        .await;
    let cookie = site.researcher().await;

    let response = site
        .get(&format!("/dashboard/edit/{}", foreign.id), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_form_is_prefilled() {
    let site = TestSite::new();
    let post = site.submitted_post("Prefilled Title").await;
    let cookie = site.researcher().await;

    let response = site
        .get(&format!("/dashboard/edit/{}", post.id), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("value=\"Prefilled Title\""));
    assert!(html.contains("Edit post"));
}
