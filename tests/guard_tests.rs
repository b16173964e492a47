mod common;

use axum::http::StatusCode;
use common::{TestSite, location, set_cookies};

#[tokio::test]
async fn test_dashboard_requires_a_session() {
    let site = TestSite::new();

    let response = site.get("/dashboard", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_editor_requires_a_session() {
    let site = TestSite::new();

    let response = site.get("/dashboard/new-post", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_researcher_is_redirected_away_from_admin() {
    let site = TestSite::new();
    let cookie = site.researcher().await;

    let response = site.get("/admin", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_researcher_cannot_trigger_admin_actions() {
    let site = TestSite::new();
    let post = site.submitted_post("Pending Work").await;
    let cookie = site.researcher().await;

    let response = site
        .post_form(&format!("/admin/posts/{}/approve", post.id), Some(&cookie), "")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let stored = site.api.post(&post.id).await.unwrap();
    assert_eq!(stored.status, pilabs_site::models::PostStatus::Submitted);
}

#[tokio::test]
async fn test_admin_reaches_admin_dashboard() {
    let site = TestSite::new();
    let cookie = site.admin().await;

    let response = site.get("/admin", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_also_passes_the_researcher_tier() {
    let site = TestSite::new();
    let cookie = site.admin().await;

    let response = site.get("/dashboard", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_cookie_counts_as_signed_out() {
    let site = TestSite::new();

    let response = site
        .get("/dashboard", Some("pilabs_session=not.a.valid.jwt"))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_rejected_api_token_clears_session() {
    let site = TestSite::new();
    let cookie = site.stale_cookie("researcher-1");

    let response = site.get("/dashboard", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(
        set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("pilabs_session=") && c.contains("Max-Age=0"))
    );
}

#[tokio::test]
async fn test_login_sets_session_and_redirects_to_dashboard() {
    let site = TestSite::new();

    let response = site
        .post_form(
            "/login",
            None,
            "email=researcher%40example.com&password=password",
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    assert!(
        set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("pilabs_session=") && c.contains("HttpOnly"))
    );
}

#[tokio::test]
async fn test_bad_credentials_rerender_login_with_message() {
    let site = TestSite::new();

    let response = site
        .post_form("/login", None, "email=researcher%40example.com&password=wrong")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_text(response).await;
    assert!(body.contains("Invalid login credentials"));
    assert!(body.contains("researcher@example.com"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let site = TestSite::new();
    let cookie = site.researcher().await;

    let response = site.post_form("/logout", Some(&cookie), "").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(set_cookies(&response).iter().any(|c| c.contains("Max-Age=0")));
}
