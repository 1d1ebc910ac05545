use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use devdir::auth::TokenGenerator;
use devdir::github::GithubClient;
use devdir::server::{AppState, create_router};
use devdir::store::{SqliteStore, Store};

/// A stand-in GitHub API. `/user/emails` answers from the bearer token so
/// tests can steer the fallback email lookup; everything else 404s, which
/// exercises the degrade-gracefully paths of save-time enrichment.
async fn spawn_mock_github() -> String {
    use axum::{Json, Router, http::HeaderMap, routing::get};

    let app = Router::new().route(
        "/user/emails",
        get(|headers: HeaderMap| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            let emails = if auth.ends_with("gho_hidden") {
                json!([{"email": "hidden@tec.mx", "primary": true, "verified": true}])
            } else {
                json!([{"email": "personal@gmail.com", "primary": true, "verified": true}])
            };
            Json(emails)
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Boots a server on an ephemeral port backed by a throwaway database and
/// the mock GitHub upstream.
async fn spawn_server() -> (String, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("devdir.db")).unwrap();
    store.initialize().unwrap();

    let state = Arc::new(AppState {
        store: Arc::new(store),
        github: GithubClient::new(spawn_mock_github().await),
        tokens: TokenGenerator::new(),
        allowed_domains: vec!["@tec.mx".to_string(), "@exatec.mx".to_string()],
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), dir)
}

async fn sign_in(client: &reqwest::Client, base: &str, login: &str, email: &str) -> (String, String) {
    let resp: Value = client
        .post(format!("{base}/api/v1/auth/signin"))
        .json(&json!({
            "github_login": login,
            "name": format!("User {login}"),
            "email": email,
            "access_token": "gho_test",
        }))
        .send()
        .await
        .expect("sign in")
        .json()
        .await
        .expect("parse sign-in response");

    let token = resp["data"]["token"].as_str().expect("token").to_string();
    let user_id = resp["data"]["user"]["id"]
        .as_str()
        .expect("user id")
        .to_string();
    (token, user_id)
}

async fn create_project(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    name: &str,
    category: &str,
) -> String {
    let resp = client
        .post(format!("{base}/api/v1/projects"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "description": format!("{name} does things"),
            "category": category,
            "tags": ["testing"],
        }))
        .send()
        .await
        .expect("create project");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("parse project");
    body["data"]["id"].as_str().expect("project id").to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signin_gate_rejects_outside_domains() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/auth/signin"))
        .json(&json!({
            "github_login": "outsider",
            "name": "Outsider",
            "email": "outsider@gmail.com",
            "access_token": "gho_test",
        }))
        .send()
        .await
        .unwrap();

    // Profile email misses and the account's email list has no community
    // address either.
    assert_eq!(resp.status(), 403);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signin_falls_back_to_hidden_verified_email() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/auth/signin"))
        .json(&json!({
            "github_login": "private-eye",
            "name": "Private Eye",
            "access_token": "gho_hidden",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["school_email"], "hidden@tec.mx");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signin_issues_usable_token() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let (token, user_id) = sign_in(&client, &base, "ada", "ada@tec.mx").await;
    assert!(token.starts_with("devdir_"));

    let me: Value = client
        .get(format!("{base}/api/v1/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["id"], user_id);
    assert_eq!(me["data"]["school_email"], "ada@tec.mx");

    // Second sign-in reuses the account.
    let (_token2, user_id2) = sign_in(&client, &base, "ada", "ada@tec.mx").await;
    assert_eq!(user_id, user_id2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signout_invalidates_the_session() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, _) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    let resp = client
        .post(format!("{base}/api/v1/auth/signout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("{base}/api/v1/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn project_listing_filters_and_paginates() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, _) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    for i in 0..3 {
        create_project(&client, &base, &token, &format!("web-{i}"), "Web Development").await;
    }
    create_project(&client, &base, &token, "game-0", "Game Development").await;

    let page: Value = client
        .get(format!(
            "{base}/api/v1/projects?category=Web%20Development&limit=2"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["has_more"], true);

    let cursor = page["next_cursor"].as_str().expect("cursor");
    let page2: Value = client
        .get(format!(
            "{base}/api/v1/projects?category=Web%20Development&limit=2&cursor={cursor}"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page2["data"].as_array().unwrap().len(), 1);
    assert_eq!(page2["has_more"], false);

    // Unknown category labels are a client error.
    let resp = client
        .get(format!("{base}/api/v1/projects?category=Blockchain"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mutations_require_membership() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (owner, _) = sign_in(&client, &base, "owner", "owner@tec.mx").await;
    let (stranger, _) = sign_in(&client, &base, "stranger", "stranger@exatec.mx").await;

    let id = create_project(&client, &base, &owner, "solo", "CLI").await;

    let update = json!({
        "name": "solo renamed",
        "description": "still does things",
        "category": "CLI",
        "tags": [],
    });

    let resp = client
        .put(format!("{base}/api/v1/projects/{id}"))
        .bearer_auth(&stranger)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(format!("{base}/api/v1/projects/{id}/can-edit"))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["can_edit"], false);

    // Non-member deletes look like a missing project.
    let resp = client
        .delete(format!("{base}/api/v1/projects/{id}"))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .put(format!("{base}/api/v1/projects/{id}"))
        .bearer_auth(&owner)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "solo renamed");

    let resp = client
        .delete(format!("{base}/api/v1/projects/{id}"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn like_toggle_round_trips() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, _) = sign_in(&client, &base, "ada", "ada@tec.mx").await;
    let id = create_project(&client, &base, &token, "likeable", "Other").await;

    for expected in [true, false, true] {
        let body: Value = client
            .post(format!("{base}/api/v1/projects/{id}/like"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"]["liked"], expected);
    }

    let body: Value = client
        .get(format!("{base}/api/v1/projects/{id}/likes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["likes"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn preferences_redact_public_profiles() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, user_id) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    // Hidden by default.
    let body: Value = client
        .get(format!("{base}/api/v1/users/{user_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"]["school_email"].is_null());

    let resp = client
        .patch(format!("{base}/api/v1/me/preferences"))
        .bearer_auth(&token)
        .json(&json!({"show_school_email": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .get(format!("{base}/api/v1/users/{user_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["school_email"], "ada@tec.mx");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn organizations_round_trip() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, user_id) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    // Logo enrichment fails against the dead upstream and is skipped.
    let resp = client
        .post(format!("{base}/api/v1/organizations"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Robotics Club",
            "description": "Builds robots",
            "url": "https://github.com/robotics-club",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let org_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["members"][0]["id"], user_id);
    assert_eq!(body["data"]["member_count"], 1);

    let body: Value = client
        .get(format!("{base}/api/v1/organizations/names"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"][0]["id"], org_id);
    assert_eq!(body["data"][0]["name"], "Robotics Club");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stats_and_catalog_are_public() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{base}/api/v1/stats/languages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total_projects"], 0);

    let body: Value = client
        .get(format!("{base}/api/v1/catalog"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["categories"].as_array().unwrap().len(), 11);
    assert!(
        body["data"]["popular_tags"]
            .as_array()
            .unwrap()
            .contains(&json!("React"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn work_experience_respects_visibility_flag() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, user_id) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    let resp = client
        .post(format!("{base}/api/v1/me/experience"))
        .bearer_auth(&token)
        .json(&json!({
            "position": "Backend Intern",
            "company": "Acme",
            "location": "Monterrey",
            "started_at": "2024-01-15T00:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{base}/api/v1/me/links"))
        .bearer_auth(&token)
        .json(&json!({
            "url": "https://ada.dev",
            "link_type": "Portfolio",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Visible by default.
    let body: Value = client
        .get(format!("{base}/api/v1/users/{user_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["work_experience"][0]["company"], "Acme");
    assert_eq!(body["data"]["links"][0]["link_type"], "Portfolio");

    let resp = client
        .patch(format!("{base}/api/v1/me/preferences"))
        .bearer_auth(&token)
        .json(&json!({"show_work_experience": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Experience is redacted; links stay public.
    let body: Value = client
        .get(format!("{base}/api/v1/users/{user_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["data"]["work_experience"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["links"].as_array().unwrap().len(), 1);

    // The owner still sees everything.
    let body: Value = client
        .get(format!("{base}/api/v1/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["work_experience"][0]["position"], "Backend Intern");

    let entry_id = body["data"]["work_experience"][0]["id"].as_str().unwrap();
    let resp = client
        .delete(format!("{base}/api/v1/me/experience/{entry_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn liked_checks_follow_project_existence() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, _) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    let resp = client
        .get(format!("{base}/api/v1/projects/ghost/liked"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let project_id = create_project(&client, &base, &token, "Liked", "CLI").await;
    let body: Value = client
        .get(format!("{base}/api/v1/projects/{project_id}/liked"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["liked"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_requires_a_github_url() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let (token, _) = sign_in(&client, &base, "ada", "ada@tec.mx").await;

    let project_id = create_project(&client, &base, &token, "Local Only", "CLI").await;
    let resp = client
        .post(format!("{base}/api/v1/projects/{project_id}/refresh"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
