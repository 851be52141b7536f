// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile editor API tests: load, validation, avatar upload and merge writes.

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;

mod common;

const PNG_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[tokio::test]
async fn test_load_form_uses_default_avatar() {
    let (app, state) = common::create_test_app();
    let (_, token, _) = common::signup_and_login(&app, "alice", "alice@example.com", "secret1").await;

    let response = common::send_json(&app, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let form = common::body_json(response).await;
    assert_eq!(form["name"], "");
    assert_eq!(form["bio"], chat_app::models::user::DEFAULT_BIO);
    assert_eq!(
        form["previous_avatar"],
        state.config.default_avatar_url.as_str()
    );
}

#[tokio::test]
async fn test_empty_name_is_rejected_without_writing() {
    let (app, state) = common::create_test_app();
    let (uid, token, _) =
        common::signup_and_login(&app, "bob", "bob@example.com", "secret1").await;
    let before = state.db.get_user(&uid).await.unwrap().unwrap();

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"name": "   ", "bio": "new bio"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = common::body_json(response).await;
    assert_eq!(error["error"], "validation_error");
    assert_eq!(error["details"], "Name cannot be empty!");

    let after = state.db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(before.bio, after.bio);
    assert_eq!(before.name, after.name);
}

#[tokio::test]
async fn test_save_without_image_keeps_previous_avatar() {
    let (app, state) = common::create_test_app();
    let (uid, token, _) =
        common::signup_and_login(&app, "carol", "carol@example.com", "secret1").await;

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"name": "Carol", "bio": "hello"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = common::body_json(response).await;
    assert_eq!(outcome["route"], "/chat");
    assert_eq!(outcome["message"], "Profile updated successfully!");
    assert_eq!(outcome["profile"]["name"], "Carol");

    let stored = state.db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.name, "Carol");
    assert_eq!(stored.bio, "hello");
    assert_eq!(stored.avatar, state.config.default_avatar_url);
    // Fields outside the form are untouched
    assert_eq!(stored.username, "carol");
    assert_eq!(stored.email, "carol@example.com");

    // The session sees the republished profile
    let snapshot = state.sessions.snapshot(&uid);
    assert_eq!(snapshot.profile.as_ref().unwrap().name, "Carol");
}

#[tokio::test]
async fn test_repeated_save_is_idempotent() {
    let (app, state) = common::create_test_app();
    let (uid, token, _) =
        common::signup_and_login(&app, "dave", "dave@example.com", "secret1").await;
    let body = json!({"name": "Dave", "bio": "same"});

    let mut stored = Vec::new();
    for _ in 0..2 {
        let response =
            common::send_json(&app, "PUT", "/api/profile", Some(&token), Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let mut profile = state.db.get_user(&uid).await.unwrap().unwrap();
        // The heartbeat may move lastSeen between saves
        profile.last_seen = 0;
        stored.push(profile);
    }
    assert_eq!(stored[0], stored[1]);
}

#[tokio::test]
async fn test_save_with_image_uploads_avatar() {
    let (app, state) = common::create_test_app();
    let (uid, token, _) =
        common::signup_and_login(&app, "erin", "erin@example.com", "secret1").await;

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({
            "name": "Erin",
            "bio": "pic",
            "avatar_image": {
                "filename": "me.png",
                "content_type": "image/png",
                "data_base64": BASE64.encode(PNG_BYTES),
            }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = common::body_json(response).await;
    let avatar = outcome["profile"]["avatar"].as_str().unwrap().to_string();
    assert!(avatar.starts_with("memory://"));
    assert!(avatar.contains(&format!("images/{}/", uid)));
    assert!(avatar.ends_with("_me.png"));

    let stored = state.db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.avatar, avatar);

    // A later save without an image keeps the uploaded avatar
    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"name": "Erin B", "bio": "pic"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = state.db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.avatar, avatar);
    assert_eq!(stored.name, "Erin B");
}

#[tokio::test]
async fn test_invalid_base64_is_bad_request() {
    let (app, _) = common::create_test_app();
    let (_, token, _) = common::signup_and_login(&app, "frank", "frank@example.com", "secret1").await;

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({
            "name": "Frank",
            "bio": "",
            "avatar_image": {
                "filename": "me.png",
                "content_type": "image/png",
                "data_base64": "not base64 !!!",
            }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_image_type_is_rejected() {
    let (app, state) = common::create_test_app();
    let (uid, token, _) =
        common::signup_and_login(&app, "gina", "gina@example.com", "secret1").await;

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({
            "name": "Gina",
            "bio": "",
            "avatar_image": {
                "filename": "me.gif",
                "content_type": "image/gif",
                "data_base64": BASE64.encode(b"GIF89a"),
            }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = state.db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.name, "");
}

#[tokio::test]
async fn test_overlong_bio_is_rejected() {
    let (app, _) = common::create_test_app();
    let (_, token, _) = common::signup_and_login(&app, "hank", "hank@example.com", "secret1").await;

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"name": "Hank", "bio": "b".repeat(501)})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_editor_recovers_after_failed_save() {
    let (app, _) = common::create_test_app();
    let (_, token, _) = common::signup_and_login(&app, "ivy", "ivy@example.com", "secret1").await;

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"name": "", "bio": ""})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = common::send_json(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({"name": "Ivy", "bio": ""})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
