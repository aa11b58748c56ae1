/// Integration tests for the rosterd API
///
/// These tests drive the real router end-to-end against PostgreSQL:
/// - user and organization CRUD with per-action permissions
/// - the validation pipeline (uniqueness, phone format, field limits)
/// - token issuance and refresh
/// - membership replacement semantics
/// - avatar upload, storage, and post-processing

mod common;

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{bare_request, body_json, json_request, TestContext, TEST_PASSWORD};
use rosterd_shared::models::{CreateOrganization, Membership, Organization, User};
use serde_json::json;
use tower::Service as _;
use uuid::Uuid;

fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4())
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 30, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test image");
    out.into_inner()
}

#[tokio::test]
async fn test_self_registration_normalizes_email() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": "New.Person@Example.COM",
            "password": TEST_PASSWORD,
            "first_name": "New",
            "last_name": "Person"
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["email"], "New.Person@example.com");
    assert_eq!(body["is_staff"], false);
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
    User::delete(&ctx.db, id).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_email_rejected_with_field_details() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let existing = ctx.create_user(false).await;

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": existing.email,
            "password": TEST_PASSWORD,
            "first_name": "Dup",
            "last_name": "Licate"
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["email"][0]
        .as_str()
        .unwrap()
        .contains("already exists"));

    User::delete(&ctx.db, existing.id).await.unwrap();
}

#[tokio::test]
async fn test_invalid_phone_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": unique_email(),
            "password": TEST_PASSWORD,
            "first_name": "Phone",
            "last_name": "Check",
            "phone": "invalid_phone"
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["details"]["phone"][0].is_string());
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": unique_email(),
            "password": "alllowercase",
            "first_name": "Weak",
            "last_name": "Password"
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["details"]["password"][0].is_string());
}

#[tokio::test]
async fn test_missing_names_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    // Credentials alone are not enough; both name fields are required
    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": unique_email(),
            "password": TEST_PASSWORD
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["first_name"][0].is_string());
    assert!(body["details"]["last_name"][0].is_string());
}

#[tokio::test]
async fn test_user_retrieval_permissions() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let alice = ctx.create_user(false).await;
    let bob = ctx.create_user(false).await;
    let staff = ctx.create_user(true).await;
    let alice_token = ctx.token_for(&alice);
    let staff_token = ctx.token_for(&staff);

    // Self: allowed
    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            &format!("/api/users/{}", alice.id),
            Some(&alice_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Another user: forbidden
    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            &format!("/api/users/{}", bob.id),
            Some(&alice_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff: allowed for anyone
    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            &format!("/api/users/{}", bob.id),
            Some(&staff_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Anonymous: unauthorized
    let response = ctx
        .app
        .clone()
        .call(bare_request("GET", &format!("/api/users/{}", bob.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for user in [alice, bob, staff] {
        User::delete(&ctx.db, user.id).await.unwrap();
    }
}

#[tokio::test]
async fn test_user_list_staff_only() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let regular = ctx.create_user(false).await;
    let staff = ctx.create_user(true).await;

    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            "/api/users",
            Some(&ctx.token_for(&regular)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            "/api/users",
            Some(&ctx.token_for(&staff)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    User::delete(&ctx.db, regular.id).await.unwrap();
    User::delete(&ctx.db, staff.id).await.unwrap();
}

#[tokio::test]
async fn test_organization_reads_are_public() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let org = Organization::create(
        &ctx.db,
        CreateOrganization {
            name: format!("Public Org {}", Uuid::new_v4()),
            description: String::new(),
        },
    )
    .await
    .unwrap();

    let response = ctx
        .app
        .clone()
        .call(bare_request("GET", "/api/organizations", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            &format!("/api/organizations/{}", org.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["users"], json!([]));

    Organization::delete(&ctx.db, org.id).await.unwrap();
}

#[tokio::test]
async fn test_organization_mutation_requires_staff() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let regular = ctx.create_user(false).await;
    let staff = ctx.create_user(true).await;
    let payload = json!({"name": "Engineering", "description": "Builds things"});

    // Anonymous: 401
    let response = ctx
        .app
        .clone()
        .call(json_request("POST", "/api/organizations", None, payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Regular user: 403
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/organizations",
            Some(&ctx.token_for(&regular)),
            payload.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff: 201
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/organizations",
            Some(&ctx.token_for(&staff)),
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let org_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    Organization::delete(&ctx.db, org_id).await.unwrap();
    User::delete(&ctx.db, regular.id).await.unwrap();
    User::delete(&ctx.db, staff.id).await.unwrap();
}

#[tokio::test]
async fn test_organization_name_length_limit() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let staff = ctx.create_user(true).await;

    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/organizations",
            Some(&ctx.token_for(&staff)),
            json!({"name": "o".repeat(101)}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["details"]["name"][0].is_string());

    User::delete(&ctx.db, staff.id).await.unwrap();
}

#[tokio::test]
async fn test_membership_replacement_semantics() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let staff = ctx.create_user(true).await;
    let token = ctx.token_for(&staff);

    let mut org_ids = Vec::new();
    for _ in 0..2 {
        let org = Organization::create(
            &ctx.db,
            CreateOrganization {
                name: format!("Org {}", Uuid::new_v4()),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        org_ids.push(org.id);
    }

    // Create a user belonging to both organizations
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/users",
            None,
            json!({
                "email": unique_email(),
                "password": TEST_PASSWORD,
                "first_name": "Member",
                "last_name": "Ship",
                "organization_ids": org_ids
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let user_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
    assert_eq!(body["organizations"].as_array().unwrap().len(), 2);

    // Replacing with the same set is idempotent
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "PATCH",
            &format!("/api/users/{}", user_id),
            Some(&token),
            json!({"organization_ids": org_ids}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(Membership::count_for_user(&ctx.db, user_id).await.unwrap(), 2);

    // Shrink to one organization
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "PATCH",
            &format!("/api/users/{}", user_id),
            Some(&token),
            json!({"organization_ids": [org_ids[0]]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["organizations"].as_array().unwrap().len(), 1);

    // Empty list clears every membership, durably
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "PATCH",
            &format!("/api/users/{}", user_id),
            Some(&token),
            json!({"organization_ids": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(Membership::count_for_user(&ctx.db, user_id).await.unwrap(), 0);

    // Omitting the field leaves memberships untouched
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "PATCH",
            &format!("/api/users/{}", user_id),
            Some(&token),
            json!({"first_name": "Renamed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(Membership::count_for_user(&ctx.db, user_id).await.unwrap(), 0);

    User::delete(&ctx.db, user_id).await.unwrap();
    User::delete(&ctx.db, staff.id).await.unwrap();
    for org_id in org_ids {
        Organization::delete(&ctx.db, org_id).await.unwrap();
    }
}

#[tokio::test]
async fn test_unknown_organization_id_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": unique_email(),
            "password": TEST_PASSWORD,
            "first_name": "No",
            "last_name": "Org",
            "organization_ids": [Uuid::new_v4()]
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["details"]["organization_ids"][0]
        .as_str()
        .unwrap()
        .contains("does not exist"));
}

#[tokio::test]
async fn test_avatar_upload_stored_and_normalized() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": unique_email(),
            "password": TEST_PASSWORD,
            "first_name": "Ava",
            "last_name": "Tar",
            "avatar": {
                "filename": "Portrait.PNG",
                "content_type": "image/png",
                "data": BASE64.encode(png_bytes(400, 300))
            }
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let user_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let avatar_url = body["avatar"].as_str().unwrap();
    let relative = avatar_url.strip_prefix("/media/").unwrap();
    assert!(relative.starts_with("avatars/"));
    assert!(relative.ends_with(".png"));

    let path = ctx.config.media.absolute_path(relative);
    assert!(path.exists());

    // Post-processing completes before the response is sent
    let (width, height) = image::image_dimensions(&path).unwrap();
    assert!(width <= 200 && height <= 200);

    User::delete(&ctx.db, user_id).await.unwrap();
}

#[tokio::test]
async fn test_avatar_content_type_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let request = json_request(
        "POST",
        "/api/users",
        None,
        json!({
            "email": unique_email(),
            "password": TEST_PASSWORD,
            "first_name": "Bad",
            "last_name": "Upload",
            "avatar": {
                "filename": "notes.txt",
                "content_type": "text/plain",
                "data": BASE64.encode(b"hello")
            }
        }),
    );

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["details"]["avatar"][0].is_string());
}

#[tokio::test]
async fn test_token_flow() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let user = ctx.create_user(false).await;

    // Obtain a pair with valid credentials
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/token",
            None,
            json!({"email": user.email, "password": TEST_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let access = body["access"].as_str().unwrap().to_string();
    let refresh = body["refresh"].as_str().unwrap().to_string();

    // The access token works against a protected route
    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            &format!("/api/users/{}", user.id),
            Some(&access),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The refresh token yields a fresh access token
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/token/refresh",
            None,
            json!({"refresh": refresh}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["access"].is_string());

    // Wrong password is rejected
    let response = ctx
        .app
        .clone()
        .call(json_request(
            "POST",
            "/api/token",
            None,
            json!({"email": user.email, "password": "Wr0ng!Pass"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    User::delete(&ctx.db, user.id).await.unwrap();
}

#[tokio::test]
async fn test_invalid_bearer_token_rejected() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .call(bare_request("GET", "/api/users", Some("not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_deletion_staff_only() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let victim = ctx.create_user(false).await;
    let regular = ctx.create_user(false).await;
    let staff = ctx.create_user(true).await;

    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "DELETE",
            &format!("/api/users/{}", victim.id),
            Some(&ctx.token_for(&regular)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "DELETE",
            &format!("/api/users/{}", victim.id),
            Some(&ctx.token_for(&staff)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Gone afterwards
    let response = ctx
        .app
        .clone()
        .call(bare_request(
            "GET",
            &format!("/api/users/{}", victim.id),
            Some(&ctx.token_for(&staff)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    User::delete(&ctx.db, regular.id).await.unwrap();
    User::delete(&ctx.db, staff.id).await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .call(bare_request("GET", "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}
