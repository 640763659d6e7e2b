use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use petro_backoffice::http::router;
use petro_backoffice::service::BackofficeService;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

fn app(name: &str) -> anyhow::Result<(TempDir, Router)> {
    let temp_dir = tempdir()?;
    let db = sled::open(temp_dir.path().join(name))?;
    let service = BackofficeService::new(Arc::new(db))?;
    Ok((temp_dir, router(Arc::new(service))))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

#[tokio::test]
async fn transfer_flow_over_http() -> anyhow::Result<()> {
    let (_dir, app) = app("http_transfer.db")?;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/settings/balances",
        Some(json!({ "type": "storage", "pms": 100.0, "ago": 0.0, "atk": 0.0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, form) = call(
        &app,
        Method::POST,
        "/api/transfer/transfers",
        Some(json!({ "formNumber": "TF-100", "petroleumType": "PMS", "quantity": 150.0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(form["status"], "pending");
    let id = form["id"].as_str().unwrap_or_default().to_string();

    let uri = format!("/api/transfer/transfers/{id}/status");
    let (status, body) = call(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({ "status": "approved", "approvedBy": "Manager" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Available: 100.00"), "{message}");
    assert!(message.contains("Required: 150.00"), "{message}");

    let (status, balances) = call(&app, Method::GET, "/api/settings/balances", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balances["storage"]["pms"], 100.0);
    assert_eq!(balances["salesFloor"]["pms"], 0.0);

    let (status, floor) = call(&app, Method::GET, "/api/sales-floor", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(floor["kind"], "salesFloor");
    assert_eq!(floor["entries"], json!([]));
    assert_eq!(floor["updatedAt"], Value::Null);

    Ok(())
}

#[tokio::test]
async fn distribution_flow_over_http() -> anyhow::Result<()> {
    let (_dir, app) = app("http_distribution.db")?;

    let (status, order) = call(
        &app,
        Method::POST,
        "/api/distribution/orders",
        Some(json!({
            "customerName": "Ama",
            "address": "Accra",
            "product": "KERO",
            "quantityWords": "ten",
            "gallons": 10.0,
            "unitPrice": 5.0,
            "createdBy": "cashier"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["product"], "ATK");
    assert_eq!(order["totalAmount"], 50.0);
    let id = order["id"].as_str().unwrap_or_default().to_string();

    let (status, order) = call(
        &app,
        Method::PATCH,
        &format!("/api/distribution/orders/{id}/payment"),
        Some(json!({ "amount": 20.0, "type": "onbill" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["balance"], 30.0);
    assert_eq!(order["payments"][0]["type"], "onbill");

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/distribution/orders/{id}/status"),
        Some(json!({ "status": "issued" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::DELETE, &format!("/api/distribution/orders/{id}"), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can only delete pending distribution orders");

    let (status, page) = call(&app, Method::GET, "/api/distribution/orders?page=1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 10);
    assert_eq!(page["hasMore"], false);

    Ok(())
}

#[tokio::test]
async fn errors_map_to_status_codes() -> anyhow::Result<()> {
    let (_dir, app) = app("http_errors.db")?;

    let (status, body) = call(&app, Method::GET, "/api/importer/agreements/imp1missing", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Agreement not found");

    let (status, body) = call(&app, Method::POST, "/api/transfer/transfers", Some(json!({ "formNumber": 7 }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _) = call(&app, Method::GET, "/api/storage/transactions?limit=abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/distribution/orders",
        Some(json!({
            "customerName": "Ama",
            "address": "Accra",
            "product": "PMS",
            "quantityWords": "ten",
            "gallons": 10.0,
            "unitPrice": 5.0,
            "createdBy": "cashier",
            "date": "2300-01-01"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("Date out of range"), "{message}");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/distribution-record/records/summary?startDate=1600-01-01&endDate=2025-01-01",
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::GET, "/api/distribution-record/records/summary", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Start date and end date are required");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/users/login",
        Some(json!({ "username": "nobody", "password": "x" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    Ok(())
}

#[tokio::test]
async fn user_routes_never_expose_credentials() -> anyhow::Result<()> {
    let (_dir, app) = app("http_users.db")?;

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/users",
        Some(json!({ "username": "kwame", "password": "pw", "role": "admin" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["user"]["id"].as_str().unwrap_or_default().to_string();

    let (status, reset) = call(&app, Method::POST, &format!("/api/users/{id}/password/reset"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let temporary = reset["tempPassword"].as_str().unwrap_or_default().to_string();
    assert!(!temporary.is_empty());

    let (status, login) = call(
        &app,
        Method::POST,
        "/api/users/login",
        Some(json!({ "username": "kwame", "password": temporary })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["username"], "kwame");

    let (_, users) = call(&app, Method::GET, "/api/users", None).await?;
    let user = &users[0];
    assert!(user.get("salt").is_none());
    assert!(user.get("passwordDigest").is_none());
    assert!(user["lastLogin"].is_string());

    Ok(())
}
