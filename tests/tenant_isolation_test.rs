//! Tenant isolation and role enforcement. Cross-tenant access must be
//! indistinguishable from a missing record: always 404, never 403.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn cross_tenant_reads_surface_as_not_found() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-SECRET",
            "name": "Alpine-only component",
            "unit_of_measure": "ea",
        }))
        .await;
    let component_id = component["id"].as_str().unwrap();

    // The other tenant's admin cannot see it, and cannot tell it exists.
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/components/{component_id}"),
            Some(&app.other_admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Same for mutation attempts.
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/components/{component_id}"),
            Some(&app.other_admin_token),
            Some(json!({ "name": "hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cross_tenant_transactions_cannot_reference_foreign_rows() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-HELD",
            "name": "Alpine stock",
            "unit_of_measure": "ea",
        }))
        .await;

    // Borealis ops posting a receipt against an Alpine component fails with
    // NotFound even though the row exists.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/transactions/receipt",
            Some(&app.other_admin_token),
            Some(json!({
                "component_id": component["id"],
                "location_id": app.other_location_id.to_string(),
                "quantity": 10,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // And an Alpine receipt against a Borealis location fails the same way.
    let (status, _) = app
        .post_transaction(
            "receipt",
            json!({
                "component_id": component["id"],
                "location_id": app.other_location_id.to_string(),
                "quantity": 10,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_endpoints_never_leak_other_tenants() {
    let app = TestApp::new().await;
    app.create_component(json!({
        "code": "CMP-MINE",
        "name": "Alpine component",
        "unit_of_measure": "ea",
    }))
    .await;

    let (status, list) = app
        .request(
            Method::GET,
            "/api/v1/components",
            Some(&app.other_admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pagination"]["total"], 0);

    let (status, locations) = app
        .request(
            Method::GET,
            "/api/v1/locations",
            Some(&app.other_admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = locations
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Borealis Warehouse"]);
}

#[tokio::test]
async fn login_issues_scoped_tokens() {
    let app = TestApp::new().await;

    let (status, json) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({
                "email": "ops@alpine.test",
                "password": TestApp::test_password(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["role"], "ops");
    assert_eq!(json["company_id"], app.company_id.to_string());
    assert!(json["access_token"].as_str().unwrap().len() > 20);

    // Wrong password and unknown email are indistinguishable.
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({
                "email": "ops@alpine.test",
                "password": "wrong",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({
                "email": "nobody@alpine.test",
                "password": TestApp::test_password(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_or_garbage_tokens_are_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(Method::GET, "/api/v1/components", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::GET,
            "/api/v1/components",
            Some("not-a-real-token"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_gate_mutations() {
    let app = TestApp::new().await;

    // Viewers cannot create master data or post transactions.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/components",
            Some(&app.viewer_token),
            Some(json!({
                "code": "CMP-NOPE",
                "name": "Should fail",
                "unit_of_measure": "ea",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/transactions/receipt",
            Some(&app.viewer_token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Ops can post transactions but cannot manage master data.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/components",
            Some(&app.ops_token),
            Some(json!({
                "code": "CMP-OPS",
                "name": "Ops cannot create",
                "unit_of_measure": "ea",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin settings are closed to ops.
    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/settings",
            Some(&app.ops_token),
            Some(json!({ "alerts_enabled": false })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn default_location_invariant_holds() {
    let app = TestApp::new().await;

    // The default cannot be deactivated.
    let (status, json) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/locations/{}", app.default_location_id),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");

    // Promoting another location demotes the old default atomically.
    let (status, json) = app
        .request(
            Method::PUT,
            &format!("/api/v1/locations/{}", app.second_location_id),
            Some(&app.admin_token),
            Some(json!({ "is_default": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let (_, locations) = app
        .request(
            Method::GET,
            "/api/v1/locations",
            Some(&app.viewer_token),
            None,
        )
        .await;
    let defaults: Vec<&str> = locations
        .as_array()
        .unwrap()
        .iter()
        .filter(|l| l["is_default"] == true)
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(defaults, vec!["Finished Goods"]);
}

#[tokio::test]
async fn duplicate_codes_conflict_within_a_tenant_only() {
    let app = TestApp::new().await;
    app.create_component(json!({
        "code": "CMP-SHARED",
        "name": "Alpine's",
        "unit_of_measure": "ea",
    }))
    .await;

    // Same code in the same tenant: conflict.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/components",
            Some(&app.admin_token),
            Some(json!({
                "code": "CMP-SHARED",
                "name": "Again",
                "unit_of_measure": "ea",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same code in another tenant: fine.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/components",
            Some(&app.other_admin_token),
            Some(json!({
                "code": "CMP-SHARED",
                "name": "Borealis's",
                "unit_of_measure": "ea",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn brands_scope_skus_within_the_tenant() {
    let app = TestApp::new().await;

    let (status, brand) = app
        .request(
            Method::POST,
            "/api/v1/brands",
            Some(&app.admin_token),
            Some(json!({ "name": "Alpine Outdoor" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{brand}");

    // A SKU can attach to its own tenant's brand.
    let (status, sku) = app
        .request(
            Method::POST,
            "/api/v1/skus",
            Some(&app.admin_token),
            Some(json!({
                "code": "SKU-BRANDED",
                "name": "Branded product",
                "brand_id": brand["id"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sku}");
    assert_eq!(sku["brand_id"], brand["id"]);

    // The other tenant cannot attach to it, and cannot see it listed.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/skus",
            Some(&app.other_admin_token),
            Some(json!({
                "code": "SKU-THEFT",
                "name": "Cross-tenant brand grab",
                "brand_id": brand["id"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, brands) = app
        .request(
            Method::GET,
            "/api/v1/brands",
            Some(&app.other_admin_token),
            None,
        )
        .await;
    assert_eq!(brands.as_array().unwrap().len(), 0);
}
