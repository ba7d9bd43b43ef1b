//! BOM lifecycle tests: drafting, costing, activation atomicity and the
//! immutability of recorded cost snapshots.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

struct BomFixture {
    app: TestApp,
    sku_id: String,
    part_a: String,
    part_b: String,
}

async fn fixture() -> BomFixture {
    let app = TestApp::new().await;
    let part_a = app
        .create_component(json!({
            "code": "CMP-A",
            "name": "Part A",
            "unit_of_measure": "ea",
            "cost_per_unit": "1.25",
        }))
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let part_b = app
        .create_component(json!({
            "code": "CMP-B",
            "name": "Part B",
            "unit_of_measure": "ea",
            "cost_per_unit": "0.5",
        }))
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let sku_id = app
        .create_sku(json!({ "code": "SKU-ASSY", "name": "Assembly" }))
        .await["id"]
        .as_str()
        .unwrap()
        .to_string();

    BomFixture {
        app,
        sku_id,
        part_a,
        part_b,
    }
}

async fn draft_version(f: &BomFixture, lines: serde_json::Value) -> serde_json::Value {
    let (status, json) = f
        .app
        .request(
            Method::POST,
            &format!("/api/v1/skus/{}/bom-versions", f.sku_id),
            Some(&f.app.admin_token),
            Some(json!({ "lines": lines })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

async fn activate(f: &BomFixture, version_id: &str) -> (StatusCode, serde_json::Value) {
    f.app
        .request(
            Method::POST,
            &format!("/api/v1/bom-versions/{version_id}/activate"),
            Some(&f.app.admin_token),
            None,
        )
        .await
}

#[tokio::test]
async fn unit_cost_is_sum_of_line_costs() {
    let f = fixture().await;
    let version = draft_version(
        &f,
        json!([
            { "component_id": f.part_a, "quantity_per_unit": 2 },
            { "component_id": f.part_b, "quantity_per_unit": 3 },
        ]),
    )
    .await;

    // 2 x 1.25 + 3 x 0.5 = 4.00
    assert_eq!(version["unit_cost"], "4.00");
    assert_eq!(version["status"], "draft");
}

#[tokio::test]
async fn cost_change_flows_into_future_reads_only() {
    let f = fixture().await;
    let version = draft_version(
        &f,
        json!([{ "component_id": f.part_a, "quantity_per_unit": 4 }]),
    )
    .await;
    let version_id = version["id"].as_str().unwrap().to_string();
    let (status, _) = activate(&f, &version_id).await;
    assert_eq!(status, StatusCode::OK);

    // Build once at the old cost so a snapshot exists.
    let finished = f
        .app
        .create_component(json!({
            "code": "FG-ASSY",
            "name": "Assembly FG",
            "unit_of_measure": "ea",
        }))
        .await;
    let (status, json) = f
        .app
        .request(
            Method::PUT,
            &format!("/api/v1/skus/{}", f.sku_id),
            Some(&f.app.admin_token),
            Some(json!({ "finished_component_id": finished["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    f.app
        .receipt(&f.part_a, &f.app.default_location_id.to_string(), 100)
        .await;
    let (status, build) = f
        .app
        .post_transaction(
            "build",
            json!({
                "sku_id": f.sku_id,
                "units": 1,
                "source_location_id": f.app.default_location_id.to_string(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{build}");
    let consumption_snapshot = build["lines"][0]["unit_cost_snapshot"].clone();
    assert_eq!(consumption_snapshot, "1.25");

    // Raise the component cost; the version's computed cost follows.
    let (status, _) = f
        .app
        .request(
            Method::PUT,
            &format!("/api/v1/components/{}", f.part_a),
            Some(&f.app.admin_token),
            Some(json!({ "cost_per_unit": "2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = f
        .app
        .request(
            Method::GET,
            &format!("/api/v1/bom-versions/{version_id}"),
            Some(&f.app.viewer_token),
            None,
        )
        .await;
    assert_eq!(detail["unit_cost"], "8");

    // The recorded build still carries the old snapshot.
    let transaction_id = build["transaction"]["id"].as_str().unwrap();
    let (_, recorded) = f
        .app
        .request(
            Method::GET,
            &format!("/api/v1/transactions/{transaction_id}"),
            Some(&f.app.viewer_token),
            None,
        )
        .await;
    assert_eq!(recorded["lines"][0]["unit_cost_snapshot"], "1.25");
}

#[tokio::test]
async fn activation_supersedes_previous_version_atomically() {
    let f = fixture().await;
    let v1 = draft_version(
        &f,
        json!([{ "component_id": f.part_a, "quantity_per_unit": 1 }]),
    )
    .await;
    let v2 = draft_version(
        &f,
        json!([{ "component_id": f.part_b, "quantity_per_unit": 5 }]),
    )
    .await;
    let v1_id = v1["id"].as_str().unwrap().to_string();
    let v2_id = v2["id"].as_str().unwrap().to_string();

    let (status, json) = activate(&f, &v1_id).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "active");

    let (status, json) = activate(&f, &v2_id).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "active");

    // v1 is superseded with its effective end stamped.
    let (_, v1_detail) = f
        .app
        .request(
            Method::GET,
            &format!("/api/v1/bom-versions/{v1_id}"),
            Some(&f.app.viewer_token),
            None,
        )
        .await;
    assert_eq!(v1_detail["status"], "superseded");
    assert!(!v1_detail["effective_end"].is_null());

    // Exactly one active version on the SKU.
    let (_, versions) = f
        .app
        .request(
            Method::GET,
            &format!("/api/v1/skus/{}/bom-versions", f.sku_id),
            Some(&f.app.viewer_token),
            None,
        )
        .await;
    let active_count = versions
        .as_array()
        .unwrap()
        .iter()
        .filter(|v| v["status"] == "active")
        .count();
    assert_eq!(active_count, 1);
}

#[tokio::test]
async fn activation_is_idempotent_and_superseded_is_terminal() {
    let f = fixture().await;
    let v1 = draft_version(
        &f,
        json!([{ "component_id": f.part_a, "quantity_per_unit": 1 }]),
    )
    .await;
    let v2 = draft_version(
        &f,
        json!([{ "component_id": f.part_a, "quantity_per_unit": 2 }]),
    )
    .await;
    let v1_id = v1["id"].as_str().unwrap().to_string();
    let v2_id = v2["id"].as_str().unwrap().to_string();

    let (status, _) = activate(&f, &v1_id).await;
    assert_eq!(status, StatusCode::OK);

    // Activating the active version again succeeds without a state change.
    let (status, json) = activate(&f, &v1_id).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "active");

    let (status, _) = activate(&f, &v2_id).await;
    assert_eq!(status, StatusCode::OK);

    // v1 is now superseded; reactivating it conflicts.
    let (status, json) = activate(&f, &v1_id).await;
    assert_eq!(status, StatusCode::CONFLICT, "{json}");
}

#[tokio::test]
async fn activating_missing_version_is_not_found() {
    let f = fixture().await;
    let (status, _) = activate(&f, "00000000-0000-0000-0000-00000000beef").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bom_rejects_duplicate_components_and_bad_quantities() {
    let f = fixture().await;

    let (status, _) = f
        .app
        .request(
            Method::POST,
            &format!("/api/v1/skus/{}/bom-versions", f.sku_id),
            Some(&f.app.admin_token),
            Some(json!({
                "lines": [
                    { "component_id": f.part_a, "quantity_per_unit": 1 },
                    { "component_id": f.part_a, "quantity_per_unit": 2 },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = f
        .app
        .request(
            Method::POST,
            &format!("/api/v1/skus/{}/bom-versions", f.sku_id),
            Some(&f.app.admin_token),
            Some(json!({
                "lines": [{ "component_id": f.part_b, "quantity_per_unit": 0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
