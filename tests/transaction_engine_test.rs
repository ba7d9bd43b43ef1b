//! Transaction engine integration tests: receipts, transfers, adjustments,
//! builds and outbound shipments against the in-memory database.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn receipt_increases_on_hand_and_ledger_agrees() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-BOLT",
            "name": "M4 bolt",
            "unit_of_measure": "ea",
            "cost_per_unit": "0.12",
            "reorder_point": 50,
        }))
        .await;
    let component_id = component["id"].as_str().unwrap().to_string();
    let location = app.default_location_id.to_string();

    app.receipt(&component_id, &location, 120).await;
    app.receipt(&component_id, &location, 30).await;

    assert_eq!(app.on_hand(&component_id).await, 150);

    // Ledger and materialized balance stay equal after a rebuild.
    let (status, json) = app
        .request(
            Method::POST,
            "/api/v1/reports/rebuild-balances",
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(app.on_hand(&component_id).await, 150);
}

#[tokio::test]
async fn receipt_rejects_non_positive_quantity() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-NUT",
            "name": "M4 nut",
            "unit_of_measure": "ea",
        }))
        .await;

    let (status, _) = app
        .post_transaction(
            "receipt",
            json!({
                "component_id": component["id"],
                "location_id": app.default_location_id.to_string(),
                "quantity": 0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn receipt_can_overwrite_component_cost() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-CELL",
            "name": "Battery cell",
            "unit_of_measure": "ea",
            "cost_per_unit": "2.50",
        }))
        .await;
    let component_id = component["id"].as_str().unwrap().to_string();

    let (status, json) = app
        .post_transaction(
            "receipt",
            json!({
                "component_id": component_id,
                "location_id": app.default_location_id.to_string(),
                "quantity": 10,
                "unit_cost": "3.1",
                "update_component_cost": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    // The line snapshots the receipt cost.
    assert_eq!(json["lines"][0]["unit_cost_snapshot"], "3.1");

    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/components/{component_id}"),
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(detail["cost_per_unit"], "3.1");
}

#[tokio::test]
async fn transfer_moves_stock_between_locations() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-STRAP",
            "name": "Strap",
            "unit_of_measure": "ea",
        }))
        .await;
    let component_id = component["id"].as_str().unwrap().to_string();
    let from = app.default_location_id.to_string();
    let to = app.second_location_id.to_string();

    app.receipt(&component_id, &from, 40).await;

    let (status, json) = app
        .post_transaction(
            "transfer",
            json!({
                "component_id": component_id,
                "from_location_id": from,
                "to_location_id": to,
                "quantity": 15,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["lines"].as_array().unwrap().len(), 2);

    // Totals unchanged; per-location split is 25 / 15.
    assert_eq!(app.on_hand(&component_id).await, 40);
}

#[tokio::test]
async fn transfer_to_same_location_is_rejected() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-CLIP",
            "name": "Clip",
            "unit_of_measure": "ea",
        }))
        .await;
    let location = app.default_location_id.to_string();
    app.receipt(component["id"].as_str().unwrap(), &location, 5).await;

    let (status, json) = app
        .post_transaction(
            "transfer",
            json!({
                "component_id": component["id"],
                "from_location_id": location,
                "to_location_id": location,
                "quantity": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["message"].as_str().unwrap().contains("must differ"),
        "{json}"
    );
}

#[tokio::test]
async fn transfer_cannot_overdraw_source() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-CORD",
            "name": "Cord",
            "unit_of_measure": "m",
        }))
        .await;
    let component_id = component["id"].as_str().unwrap().to_string();
    app.receipt(&component_id, &app.default_location_id.to_string(), 10)
        .await;

    let (status, json) = app
        .post_transaction(
            "transfer",
            json!({
                "component_id": component_id,
                "from_location_id": app.default_location_id.to_string(),
                "to_location_id": app.second_location_id.to_string(),
                "quantity": 11,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{json}");
    assert_eq!(json["details"][0]["shortage"], 1);
}

#[tokio::test]
async fn adjustment_requires_reason_code() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-FOAM",
            "name": "Foam",
            "unit_of_measure": "ea",
        }))
        .await;

    let (status, _) = app
        .post_transaction(
            "adjustment",
            json!({
                "component_id": component["id"],
                "location_id": app.default_location_id.to_string(),
                "quantity_change": -1,
                "reason_code": "",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adjustment_applies_signed_change() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-GLUE",
            "name": "Glue",
            "unit_of_measure": "ea",
        }))
        .await;
    let component_id = component["id"].as_str().unwrap().to_string();
    let location = app.default_location_id.to_string();
    app.receipt(&component_id, &location, 20).await;

    let (status, json) = app
        .post_transaction(
            "adjustment",
            json!({
                "component_id": component_id,
                "location_id": location,
                "quantity_change": -3,
                "reason_code": "damage",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(app.on_hand(&component_id).await, 17);
}

/// A build of 10 units where the single BOM line needs 2 per unit, with 15 on
/// hand: rejected with shortage 5 by default, allowed to go to -5 when the
/// caller opts in.
#[tokio::test]
async fn build_shortage_blocks_then_override_allows_negative() {
    let app = TestApp::new().await;
    let part = app
        .create_component(json!({
            "code": "CMP-X",
            "name": "Component X",
            "unit_of_measure": "ea",
        }))
        .await;
    let finished = app
        .create_component(json!({
            "code": "FG-WIDGET",
            "name": "Widget finished goods",
            "unit_of_measure": "ea",
        }))
        .await;
    let part_id = part["id"].as_str().unwrap().to_string();
    let source = app.default_location_id.to_string();

    let sku = app
        .create_sku(json!({
            "code": "SKU-WIDGET",
            "name": "Widget",
            "finished_component_id": finished["id"],
        }))
        .await;
    let sku_id = sku["id"].as_str().unwrap().to_string();

    let (status, version) = app
        .request(
            Method::POST,
            &format!("/api/v1/skus/{sku_id}/bom-versions"),
            Some(&app.admin_token),
            Some(json!({
                "lines": [{ "component_id": part_id, "quantity_per_unit": 2 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{version}");
    let version_id = version["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/bom-versions/{version_id}/activate"),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.receipt(&part_id, &source, 15).await;

    let build_body = json!({
        "sku_id": sku_id,
        "units": 10,
        "source_location_id": source,
        "output_location_id": app.second_location_id.to_string(),
    });

    let (status, json) = app.post_transaction("build", build_body.clone()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{json}");
    assert_eq!(json["details"][0]["required"], 20);
    assert_eq!(json["details"][0]["available"], 15);
    assert_eq!(json["details"][0]["shortage"], 5);
    // Nothing was written.
    assert_eq!(app.on_hand(&part_id).await, 15);

    let mut override_body = build_body;
    override_body["allow_insufficient_inventory"] = json!(true);
    let (status, json) = app.post_transaction("build", override_body).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");

    assert_eq!(app.on_hand(&part_id).await, -5);
    let finished_id = finished["id"].as_str().unwrap().to_string();
    assert_eq!(app.on_hand(&finished_id).await, 10);
}

#[tokio::test]
async fn build_without_active_bom_is_rejected() {
    let app = TestApp::new().await;
    let sku = app
        .create_sku(json!({ "code": "SKU-BARE", "name": "No BOM yet" }))
        .await;

    let (status, json) = app
        .post_transaction(
            "build",
            json!({
                "sku_id": sku["id"],
                "units": 1,
                "source_location_id": app.default_location_id.to_string(),
                "output_to_finished_goods": false,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    assert!(
        json["message"].as_str().unwrap().contains("no active BOM"),
        "{json}"
    );
}

#[tokio::test]
async fn outbound_ships_finished_goods_and_respects_policy() {
    let app = TestApp::new().await;
    let finished = app
        .create_component(json!({
            "code": "FG-KIT",
            "name": "Kit finished goods",
            "unit_of_measure": "ea",
        }))
        .await;
    let finished_id = finished["id"].as_str().unwrap().to_string();
    let location = app.default_location_id.to_string();
    let sku = app
        .create_sku(json!({
            "code": "SKU-KIT",
            "name": "Kit",
            "finished_component_id": finished["id"],
        }))
        .await;

    app.receipt(&finished_id, &location, 8).await;

    let (status, json) = app
        .post_transaction(
            "outbound",
            json!({
                "sku_id": sku["id"],
                "location_id": location,
                "units": 5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(app.on_hand(&finished_id).await, 3);

    let (status, json) = app
        .post_transaction(
            "outbound",
            json!({
                "sku_id": sku["id"],
                "location_id": location,
                "units": 5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{json}");
    assert_eq!(json["details"][0]["shortage"], 2);
}

#[tokio::test]
async fn transactions_are_listed_and_fetchable() {
    let app = TestApp::new().await;
    let component = app
        .create_component(json!({
            "code": "CMP-LIST",
            "name": "Listable",
            "unit_of_measure": "ea",
        }))
        .await;
    let component_id = component["id"].as_str().unwrap().to_string();
    let location = app.default_location_id.to_string();

    let posted = app.receipt(&component_id, &location, 7).await;
    let transaction_id = posted["transaction"]["id"].as_str().unwrap();

    let (status, json) = app
        .request(
            Method::GET,
            "/api/v1/transactions?type=receipt",
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pagination"]["total"], 1);

    let (status, json) = app
        .request(
            Method::GET,
            &format!("/api/v1/transactions/{transaction_id}"),
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"][0]["quantity_change"], 7);
}
