//! CSV import/export tests: row-by-row rejection, 1-indexed data row
//! numbers, duplicate skipping and initial-inventory loading.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn component_import_reports_bad_row_and_keeps_the_rest() {
    let app = TestApp::new().await;

    // Row 2 is missing its name; the other three import.
    let csv = "\
code,name,unit_of_measure,cost_per_unit,reorder_point,lead_time_days,lot_tracked
CMP-001,Widget shell,ea,1.20,100,14,false
CMP-002,,ea,0.40,50,7,false
CMP-003,Gasket,ea,0.05,500,3,true
CMP-004,Label,ea,0.01,1000,2,false
";

    let (status, report) = app
        .request_text(
            Method::POST,
            "/api/v1/csv/components/import",
            Some(&app.ops_token),
            csv.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["successful"], 3);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["errors"][0]["row_number"], 2);
    assert_eq!(report["errors"][0]["field"], "name");

    let (_, list) = app
        .request(
            Method::GET,
            "/api/v1/components",
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(list["pagination"]["total"], 3);
}

#[tokio::test]
async fn duplicate_codes_are_skipped_not_overwritten() {
    let app = TestApp::new().await;
    app.create_component(json!({
        "code": "CMP-DUP",
        "name": "Original name",
        "unit_of_measure": "ea",
    }))
    .await;

    let csv = "\
code,name,unit_of_measure,cost_per_unit,reorder_point,lead_time_days,lot_tracked
CMP-DUP,Replacement name,ea,9.99,1,1,false
CMP-NEW,Fresh component,ea,0.10,10,5,false
CMP-NEW,Same file duplicate,ea,0.20,20,5,false
";

    let (status, report) = app
        .request_text(
            Method::POST,
            "/api/v1/csv/components/import",
            Some(&app.ops_token),
            csv.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["successful"], 1);
    assert_eq!(report["skipped_duplicates"], 2);
    assert_eq!(report["failed"], 0);

    // The original row was not overwritten.
    let (_, list) = app
        .request(
            Method::GET,
            "/api/v1/components",
            Some(&app.viewer_token),
            None,
        )
        .await;
    let original = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["code"] == "CMP-DUP")
        .unwrap();
    assert_eq!(original["name"], "Original name");
}

#[tokio::test]
async fn sku_import_resolves_finished_component_codes() {
    let app = TestApp::new().await;
    app.create_component(json!({
        "code": "FG-BOX",
        "name": "Boxed product",
        "unit_of_measure": "ea",
    }))
    .await;

    let csv = "\
code,name,finished_component_code
SKU-BOX,Boxed product,FG-BOX
SKU-GHOST,References missing component,FG-MISSING
SKU-PLAIN,No finished component,
";

    let (status, report) = app
        .request_text(
            Method::POST,
            "/api/v1/csv/skus/import",
            Some(&app.ops_token),
            csv.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["successful"], 2);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["errors"][0]["row_number"], 2);
    assert_eq!(report["errors"][0]["field"], "finished_component_code");
}

#[tokio::test]
async fn initial_inventory_import_posts_initial_transactions() {
    let app = TestApp::new().await;
    app.create_component(json!({
        "code": "CMP-SEED",
        "name": "Seeded component",
        "unit_of_measure": "ea",
        "lot_tracked": true,
    }))
    .await;

    let csv = "\
component_code,location_name,quantity,unit_cost,lot_code,expiry_date
CMP-SEED,Main Warehouse,250,0.75,LOT-OPEN,2030-06-30
CMP-SEED,Nowhere Warehouse,10,,,
CMP-SEED,Main Warehouse,-3,,,
";

    let (status, report) = app
        .request_text(
            Method::POST,
            "/api/v1/csv/initial-inventory/import",
            Some(&app.ops_token),
            csv.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["successful"], 1);
    assert_eq!(report["failed"], 2);
    assert_eq!(report["errors"][0]["row_number"], 2);
    assert_eq!(report["errors"][0]["field"], "location_name");
    assert_eq!(report["errors"][1]["row_number"], 3);
    assert_eq!(report["errors"][1]["field"], "quantity");

    // The good row landed as an `initial` transaction with its lot.
    let (_, transactions) = app
        .request(
            Method::GET,
            "/api/v1/transactions?type=initial",
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(transactions["pagination"]["total"], 1);

    let (_, list) = app
        .request(
            Method::GET,
            "/api/v1/components?reorder_status=ok",
            Some(&app.viewer_token),
            None,
        )
        .await;
    let seeded = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["code"] == "CMP-SEED")
        .unwrap();
    assert_eq!(seeded["quantity_on_hand"], 250);
}

#[tokio::test]
async fn component_export_round_trips_through_import() {
    let app = TestApp::new().await;
    app.create_component(json!({
        "code": "CMP-EXP",
        "name": "Exported component",
        "unit_of_measure": "ea",
        "cost_per_unit": "1.5",
        "reorder_point": 42,
        "lead_time_days": 9,
        "lot_tracked": true,
    }))
    .await;

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/csv/components/export",
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let csv = body.as_str().expect("csv body").to_string();
    assert!(csv.contains("CMP-EXP"), "{csv}");
    assert!(csv.contains("Exported component"), "{csv}");

    // Importing the export back is all duplicates, nothing overwritten.
    let (status, report) = app
        .request_text(
            Method::POST,
            "/api/v1/csv/components/import",
            Some(&app.ops_token),
            csv,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["successful"], 0);
    assert_eq!(report["skipped_duplicates"], 1);
}

#[tokio::test]
async fn csv_import_requires_ops_role() {
    let app = TestApp::new().await;
    let csv = "code,name,unit_of_measure,cost_per_unit,reorder_point,lead_time_days,lot_tracked\n";

    let (status, _) = app
        .request_text(
            Method::POST,
            "/api/v1/csv/components/import",
            Some(&app.viewer_token),
            csv.to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
