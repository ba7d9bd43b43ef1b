//! Reorder classification and runout forecasting through the API, including
//! the per-tenant warning multiplier and the forecast's exclusion of initial
//! and adjustment transactions.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

async fn seeded_component(app: &TestApp, code: &str, reorder_point: i64) -> String {
    app.create_component(json!({
        "code": code,
        "name": format!("{code} component"),
        "unit_of_measure": "ea",
        "reorder_point": reorder_point,
        "lead_time_days": 5,
    }))
    .await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn reorder_statuses_follow_threshold_boundaries() {
    let app = TestApp::new().await;
    let location = app.default_location_id.to_string();

    // Same reorder point, three different stock levels.
    let critical = seeded_component(&app, "CMP-CRIT", 100).await;
    let warning = seeded_component(&app, "CMP-WARN", 100).await;
    let ok = seeded_component(&app, "CMP-OK", 100).await;

    app.receipt(&critical, &location, 100).await;
    app.receipt(&warning, &location, 120).await;
    app.receipt(&ok, &location, 160).await;

    let expect_status = |list: &serde_json::Value, code: &str, status: &str| {
        let row = list["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["code"] == code)
            .unwrap_or_else(|| panic!("{code} missing from {list}"));
        assert_eq!(row["reorder_status"], status, "{code}");
    };

    let (_, list) = app
        .request(
            Method::GET,
            "/api/v1/components?per_page=50",
            Some(&app.viewer_token),
            None,
        )
        .await;
    expect_status(&list, "CMP-CRIT", "critical");
    expect_status(&list, "CMP-WARN", "warning");
    expect_status(&list, "CMP-OK", "ok");

    // The status filter returns only matching components.
    let (_, filtered) = app
        .request(
            Method::GET,
            "/api/v1/components?reorder_status=warning",
            Some(&app.viewer_token),
            None,
        )
        .await;
    let codes: Vec<&str> = filtered["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["CMP-WARN"]);
}

#[tokio::test]
async fn warning_multiplier_is_tenant_configurable() {
    let app = TestApp::new().await;
    let location = app.default_location_id.to_string();
    let component = seeded_component(&app, "CMP-TUNED", 100).await;
    app.receipt(&component, &location, 160).await;

    // 160 on hand is ok at the default 1.5 multiplier.
    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/components/{component}"),
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(detail["reorder_status"], "ok");

    // Raise the multiplier to 2.0 and the same stock is a warning.
    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/settings",
            Some(&app.admin_token),
            Some(json!({ "reorder_warning_multiplier": "2.0" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/components/{component}"),
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(detail["reorder_status"], "warning");
}

#[tokio::test]
async fn forecast_ignores_initial_and_adjustment_consumption() {
    let app = TestApp::new().await;
    let location = app.default_location_id.to_string();
    let component = seeded_component(&app, "CMP-FCAST", 10).await;

    // Opening balance (excluded from consumption), then a real outbound via
    // a finished-goods SKU, then an adjustment (also excluded).
    let (status, _) = app
        .post_transaction(
            "initial",
            json!({
                "component_id": component,
                "location_id": location,
                "quantity": 300,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let sku = app
        .create_sku(json!({
            "code": "SKU-FCAST",
            "name": "Forecast product",
            "finished_component_id": component,
        }))
        .await;

    let (status, _) = app
        .post_transaction(
            "outbound",
            json!({
                "sku_id": sku["id"],
                "location_id": location,
                "units": 60,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post_transaction(
            "adjustment",
            json!({
                "component_id": component,
                "location_id": location,
                "quantity_change": -40,
                "reason_code": "cycle-count",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/components/{component}"),
            Some(&app.viewer_token),
            None,
        )
        .await;

    // 300 - 60 - 40 = 200 on hand; only the outbound 60 counts toward the
    // 30-day consumption rate: 2/day -> 100 days to runout.
    assert_eq!(detail["quantity_on_hand"], 200);
    let rate: f64 = detail["forecast"]["average_daily_consumption"]
        .as_str()
        .expect("rate serialized as decimal string")
        .parse()
        .unwrap();
    assert!((rate - 2.0).abs() < f64::EPSILON, "rate was {rate}");
    assert_eq!(detail["forecast"]["days_until_runout"], 100);
    assert!(!detail["forecast"]["runout_date"].is_null());
    assert!(!detail["forecast"]["recommended_reorder_date"].is_null());
}

#[tokio::test]
async fn zero_consumption_yields_no_runout() {
    let app = TestApp::new().await;
    let location = app.default_location_id.to_string();
    let component = seeded_component(&app, "CMP-IDLE", 10).await;
    app.receipt(&component, &location, 50).await;

    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/components/{component}"),
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert!(detail["forecast"]["average_daily_consumption"].is_null());
    assert!(detail["forecast"]["days_until_runout"].is_null());
    assert!(detail["forecast"]["runout_date"].is_null());
}

#[tokio::test]
async fn reorder_report_covers_active_components() {
    let app = TestApp::new().await;
    let location = app.default_location_id.to_string();
    let low = seeded_component(&app, "CMP-LOW", 50).await;
    seeded_component(&app, "CMP-EMPTY", 5).await;
    app.receipt(&low, &location, 20).await;

    let (status, report) = app
        .request(
            Method::GET,
            "/api/v1/reports/reorder",
            Some(&app.viewer_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");

    let rows = report.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["reorder_status"], "critical");
    }
}
