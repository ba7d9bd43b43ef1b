//! Ledger consistency property: for any sequence of receipts and
//! adjustments, the derived on-hand quantity equals the exact sum of the
//! accepted quantity changes, and the materialized balance table agrees with
//! the ledger after a rebuild.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Op {
    Receipt(i64),
    Adjust(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..50).prop_map(Op::Receipt),
        (-30i64..=30)
            .prop_filter("adjustments cannot be zero", |d| *d != 0)
            .prop_map(Op::Adjust),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 8,
        .. ProptestConfig::default()
    })]

    #[test]
    fn on_hand_equals_sum_of_accepted_changes(ops in proptest::collection::vec(op_strategy(), 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async move {
            let app = TestApp::new().await;
            let component = app
                .create_component(json!({
                    "code": "CMP-PROP",
                    "name": "Property component",
                    "unit_of_measure": "ea",
                }))
                .await["id"]
                .as_str()
                .unwrap()
                .to_string();
            let location = app.default_location_id.to_string();

            let mut expected = 0i64;
            for op in &ops {
                match op {
                    Op::Receipt(quantity) => {
                        app.receipt(&component, &location, *quantity).await;
                        expected += quantity;
                    }
                    Op::Adjust(delta) => {
                        let (status, body) = app
                            .post_transaction(
                                "adjustment",
                                json!({
                                    "component_id": component,
                                    "location_id": location,
                                    "quantity_change": delta,
                                    "reason_code": "prop-test",
                                }),
                            )
                            .await;

                        if *delta < 0 && expected + delta < 0 {
                            // Non-negative policy blocks the overdraw and
                            // must not partially apply anything.
                            assert_eq!(
                                status,
                                StatusCode::UNPROCESSABLE_ENTITY,
                                "overdraw accepted: {body}"
                            );
                        } else {
                            assert_eq!(status, StatusCode::CREATED, "adjustment failed: {body}");
                            expected += delta;
                        }
                    }
                }

                assert_eq!(app.on_hand(&component).await, expected);
            }

            // The materialized balances replay to the same value.
            let (status, _) = app
                .request(
                    Method::POST,
                    "/api/v1/reports/rebuild-balances",
                    Some(&app.admin_token),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(app.on_hand(&component).await, expected);
        });
    }
}
