use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::auth::AuthenticatedUser;
use crate::entities::inventory_transaction::TransactionType;
use crate::entities::user::Role;
use crate::errors::ApiError;
use crate::services::transactions::{
    AdjustmentInput, BuildInput, BuildLotPick, NewLot, OutboundInput, ReceiptInput, TransferInput,
};
use crate::AppState;

pub fn transaction_routes() -> Router<AppState> {
    // The path segment is a transaction type on POST and a transaction id on
    // GET, so both verbs share one capture.
    Router::new()
        .route("/", get(list_transactions))
        .route("/:kind", post(post_transaction).get(get_transaction))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LotRequest {
    #[validate(length(min = 1, max = 64))]
    pub lot_code: String,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReceiptRequest {
    pub component_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub update_component_cost: bool,
    pub lot: Option<LotRequest>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BuildRequest {
    pub sku_id: Uuid,
    pub units: i64,
    pub source_location_id: Uuid,
    pub output_location_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub output_to_finished_goods: bool,
    #[serde(default)]
    pub allow_insufficient_inventory: bool,
    #[serde(default)]
    pub allow_expired_lots: bool,
    #[serde(default)]
    pub manual_allocations: Vec<ManualAllocationRequest>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct ManualAllocationRequest {
    pub component_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    pub component_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub quantity: i64,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustmentRequest {
    pub component_id: Uuid,
    pub location_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity_change: i64,
    #[validate(length(min = 1, max = 64))]
    pub reason_code: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OutboundRequest {
    pub sku_id: Uuid,
    pub location_id: Uuid,
    pub units: i64,
    #[serde(default)]
    pub allow_insufficient_inventory: bool,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
}

fn parse_body<T>(value: serde_json::Value) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(value)
        .map_err(|e| ApiError::Validation(format!("invalid request body: {e}")))?;
    validate_input(&parsed)?;
    Ok(parsed)
}

/// One endpoint per transaction type, dispatched on the path segment:
/// `POST /transactions/receipt`, `/transactions/build`, and so on.
async fn post_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(kind): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Ops).map_err(map_service_error)?;

    let kind = TransactionType::from_str(&kind)
        .ok_or_else(|| ApiError::Validation(format!("unknown transaction type {kind:?}")))?;

    let company_id = user.company_id;
    let created_by = Some(user.user_id);
    let service = &state.services.transactions;

    let posted = match kind {
        TransactionType::Receipt | TransactionType::Initial => {
            let request: ReceiptRequest = parse_body(body)?;
            let input = ReceiptInput {
                component_id: request.component_id,
                location_id: request.location_id,
                quantity: request.quantity,
                unit_cost: request.unit_cost,
                update_component_cost: request.update_component_cost,
                lot: request.lot.map(|l| NewLot {
                    lot_code: l.lot_code,
                    expiry_date: l.expiry_date,
                    supplier: l.supplier,
                }),
                reference: request.reference,
                notes: request.notes,
            };
            if kind == TransactionType::Receipt {
                service.post_receipt(company_id, created_by, input).await
            } else {
                service.post_initial(company_id, created_by, input).await
            }
        }
        TransactionType::Build => {
            let request: BuildRequest = parse_body(body)?;
            service
                .post_build(
                    company_id,
                    created_by,
                    BuildInput {
                        sku_id: request.sku_id,
                        units: request.units,
                        source_location_id: request.source_location_id,
                        output_location_id: request.output_location_id,
                        output_to_finished_goods: request.output_to_finished_goods,
                        allow_insufficient_inventory: request.allow_insufficient_inventory,
                        allow_expired_lots: request.allow_expired_lots,
                        manual_allocations: request
                            .manual_allocations
                            .into_iter()
                            .map(|p| BuildLotPick {
                                component_id: p.component_id,
                                lot_id: p.lot_id,
                                quantity: p.quantity,
                            })
                            .collect(),
                        reference: request.reference,
                        notes: request.notes,
                    },
                )
                .await
        }
        TransactionType::Transfer => {
            let request: TransferRequest = parse_body(body)?;
            service
                .post_transfer(
                    company_id,
                    created_by,
                    TransferInput {
                        component_id: request.component_id,
                        from_location_id: request.from_location_id,
                        to_location_id: request.to_location_id,
                        quantity: request.quantity,
                        reference: request.reference,
                        notes: request.notes,
                    },
                )
                .await
        }
        TransactionType::Adjustment => {
            let request: AdjustmentRequest = parse_body(body)?;
            service
                .post_adjustment(
                    company_id,
                    created_by,
                    AdjustmentInput {
                        component_id: request.component_id,
                        location_id: request.location_id,
                        lot_id: request.lot_id,
                        quantity_change: request.quantity_change,
                        reason_code: request.reason_code,
                        notes: request.notes,
                    },
                )
                .await
        }
        TransactionType::Outbound => {
            let request: OutboundRequest = parse_body(body)?;
            service
                .post_outbound(
                    company_id,
                    created_by,
                    OutboundInput {
                        sku_id: request.sku_id,
                        location_id: request.location_id,
                        units: request.units,
                        allow_insufficient_inventory: request.allow_insufficient_inventory,
                        reference: request.reference,
                        notes: request.notes,
                    },
                )
                .await
        }
    }
    .map_err(map_service_error)?;

    info!(
        transaction_id = %posted.transaction.id,
        transaction_type = %posted.transaction.transaction_type,
        lines = posted.lines.len(),
        "transaction posted"
    );
    Ok(created_response(posted))
}

async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<TransactionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match query.transaction_type.as_deref() {
        None => None,
        Some(raw) => Some(TransactionType::from_str(raw).ok_or_else(|| {
            ApiError::Validation(format!("unknown transaction type {raw:?}"))
        })?),
    };

    let page = pagination.page;
    let per_page = pagination.per_page;
    let (items, total) = state
        .services
        .transactions
        .list(user.company_id, kind, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items, page, per_page, total,
    )))
}

async fn get_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = Uuid::parse_str(&raw_id)
        .map_err(|_| ApiError::Validation(format!("invalid transaction id {raw_id:?}")))?;

    let found = state
        .services
        .transactions
        .get(user.company_id, transaction_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(found))
}
