use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{DbPool, ScopedSelect};
use crate::entities::component::{self, Entity as ComponentEntity};
use crate::entities::location::{self, Entity as LocationEntity};
use crate::entities::sku::{self, Entity as SkuEntity};
use crate::errors::ServiceError;
use crate::services::components::{ComponentsService, CreateComponentInput};
use crate::services::skus::{CreateSkuInput, SkusService};
use crate::services::transactions::{NewLot, ReceiptInput, TransactionService};

/// One rejected row. `row_number` is the 1-indexed position among data rows,
/// header excluded, so it matches what a spreadsheet user sees.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowError {
    pub row_number: usize,
    pub field: Option<String>,
    pub message: String,
}

/// Import outcome. Bad rows are reported and skipped; the rest import.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ImportReport {
    pub successful: usize,
    pub failed: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Deserialize)]
struct ComponentRow {
    code: String,
    name: String,
    unit_of_measure: String,
    cost_per_unit: String,
    reorder_point: String,
    lead_time_days: String,
    #[serde(default)]
    lot_tracked: String,
}

#[derive(Debug, Serialize)]
struct ComponentExportRow<'a> {
    code: &'a str,
    name: &'a str,
    unit_of_measure: &'a str,
    cost_per_unit: Decimal,
    reorder_point: i64,
    lead_time_days: i32,
    lot_tracked: bool,
}

#[derive(Debug, Deserialize)]
struct SkuRow {
    code: String,
    name: String,
    #[serde(default)]
    finished_component_code: String,
}

#[derive(Debug, Serialize)]
struct SkuExportRow<'a> {
    code: &'a str,
    name: &'a str,
    finished_component_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitialInventoryRow {
    component_code: String,
    location_name: String,
    quantity: String,
    #[serde(default)]
    unit_cost: String,
    #[serde(default)]
    lot_code: String,
    #[serde(default)]
    expiry_date: String,
}

/// CSV import/export with fixed column schemas. Imports reject row by row:
/// one malformed row never aborts the file, and duplicate codes within the
/// tenant are skipped rather than overwritten.
#[derive(Clone)]
pub struct CsvService {
    db: Arc<DbPool>,
    components: ComponentsService,
    skus: SkusService,
    transactions: TransactionService,
}

impl CsvService {
    pub fn new(
        db: Arc<DbPool>,
        components: ComponentsService,
        skus: SkusService,
        transactions: TransactionService,
    ) -> Self {
        Self {
            db,
            components,
            skus,
            transactions,
        }
    }

    #[instrument(skip(self, data))]
    pub async fn import_components(
        &self,
        company_id: Uuid,
        data: &str,
    ) -> Result<ImportReport, ServiceError> {
        let mut report = ImportReport::default();
        let mut seen_codes: HashSet<String> = ComponentEntity::find()
            .for_company(company_id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|c| c.code)
            .collect();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());

        for (index, result) in reader.deserialize::<ComponentRow>().enumerate() {
            let row_number = index + 1;
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.fail(row_number, None, format!("malformed row: {e}"));
                    continue;
                }
            };

            if row.code.is_empty() {
                report.fail(row_number, Some("code"), "code is required".to_string());
                continue;
            }
            if row.name.is_empty() {
                report.fail(row_number, Some("name"), "name is required".to_string());
                continue;
            }
            if seen_codes.contains(&row.code) {
                report.skipped_duplicates += 1;
                continue;
            }

            let cost_per_unit = match Decimal::from_str(&row.cost_per_unit) {
                Ok(v) if v >= Decimal::ZERO => v,
                _ => {
                    report.fail(
                        row_number,
                        Some("cost_per_unit"),
                        format!("invalid cost: {:?}", row.cost_per_unit),
                    );
                    continue;
                }
            };
            let reorder_point = match row.reorder_point.parse::<i64>() {
                Ok(v) if v >= 0 => v,
                _ => {
                    report.fail(
                        row_number,
                        Some("reorder_point"),
                        format!("invalid reorder point: {:?}", row.reorder_point),
                    );
                    continue;
                }
            };
            let lead_time_days = match row.lead_time_days.parse::<i32>() {
                Ok(v) if v >= 0 => v,
                _ => {
                    report.fail(
                        row_number,
                        Some("lead_time_days"),
                        format!("invalid lead time: {:?}", row.lead_time_days),
                    );
                    continue;
                }
            };
            let lot_tracked = match parse_bool(&row.lot_tracked) {
                Some(v) => v,
                None => {
                    report.fail(
                        row_number,
                        Some("lot_tracked"),
                        format!("invalid boolean: {:?}", row.lot_tracked),
                    );
                    continue;
                }
            };

            let input = CreateComponentInput {
                code: row.code.clone(),
                name: row.name,
                unit_of_measure: row.unit_of_measure,
                cost_per_unit,
                reorder_point,
                lead_time_days,
                lot_tracked,
            };

            match self.components.create(company_id, input).await {
                Ok(_) => {
                    seen_codes.insert(row.code);
                    report.successful += 1;
                }
                Err(ServiceError::Conflict(_)) => report.skipped_duplicates += 1,
                Err(e) => report.fail(row_number, None, e.response_message()),
            }
        }

        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn export_components(&self, company_id: Uuid) -> Result<String, ServiceError> {
        let components = ComponentEntity::find()
            .for_company(company_id)
            .order_by_asc(component::Column::Code)
            .all(self.db.as_ref())
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for c in &components {
            writer
                .serialize(ComponentExportRow {
                    code: &c.code,
                    name: &c.name,
                    unit_of_measure: &c.unit_of_measure,
                    cost_per_unit: c.cost_per_unit,
                    reorder_point: c.reorder_point,
                    lead_time_days: c.lead_time_days,
                    lot_tracked: c.lot_tracked,
                })
                .map_err(|e| ServiceError::Internal(format!("csv write failed: {e}")))?;
        }

        finish_csv(writer)
    }

    #[instrument(skip(self, data))]
    pub async fn import_skus(
        &self,
        company_id: Uuid,
        data: &str,
    ) -> Result<ImportReport, ServiceError> {
        let mut report = ImportReport::default();
        let mut seen_codes: HashSet<String> = SkuEntity::find()
            .for_company(company_id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|s| s.code)
            .collect();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());

        for (index, result) in reader.deserialize::<SkuRow>().enumerate() {
            let row_number = index + 1;
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.fail(row_number, None, format!("malformed row: {e}"));
                    continue;
                }
            };

            if row.code.is_empty() {
                report.fail(row_number, Some("code"), "code is required".to_string());
                continue;
            }
            if row.name.is_empty() {
                report.fail(row_number, Some("name"), "name is required".to_string());
                continue;
            }
            if seen_codes.contains(&row.code) {
                report.skipped_duplicates += 1;
                continue;
            }

            let finished_component_id = if row.finished_component_code.is_empty() {
                None
            } else {
                match self
                    .find_component_by_code(company_id, &row.finished_component_code)
                    .await?
                {
                    Some(found) => Some(found.id),
                    None => {
                        report.fail(
                            row_number,
                            Some("finished_component_code"),
                            format!("unknown component {:?}", row.finished_component_code),
                        );
                        continue;
                    }
                }
            };

            let input = CreateSkuInput {
                code: row.code.clone(),
                name: row.name,
                brand_id: None,
                finished_component_id,
            };

            match self.skus.create(company_id, input).await {
                Ok(_) => {
                    seen_codes.insert(row.code);
                    report.successful += 1;
                }
                Err(ServiceError::Conflict(_)) => report.skipped_duplicates += 1,
                Err(e) => report.fail(row_number, None, e.response_message()),
            }
        }

        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn export_skus(&self, company_id: Uuid) -> Result<String, ServiceError> {
        let skus = SkuEntity::find()
            .for_company(company_id)
            .order_by_asc(sku::Column::Code)
            .all(self.db.as_ref())
            .await?;

        let component_codes: std::collections::HashMap<Uuid, String> = ComponentEntity::find()
            .for_company(company_id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|c| (c.id, c.code))
            .collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        for s in &skus {
            let finished = s
                .finished_component_id
                .and_then(|id| component_codes.get(&id))
                .map(String::as_str)
                .unwrap_or("");
            writer
                .serialize(SkuExportRow {
                    code: &s.code,
                    name: &s.name,
                    finished_component_code: finished,
                })
                .map_err(|e| ServiceError::Internal(format!("csv write failed: {e}")))?;
        }

        finish_csv(writer)
    }

    /// Opening balances arrive as `initial` transactions through the engine,
    /// so they hit the ledger, lot balances and stock balances like any
    /// other inbound stock.
    #[instrument(skip(self, data))]
    pub async fn import_initial_inventory(
        &self,
        company_id: Uuid,
        created_by: Option<Uuid>,
        data: &str,
    ) -> Result<ImportReport, ServiceError> {
        let mut report = ImportReport::default();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());

        for (index, result) in reader.deserialize::<InitialInventoryRow>().enumerate() {
            let row_number = index + 1;
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.fail(row_number, None, format!("malformed row: {e}"));
                    continue;
                }
            };

            if row.component_code.is_empty() {
                report.fail(
                    row_number,
                    Some("component_code"),
                    "component_code is required".to_string(),
                );
                continue;
            }

            let component = match self
                .find_component_by_code(company_id, &row.component_code)
                .await?
            {
                Some(found) => found,
                None => {
                    report.fail(
                        row_number,
                        Some("component_code"),
                        format!("unknown component {:?}", row.component_code),
                    );
                    continue;
                }
            };

            let location = match self
                .find_location_by_name(company_id, &row.location_name)
                .await?
            {
                Some(found) => found,
                None => {
                    report.fail(
                        row_number,
                        Some("location_name"),
                        format!("unknown location {:?}", row.location_name),
                    );
                    continue;
                }
            };

            let quantity = match row.quantity.parse::<i64>() {
                Ok(v) if v > 0 => v,
                _ => {
                    report.fail(
                        row_number,
                        Some("quantity"),
                        format!("invalid quantity: {:?}", row.quantity),
                    );
                    continue;
                }
            };

            let unit_cost = if row.unit_cost.is_empty() {
                None
            } else {
                match Decimal::from_str(&row.unit_cost) {
                    Ok(v) if v >= Decimal::ZERO => Some(v),
                    _ => {
                        report.fail(
                            row_number,
                            Some("unit_cost"),
                            format!("invalid cost: {:?}", row.unit_cost),
                        );
                        continue;
                    }
                }
            };

            let expiry_date = if row.expiry_date.is_empty() {
                None
            } else {
                match NaiveDate::parse_from_str(&row.expiry_date, "%Y-%m-%d") {
                    Ok(date) => Some(date),
                    Err(_) => {
                        report.fail(
                            row_number,
                            Some("expiry_date"),
                            format!("invalid date (expected YYYY-MM-DD): {:?}", row.expiry_date),
                        );
                        continue;
                    }
                }
            };

            let lot = (!row.lot_code.is_empty()).then(|| NewLot {
                lot_code: row.lot_code.clone(),
                expiry_date,
                supplier: None,
            });

            let input = ReceiptInput {
                component_id: component.id,
                location_id: location.id,
                quantity,
                unit_cost,
                update_component_cost: false,
                lot,
                reference: Some("csv-import".to_string()),
                notes: None,
            };

            match self.transactions.post_initial(company_id, created_by, input).await {
                Ok(_) => report.successful += 1,
                Err(e) => report.fail(row_number, None, e.response_message()),
            }
        }

        Ok(report)
    }

    async fn find_component_by_code(
        &self,
        company_id: Uuid,
        code: &str,
    ) -> Result<Option<component::Model>, ServiceError> {
        ComponentEntity::find()
            .for_company(company_id)
            .filter(component::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from)
    }

    async fn find_location_by_name(
        &self,
        company_id: Uuid,
        name: &str,
    ) -> Result<Option<location::Model>, ServiceError> {
        LocationEntity::find()
            .for_company(company_id)
            .filter(location::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from)
    }
}

impl ImportReport {
    fn fail(&mut self, row_number: usize, field: Option<&str>, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RowError {
            row_number,
            field: field.map(str::to_string),
            message: message.into(),
        });
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "0" => Some(false),
        "true" | "yes" | "1" => Some(true),
        _ => None,
    }
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, ServiceError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::Internal(format!("csv flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::Internal(format!("csv not utf-8: {e}")))
}
