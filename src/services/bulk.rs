use crate::{
    db::DbPool,
    entities::{product, OperationType},
    errors::ServiceError,
    services::{
        non_blank,
        products::{CreateProductRequest, ProductService, UpdateProductRequest},
        stock::{StockChange, StockService, StockTarget},
    },
};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

pub const CSV_HEADERS: [&str; 8] = [
    "sku",
    "name",
    "description",
    "category",
    "quantity",
    "reorder_level",
    "price",
    "location",
];

const IMPORT_REASON: &str = "Bulk import";

/// One CSV line, in column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCsvRow {
    pub sku: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<i32>,
    pub reorder_level: Option<i32>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
}

impl From<product::Model> for ProductCsvRow {
    fn from(p: product::Model) -> Self {
        Self {
            sku: p.sku,
            name: Some(p.name),
            description: p.description,
            category: p.category,
            quantity: Some(p.quantity),
            reorder_level: Some(p.reorder_level),
            price: Some(p.price),
            location: p.location,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RowError {
    /// 1-based line in the uploaded file, header included
    pub line: u64,
    pub sku: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Updated,
    Unchanged,
}

fn row_message(err: &ServiceError) -> String {
    match err {
        ServiceError::InvalidFields(fields) => fields.join("; "),
        e if e.status_code().is_server_error() => e.response_message(),
        e => e.to_string(),
    }
}

/// Parses an upload into rows, keeping the line number of each record.
/// Records that cannot be decoded are returned as row errors.
pub fn parse_rows(
    data: &[u8],
    max_rows: usize,
) -> Result<(Vec<(u64, ProductCsvRow)>, Vec<RowError>), ServiceError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers: StringRecord = reader.headers()?.clone();
    let headers = StringRecord::from(
        headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect::<Vec<_>>(),
    );
    if !headers.iter().any(|h| h == "sku") {
        return Err(ServiceError::BadRequest(
            "CSV header must include a 'sku' column".to_string(),
        ));
    }

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for record in reader.records() {
        if rows.len() + errors.len() >= max_rows {
            return Err(ServiceError::BadRequest(format!(
                "CSV exceeds the limit of {max_rows} rows"
            )));
        }

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(RowError {
                    line: e.position().map(|p| p.line()).unwrap_or(0),
                    sku: None,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }

        match record.deserialize::<ProductCsvRow>(Some(&headers)) {
            Ok(row) if row.sku.is_empty() => errors.push(RowError {
                line,
                sku: None,
                message: "sku is required".to_string(),
            }),
            Ok(row) => rows.push((line, row)),
            Err(e) => errors.push(RowError {
                line,
                sku: record
                    .get(headers.iter().position(|h| h == "sku").unwrap_or(0))
                    .map(str::to_string)
                    .filter(|s| !s.is_empty()),
                message: e.to_string(),
            }),
        }
    }

    Ok((rows, errors))
}

/// Serializes rows with the standard header
pub fn write_rows(rows: impl IntoIterator<Item = ProductCsvRow>) -> Result<String, ServiceError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    let internal = |e: csv::Error| ServiceError::InternalError(format!("CSV write failed: {e}"));

    writer.write_record(CSV_HEADERS).map_err(internal)?;
    for row in rows {
        writer.serialize(row).map_err(internal)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::InternalError(format!("CSV write failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| ServiceError::InternalError(format!("CSV is not valid UTF-8: {e}")))
}

/// CSV import and export of the product catalogue
pub struct BulkService {
    db: Arc<DbPool>,
    products: Arc<ProductService>,
    stock: Arc<StockService>,
    max_import_rows: usize,
}

impl BulkService {
    pub fn new(
        db: Arc<DbPool>,
        products: Arc<ProductService>,
        stock: Arc<StockService>,
        max_import_rows: usize,
    ) -> Self {
        Self {
            db,
            products,
            stock,
            max_import_rows,
        }
    }

    /// Upserts products by SKU. Each row stands alone: a failing row is
    /// reported and the rest of the file is still applied.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn import_csv(&self, data: &[u8], user_id: i32) -> Result<ImportSummary, ServiceError> {
        let (rows, parse_errors) = parse_rows(data, self.max_import_rows)?;

        let mut summary = ImportSummary {
            total_rows: rows.len() + parse_errors.len(),
            failed: parse_errors.len(),
            errors: parse_errors,
            ..Default::default()
        };

        for (line, row) in rows {
            let sku = row.sku.clone();
            match self.import_row(row, user_id).await {
                Ok(RowOutcome::Created) => summary.created += 1,
                Ok(RowOutcome::Updated) => summary.updated += 1,
                Ok(RowOutcome::Unchanged) => summary.unchanged += 1,
                Err(e) => {
                    warn!(line, sku = %sku, error = %e, "Import row rejected");
                    summary.failed += 1;
                    summary.errors.push(RowError {
                        line,
                        sku: Some(sku),
                        message: row_message(&e),
                    });
                }
            }
        }
        summary.errors.sort_by_key(|e| e.line);

        counter!("inventory_bulk_import_rows_total", summary.created as u64, "outcome" => "created");
        counter!("inventory_bulk_import_rows_total", summary.updated as u64, "outcome" => "updated");
        counter!("inventory_bulk_import_rows_total", summary.failed as u64, "outcome" => "failed");
        info!(
            total = summary.total_rows,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "CSV import finished"
        );

        Ok(summary)
    }

    async fn import_row(&self, row: ProductCsvRow, user_id: i32) -> Result<RowOutcome, ServiceError> {
        let existing = product::Entity::find()
            .filter(product::Column::Sku.eq(row.sku.as_str()))
            .one(self.db.as_ref())
            .await?;

        let Some(existing) = existing else {
            let name = non_blank(row.name).ok_or_else(|| {
                ServiceError::ValidationError("name is required for new products".to_string())
            })?;
            self.products
                .create(
                    CreateProductRequest {
                        sku: row.sku,
                        name,
                        description: row.description,
                        category: row.category,
                        quantity: row.quantity,
                        reorder_level: row.reorder_level,
                        price: row.price.unwrap_or(Decimal::ZERO),
                        location: row.location,
                    },
                    user_id,
                )
                .await?;
            return Ok(RowOutcome::Created);
        };

        if row.quantity.is_some_and(|q| q < 0) {
            return Err(ServiceError::ValidationError(
                "quantity cannot be negative".to_string(),
            ));
        }

        // Stock level is evaluated once, after both the field update and the
        // quantity change have landed.
        let mut level_moved = None;
        let mut outcome = RowOutcome::Unchanged;
        if let Some(update) = changed_fields(&existing, &row) {
            let (updated, reorder_level_changed) =
                self.products.apply_update(existing.id, update).await?;
            if reorder_level_changed {
                level_moved = Some(updated);
            }
            outcome = RowOutcome::Updated;
        }

        if let Some(quantity) = row.quantity.filter(|q| *q != existing.quantity) {
            self.stock
                .adjust_stock(StockChange {
                    product_id: existing.id,
                    user_id,
                    target: StockTarget::Set(quantity),
                    reason: IMPORT_REASON.to_string(),
                    operation_type: OperationType::BulkImport,
                })
                .await?;
            return Ok(RowOutcome::Updated);
        }

        if let Some(product) = level_moved {
            self.products.notify_stock_level(&product).await;
        }
        Ok(outcome)
    }

    /// Every product as CSV, ordered by SKU
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<String, ServiceError> {
        let products = product::Entity::find()
            .order_by_asc(product::Column::Sku)
            .all(self.db.as_ref())
            .await?;
        let count = products.len();
        let csv = write_rows(products.into_iter().map(ProductCsvRow::from))?;
        info!(products = count, "CSV export generated");
        Ok(csv)
    }

    /// Header plus one sample row
    pub fn template() -> Result<String, ServiceError> {
        write_rows([ProductCsvRow {
            sku: "WIDGET-001".to_string(),
            name: Some("Sample widget".to_string()),
            description: Some("Replace or delete this row".to_string()),
            category: Some("General".to_string()),
            quantity: Some(25),
            reorder_level: Some(5),
            price: Some(Decimal::new(1999, 2)),
            location: Some("A1-01".to_string()),
        }])
    }
}

/// Descriptive fields in `row` that differ from `existing`, as an update request
fn changed_fields(existing: &product::Model, row: &ProductCsvRow) -> Option<UpdateProductRequest> {
    let mut update = UpdateProductRequest::default();
    let mut changed = false;

    if let Some(name) = row.name.as_ref().filter(|n| !n.is_empty() && **n != existing.name) {
        update.name = Some(name.clone());
        changed = true;
    }
    if row.description.is_some() && row.description != existing.description {
        update.description = row.description.clone();
        changed = true;
    }
    if row.category.is_some() && row.category != existing.category {
        update.category = row.category.clone();
        changed = true;
    }
    if let Some(level) = row.reorder_level.filter(|l| *l != existing.reorder_level) {
        update.reorder_level = Some(level);
        changed = true;
    }
    if let Some(price) = row.price.filter(|p| *p != existing.price) {
        update.price = Some(price);
        changed = true;
    }
    if row.location.is_some() && row.location != existing.location {
        update.location = row.location.clone();
        changed = true;
    }

    changed.then_some(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_rows_and_reports_bad_lines() {
        let data = b"sku,name,description,category,quantity,reorder_level,price,location\n\
BOLT-1,Bolt,,Fasteners,10,5,0.25,A1\n\
NUT-1,Nut,,Fasteners,lots,5,0.10,A2\n\
,Washer,,,1,1,0.01,\n\
\n\
SCREW-1,Screw,,,,,,\n";
        let (rows, errors) = parse_rows(data, 100).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[0].1.quantity, Some(10));
        assert_eq!(rows[0].1.description, None);
        assert_eq!(rows[1].1.sku, "SCREW-1");
        assert_eq!(rows[1].1.price, None);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 3);
        assert_eq!(errors[0].sku.as_deref(), Some("NUT-1"));
        assert_eq!(errors[1].line, 4);
        assert_eq!(errors[1].message, "sku is required");
    }

    #[test]
    fn missing_sku_header_is_rejected() {
        let err = parse_rows(b"name,price\nBolt,1.00\n", 100).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn row_limit_is_enforced() {
        let data = b"sku,name\nA,a\nB,b\nC,c\n";
        assert!(parse_rows(data, 3).is_ok());
        assert!(matches!(
            parse_rows(data, 2),
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[test]
    fn template_starts_with_header() {
        let template = BulkService::template().unwrap();
        let mut lines = template.lines();
        assert_eq!(lines.next(), Some(CSV_HEADERS.join(",").as_str()));
        assert!(lines.next().unwrap().starts_with("WIDGET-001,Sample widget"));
    }

    #[test]
    fn unchanged_rows_produce_no_update() {
        let now = Utc::now();
        let existing = product::Model {
            id: 3,
            sku: "BOLT-1".into(),
            name: "Bolt".into(),
            description: None,
            category: Some("Fasteners".into()),
            quantity: 10,
            reorder_level: 5,
            price: Decimal::new(25, 2),
            location: None,
            created_at: now,
            updated_at: now,
        };
        let same = ProductCsvRow::from(existing.clone());
        assert!(changed_fields(&existing, &same).is_none());

        let renamed = ProductCsvRow {
            name: Some("Hex bolt".into()),
            ..same
        };
        let update = changed_fields(&existing, &renamed).unwrap();
        assert_eq!(update.name.as_deref(), Some("Hex bolt"));
        assert!(update.price.is_none());
    }
}
