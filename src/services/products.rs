use crate::{
    db::{self, DbPool},
    entities::{inventory_audit, product, OperationType},
    errors::ServiceError,
    services::{non_blank, notifications::NotificationService, PageRequest, SortOrder},
    PaginatedResponse,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_REORDER_LEVEL: i32 = 10;

pub(crate) static SKU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid SKU pattern"));

pub(crate) fn validate_price(price: &Decimal) -> Result<(), validator::ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = validator::ValidationError::new("price_negative");
        err.message = Some("price cannot be negative".into());
        return Err(err);
    }
    if price.scale() > 2 {
        let mut err = validator::ValidationError::new("price_precision");
        err.message = Some("price cannot have more than two decimal places".into());
        return Err(err);
    }
    Ok(())
}

/// Body of `POST /api/products`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(
        length(min = 1, max = 64, message = "sku must be 1-64 characters"),
        regex(path = "SKU_PATTERN", message = "sku may only contain letters, digits, '.', '_' and '-'")
    )]
    #[schema(example = "BOLT-M6-40")]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100, message = "category cannot exceed 100 characters"))]
    pub category: Option<String>,
    /// Opening stock; recorded as an `initial_stock` audit entry when positive
    #[validate(range(min = 0, message = "quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0, message = "reorder_level cannot be negative"))]
    pub reorder_level: Option<i32>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = String, example = "0.35")]
    pub price: Decimal,
    #[validate(length(max = 255, message = "location cannot exceed 255 characters"))]
    pub location: Option<String>,
}

/// Body of `PUT /api/products/:id`. Absent fields are left untouched; blank
/// strings clear optional text fields.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(
        length(min = 1, max = 64, message = "sku must be 1-64 characters"),
        regex(path = "SKU_PATTERN", message = "sku may only contain letters, digits, '.', '_' and '-'")
    )]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100, message = "category cannot exceed 100 characters"))]
    pub category: Option<String>,
    #[validate(range(min = 0, message = "reorder_level cannot be negative"))]
    pub reorder_level: Option<i32>,
    #[validate(custom = "validate_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(length(max = 255, message = "location cannot exceed 255 characters"))]
    pub location: Option<String>,
    /// Rejected: stock only changes through the stock endpoints
    #[schema(ignore)]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortField {
    #[default]
    Name,
    Sku,
    Category,
    Quantity,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl From<ProductSortField> for product::Column {
    fn from(field: ProductSortField) -> Self {
        match field {
            ProductSortField::Name => product::Column::Name,
            ProductSortField::Sku => product::Column::Sku,
            ProductSortField::Category => product::Column::Category,
            ProductSortField::Quantity => product::Column::Quantity,
            ProductSortField::Price => product::Column::Price,
            ProductSortField::CreatedAt => product::Column::CreatedAt,
            ProductSortField::UpdatedAt => product::Column::UpdatedAt,
        }
    }
}

/// Query string of `GET /api/products`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive substring match on name, SKU and description
    pub search: Option<String>,
    pub category: Option<String>,
    /// Only products at or below their reorder level
    pub low_stock: Option<bool>,
    pub sort_by: Option<ProductSortField>,
    pub sort_order: Option<SortOrder>,
}

pub struct ProductService {
    db: Arc<DbPool>,
    notifications: Arc<NotificationService>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, notifications: Arc<NotificationService>) -> Self {
        Self { db, notifications }
    }

    /// Creates a product. Opening stock is audited in the same transaction.
    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create(
        &self,
        request: CreateProductRequest,
        user_id: i32,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let sku = request.sku.trim().to_string();
        self.ensure_sku_available(&sku, None).await?;

        let quantity = request.quantity.unwrap_or(0);
        let model = product::ActiveModel {
            sku: Set(sku),
            name: Set(request.name.trim().to_string()),
            description: Set(non_blank(request.description)),
            category: Set(non_blank(request.category)),
            quantity: Set(quantity),
            reorder_level: Set(request.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL)),
            price: Set(request.price),
            location: Set(non_blank(request.location)),
            ..Default::default()
        };

        let created = db::transaction(self.db.as_ref(), "product.create", move |txn| {
            Box::pin(async move {
                let created = model.insert(txn).await?;
                if quantity > 0 {
                    inventory_audit::ActiveModel {
                        product_id: Set(created.id),
                        user_id: Set(user_id),
                        old_quantity: Set(0),
                        new_quantity: Set(quantity),
                        reason: Set("Initial stock".to_string()),
                        operation_type: Set(OperationType::InitialStock),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                }
                Ok(created)
            })
        })
        .await?;

        info!(product_id = created.id, sku = %created.sku, quantity, "Product created");
        self.notifications.notify_stock_level(&created).await;
        Ok(created)
    }

    /// Updates descriptive fields and re-checks stock when the reorder level moved.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        let (updated, reorder_level_changed) = self.apply_update(id, request).await?;
        if reorder_level_changed {
            self.notifications.notify_stock_level(&updated).await;
        }
        Ok(updated)
    }

    /// Writes the update without evaluating notifications. The flag reports
    /// whether `reorder_level` changed.
    pub(crate) async fn apply_update(
        &self,
        id: i32,
        request: UpdateProductRequest,
    ) -> Result<(product::Model, bool), ServiceError> {
        if request.quantity.is_some() {
            return Err(ServiceError::ValidationError(
                "quantity can only be changed through stock adjustments".to_string(),
            ));
        }
        request.validate()?;

        let existing = self.get(id).await?;
        let previous_reorder_level = existing.reorder_level;
        let mut active: product::ActiveModel = existing.clone().into();

        if let Some(sku) = request.sku {
            let sku = sku.trim().to_string();
            if sku != existing.sku {
                self.ensure_sku_available(&sku, Some(id)).await?;
                active.sku = Set(sku);
            }
        }
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(non_blank(Some(description)));
        }
        if let Some(category) = request.category {
            active.category = Set(non_blank(Some(category)));
        }
        if let Some(reorder_level) = request.reorder_level {
            active.reorder_level = Set(reorder_level);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(location) = request.location {
            active.location = Set(non_blank(Some(location)));
        }

        let updated = active.update(self.db.as_ref()).await?;
        info!(product_id = id, sku = %updated.sku, "Product updated");

        let reorder_level_changed = updated.reorder_level != previous_reorder_level;
        Ok((updated, reorder_level_changed))
    }

    pub(crate) async fn notify_stock_level(&self, product: &product::Model) {
        self.notifications.notify_stock_level(product).await;
    }

    /// Deletes a product; its audit rows and notifications go with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = product::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Product", id));
        }
        info!(product_id = id, "Product deleted");
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    pub async fn get_by_sku(&self, sku: &str) -> Result<product::Model, ServiceError> {
        product::Entity::find()
            .filter(product::Column::Sku.eq(sku.trim()))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with SKU '{sku}' not found")))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ProductQuery,
        page: PageRequest,
    ) -> Result<PaginatedResponse<product::Model>, ServiceError> {
        let mut condition = Condition::all();

        if let Some(term) = non_blank(query.search) {
            let pattern = format!("%{}%", term.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(lower_like(product::Column::Name, &pattern))
                    .add(lower_like(product::Column::Sku, &pattern))
                    .add(lower_like(product::Column::Description, &pattern)),
            );
        }
        if let Some(category) = non_blank(query.category) {
            condition = condition.add(product::Column::Category.eq(category));
        }
        if query.low_stock == Some(true) {
            condition = condition.add(
                Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)),
            );
        }

        let sort_column: product::Column = query.sort_by.unwrap_or_default().into();
        let order: sea_orm::Order = query.sort_order.unwrap_or_default().into();

        let paginator = product::Entity::find()
            .filter(condition)
            .order_by(sort_column, order)
            .order_by_asc(product::Column::Id)
            .paginate(self.db.as_ref(), page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    /// Distinct non-empty categories, alphabetically
    pub async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories = product::Entity::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .filter(product::Column::Category.is_not_null())
            .order_by_asc(product::Column::Category)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await?;
        Ok(categories)
    }

    /// Products at or below their reorder level, emptiest first
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = product::Entity::find()
            .filter(
                Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)),
            )
            .order_by_asc(product::Column::Quantity)
            .order_by_asc(product::Column::Sku)
            .all(self.db.as_ref())
            .await?;
        Ok(products)
    }

    async fn ensure_sku_available(&self, sku: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.count(self.db.as_ref()).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU '{sku}' already exists"
            )));
        }
        Ok(())
    }
}

/// `LOWER(column) LIKE pattern`, identical on SQLite and Postgres
fn lower_like(column: product::Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn create_request(sku: &str) -> CreateProductRequest {
        CreateProductRequest {
            sku: sku.into(),
            name: "Hex bolt".into(),
            description: None,
            category: Some("Fasteners".into()),
            quantity: Some(50),
            reorder_level: None,
            price: dec!(0.35),
            location: None,
        }
    }

    #[test]
    fn sku_pattern_rejects_spaces_and_symbols() {
        assert!(create_request("BOLT-M6.40_A").validate().is_ok());
        assert!(create_request("BOLT M6").validate().is_err());
        assert!(create_request("BOLT#6").validate().is_err());
        assert!(create_request("").validate().is_err());
    }

    #[test]
    fn price_must_be_non_negative_with_cents_precision() {
        assert!(validate_price(&dec!(0)).is_ok());
        assert!(validate_price(&dec!(12.50)).is_ok());
        assert!(validate_price(&dec!(-0.01)).is_err());
        assert!(validate_price(&dec!(1.005)).is_err());
    }

    #[test]
    fn update_request_validates_only_present_fields() {
        assert!(UpdateProductRequest::default().validate().is_ok());
        let bad = UpdateProductRequest {
            reorder_level: Some(-1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
