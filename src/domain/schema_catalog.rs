//! Table catalog rendered into the schema-selection prompt.
//!
//! The catalog is an ordered, immutable set of table definitions built at
//! process start. Rendering preserves declaration order and emits the
//! JSON-schema-flavored block the selection template expects.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub description: String,
    /// Enumerated distinct values, when the column has a small closed set.
    pub distinct_values: Option<Vec<String>>,
}

impl ColumnSchema {
    pub fn new(name: &str, data_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            description: description.to_string(),
            distinct_values: None,
        }
    }

    pub fn with_distinct_values(mut self, values: &[&str]) -> Self {
        self.distinct_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Hint that a table joins another on a fixed column set. All listed columns
/// participate in the join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinHint {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub joins: Vec<JoinHint>,
}

impl TableSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            joins: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    pub fn join(mut self, table: &str, columns: &[&str]) -> Self {
        self.joins.push(JoinHint {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }
}

/// Ordered set of table definitions, fixed at construction and never mutated
/// at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCatalog {
    tables: Vec<TableSchema>,
}

impl SchemaCatalog {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Render every table definition, in declaration order, as the text block
    /// substituted into the schema-selection template.
    pub fn render_prompt_block(&self) -> String {
        let mut block = String::new();

        for table in &self.tables {
            let _ = writeln!(block, "{} = {{", table.name);
            let _ = writeln!(block, "  \"properties\": {{");

            for column in &table.columns {
                let mut entry = format!(
                    "    \"{}\": {{\"type\": \"{}\", \"description\": \"{}\"",
                    column.name, column.data_type, column.description
                );
                if let Some(values) = &column.distinct_values {
                    let rendered = values
                        .iter()
                        .map(|v| format!("'{}'", v))
                        .collect::<Vec<_>>()
                        .join(", ");
                    entry.push_str(&format!(", \"distinct_values\": \"[{}]\"", rendered));
                }
                entry.push_str("},");
                let _ = writeln!(block, "{}", entry);
            }

            for (idx, join) in table.joins.iter().enumerate() {
                let columns = join
                    .columns
                    .iter()
                    .map(|c| format!("\"{}\"", c))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(
                    block,
                    "    \"join_columns{}\": {{\"description\": \"Use ALL THE COLUMNS to join with {}\", \"columns\": \"[{}]\"}},",
                    idx + 1,
                    join.table,
                    columns
                );
            }

            let _ = writeln!(block, "  }}");
            let _ = writeln!(block, "}}");
            let _ = writeln!(block);
        }

        block
    }
}

/// Built-in catalogs for the two pipeline variants this system ships with.
pub mod presets {
    use super::*;

    /// Sales-order card-authorization catalog: posting errors plus the
    /// authorization event log they join against.
    pub fn card_authorizations() -> SchemaCatalog {
        SchemaCatalog::new(vec![
            TableSchema::new("posting_errors")
                .column(ColumnSchema::new(
                    "posting_error_date",
                    "date",
                    "Date when the error log was recorded",
                ))
                .column(ColumnSchema::new(
                    "posting_error",
                    "string",
                    "Posting error log message",
                ))
                .column(ColumnSchema::new(
                    "line_confirmation_id",
                    "string",
                    "Unique identifier for the line confirmation",
                ))
                .column(ColumnSchema::new(
                    "sales_order",
                    "string",
                    "Sales order number associated with the sales line",
                ))
                .join("card_authorizations", &["sales_order", "line_confirmation_id"]),
            TableSchema::new("card_authorizations")
                .column(ColumnSchema::new(
                    "line_confirmation_id",
                    "string",
                    "Unique identifier for the line confirmation",
                ))
                .column(ColumnSchema::new(
                    "sales_order",
                    "string",
                    "Sales order number associated with the line confirmation",
                ))
                .column(
                    ColumnSchema::new("auth_type", "string", "Type of the line confirmation")
                        .with_distinct_values(&[
                            "Post Authorization",
                            "Credit",
                            "Void",
                            "Finalization",
                            "Authorization",
                        ]),
                )
                .column(
                    ColumnSchema::new("status", "string", "Status of the line confirmation")
                        .with_distinct_values(&["Approved", "Settled", "Declined"]),
                )
                .column(ColumnSchema::new(
                    "event_date",
                    "timestamp",
                    "Date of the line confirmation event",
                ))
                .column(ColumnSchema::new(
                    "credit_card_type",
                    "string",
                    "Type of credit card used",
                ))
                .column(ColumnSchema::new(
                    "amount",
                    "decimal",
                    "Amount of the line confirmation in the sales order currency",
                ))
                .column(ColumnSchema::new(
                    "authorization_code",
                    "string",
                    "Authorization code",
                ))
                .column(ColumnSchema::new(
                    "seq_no",
                    "decimal",
                    "Sequence of authorizations within the sales order",
                ))
                .join("posting_errors", &["sales_order", "line_confirmation_id"]),
        ])
    }

    /// E-commerce analytics catalog: orders with their customers, items,
    /// payments, products, sellers and customer geolocation.
    pub fn ecommerce() -> SchemaCatalog {
        SchemaCatalog::new(vec![
            TableSchema::new("customers")
                .column(ColumnSchema::new(
                    "customer_unique_id",
                    "string",
                    "Unique identifier for the customer",
                ))
                .column(ColumnSchema::new(
                    "customer_id",
                    "string",
                    "Identifier for the customer used by orders",
                ))
                .column(ColumnSchema::new(
                    "customer_state",
                    "string",
                    "State where the customer is located",
                ))
                .column(ColumnSchema::new(
                    "customer_zip_code_prefix",
                    "bigint",
                    "First digits of the customer zip code",
                ))
                .column(ColumnSchema::new(
                    "customer_city",
                    "string",
                    "City where the customer is located",
                ))
                .join("orders", &["customer_id"])
                .join("geolocation", &["customer_zip_code_prefix"]),
            TableSchema::new("geolocation")
                .column(ColumnSchema::new(
                    "geolocation_lng",
                    "double",
                    "Longitude of the geographical location",
                ))
                .column(ColumnSchema::new(
                    "geolocation_state",
                    "string",
                    "State name of the geographical location",
                ))
                .column(ColumnSchema::new(
                    "geolocation_lat",
                    "double",
                    "Latitude of the geographical location",
                ))
                .column(ColumnSchema::new(
                    "geolocation_city",
                    "string",
                    "City name of the geographical location",
                ))
                .column(ColumnSchema::new(
                    "geolocation_zip_code_prefix",
                    "bigint",
                    "First digits of the zip code",
                )),
            TableSchema::new("order_items")
                .column(ColumnSchema::new(
                    "order_id",
                    "string",
                    "Identifier of the order the item belongs to",
                ))
                .column(ColumnSchema::new(
                    "seller_id",
                    "string",
                    "Identifier of the seller providing the product",
                ))
                .column(ColumnSchema::new(
                    "freight_value",
                    "double",
                    "Freight value charged for the item",
                ))
                .column(ColumnSchema::new(
                    "product_id",
                    "string",
                    "Identifier of the product being ordered",
                ))
                .column(ColumnSchema::new(
                    "shipping_limit_date",
                    "timestamp",
                    "Deadline for handing the item to the carrier",
                ))
                .column(ColumnSchema::new(
                    "price",
                    "double",
                    "Price of the product in the order",
                ))
                .column(ColumnSchema::new(
                    "order_item_id",
                    "bigint",
                    "Identifier of the item within its order",
                ))
                .join("orders", &["order_id"])
                .join("products", &["product_id"])
                .join("sellers", &["seller_id"]),
            TableSchema::new("orders")
                .column(ColumnSchema::new(
                    "order_approved_at",
                    "timestamp",
                    "When the order was approved",
                ))
                .column(ColumnSchema::new(
                    "order_estimated_delivery_date",
                    "timestamp",
                    "Estimated delivery date given at purchase",
                ))
                .column(
                    ColumnSchema::new("order_status", "string", "Current status of the order")
                        .with_distinct_values(&[
                            "created",
                            "approved",
                            "shipped",
                            "delivered",
                            "canceled",
                        ]),
                )
                .column(ColumnSchema::new(
                    "order_delivered_customer_date",
                    "timestamp",
                    "When the order reached the customer",
                ))
                .column(ColumnSchema::new(
                    "order_purchase_timestamp",
                    "timestamp",
                    "When the order was placed",
                ))
                .column(ColumnSchema::new(
                    "order_delivered_carrier_date",
                    "timestamp",
                    "When the order was handed to the carrier",
                ))
                .column(ColumnSchema::new(
                    "order_id",
                    "string",
                    "Unique identifier for the order",
                ))
                .column(ColumnSchema::new(
                    "customer_id",
                    "string",
                    "Identifier of the customer placing the order",
                ))
                .join("customers", &["customer_id"]),
            TableSchema::new("payments")
                .column(ColumnSchema::new(
                    "payment_sequential",
                    "bigint",
                    "Sequence of the payment within the order",
                ))
                .column(ColumnSchema::new(
                    "payment_installments",
                    "bigint",
                    "Number of installments for the payment plan",
                ))
                .column(ColumnSchema::new(
                    "payment_type",
                    "string",
                    "Payment method",
                ))
                .column(ColumnSchema::new(
                    "payment_value",
                    "double",
                    "Value of the payment",
                ))
                .column(ColumnSchema::new(
                    "order_id",
                    "string",
                    "Identifier of the order the payment belongs to",
                ))
                .join("orders", &["order_id"]),
            TableSchema::new("products")
                .column(ColumnSchema::new(
                    "product_category",
                    "string",
                    "Category of the product",
                ))
                .column(ColumnSchema::new(
                    "product_photos_qty",
                    "bigint",
                    "Number of photos published for the product",
                ))
                .column(ColumnSchema::new(
                    "product_id",
                    "string",
                    "Unique identifier for the product",
                ))
                .column(ColumnSchema::new(
                    "product_weight_g",
                    "bigint",
                    "Weight of the product in grams",
                ))
                .join("order_items", &["product_id"]),
            TableSchema::new("sellers")
                .column(ColumnSchema::new(
                    "seller_state",
                    "string",
                    "State where the seller is located",
                ))
                .column(ColumnSchema::new(
                    "seller_zip_code_prefix",
                    "bigint",
                    "First digits of the seller zip code",
                ))
                .column(ColumnSchema::new(
                    "seller_city",
                    "string",
                    "City where the seller is located",
                ))
                .column(ColumnSchema::new(
                    "seller_id",
                    "string",
                    "Unique identifier for the seller",
                ))
                .join("order_items", &["seller_id"]),
        ])
    }
}
