use queryloom::application::use_cases::pipeline::{Pipeline, SequentialChain};
use queryloom::application::use_cases::table_session::{SessionConfig, TableSession};
use queryloom::domain::error::{AppError, Result};
use queryloom::domain::request::UserRequest;
use queryloom::domain::schema_catalog::{presets, SchemaCatalog};
use queryloom::domain::templates;
use queryloom::infrastructure::config;
use queryloom::infrastructure::llm_clients::RouterClient;
use std::io::Read;
use tracing::info;

/// Demo rows for the card-authorization catalog, used when no database file
/// is configured.
const CARD_AUTH_DEMO_SEED: &str = "\
    CREATE TABLE posting_errors (posting_error_date TEXT, posting_error TEXT, line_confirmation_id TEXT, sales_order TEXT);\
    CREATE TABLE card_authorizations (line_confirmation_id TEXT, sales_order TEXT, auth_type TEXT, status TEXT, event_date TEXT, credit_card_type TEXT, amount REAL, authorization_code TEXT, seq_no REAL);\
    INSERT INTO posting_errors VALUES ('2024-01-02', 'Refund failed: full refund already settled', 'LC1', 'SO1');\
    INSERT INTO card_authorizations VALUES ('LC1', 'SO1', 'Authorization', 'Approved', '2024-01-01', 'VISA', 100.0, 'A1', 1);\
    INSERT INTO card_authorizations VALUES ('LC1', 'SO1', 'Void', 'Declined', '2024-01-02', 'VISA', 100.0, 'A2', 2);\
    INSERT INTO card_authorizations VALUES ('LC2', 'SO2', 'Authorization', 'Approved', '2024-01-01', 'AMEX', 50.0, 'B1', 1);\
    INSERT INTO card_authorizations VALUES ('LC2', 'SO2', 'Finalization', 'Settled', '2024-01-03', 'AMEX', 50.0, 'B2', 2);";

/// Demo rows for the e-commerce catalog.
const ECOMMERCE_DEMO_SEED: &str = "\
    CREATE TABLE customers (customer_unique_id TEXT, customer_id TEXT, customer_state TEXT, customer_zip_code_prefix INTEGER, customer_city TEXT);\
    CREATE TABLE geolocation (geolocation_lng REAL, geolocation_state TEXT, geolocation_lat REAL, geolocation_city TEXT, geolocation_zip_code_prefix INTEGER);\
    CREATE TABLE order_items (order_id TEXT, seller_id TEXT, freight_value REAL, product_id TEXT, shipping_limit_date TEXT, price REAL, order_item_id INTEGER);\
    CREATE TABLE orders (order_approved_at TEXT, order_estimated_delivery_date TEXT, order_status TEXT, order_delivered_customer_date TEXT, order_purchase_timestamp TEXT, order_delivered_carrier_date TEXT, order_id TEXT, customer_id TEXT);\
    CREATE TABLE payments (payment_sequential INTEGER, payment_installments INTEGER, payment_type TEXT, payment_value REAL, order_id TEXT);\
    CREATE TABLE products (product_category TEXT, product_photos_qty INTEGER, product_id TEXT, product_weight_g INTEGER);\
    CREATE TABLE sellers (seller_state TEXT, seller_zip_code_prefix INTEGER, seller_city TEXT, seller_id TEXT);\
    INSERT INTO customers VALUES ('CU1', 'C1', 'SP', 13023, 'Campinas');\
    INSERT INTO customers VALUES ('CU2', 'C2', 'RJ', 20040, 'Rio de Janeiro');\
    INSERT INTO orders VALUES ('2024-02-01', '2024-02-12', 'delivered', '2024-02-10', '2024-01-31', '2024-02-03', 'ORD1', 'C1');\
    INSERT INTO orders VALUES ('2024-02-05', '2024-02-20', 'canceled', NULL, '2024-02-04', NULL, 'ORD2', 'C2');\
    INSERT INTO order_items VALUES ('ORD1', 'S1', 12.5, 'P1', '2024-02-02', 89.9, 1);\
    INSERT INTO payments VALUES (1, 1, 'credit_card', 102.4, 'ORD1');\
    INSERT INTO products VALUES ('housewares', 3, 'P1', 1200);\
    INSERT INTO sellers VALUES ('SP', 1046, 'Sao Paulo', 'S1');";

fn resolve_catalog(name: &str) -> Result<SchemaCatalog> {
    match name {
        "ecommerce" => Ok(presets::ecommerce()),
        "card_authorizations" => Ok(presets::card_authorizations()),
        other => Err(AppError::ValidationError(format!(
            "Unknown catalog preset '{}'; expected 'ecommerce' or 'card_authorizations'",
            other
        ))),
    }
}

fn demo_seed(catalog: &str) -> &'static str {
    match catalog {
        "card_authorizations" => CARD_AUTH_DEMO_SEED,
        _ => ECOMMERCE_DEMO_SEED,
    }
}

fn read_user_input() -> Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| AppError::IoError(format!("Failed to read request from stdin: {}", e)))?;
    Ok(buffer)
}

fn print_result(result: &queryloom::application::use_cases::table_session::ResultTable) {
    if result.row_count == 0 {
        println!("(no rows)");
        return;
    }

    println!("{}", result.columns.join(" | "));
    for row in &result.rows {
        let rendered: Vec<String> = result
            .columns
            .iter()
            .map(|column| match row.get(column) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => String::new(),
            })
            .collect();
        println!("{}", rendered.join(" | "));
    }
}

async fn run() -> Result<()> {
    let settings = config::load()?;
    let mut llm_config = settings.llm.clone();
    config::resolve_api_key(&mut llm_config);

    let request = UserRequest::new(&read_user_input()?)?;
    let catalog = resolve_catalog(&settings.catalog)?;

    let selector_template = templates::resolve(
        templates::SCHEMA_SELECTOR_ID,
        settings.templates.schema_selector.as_deref(),
    )?;
    let generator_template = templates::resolve(
        templates::CODE_GENERATOR_ID,
        settings.templates.code_generator.as_deref(),
    )?;

    let session_config = SessionConfig {
        query_timeout_secs: settings.executor.query_timeout_secs,
    };
    let session = match &settings.executor.database {
        Some(path) => TableSession::open(path, session_config).await?,
        None => {
            info!(catalog = %settings.catalog, "No database configured, seeding demo session");
            TableSession::in_memory(demo_seed(&settings.catalog), session_config).await?
        }
    };

    let chain = SequentialChain::with_templates(&catalog, selector_template, generator_template);
    let pipeline = Pipeline::new(chain, session);
    let client = RouterClient::new();

    let outcome = pipeline.run(&client, &llm_config, &request).await?;

    print_result(&outcome.result);
    println!(
        "-- {} row(s) in {} ms (run {})",
        outcome.telemetry.row_count, outcome.telemetry.total_ms, outcome.telemetry.run_id
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    if let Err(err) = run().await {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
