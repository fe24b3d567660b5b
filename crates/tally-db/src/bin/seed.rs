//! # Seed Data Generator
//!
//! Populates a development database with a demo cashier, a small
//! catalog with stock, and a couple of discount codes.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```

use std::env;

use tally_core::DiscountType;
use tally_db::repository::discount::NewDiscount;
use tally_db::repository::product::NewProduct;
use tally_db::{Database, DbConfig};

const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("BEV-COLA-330", "Cola 330ml", 150, 120),
    ("BEV-WATER-500", "Still Water 500ml", 100, 200),
    ("SNK-CHIPS-150", "Salted Chips 150g", 299, 80),
    ("SNK-CHOC-100", "Chocolate Bar 100g", 249, 60),
    ("GRO-PASTA-500", "Pasta 500g", 189, 45),
    ("GRO-RICE-1000", "Rice 1kg", 349, 30),
    ("DAI-MILK-1000", "Milk 1L", 129, 40),
    ("DAI-CHEESE-200", "Cheddar 200g", 459, 25),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let cashier = db.users().register("demo", "demo1234", None).await?;
    println!("✓ Demo cashier: {} (password: demo1234)", cashier.username);

    for (sku, name, price_cents, stock) in PRODUCTS {
        db.products()
            .create(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                description: None,
                price_cents: *price_cents,
                initial_quantity: *stock,
            })
            .await?;
    }
    println!("✓ {} products with stock", PRODUCTS.len());

    db.discounts()
        .create(NewDiscount {
            code: "SAVE10".to_string(),
            description: Some("10% off everything".to_string()),
            discount_type: DiscountType::Percentage,
            value: 1000,
            is_active: true,
            valid_from: None,
            valid_until: None,
        })
        .await?;

    db.discounts()
        .create(NewDiscount {
            code: "FLAT2".to_string(),
            description: Some("$2 off any sale".to_string()),
            discount_type: DiscountType::FixedAmount,
            value: 200,
            is_active: true,
            valid_from: None,
            valid_until: None,
        })
        .await?;
    println!("✓ Discount codes: SAVE10 (10%), FLAT2 ($2)");

    println!();
    println!("Done. Point the backend at {db_path} and start selling.");
    Ok(())
}
