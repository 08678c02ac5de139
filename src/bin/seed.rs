//! # Seed Data Generator
//!
//! Bootstraps a fresh database: ensures the admin account exists and
//! loads the launch catalog when the products table is empty.
//!
//! ## Usage
//! ```bash
//! DATABASE_URL=postgres://... \
//! ADMIN_USERNAME=admin ADMIN_PASSWORD=change-me ADMIN_EMAIL=admin@example.com \
//! cargo run --bin seed
//! ```
//!
//! Re-running is safe: the admin password is refreshed in place and
//! products are only inserted into an empty catalog.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use mistiq_commerce::auth::hash_password;

struct SeedProduct {
    name: &'static str,
    gender: &'static str,
    impression_of: &'static str,
    top_notes: &'static [&'static str],
    heart_notes: &'static [&'static str],
    base_notes: &'static [&'static str],
    bottle_image: &'static str,
    theme_color: &'static str,
    rating: f64,
    description: &'static str,
    actual_price: i64,
    stock: i64,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "La Fleure",
        gender: "Female",
        impression_of: "Gucci Flora",
        top_notes: &["Bergamot", "Citrus", "Peony"],
        heart_notes: &["Rose", "Jasmine", "Osmanthus"],
        base_notes: &["Musk", "Vanilla", "Sandalwood"],
        bottle_image: "/images/perfumes/la-fleure.jpg",
        theme_color: "#d63384",
        rating: 4.8,
        description: "A delicate floral fragrance that captures the essence of a blooming garden, perfect for those who love elegant, timeless scents.",
        actual_price: 2650,
        stock: 50,
    },
    SeedProduct {
        name: "Belle Aura",
        gender: "Female",
        impression_of: "Miss Dior",
        top_notes: &["Mandarin", "Bergamot", "Pink Pepper"],
        heart_notes: &["Rose", "Lily of the Valley", "Jasmine"],
        base_notes: &["Patchouli", "Amber", "Musk"],
        bottle_image: "/images/perfumes/belle-aura.jpg",
        theme_color: "#6f42c1",
        rating: 4.9,
        description: "An enchanting blend of floral and fruity notes for the modern woman who embraces her femininity with confidence and grace.",
        actual_price: 2850,
        stock: 45,
    },
    SeedProduct {
        name: "Inferno",
        gender: "Male",
        impression_of: "Tuscan Leather",
        top_notes: &["Black Pepper", "Saffron", "Raspberry"],
        heart_notes: &["Leather", "Jasmine", "Olive Blossom"],
        base_notes: &["Leather", "Musk", "Suede"],
        bottle_image: "/images/perfumes/inferno.jpg",
        theme_color: "#d4af37",
        rating: 4.7,
        description: "A bold, intoxicating scent that combines the richness of leather with spicy top notes, commanding attention and leaving a lasting impression.",
        actual_price: 2950,
        stock: 60,
    },
    SeedProduct {
        name: "Valiant",
        gender: "Male",
        impression_of: "Azzaro Wanted",
        top_notes: &["Lemon", "Ginger", "Lavender"],
        heart_notes: &["Juniper", "Cinnamon", "Patchouli"],
        base_notes: &["Tonka Bean", "Amberwood", "Vanilla"],
        bottle_image: "/images/perfumes/valiant.jpg",
        theme_color: "#d4af37",
        rating: 4.6,
        description: "A dynamic fragrance blending fresh citrus with warm spices, made for the man who lives life with passion and determination.",
        actual_price: 2650,
        stock: 55,
    },
    SeedProduct {
        name: "Magnus Noir",
        gender: "Male",
        impression_of: "Dior Sauvage",
        top_notes: &["Calabrian Bergamot", "Pepper"],
        heart_notes: &["Sichuan Pepper", "Lavender", "Geranium"],
        base_notes: &["Ambroxan", "Cedar", "Labdanum"],
        bottle_image: "/images/perfumes/magnus-noir.jpg",
        theme_color: "#1a1a2e",
        rating: 4.9,
        description: "Raw freshness wrapped in darkness. Magnus Noir is powerful and noble at once, a signature scent for day and night.",
        actual_price: 3050,
        stock: 70,
    },
    SeedProduct {
        name: "Aqua Vive",
        gender: "Unisex",
        impression_of: "Acqua di Gio",
        top_notes: &["Sea Notes", "Bergamot", "Green Tangerine"],
        heart_notes: &["Rosemary", "Persimmon", "Jasmine"],
        base_notes: &["Incense", "Cedar", "Musk"],
        bottle_image: "/images/perfumes/aqua-vive.jpg",
        theme_color: "#0e7490",
        rating: 4.5,
        description: "A breath of sea air in a bottle. Crisp aquatic notes over a warm woody base make Aqua Vive effortless for any occasion.",
        actual_price: 2450,
        stock: 40,
    },
];

async fn seed_admin(db: &PgPool) -> Result<()> {
    let username = std::env::var("ADMIN_USERNAME").context("ADMIN_USERNAME is not set")?;
    let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD is not set")?;
    let email = std::env::var("ADMIN_EMAIL").context("ADMIN_EMAIL is not set")?;

    let password_hash = hash_password(&password)?;
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role, first_name, last_name)
         VALUES ($1, $2, $3, $4, 'admin', 'Admin', 'User')
         ON CONFLICT (username) DO UPDATE
             SET password_hash = EXCLUDED.password_hash,
                 role = 'admin',
                 updated_at = NOW()",
    )
    .bind(Uuid::now_v7())
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .execute(db)
    .await?;

    println!("admin account ready: {username} <{email}>");
    Ok(())
}

async fn seed_products(db: &PgPool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(db)
        .await?;
    if existing > 0 {
        println!("catalog already has {existing} products, skipping");
        return Ok(());
    }

    for p in PRODUCTS {
        let top: Vec<String> = p.top_notes.iter().map(|s| s.to_string()).collect();
        let heart: Vec<String> = p.heart_notes.iter().map(|s| s.to_string()).collect();
        let base: Vec<String> = p.base_notes.iter().map(|s| s.to_string()).collect();
        sqlx::query(
            "INSERT INTO products (id, name, gender, impression_of, top_notes, heart_notes,
                                   base_notes, bottle_image, theme_color, rating, description,
                                   actual_price, stock)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(Uuid::now_v7())
        .bind(p.name)
        .bind(p.gender)
        .bind(p.impression_of)
        .bind(&top)
        .bind(&heart)
        .bind(&base)
        .bind(p.bottle_image)
        .bind(p.theme_color)
        .bind(p.rating)
        .bind(p.description)
        .bind(p.actual_price)
        .bind(p.stock)
        .execute(db)
        .await?;
        println!("inserted {}", p.name);
    }
    println!("seeded {} products", PRODUCTS.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let db = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    seed_admin(&db).await?;
    seed_products(&db).await?;
    Ok(())
}
