use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_marketplace_api::{config::AppConfig, db::create_pool};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let vendor_user = ensure_user(&pool, "vendor@example.com", "vendor123").await?;
    let shopper = ensure_user(&pool, "shopper@example.com", "shopper123").await?;
    let vendor_id = ensure_vendor(&pool, vendor_user, "Acme Traders", "+254700000001").await?;
    seed_products(&pool, vendor_id).await?;

    println!("Seed completed. Vendor user: {vendor_user}, shopper: {shopper}");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    // Seed accounts skip email confirmation.
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, is_active)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (email) DO UPDATE SET is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn ensure_vendor(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    name: &str,
    phone: &str,
) -> anyhow::Result<Uuid> {
    let code = format!("V{}", &user_id.to_string()[..8]);
    let (vendor_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO vendors (id, user_id, name, code, phone)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(code)
    .bind(phone)
    .fetch_one(pool)
    .await?;

    println!("Ensured vendor {name}");
    Ok(vendor_id)
}

async fn seed_products(pool: &sqlx::PgPool, vendor_id: Uuid) -> anyhow::Result<()> {
    let products = vec![
        ("Ceramic Mug", "Hand-glazed 350ml mug", Decimal::new(1200, 2), 100),
        ("Canvas Tote", "Heavy cotton shopping tote", Decimal::new(1850, 2), 50),
        ("Beeswax Candle", "Slow-burning natural candle", Decimal::new(950, 2), 200),
        ("Leather Journal", "A5 refillable notebook", Decimal::new(3400, 2), 75),
    ];

    for (name, desc, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, vendor_id, name, price, stock, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (vendor_id, name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vendor_id)
        .bind(name)
        .bind(price)
        .bind(stock)
        .bind(desc)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
