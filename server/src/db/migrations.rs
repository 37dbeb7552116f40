use sqlx::postgres::PgPool;
use sqlx::Executor;

/// Schema migrations in application order.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!("../../migrations/0001_init.sql"),
)];

/// Apply every migration that is not yet recorded in the `migrations` table.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::Error> {
    init_migrations_tracker(pool).await?;

    let mut applied = 0;
    for (name, sql) in MIGRATIONS {
        if is_applied(pool, name).await? {
            tracing::debug!("Migration {} already applied", name);
            continue;
        }

        tracing::info!("Running migration: {}", name);
        // Multi-statement files need the simple query protocol.
        pool.execute(*sql).await?;
        record_migration(pool, name).await?;
        applied += 1;
    }

    tracing::info!("Migrations complete ({} applied)", applied);
    Ok(applied)
}

async fn init_migrations_tracker(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn is_applied(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM migrations WHERE name = $1)")
        .bind(name)
        .fetch_one(pool)
        .await
}

async fn record_migration(pool: &PgPool, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO migrations (name) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}
