//! Test harness with testcontainers for Postgres store tests.
//!
//! Uses one shared container across all tests. The container and migrations
//! are initialized on first use, then reused; each harness truncates the
//! listing tables.
//!
//! Tests using this harness need Docker and are `#[ignore]`d by default.
//! Run with: cargo test -- --ignored

use anyhow::{Context, Result};
use listings_core::domains::listings::{ListingStores, ListingTier};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

/// Global shared infrastructure - initialized once, reused by all tests.
static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

/// Tests share tables, so they run one at a time.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        // Run migrations once on the shared database
        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Postgres-backed stores over a clean schema.
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// #[ignore = "requires docker"]
/// async fn my_test(ctx: &mut TestHarness) {
///     let idx = ctx.stores.get(ListingTier::Idx);
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
    pub stores: ListingStores,
    _lock: MutexGuard<'static, ()>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        // Pool and lock are dropped here
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let lock = DB_LOCK.lock().await;
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        for tier in ListingTier::ALL {
            sqlx::query(&format!("TRUNCATE {}", tier.table_name()))
                .execute(&db_pool)
                .await
                .context("Failed to truncate listing table")?;
        }

        Ok(Self {
            stores: ListingStores::postgres(db_pool.clone()),
            db_pool,
            _lock: lock,
        })
    }
}
