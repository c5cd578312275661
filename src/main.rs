use std::sync::Arc;

use alamal_menus::config::AppConfig;
use alamal_menus::http_api::{self, ApiCtx};
use alamal_menus::mongo;
use alamal_menus::orders::MongoOrderStore;
use alamal_menus::products::MongoProductStore;
use alamal_menus::store::MongoMenuStore;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // تحميل الإعدادات من .env ومتغيرات البيئة
    let cfg = AppConfig::from_env()?;

    // تهيئة MongoDB
    let database = mongo::init_mongo(&cfg).await?;
    tracing::info!(target: "boot", "using database {}", cfg.mongo_db);

    let ctx = Arc::new(ApiCtx {
        api_key: cfg.api_key.clone(),
        hmac_secret: cfg.hmac_secret.clone(),
        store: Arc::new(MongoMenuStore::new(database)),
        products: Arc::new(MongoProductStore::new(database)),
        orders: Arc::new(MongoOrderStore::new(database)),
    });

    // تشغيل سيرفر الـ HTTP (Axum)
    http_api::run_http_server(ctx, cfg.port).await?;

    Ok(())
}
