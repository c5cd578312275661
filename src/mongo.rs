use mongodb::{
    bson::{doc, Document},
    options::{FindOptions, IndexOptions},
    Client, Database, IndexModel,
};
use once_cell::sync::OnceCell;
use anyhow::{Result, anyhow};

use crate::config::AppConfig;
use crate::orders::ORDERS_COLLECTION;
use crate::store::MENUS_COLLECTION;

/// تخزين الـ Database بشكل ثابت (Singleton)
static MONGO_DB: OnceCell<Database> = OnceCell::new();

/// دالة الوصول إلى الـ Database بعد التهيئة
pub fn db() -> Result<&'static Database, String> {
    MONGO_DB
        .get()
        .ok_or_else(|| "MongoDB not initialized".to_string())
}

/// كشف إن كان الـ URI يشير إلى Firestore Mongo API
fn is_firestore_uri(uri: &str) -> bool {
    uri.contains(".firestore.goog")
}

/// تهيئة MongoDB من الإعدادات. الاتصال نفسه كسول: تعذّر الوصول للخادم
/// لا يوقف الإقلاع، بل يظهر لاحقاً كأخطاء `Unreachable` في المخزن.
pub async fn init_mongo(cfg: &AppConfig) -> Result<&'static Database> {
    let client = Client::with_uri_str(&cfg.mongo_uri)
        .await
        .map_err(|e| anyhow!("Mongo connect error: {}", e))?;

    let database = client.database(&cfg.mongo_db);

    // إنشاء الفهارس في الخلفية – تُتخطى لو نستخدم Firestore Mongo API
    let on_firestore = is_firestore_uri(&cfg.mongo_uri);
    let for_indexes = database.clone();
    tokio::spawn(async move { ensure_indexes(&for_indexes, on_firestore).await });

    MONGO_DB
        .set(database)
        .map_err(|_| anyhow!("MongoDB already initialized"))?;

    db().map_err(|e| anyhow!(e))
}

/// ترتيب الأحدث أولاً (createdAt ثم _id)
pub fn sort_created_at_desc() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "createdAt": -1, "_id": -1 })
        .build()
}

/// فهرس على parentId و order لتسريع قراءة القوائم الفرعية، وفهرس الهاتف للطلبات
async fn ensure_indexes(db: &Database, on_firestore: bool) {
    if on_firestore {
        return;
    }

    let menus = db.collection::<Document>(MENUS_COLLECTION);
    let idx_parent_order = IndexModel::builder()
        .keys(doc! { "parentId": 1, "order": 1 })
        .options(IndexOptions::builder().name(Some("idx_menus_parent_order".into())).build())
        .build();

    if let Err(e) = menus.create_index(idx_parent_order, None).await {
        tracing::warn!(target: "mongo", "could not create menus index: {e}");
    }

    let orders = db.collection::<Document>(ORDERS_COLLECTION);
    let idx_phone_created = IndexModel::builder()
        .keys(doc! { "phone": 1, "createdAt": -1 })
        .options(IndexOptions::builder().name(Some("idx_orders_phone_created".into())).build())
        .build();

    if let Err(e) = orders.create_index(idx_phone_created, None).await {
        tracing::warn!(target: "mongo", "could not create orders index: {e}");
    }
}
