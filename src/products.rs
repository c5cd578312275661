use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;
use crate::util::{bool_from, f64_from, i64_from, opt_string, string_or_default};

pub const PRODUCTS_COLLECTION: &str = "products";

/// منتج كما يُخزَّن في مجموعة `products` ويُعرض في المتجر.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<i64>,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<i64>,
}

pub(crate) fn doc_to_product(d: &Document) -> Option<Product> {
    let id = i64_from(d, "id").or_else(|| i64_from(d, "_id"))?;
    let stock = i64_from(d, "stock").unwrap_or(0);
    Some(Product {
        id,
        name: string_or_default(d, "name"),
        price: f64_from(d, "price").unwrap_or(0.0),
        original_price: f64_from(d, "originalPrice"),
        image: opt_string(d, "image"),
        rating: f64_from(d, "rating"),
        category: string_or_default(d, "category"),
        subcategory: opt_string(d, "subcategory"),
        badge: opt_string(d, "badge"),
        description: opt_string(d, "description"),
        in_stock: bool_from(d, "inStock").unwrap_or(stock > 0),
        reviews: i64_from(d, "reviews"),
        stock,
        sales: i64_from(d, "sales"),
    })
}

/// فلتر القسم كما في `?category=`: الفارغ و "all" و "*" تعني كل المنتجات.
pub fn category_filter(raw: Option<&str>) -> Option<String> {
    let sec = raw?.trim();
    if sec.is_empty() || sec.eq_ignore_ascii_case("all") || sec == "*" {
        return None;
    }
    Some(sec.to_string())
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// المنتجات مرتبة حسب المعرّف، مقصورة على القسم إن أُعطي.
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError>;
}

/* ================== MongoDB ================== */

#[derive(Clone)]
pub struct MongoProductStore {
    coll: Collection<Document>,
}

impl MongoProductStore {
    pub fn new(database: &Database) -> Self {
        Self {
            coll: database.collection(PRODUCTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ProductStore for MongoProductStore {
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        let filter = match category {
            Some(cat) => doc! { "category": cat },
            None => doc! {},
        };
        let opts = FindOptions::builder().sort(doc! { "id": 1 }).build();

        let mut cur = self.coll.find(filter, opts).await?;
        let mut out = vec![];
        while let Some(docu) = cur.try_next().await? {
            match doc_to_product(&docu) {
                Some(p) => out.push(p),
                None => tracing::warn!(
                    target: "products",
                    "skipping product document without id: {:?}",
                    docu.get("_id")
                ),
            }
        }
        Ok(out)
    }
}

/* ================== In-memory (tests) ================== */
