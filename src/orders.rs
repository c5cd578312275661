use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::mongo::sort_created_at_desc;
use crate::store::StoreError;
use crate::util::{f64_from, i64_from, now_iso_rfc3339, opt_string, string_or_default};

pub const ORDERS_COLLECTION: &str = "orders";

/* ================== Models ================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub image: String,
}

/// طلب مُسجَّل. `id` يولَّد عند الحفظ و `created_at` هو وقت الاستلام.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub phone: String,
    pub address: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub shipping: f64,
    pub discount: f64,
    pub total: f64,
    pub payment_method: String,
    pub status: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
    pub created_at: String,
}

/// جسم طلب الشراء كما ترسله صفحة السلة.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub discount: f64,
    pub total: f64,
    #[serde(default = "default_payment")]
    pub payment_method: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub date: String,
    pub notes: Option<String>,
    pub coupon: Option<String>,
}

fn default_payment() -> String {
    "cash".into()
}

fn default_status() -> String {
    "pending".into()
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("customer name is required")]
    MissingCustomer,

    #[error("phone number is required")]
    MissingPhone,

    #[error("order has no items")]
    NoItems,

    #[error("item {0} has a quantity below 1")]
    InvalidQuantity(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.customer.trim().is_empty() {
            return Err(OrderError::MissingCustomer);
        }
        if self.phone.trim().is_empty() {
            return Err(OrderError::MissingPhone);
        }
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(bad) = self.items.iter().find(|i| i.quantity < 1) {
            return Err(OrderError::InvalidQuantity(bad.id));
        }
        Ok(())
    }

    pub fn into_order(self, id: String, created_at: String) -> Order {
        Order {
            id,
            customer: self.customer.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address,
            items: self.items,
            subtotal: self.subtotal,
            shipping: self.shipping,
            discount: self.discount,
            total: self.total,
            payment_method: self.payment_method,
            status: self.status,
            date: self.date,
            notes: self.notes.filter(|s| !s.trim().is_empty()),
            coupon: self.coupon.filter(|s| !s.trim().is_empty()),
            created_at,
        }
    }
}

/// الأحدث أولاً حسب createdAt ثم المعرّف، كما يرتّب Mongo.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/* ================== Store ================== */

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// كل الطلبات، الأحدث أولاً.
    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// طلبات عميل واحد حسب رقم الهاتف، الأحدث أولاً.
    async fn list_by_phone(&self, phone: &str) -> Result<Vec<Order>, StoreError>;
}

/// يتحقق من الطلب، يعطيه معرّفاً ووقت إنشاء، ثم يحفظه.
pub async fn place_order(store: &dyn OrderStore, new: NewOrder) -> Result<Order, OrderError> {
    new.validate()?;
    let order = new.into_order(Uuid::new_v4().to_string(), now_iso_rfc3339());
    store.insert(&order).await?;
    tracing::info!(
        target: "orders",
        "order {} placed by {} ({} items, total {})",
        order.id,
        order.phone,
        order.items.len(),
        order.total
    );
    Ok(order)
}

/* ================== Documents ================== */

pub(crate) fn order_to_doc(o: &Order) -> Document {
    let items: Vec<Bson> = o
        .items
        .iter()
        .map(|i| {
            Bson::Document(doc! {
                "id": i.id,
                "name": i.name.clone(),
                "price": i.price,
                "quantity": i.quantity,
                "image": i.image.clone(),
            })
        })
        .collect();

    let mut docu = doc! {
        "_id": o.id.clone(),
        "id": o.id.clone(),
        "customer": o.customer.clone(),
        "phone": o.phone.clone(),
        "address": o.address.clone(),
        "items": items,
        "subtotal": o.subtotal,
        "shipping": o.shipping,
        "discount": o.discount,
        "total": o.total,
        "paymentMethod": o.payment_method.clone(),
        "status": o.status.clone(),
        "date": o.date.clone(),
        "createdAt": o.created_at.clone(),
    };
    if let Some(notes) = &o.notes {
        docu.insert("notes", notes.as_str());
    }
    if let Some(coupon) = &o.coupon {
        docu.insert("coupon", coupon.as_str());
    }
    docu
}

fn doc_to_item(d: &Document) -> OrderItem {
    OrderItem {
        id: i64_from(d, "id").unwrap_or(0),
        name: string_or_default(d, "name"),
        price: f64_from(d, "price").unwrap_or(0.0),
        quantity: i64_from(d, "quantity").unwrap_or(1),
        image: string_or_default(d, "image"),
    }
}

pub(crate) fn doc_to_order(d: &Document) -> Order {
    let items = d
        .get_array("items")
        .map(|arr| {
            arr.iter()
                .filter_map(|b| b.as_document().map(doc_to_item))
                .collect()
        })
        .unwrap_or_default();

    Order {
        id: d
            .get_str("id")
            .or_else(|_| d.get_str("_id"))
            .map(|s| s.to_string())
            .unwrap_or_else(|_| d.get("_id").map(|b| b.to_string()).unwrap_or_default()),
        customer: string_or_default(d, "customer"),
        phone: string_or_default(d, "phone"),
        address: string_or_default(d, "address"),
        items,
        subtotal: f64_from(d, "subtotal").unwrap_or(0.0),
        shipping: f64_from(d, "shipping").unwrap_or(0.0),
        discount: f64_from(d, "discount").unwrap_or(0.0),
        total: f64_from(d, "total").unwrap_or(0.0),
        payment_method: string_or_default(d, "paymentMethod"),
        status: string_or_default(d, "status"),
        date: string_or_default(d, "date"),
        notes: opt_string(d, "notes"),
        coupon: opt_string(d, "coupon"),
        created_at: string_or_default(d, "createdAt"),
    }
}

/* ================== MongoDB ================== */

#[derive(Clone)]
pub struct MongoOrderStore {
    coll: Collection<Document>,
}

impl MongoOrderStore {
    pub fn new(database: &Database) -> Self {
        Self {
            coll: database.collection(ORDERS_COLLECTION),
        }
    }

    async fn find_sorted(&self, filter: Document) -> Result<Vec<Order>, StoreError> {
        let mut cur = self.coll.find(filter, sort_created_at_desc()).await?;
        let mut out = vec![];
        while let Some(docu) = cur.try_next().await? {
            out.push(doc_to_order(&docu));
        }
        Ok(out)
    }
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.coll.insert_one(order_to_doc(order), None).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        self.find_sorted(doc! {}).await
    }

    async fn list_by_phone(&self, phone: &str) -> Result<Vec<Order>, StoreError> {
        self.find_sorted(doc! { "phone": phone.trim() }).await
    }
}

/* ================== In-memory (tests) ================== */
