use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::ErrorKind,
    options::ReplaceOptions,
    Collection, Database,
};
use thiserror::Error;

use crate::menu::MenuItem;
use crate::util::{bool_from, i64_from, opt_string};

pub const MENUS_COLLECTION: &str = "menus";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        match e.kind.as_ref() {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
                StoreError::Unreachable(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// حدّ التخزين لعناصر القوائم: مستند واحد لكل عنصر، مفتاحه `id` كنص.
#[async_trait]
pub trait MenuStore: Send + Sync {
    /// كل العناصر المخزنة، بلا ترتيب محدد.
    async fn list(&self) -> Result<Vec<MenuItem>, StoreError>;

    /// upsert بمفتاح `item.id`؛ تكرار الاستدعاء يترك نفس الحالة.
    async fn create(&self, item: &MenuItem) -> Result<(), StoreError>;

    async fn update(&self, item: &MenuItem) -> Result<(), StoreError>;

    /// يحذف سجلاً واحداً فقط. حذف القوائم الفرعية مسؤولية المستدعي.
    async fn remove(&self, id: i64) -> Result<(), StoreError>;

    /// ليست ذرّية: أول فشل يوقف الحلقة، وما كُتب قبله يبقى مكتوباً.
    async fn save_all(&self, items: &[MenuItem]) -> Result<(), StoreError> {
        for item in items {
            self.update(item).await?;
        }
        Ok(())
    }
}

/// `list` لا تفشل: الأخطاء تُسجَّل وتُقرأ كـ "لا توجد قوائم بعد".
pub async fn list_or_empty(store: &dyn MenuStore) -> Vec<MenuItem> {
    match store.list().await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(target: "menus", "failed to load menus: {e}");
            Vec::new()
        }
    }
}

/* ================== Documents ================== */

pub(crate) fn doc_to_menu(d: &Document) -> Option<MenuItem> {
    let id = i64_from(d, "id").or_else(|| i64_from(d, "_id"))?;
    Some(MenuItem {
        id,
        name: d.get_str("name").unwrap_or_default().to_string(),
        url: d.get_str("url").unwrap_or_default().to_string(),
        parent_id: i64_from(d, "parentId").filter(|p| *p != 0),
        order: i64_from(d, "order").unwrap_or(0),
        is_active: bool_from(d, "isActive").unwrap_or(true),
        icon_url: opt_string(d, "iconUrl").filter(|s| !s.trim().is_empty()),
    })
}

pub(crate) fn menu_to_doc(m: &MenuItem) -> Document {
    let mut docu = doc! {
        "_id": m.id.to_string(),
        "id": m.id,
        "name": &m.name,
        "url": &m.url,
        "order": m.order,
        "isActive": m.is_active,
    };
    if let Some(parent) = m.parent() {
        docu.insert("parentId", parent);
    }
    if let Some(icon) = &m.icon_url {
        docu.insert("iconUrl", icon);
    }
    docu
}

/* ================== MongoDB ================== */

#[derive(Clone)]
pub struct MongoMenuStore {
    coll: Collection<Document>,
}

impl MongoMenuStore {
    pub fn new(database: &Database) -> Self {
        Self {
            coll: database.collection(MENUS_COLLECTION),
        }
    }

    async fn upsert(&self, item: &MenuItem) -> Result<(), StoreError> {
        let opts = ReplaceOptions::builder().upsert(true).build();
        self.coll
            .replace_one(doc! { "_id": item.id.to_string() }, menu_to_doc(item), opts)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MenuStore for MongoMenuStore {
    async fn list(&self) -> Result<Vec<MenuItem>, StoreError> {
        let mut cur = self.coll.find(doc! {}, None).await?;

        let mut out = vec![];
        while let Some(docu) = cur.try_next().await? {
            match doc_to_menu(&docu) {
                Some(item) => out.push(item),
                None => tracing::warn!(
                    target: "menus",
                    "skipping menu document without id: {:?}",
                    docu.get("_id")
                ),
            }
        }
        tracing::debug!(target: "menus", "loaded {} menu documents", out.len());
        Ok(out)
    }

    async fn create(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.upsert(item).await
    }

    async fn update(&self, item: &MenuItem) -> Result<(), StoreError> {
        self.upsert(item).await
    }

    async fn remove(&self, id: i64) -> Result<(), StoreError> {
        self.coll
            .delete_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(())
    }
}

/* ================== In-memory (tests) ================== */

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// بديل للاختبارات بمفاتيح مثل مخزن المستندات. `calls` يسجّل كل كتابة.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        docs: Mutex<BTreeMap<String, Document>>,
        calls: Mutex<Vec<String>>,
        unreachable: Mutex<bool>,
        writes_left: Mutex<Option<usize>>,
    }

    impl MemoryStore {
        pub(crate) fn with_items(items: &[MenuItem]) -> Self {
            let store = Self::default();
            {
                let mut docs = store.docs.lock().unwrap();
                for m in items {
                    docs.insert(m.id.to_string(), menu_to_doc(m));
                }
            }
            store
        }

        pub(crate) fn set_unreachable(&self, down: bool) {
            *self.unreachable.lock().unwrap() = down;
        }

        /// الكتابات بعد أول `n` تفشل بخطأ من المخزن.
        pub(crate) fn fail_after(&self, n: usize) {
            *self.writes_left.lock().unwrap() = Some(n);
        }

        pub(crate) fn snapshot(&self) -> Vec<MenuItem> {
            self.docs
                .lock()
                .unwrap()
                .values()
                .filter_map(doc_to_menu)
                .collect()
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn check_write(&self, call: String) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(call);
            if *self.unreachable.lock().unwrap() {
                return Err(StoreError::Unreachable("connection refused".into()));
            }
            let mut left = self.writes_left.lock().unwrap();
            match left.as_mut() {
                Some(0) => Err(StoreError::Backend("write rejected".into())),
                Some(n) => {
                    *n -= 1;
                    Ok(())
                }
                None => Ok(()),
            }
        }

        fn put(&self, call: &str, item: &MenuItem) -> Result<(), StoreError> {
            self.check_write(format!("{call}:{}", item.id))?;
            self.docs
                .lock()
                .unwrap()
                .insert(item.id.to_string(), menu_to_doc(item));
            Ok(())
        }
    }

    #[async_trait]
    impl MenuStore for MemoryStore {
        async fn list(&self) -> Result<Vec<MenuItem>, StoreError> {
            if *self.unreachable.lock().unwrap() {
                return Err(StoreError::Unreachable("connection refused".into()));
            }
            Ok(self.snapshot())
        }

        async fn create(&self, item: &MenuItem) -> Result<(), StoreError> {
            self.put("create", item)
        }

        async fn update(&self, item: &MenuItem) -> Result<(), StoreError> {
            self.put("update", item)
        }

        async fn remove(&self, id: i64) -> Result<(), StoreError> {
            self.check_write(format!("remove:{id}"))?;
            self.docs.lock().unwrap().remove(&id.to_string());
            Ok(())
        }
    }
}
