use serde::Serialize;

use crate::defaults::fallback_menus;
use crate::menu::{self, MenuItem};
use crate::store::{MenuStore, StoreError};

/// قائمة رئيسية نشطة مع قوائمها الفرعية النشطة، كما تعرضها واجهة المتجر.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    fn leaf(m: &MenuItem) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            url: m.url.clone(),
            icon_url: m.icon_url.clone(),
            children: vec![],
        }
    }
}

/// القوائم الرئيسية النشطة بالترتيب، مع فروعها النشطة. القائمة الرئيسية غير
/// النشطة تُخفي فرعها كاملاً.
pub fn active_tree(items: &[MenuItem]) -> Vec<NavEntry> {
    menu::roots(items)
        .into_iter()
        .filter(|r| r.is_active)
        .map(|r| NavEntry {
            children: menu::children(items, r.id)
                .into_iter()
                .filter(|c| c.is_active)
                .map(NavEntry::leaf)
                .collect(),
            ..NavEntry::leaf(r)
        })
        .collect()
}

/// قائمة المتجر. عند تعذّر الوصول للمخزن تُعرض القوائم الافتراضية، وعند أي
/// خطأ آخر لا يُعرض شيء.
pub async fn storefront_menu(store: &dyn MenuStore) -> Vec<NavEntry> {
    let items = match store.list().await {
        Ok(items) => items,
        Err(StoreError::Unreachable(e)) => {
            tracing::warn!(target: "menus", "store unreachable, serving default navigation: {e}");
            fallback_menus()
        }
        Err(e) => {
            tracing::error!(target: "menus", "failed to load navigation: {e}");
            vec![]
        }
    };
    active_tree(&items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::item;
    use crate::store::memory::MemoryStore;

    #[test]
    fn inactive_items_are_hidden() {
        let mut l = vec![
            item(1, "Home", "/", None, 1),
            item(2, "Products", "/products", None, 2),
            item(3, "Books", "/products?c=books", Some(2), 2),
            item(4, "Pens", "/products?c=pens", Some(2), 1),
            item(5, "Offers", "/offers", None, 3),
            item(6, "Flash", "/offers/flash", Some(5), 1),
        ];
        l[3].is_active = false;
        l[4].is_active = false;

        let tree = active_tree(&l);
        let shape: Vec<(i64, Vec<i64>)> = tree
            .iter()
            .map(|e| (e.id, e.children.iter().map(|c| c.id).collect()))
            .collect();
        assert_eq!(shape, vec![(1, vec![]), (2, vec![3])]);
    }

    #[tokio::test]
    async fn unreachable_store_serves_defaults() {
        let store = MemoryStore::default();
        store.set_unreachable(true);
        let tree = storefront_menu(&store).await;
        assert_eq!(tree, active_tree(&fallback_menus()));
        assert_eq!(tree[0].url, "/");
    }

    #[tokio::test]
    async fn empty_store_is_empty_navigation() {
        let store = MemoryStore::default();
        assert!(storefront_menu(&store).await.is_empty());
    }
}
