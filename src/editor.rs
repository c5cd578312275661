//! محرر القوائم في لوحة التحكم.
//!
//! يملك [`MenuEditor`] القائمة في الذاكرة لشاشة واحدة (أو طلب واحد). كل تعديل
//! يُطبَّق على القائمة أولاً ثم يُرسل إلى المخزن؛ أخطاء المخزن تُسجَّل ولا
//! يُتراجع عنها، فقد تختلف القائمة عن المخزن حتى [`MenuEditor::reload`] التالي.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::menu::{self, MenuItem, MenuRow};
use crate::store::{list_or_empty, MenuStore};

pub const DELETE_PROMPT: &str = "هل أنت متأكد من حذف هذه القائمة؟";

/// هل يملك المستدعي جلسة مدير؟ يمرّرها صاحب الجلسة، والمحرر لا يبحث عنها بنفسه.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized(pub bool);

#[derive(Debug, Error)]
pub enum FormError {
    #[error("اسم القائمة مطلوب")]
    MissingName,

    #[error("الرابط مطلوب")]
    MissingUrl,

    #[error("order must be at least 1, got {0}")]
    InvalidOrder(i64),

    #[error("menu {0} is not a root menu")]
    InvalidParent(i64),

    #[error("a menu cannot be its own parent")]
    SelfParent,

    #[error("menu {0} has sub-menus and cannot become a sub-menu")]
    HasChildren(i64),

    #[error("no menu ids left after {}", i64::MAX)]
    IdsExhausted,

    #[error("no menu form is open")]
    NotOpen,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("admin session required")]
    Unauthorized,

    #[error("menu {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Form(#[from] FormError),
}

/// حقول نافذة الإضافة/التعديل.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MenuForm {
    pub name: String,
    pub url: String,
    /// `None` أو `Some(0)`: قائمة رئيسية.
    pub parent_id: Option<i64>,
    pub order: i64,
    pub is_active: bool,
    pub icon_url: String,
}

impl Default for MenuForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            parent_id: None,
            order: 1,
            is_active: true,
            icon_url: String::new(),
        }
    }
}

impl From<&MenuItem> for MenuForm {
    fn from(m: &MenuItem) -> Self {
        Self {
            name: m.name.clone(),
            url: m.url.clone(),
            parent_id: m.parent(),
            order: m.order,
            is_active: m.is_active,
            icon_url: m.icon_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormMode {
    Add,
    Edit(i64),
}

#[derive(Debug)]
struct OpenForm {
    mode: FormMode,
    fields: MenuForm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Saved {
    pub item: MenuItem,
    /// `false` إذا فشل الحفظ في المخزن؛ التعديل يبقى في القائمة المحلية.
    pub synced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Deletion {
    pub removed: Vec<i64>,
    pub failed: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct MenuEditor {
    items: Vec<MenuItem>,
    form: Option<OpenForm>,
}

impl MenuEditor {
    /// تحميل القائمة كاملة. تعذّر الوصول للمخزن يعطي محرراً فارغاً.
    pub async fn mount(store: &dyn MenuStore, auth: Authorized) -> Result<Self, EditorError> {
        if !auth.0 {
            return Err(EditorError::Unauthorized);
        }
        let items = list_or_empty(store).await;
        tracing::info!(target: "menus", "menu editor mounted with {} items", items.len());
        Ok(Self { items, form: None })
    }

    /// إعادة التحميل من المخزن، وتُهمل أي تعديلات محلية لم تُحفظ.
    pub async fn reload(&mut self, store: &dyn MenuStore) {
        self.items = list_or_empty(store).await;
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&MenuItem> {
        self.items.iter().find(|m| m.id == id)
    }

    pub fn roots(&self) -> Vec<&MenuItem> {
        menu::roots(&self.items)
    }

    pub fn children(&self, parent_id: i64) -> Vec<&MenuItem> {
        menu::children(&self.items, parent_id)
    }

    pub fn rows(&self) -> Vec<MenuRow<'_>> {
        menu::display_order(&self.items)
    }

    /// القوائم المتاحة كقائمة رئيسية: القوائم الرئيسية الحالية عدا القائمة
    /// قيد التعديل. القوائم الفرعية لا تُعرض أبداً، فتبقى الشجرة بمستويين.
    pub fn parent_options(&self) -> Vec<&MenuItem> {
        let editing = self.editing();
        self.roots()
            .into_iter()
            .filter(|m| Some(m.id) != editing)
            .collect()
    }

    /* ---- form ---- */

    pub fn begin_add(&mut self) -> &mut MenuForm {
        let open = self.form.insert(OpenForm {
            mode: FormMode::Add,
            fields: MenuForm::default(),
        });
        &mut open.fields
    }

    pub fn begin_edit(&mut self, id: i64) -> Result<&mut MenuForm, EditorError> {
        let fields = MenuForm::from(self.get(id).ok_or(EditorError::NotFound(id))?);
        let open = self.form.insert(OpenForm {
            mode: FormMode::Edit(id),
            fields,
        });
        Ok(&mut open.fields)
    }

    pub fn form(&self) -> Option<&MenuForm> {
        self.form.as_ref().map(|f| &f.fields)
    }

    pub fn form_mut(&mut self) -> Option<&mut MenuForm> {
        self.form.as_mut().map(|f| &mut f.fields)
    }

    pub fn editing(&self) -> Option<i64> {
        match self.form.as_ref()?.mode {
            FormMode::Edit(id) => Some(id),
            FormMode::Add => None,
        }
    }

    pub fn cancel(&mut self) {
        self.form = None;
    }

    fn build(&self, open: &OpenForm) -> Result<MenuItem, FormError> {
        let f = &open.fields;
        let name = f.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingName);
        }
        let url = f.url.trim();
        if url.is_empty() {
            return Err(FormError::MissingUrl);
        }
        if f.order < 1 {
            return Err(FormError::InvalidOrder(f.order));
        }

        let id = match open.mode {
            FormMode::Edit(id) => id,
            FormMode::Add => menu::next_id(&self.items).ok_or(FormError::IdsExhausted)?,
        };

        let parent_id = f.parent_id.filter(|p| *p != 0);
        if let Some(parent) = parent_id {
            if parent == id {
                return Err(FormError::SelfParent);
            }
            if !self.roots().iter().any(|r| r.id == parent) {
                return Err(FormError::InvalidParent(parent));
            }
            // فقط القائمة الرئيسية ذات الفروع؛ عناصر تشير إلى قائمة فرعية يتيمة ولا تمنع التعديل
            let is_root = self.get(id).is_some_and(MenuItem::is_root);
            if matches!(open.mode, FormMode::Edit(_)) && is_root && !self.children(id).is_empty() {
                return Err(FormError::HasChildren(id));
            }
        }

        let icon = f.icon_url.trim();
        Ok(MenuItem {
            id,
            name: name.to_string(),
            url: url.to_string(),
            parent_id,
            order: f.order,
            is_active: f.is_active,
            icon_url: (!icon.is_empty()).then(|| icon.to_string()),
        })
    }

    /// يتحقق من النموذج، يطبّقه على القائمة المحلية، يغلق النموذج، ثم يحفظ
    /// العنصر الوحيد المتأثر.
    pub async fn submit(&mut self, store: &dyn MenuStore) -> Result<Saved, EditorError> {
        let open = self.form.as_ref().ok_or(FormError::NotOpen)?;
        let mode = open.mode;
        let item = self.build(open)?;

        match mode {
            FormMode::Edit(id) => {
                let slot = self
                    .items
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or(EditorError::NotFound(id))?;
                *slot = item.clone();
            }
            FormMode::Add => self.items.push(item.clone()),
        }
        self.form = None;

        let res = match mode {
            FormMode::Edit(_) => store.update(&item).await,
            FormMode::Add => store.create(&item).await,
        };
        let synced = match res {
            Ok(()) => {
                tracing::info!(target: "menus", "menu {} saved", item.id);
                true
            }
            Err(e) => {
                tracing::error!(target: "menus", "failed to save menu {}: {e}", item.id);
                false
            }
        };

        Ok(Saved { item, synced })
    }

    /* ---- delete ---- */

    /// يحذف `id` ومعه كل قوائمه الفرعية إن كانت رئيسية، بعد موافقة `confirm`
    /// على [`DELETE_PROMPT`]. يعيد `Ok(None)` عند الرفض.
    ///
    /// استدعاء `remove` واحد لكل عنصر محذوف؛ تعمل معاً وقد تنتهي بأي ترتيب.
    pub async fn delete<F>(
        &mut self,
        id: i64,
        confirm: F,
        store: &dyn MenuStore,
    ) -> Result<Option<Deletion>, EditorError>
    where
        F: FnOnce(&str) -> bool,
    {
        if self.get(id).is_none() {
            return Err(EditorError::NotFound(id));
        }
        if !confirm(DELETE_PROMPT) {
            tracing::debug!(target: "menus", "delete of menu {id} declined");
            return Ok(None);
        }

        let removed = menu::cascade_ids(&self.items, id);
        self.items.retain(|m| !removed.contains(&m.id));
        if self.editing().is_some_and(|e| removed.contains(&e)) {
            self.form = None;
        }

        let results = join_all(removed.iter().map(|&rid| async move {
            (rid, store.remove(rid).await)
        }))
        .await;

        let mut failed = vec![];
        for (rid, res) in results {
            if let Err(e) = res {
                tracing::error!(target: "menus", "failed to delete menu {rid}: {e}");
                failed.push(rid);
            }
        }
        tracing::info!(
            target: "menus",
            "deleted menus {:?} ({} not synced)",
            removed,
            failed.len()
        );

        Ok(Some(Deletion { removed, failed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::item;
    use crate::store::memory::MemoryStore;

    fn shop() -> Vec<MenuItem> {
        vec![
            item(1, "Home", "/", None, 1),
            item(2, "Products", "/products", None, 2),
            item(3, "Books", "/products?c=books", Some(2), 1),
        ]
    }

    async fn mounted(store: &MemoryStore) -> MenuEditor {
        MenuEditor::mount(store, Authorized(true)).await.unwrap()
    }

    fn ids(items: &[MenuItem]) -> Vec<i64> {
        let mut v: Vec<i64> = items.iter().map(|m| m.id).collect();
        v.sort();
        v
    }

    #[tokio::test]
    async fn mount_requires_admin() {
        let store = MemoryStore::with_items(&shop());
        let err = MenuEditor::mount(&store, Authorized(false)).await.unwrap_err();
        assert!(matches!(err, EditorError::Unauthorized));
    }

    #[tokio::test]
    async fn mount_with_store_down_is_empty() {
        let store = MemoryStore::with_items(&shop());
        store.set_unreachable(true);
        let ed = mounted(&store).await;
        assert!(ed.items().is_empty());
        assert!(ed.rows().is_empty());
    }

    #[tokio::test]
    async fn add_assigns_next_id() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        let form = ed.begin_add();
        assert_eq!(form.order, 1);
        assert!(form.is_active);
        assert_eq!(form.parent_id, None);

        form.name = "Contact".into();
        form.url = "/contact".into();
        form.order = 3;

        let saved = ed.submit(&store).await.unwrap();
        assert_eq!(saved.item.id, 4);
        assert!(saved.synced);
        assert!(ed.form().is_none());
        assert_eq!(ed.items().len(), 4);
        assert_eq!(store.calls(), vec!["create:4".to_string()]);
        assert!(store.snapshot().contains(&saved.item));
    }

    #[tokio::test]
    async fn add_to_empty_list_gets_id_one() {
        let store = MemoryStore::default();
        let mut ed = mounted(&store).await;
        let form = ed.begin_add();
        form.name = "الرئيسية".into();
        form.url = "/".into();
        assert_eq!(ed.submit(&store).await.unwrap().item.id, 1);
    }

    #[tokio::test]
    async fn edit_is_full_replace_keeping_id() {
        let mut l = shop();
        l[2].icon_url = Some("https://cdn/books.png".into());
        let store = MemoryStore::with_items(&l);
        let mut ed = mounted(&store).await;

        let form = ed.begin_edit(3).unwrap();
        assert_eq!(form.name, "Books");
        assert_eq!(form.parent_id, Some(2));
        assert_eq!(form.icon_url, "https://cdn/books.png");

        form.name = "Novels".into();
        form.icon_url = String::new();
        form.is_active = false;
        form.parent_id = Some(0);

        let saved = ed.submit(&store).await.unwrap();
        let expected = MenuItem {
            id: 3,
            name: "Novels".into(),
            url: "/products?c=books".into(),
            parent_id: None,
            order: 1,
            is_active: false,
            icon_url: None,
        };
        assert_eq!(saved.item, expected);
        assert_eq!(ed.get(3), Some(&expected));
        assert_eq!(ed.items().len(), 3);
        assert_eq!(store.calls(), vec!["update:3".to_string()]);
    }

    #[tokio::test]
    async fn edit_unknown_id() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;
        assert!(matches!(ed.begin_edit(42), Err(EditorError::NotFound(42))));
    }

    #[tokio::test]
    async fn required_fields_keep_form_open() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        ed.begin_add().url = "/x".into();
        let err = ed.submit(&store).await.unwrap_err();
        assert!(matches!(err, EditorError::Form(FormError::MissingName)));
        assert!(ed.form().is_some());

        let form = ed.form_mut().unwrap();
        form.name = "X".into();
        form.url = "   ".into();
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::MissingUrl))
        ));

        let form = ed.form_mut().unwrap();
        form.url = "/x".into();
        form.order = 0;
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::InvalidOrder(0)))
        ));
        assert!(store.calls().is_empty());
        assert_eq!(ed.items().len(), 3);
    }

    #[tokio::test]
    async fn submit_without_form() {
        let store = MemoryStore::default();
        let mut ed = mounted(&store).await;
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::NotOpen))
        ));
    }

    #[tokio::test]
    async fn parent_must_be_a_root() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        let opts: Vec<i64> = ed.parent_options().iter().map(|m| m.id).collect();
        assert_eq!(opts, vec![1, 2]);

        let form = ed.begin_add();
        form.name = "Deep".into();
        form.url = "/deep".into();
        form.parent_id = Some(3);
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::InvalidParent(3)))
        ));
    }

    #[tokio::test]
    async fn root_with_children_cannot_move_under_another_root() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        ed.begin_edit(2).unwrap().parent_id = Some(1);
        let opts: Vec<i64> = ed.parent_options().iter().map(|m| m.id).collect();
        assert_eq!(opts, vec![1]);
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::HasChildren(2)))
        ));

        ed.form_mut().unwrap().parent_id = Some(2);
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::SelfParent))
        ));
    }

    #[tokio::test]
    async fn child_with_stray_grandchild_stays_editable() {
        let store = MemoryStore::with_items(&[
            item(2, "Products", "/products", None, 2),
            item(3, "Books", "/products?c=books", Some(2), 1),
            item(9, "Deep", "/deep", Some(3), 1),
        ]);
        let mut ed = mounted(&store).await;

        ed.begin_edit(3).unwrap().name = "Novels".into();
        let saved = ed.submit(&store).await.unwrap();
        assert_eq!(saved.item.name, "Novels");
        assert_eq!(saved.item.parent_id, Some(2));
        assert_eq!(store.calls(), vec!["update:3".to_string()]);
    }

    #[tokio::test]
    async fn add_fails_cleanly_when_ids_run_out() {
        let store = MemoryStore::with_items(&[item(i64::MAX, "Last", "/last", None, 1)]);
        let mut ed = mounted(&store).await;

        let form = ed.begin_add();
        form.name = "Contact".into();
        form.url = "/contact".into();
        assert!(matches!(
            ed.submit(&store).await,
            Err(EditorError::Form(FormError::IdsExhausted))
        ));
        assert_eq!(ed.items().len(), 1);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_root_cascades() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        let mut prompt = String::new();
        let del = ed
            .delete(
                2,
                |p| {
                    prompt = p.to_string();
                    true
                },
                &store,
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(prompt, DELETE_PROMPT);
        assert_eq!(del.removed, vec![2, 3]);
        assert!(del.failed.is_empty());
        assert_eq!(ids(ed.items()), vec![1]);
        assert_eq!(ids(&store.snapshot()), vec![1]);

        let mut calls = store.calls();
        calls.sort();
        assert_eq!(calls, vec!["remove:2".to_string(), "remove:3".to_string()]);
    }

    #[tokio::test]
    async fn delete_child_removes_only_itself() {
        let mut l = shop();
        l.push(item(4, "Pens", "/products?c=pens", Some(2), 2));
        let store = MemoryStore::with_items(&l);
        let mut ed = mounted(&store).await;

        let del = ed.delete(3, |_| true, &store).await.unwrap().unwrap();
        assert_eq!(del.removed, vec![3]);
        assert_eq!(ids(ed.items()), vec![1, 2, 4]);
        assert_eq!(store.calls(), vec!["remove:3".to_string()]);
    }

    #[tokio::test]
    async fn declined_delete_changes_nothing() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        assert!(ed.delete(2, |_| false, &store).await.unwrap().is_none());
        assert_eq!(ed.items().len(), 3);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn store_failures_do_not_roll_back() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;
        store.set_unreachable(true);

        let form = ed.begin_add();
        form.name = "Contact".into();
        form.url = "/contact".into();
        let saved = ed.submit(&store).await.unwrap();
        assert!(!saved.synced);
        assert!(ed.get(4).is_some());

        let del = ed.delete(2, |_| true, &store).await.unwrap().unwrap();
        assert_eq!(del.failed.len(), 2);
        assert_eq!(ids(ed.items()), vec![1, 4]);

        store.set_unreachable(false);
        ed.reload(&store).await;
        assert_eq!(ids(ed.items()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cancel_discards_the_form() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        ed.begin_edit(1).unwrap().name = "changed".into();
        assert_eq!(ed.editing(), Some(1));
        ed.cancel();
        assert!(ed.form().is_none());
        assert_eq!(ed.get(1).unwrap().name, "Home");

        // الإضافة بعد التعديل تبدأ من القيم الافتراضية
        assert_eq!(*ed.begin_add(), MenuForm::default());
        assert_eq!(ed.editing(), None);
    }

    #[tokio::test]
    async fn deleting_the_edited_item_closes_the_form() {
        let store = MemoryStore::with_items(&shop());
        let mut ed = mounted(&store).await;

        ed.begin_edit(3).unwrap();
        ed.delete(2, |_| true, &store).await.unwrap();
        assert!(ed.form().is_none());
    }
}
