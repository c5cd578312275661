use serde::{Deserialize, Serialize};

/* ================== Model ================== */

/// عنصر قائمة واحد كما يُخزَّن في مجموعة `menus`.
///
/// `parent_id` غائب (أو صفر) يعني قائمة رئيسية؛ غير ذلك فهو قائمة فرعية
/// تابعة لقائمة رئيسية. لا يوجد مستوى ثالث.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub order: i64,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl MenuItem {
    pub fn is_root(&self) -> bool {
        matches!(self.parent_id, None | Some(0))
    }

    /// مرجع القائمة الرئيسية، والصفر المخزَّن يُقرأ كـ `None`.
    pub fn parent(&self) -> Option<i64> {
        self.parent_id.filter(|p| *p != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Root,
    Child,
}

/// سطر واحد من جدول لوحة التحكم، بترتيب العرض.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuRow<'a> {
    pub depth: Depth,
    #[serde(flatten)]
    pub item: &'a MenuItem,
}

/* ================== Hierarchy ================== */

// sort_by_key مستقر: عند تساوي order يبقى ترتيب القائمة الأصلي.

pub fn roots(items: &[MenuItem]) -> Vec<&MenuItem> {
    let mut out: Vec<&MenuItem> = items.iter().filter(|m| m.is_root()).collect();
    out.sort_by_key(|m| m.order);
    out
}

pub fn children(items: &[MenuItem], parent_id: i64) -> Vec<&MenuItem> {
    let mut out: Vec<&MenuItem> = items
        .iter()
        .filter(|m| m.parent() == Some(parent_id))
        .collect();
    out.sort_by_key(|m| m.order);
    out
}

/// كل قائمة رئيسية تليها قوائمها الفرعية. القوائم اليتيمة لا تظهر.
pub fn display_order(items: &[MenuItem]) -> Vec<MenuRow<'_>> {
    let mut rows = Vec::with_capacity(items.len());
    for root in roots(items) {
        rows.push(MenuRow {
            depth: Depth::Root,
            item: root,
        });
        rows.extend(children(items, root.id).into_iter().map(|item| MenuRow {
            depth: Depth::Child,
            item,
        }));
    }
    rows
}

/// أكبر معرّف + 1، أو `None` إذا بلغ أكبر معرّف `i64::MAX`.
pub fn next_id(items: &[MenuItem]) -> Option<i64> {
    items.iter().map(|m| m.id).max().unwrap_or(0).max(0).checked_add(1)
}

/// المعرّفات التي تُحذف مع `id`: العنصر نفسه وكل عنصر يشير إليه، بترتيب القائمة.
pub fn cascade_ids(items: &[MenuItem], id: i64) -> Vec<i64> {
    items
        .iter()
        .filter(|m| m.id == id || m.parent() == Some(id))
        .map(|m| m.id)
        .collect()
}

#[cfg(test)]
pub(crate) fn item(id: i64, name: &str, url: &str, parent_id: Option<i64>, order: i64) -> MenuItem {
    MenuItem {
        id,
        name: name.to_string(),
        url: url.to_string(),
        parent_id,
        order,
        is_active: true,
        icon_url: None,
    }
}
