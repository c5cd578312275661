use crate::menu::MenuItem;

/// القوائم الافتراضية للمتجر، تُعرض فقط عندما يتعذر الوصول إلى قاعدة البيانات.
pub fn fallback_menus() -> Vec<MenuItem> {
    let entry = |id: i64, name: &str, url: &str, parent_id: Option<i64>, order: i64| MenuItem {
        id,
        name: name.to_string(),
        url: url.to_string(),
        parent_id,
        order,
        is_active: true,
        icon_url: None,
    };

    vec![
        entry(1, "الرئيسية", "/", None, 1),
        entry(2, "المنتجات", "/products", None, 2),
        entry(3, "الكتب", "/products?category=books", Some(2), 1),
        entry(4, "القرطاسية", "/products?category=stationery", Some(2), 2),
        entry(5, "المستلزمات المدرسية", "/products?category=school", Some(2), 3),
        entry(6, "المفضلة", "/favorites", None, 3),
        entry(7, "سلة المشتريات", "/cart", None, 4),
    ]
}
