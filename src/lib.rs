//! خدمة قوائم التنقل لمكتبة الأمل: نموذج القوائم، طبقة التخزين فوق MongoDB،
//! محرر القوائم للوحة التحكم، المنتجات والطلبات، وواجهة HTTP للوحة التحكم والمتجر.

pub mod config;
pub mod defaults;
pub mod editor;
pub mod http_api;
pub mod menu;
pub mod mongo;
pub mod navigation;
pub mod orders;
pub mod products;
pub mod store;
pub mod util;
