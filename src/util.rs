use mongodb::bson::Document;
use time::OffsetDateTime;

/* ================== Time ================== */

pub fn now_iso_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/* ================== قراءة المستندات ================== */

// الحقول قد تُخزَّن بأنواع مختلفة (int32/int64/double/نص) حسب من كتبها.

pub fn i64_from(d: &Document, k: &str) -> Option<i64> {
    d.get_i64(k)
        .ok()
        .or_else(|| d.get_i32(k).ok().map(i64::from))
        .or_else(|| {
            d.get_f64(k)
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v as i64)
        })
        .or_else(|| d.get_str(k).ok().and_then(|s| s.trim().parse::<i64>().ok()))
}

pub fn f64_from(d: &Document, k: &str) -> Option<f64> {
    d.get_f64(k)
        .ok()
        .or_else(|| d.get_i64(k).ok().map(|v| v as f64))
        .or_else(|| d.get_i32(k).ok().map(f64::from))
        .or_else(|| {
            d.get_str(k)
                .ok()
                .and_then(|s| s.trim().parse::<f64>().ok())
        })
}

pub fn opt_string(d: &Document, k: &str) -> Option<String> {
    d.get_str(k).ok().map(|s| s.to_string())
}

pub fn string_or_default(d: &Document, k: &str) -> String {
    d.get_str(k).unwrap_or_default().to_string()
}

pub fn bool_from(d: &Document, k: &str) -> Option<bool> {
    if let Ok(b) = d.get_bool(k) {
        return Some(b);
    }
    if let Some(i) = i64_from(d, k) {
        return Some(i != 0);
    }
    if let Ok(s) = d.get_str(k) {
        let s = s.trim().to_ascii_lowercase();
        return match s.as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        };
    }
    None
}
