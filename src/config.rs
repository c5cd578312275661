use anyhow::{anyhow, Result};

const DEV_API_KEY: &str = "SUPER_SECRET_API_KEY_123";
const DEV_HMAC_SECRET: &str = "dev-secret-xyz";

/// إعدادات التشغيل من متغيرات البيئة (و .env إن وجد).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo_uri: String,
    pub mongo_db: String,
    pub port: u16,
    pub api_key: String,
    pub hmac_secret: String,
}

impl AppConfig {
    /// - MONGO_URI (إجباري)
    /// - MONGO_DB (الافتراضي "default")
    /// - PORT (الافتراضي 3000)
    /// - SHOP_API_KEY / SHOP_HMAC_SECRET (قيم تطوير افتراضية)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mongo_uri = get("MONGO_URI").ok_or_else(|| anyhow!("MONGO_URI missing in environment"))?;
        let mongo_db = get("MONGO_DB").unwrap_or_else(|| "default".into());
        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow!("PORT is not a valid port: {v}"))?,
            None => 3000,
        };

        let api_key = get("SHOP_API_KEY").unwrap_or_else(|| {
            tracing::warn!(target: "boot", "SHOP_API_KEY not set, using the development key");
            DEV_API_KEY.into()
        });
        let hmac_secret = get("SHOP_HMAC_SECRET").unwrap_or_else(|| DEV_HMAC_SECRET.into());

        Ok(Self {
            mongo_uri,
            mongo_db,
            port,
            api_key,
            hmac_secret,
        })
    }
}
