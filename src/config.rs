use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub app_name: String,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub hmac_secret: Option<String>,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::temp_dir().join("dailybudget-test-data"),
            app_name: "Daily Budget".to_string(),
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            hmac_secret: None,
        }
    }
}
