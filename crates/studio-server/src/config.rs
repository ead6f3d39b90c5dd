//! Server Configuration
//!
//! Everything comes from the environment, read once at startup. Handlers
//! never touch `std::env`; anything optional that is absent here simply
//! leaves its feature unconfigured.

use studio_imaging::ArkConfig;
use studio_ledger::SupabaseConfig;

/// Runtime configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Listen port
    pub port: u16,

    /// SPA base URL for checkout redirects
    pub app_base_url: String,

    /// remove.bg API key
    pub remove_bg_api_key: Option<String>,

    /// Ark API key
    pub ark_api_key: Option<String>,

    /// Ark base URL override
    pub ark_base_url: Option<String>,

    /// Ark vision model override
    pub ark_vision_model: Option<String>,

    /// Ark image model override
    pub ark_image_model: Option<String>,

    /// Creem API key
    pub creem_api_key: Option<String>,

    /// Creem base URL override
    pub creem_api_base: Option<String>,

    /// Creem webhook shared secret
    pub creem_webhook_secret: Option<String>,

    /// Supabase project URL
    pub supabase_url: Option<String>,

    /// Supabase service-role key
    pub supabase_service_key: Option<String>,

    /// Mount the /api/test routes (development only)
    pub enable_test_endpoints: bool,
}

impl Config {
    /// Read configuration from environment variables
    pub fn from_env() -> Self {
        let port = env_var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        Self {
            port,
            app_base_url: env_var("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:5174".into()),
            remove_bg_api_key: env_var("REMOVE_BG_API_KEY"),
            ark_api_key: env_var("ARK_API_KEY"),
            ark_base_url: env_var("ARK_BASE_URL"),
            ark_vision_model: env_var("ARK_VISION_MODEL"),
            ark_image_model: env_var("ARK_IMAGE_MODEL"),
            creem_api_key: env_var("CREEM_API_KEY"),
            creem_api_base: env_var("CREEM_API_BASE"),
            creem_webhook_secret: env_var("CREEM_WEBHOOK_SECRET"),
            supabase_url: env_var("SUPABASE_URL"),
            supabase_service_key: env_var("SUPABASE_SERVICE_KEY"),
            enable_test_endpoints: env_var("ENABLE_TEST_ENDPOINTS")
                .is_some_and(|v| v == "true" || v == "1"),
        }
    }

    /// Supabase settings, when both URL and key are present
    pub fn supabase(&self) -> Option<SupabaseConfig> {
        match (&self.supabase_url, &self.supabase_service_key) {
            (Some(url), Some(service_key)) => Some(SupabaseConfig {
                url: url.clone(),
                service_key: service_key.clone(),
            }),
            _ => None,
        }
    }

    /// Ark settings, when the API key is present
    pub fn ark(&self) -> Option<ArkConfig> {
        let mut config = ArkConfig::new(self.ark_api_key.clone()?);
        if let Some(base_url) = &self.ark_base_url {
            config.base_url = base_url.clone();
        }
        if let Some(vision_model) = &self.ark_vision_model {
            config.vision_model = vision_model.clone();
        }
        if let Some(image_model) = &self.ark_image_model {
            config.image_model = image_model.clone();
        }
        Some(config)
    }
}

/// Read a variable, treating empty values as unset
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_config() -> Config {
        Config {
            port: 3001,
            app_base_url: "http://localhost:5174".into(),
            remove_bg_api_key: None,
            ark_api_key: None,
            ark_base_url: None,
            ark_vision_model: None,
            ark_image_model: None,
            creem_api_key: None,
            creem_api_base: None,
            creem_webhook_secret: None,
            supabase_url: None,
            supabase_service_key: None,
            enable_test_endpoints: false,
        }
    }

    #[test]
    fn test_supabase_requires_both_values() {
        let mut config = bare_config();
        assert!(config.supabase().is_none());

        config.supabase_url = Some("https://proj.supabase.co".into());
        assert!(config.supabase().is_none());

        config.supabase_service_key = Some("service-key".into());
        let supabase = config.supabase().unwrap();
        assert_eq!(supabase.url, "https://proj.supabase.co");
    }

    #[test]
    fn test_ark_defaults_and_overrides() {
        let mut config = bare_config();
        assert!(config.ark().is_none());

        config.ark_api_key = Some("ark-key".into());
        let ark = config.ark().unwrap();
        assert_eq!(ark.base_url, "https://ark.cn-beijing.volces.com");
        assert_eq!(ark.vision_model, "ep-20251002143225-lp445");

        config.ark_vision_model = Some("ep-custom".into());
        assert_eq!(config.ark().unwrap().vision_model, "ep-custom");
    }
}
