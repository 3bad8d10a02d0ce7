use std::sync::Arc;

use chrono_tz::Tz;

use crate::config::{AccountMode, ExtractionMode, GleanerConfig};
use crate::error::AppError;
use crate::service::demo::{DemoAccount, DemoExtractor};
use crate::service::gemini::GeminiExtractor;
use crate::service::google::GoogleAccount;
use crate::service::keyring::KeyringTokenStore;
use crate::service::{Account, Extractor};

/// The collaborators one run works with. Built once at startup; demo or live is
/// decided here and never re-checked.
#[derive(Clone)]
pub struct Context {
    pub config: GleanerConfig,
    pub time_zone: Tz,
    pub extraction_mode: ExtractionMode,
    pub account_mode: AccountMode,
    pub extractor: Arc<dyn Extractor>,
    pub account: Arc<dyn Account>,
}

impl Context {
    pub fn from_config(config: GleanerConfig) -> Result<Self, AppError> {
        let extractor: Arc<dyn Extractor> = match config.extraction_mode() {
            ExtractionMode::Live => Arc::new(GeminiExtractor::new(&config)),
            ExtractionMode::Demo => {
                log::info!("No Gemini API key configured, using demo analysis");
                Arc::new(DemoExtractor::default())
            }
        };
        let account: Arc<dyn Account> = match config.account_mode() {
            AccountMode::Live => {
                let store = Arc::new(KeyringTokenStore::new(config.google.client_id.trim()));
                Arc::new(GoogleAccount::new(&config, store))
            }
            AccountMode::Demo => {
                log::info!("No Google client id configured, using demo account");
                Arc::new(DemoAccount::default())
            }
        };
        Self::new(config, extractor, account)
    }

    /// Build around explicit collaborators, e.g. zero-latency demos in tests.
    pub fn new(
        config: GleanerConfig,
        extractor: Arc<dyn Extractor>,
        account: Arc<dyn Account>,
    ) -> Result<Self, AppError> {
        let time_zone = config.tz()?;
        Ok(Self {
            extraction_mode: config.extraction_mode(),
            account_mode: config.account_mode(),
            time_zone,
            config,
            extractor,
            account,
        })
    }

    pub fn is_demo(&self) -> bool {
        self.extraction_mode == ExtractionMode::Demo || self.account_mode == AccountMode::Demo
    }
}
