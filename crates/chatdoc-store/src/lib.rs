pub mod clock;
pub mod collection;
pub mod composer;
pub mod config;
pub mod error;
pub mod expiry;
pub mod records;
pub mod scheduler;
pub mod settings;
pub mod substrate;
pub mod transfer;
pub mod types;
pub mod vault;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collection::{Collection, CollectionDocument};
pub use composer::{ContextComposer, HISTORY_HEADER};
pub use config::{ContextConfig, StoreConfig};
pub use error::{ImportError, Result, StoreError, WriteOutcome};
pub use expiry::{
    expired_count, expiry_notice, is_expired, relative_day, sweep, SweepResult, EXPIRY_NOTICE,
};
pub use records::RecordStore;
pub use scheduler::{until_next_midnight, ExpiryScheduler, SweepReport};
pub use settings::{Settings, DEFAULT_API_BASE_URL};
pub use substrate::{FileSubstrate, MemorySubstrate, Substrate};
pub use transfer::export_file_name;
pub use types::{
    ConversationEntry, CredentialBundle, CredentialOverride, EntryPatch, Message, Role,
};
pub use vault::CredentialVault;

/// Everything persisted on the client, opened from one configuration.
pub struct ChatStore {
    pub records: Arc<RecordStore>,
    pub vault: Arc<CredentialVault>,
    pub settings: Arc<Settings>,
    pub composer: ContextComposer,
}

impl ChatStore {
    /// Files under `config.data_dir`, one per key.
    pub fn open(config: &StoreConfig) -> Self {
        Self::with_substrate(config, Arc::new(FileSubstrate::new(&config.data_dir)))
    }

    pub fn in_memory(config: &StoreConfig) -> Self {
        Self::with_substrate(config, Arc::new(MemorySubstrate::new()))
    }

    pub fn with_substrate(config: &StoreConfig, substrate: Arc<dyn Substrate>) -> Self {
        Self {
            records: Arc::new(RecordStore::new(substrate.clone(), &config.history_key)),
            vault: Arc::new(CredentialVault::new(
                substrate.clone(),
                &config.credentials_key,
            )),
            settings: Arc::new(Settings::new(substrate, &config.settings_key)),
            composer: ContextComposer::new(config.context.clone()),
        }
    }

    pub fn scheduler(&self, clock: Arc<dyn Clock>) -> ExpiryScheduler {
        ExpiryScheduler::new(self.records.clone(), clock)
    }
}
