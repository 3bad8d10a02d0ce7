use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::oauth::GoogleToken;

pub(crate) const SERVICE_NAME: &str = "gleaner";
const TOKEN_SERVER: &str = "google-oauth";

/// Where the OAuth token lives between runs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<GoogleToken>, String>;
    async fn store(&self, token: &GoogleToken) -> Result<(), String>;
    async fn delete(&self) -> Result<(), String>;
}

/// Token stored in the system keyring via Secret Service.
pub struct KeyringTokenStore {
    client_id: String,
}

impl KeyringTokenStore {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
        }
    }

    fn attributes(&self) -> HashMap<&str, &str> {
        let mut attrs = HashMap::new();
        attrs.insert("service", SERVICE_NAME);
        attrs.insert("server", TOKEN_SERVER);
        attrs.insert("client", self.client_id.as_str());
        attrs
    }
}

#[async_trait]
impl TokenStore for KeyringTokenStore {
    async fn load(&self) -> Result<Option<GoogleToken>, String> {
        let keyring = oo7::Keyring::new()
            .await
            .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

        let items = keyring
            .search_items(&self.attributes())
            .await
            .map_err(|e| format!("Failed to search keyring: {}", e))?;

        if let Some(item) = items.first() {
            let secret_bytes = item
                .secret()
                .await
                .map_err(|e| format!("Failed to read secret: {}", e))?;
            let token = serde_json::from_slice::<GoogleToken>(&secret_bytes.to_vec())
                .map_err(|e| format!("Invalid token in keyring: {}", e))?;
            return Ok(Some(token));
        }

        Ok(None)
    }

    async fn store(&self, token: &GoogleToken) -> Result<(), String> {
        let keyring = oo7::Keyring::new()
            .await
            .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

        let secret = serde_json::to_vec(token).map_err(|e| format!("Failed to encode token: {}", e))?;

        keyring
            .create_item(
                "Gleaner Google account",
                &self.attributes(),
                secret.as_slice(),
                true, // replace existing
            )
            .await
            .map_err(|e| format!("Failed to store token: {}", e))?;

        Ok(())
    }

    async fn delete(&self) -> Result<(), String> {
        let keyring = oo7::Keyring::new()
            .await
            .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

        let items = keyring
            .search_items(&self.attributes())
            .await
            .map_err(|e| format!("Failed to search keyring: {}", e))?;

        for item in items {
            item.delete()
                .await
                .map_err(|e| format!("Failed to delete token: {}", e))?;
        }

        Ok(())
    }
}

/// Process-local store, for tests and for sessions that should not persist.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<GoogleToken>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: GoogleToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<GoogleToken>>, String> {
        self.token.lock().map_err(|_| "token store poisoned".to_string())
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<GoogleToken>, String> {
        Ok(self.lock()?.clone())
    }

    async fn store(&self, token: &GoogleToken) -> Result<(), String> {
        *self.lock()? = Some(token.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<(), String> {
        *self.lock()? = None;
        Ok(())
    }
}
