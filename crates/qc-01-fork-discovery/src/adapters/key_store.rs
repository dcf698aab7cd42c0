//! # Node Key Store
//!
//! Persists the node's secp256k1 identity key as hex at
//! `<data_dir>/network-keys`. A missing file is generated on first start.
//! Without a data directory the key is ephemeral.

use std::fs;
use std::path::{Path, PathBuf};

use k256::ecdsa::SigningKey;
use tracing::info;

use crate::domain::ForkDiscoveryError;

/// File name of the persisted key inside the data directory.
pub const KEY_FILE_NAME: &str = "network-keys";

/// File-backed node identity key.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: Option<PathBuf>,
}

impl FileKeyStore {
    /// Key store under `data_dir`. An empty path yields an ephemeral store.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        let path = (!dir.as_os_str().is_empty()).then(|| dir.join(KEY_FILE_NAME));
        Self { path }
    }

    /// Location of the key file, if persistent.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the key, generating and saving a new one if none exists.
    ///
    /// # Errors
    ///
    /// `KeyStore` if the file exists but is unreadable or not a valid key,
    /// or if a new key cannot be written.
    pub fn load_or_generate(&self) -> Result<SigningKey, ForkDiscoveryError> {
        let Some(path) = &self.path else {
            info!("No data directory configured, using ephemeral node key");
            return Ok(SigningKey::random(&mut rand::thread_rng()));
        };

        if path.exists() {
            return Self::load(path);
        }

        let key = SigningKey::random(&mut rand::thread_rng());
        Self::save(path, &key)?;
        info!(path = %path.display(), "Generated new node key");
        Ok(key)
    }

    fn load(path: &Path) -> Result<SigningKey, ForkDiscoveryError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ForkDiscoveryError::KeyStore(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut secret = [0u8; 32];
        hex::decode_to_slice(content.trim(), &mut secret).map_err(|e| {
            ForkDiscoveryError::KeyStore(format!("{} is not a hex secret: {e}", path.display()))
        })?;
        SigningKey::from_bytes((&secret).into()).map_err(|e| {
            ForkDiscoveryError::KeyStore(format!("{} holds an invalid key: {e}", path.display()))
        })
    }

    fn save(path: &Path, key: &SigningKey) -> Result<(), ForkDiscoveryError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                ForkDiscoveryError::KeyStore(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        fs::write(path, hex::encode(key.to_bytes())).map_err(|e| {
            ForkDiscoveryError::KeyStore(format!("failed to write {}: {e}", path.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ForkDiscoveryError::KeyStore(format!("failed to restrict {}: {e}", path.display()))
            })?;
        }

        Ok(())
    }
}
