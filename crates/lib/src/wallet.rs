//! Deploy wallet provisioning.
//!
//! `forc deploy --default-signer` needs a keystore on disk. forc offers no
//! non-interactive way to create one, so the default provider writes a fixed
//! testnet keystore. Other providers can be plugged into the contributor.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::ConfigurationResolver;
use crate::consts::WALLET_FILENAME;

#[derive(Debug, Error)]
pub enum WalletError {
  #[error("failed to create wallet directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write wallet {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },

  #[error("wallet is not a JSON keystore: {0}")]
  InvalidKeystore(#[from] serde_json::Error),

  #[error("{0}")]
  Provider(String),
}

/// Produces the bytes of the deploy wallet keystore.
pub trait WalletProvider {
  fn wallet(&self, config: &ConfigurationResolver) -> Result<Vec<u8>, WalletError>;
}

/// Fixed testnet keystore, identical for every build.
pub const STATIC_WALLET: &str = r#"{"crypto":{"cipher":"aes-128-ctr","cipherparams":{"iv":"4d4a85c291ffad4477bd2c3e6e64f078"},"ciphertext":"89067d9bfffe1db17a37dd65c4e45e7953b8fc00143a6e1090937add1e3cb21153ca3156cc50e5ccedbe72534843bf7ad80fc4a9bc65fea82427e8905aa64fa241cb1522d8f5f817dfc144e45285a03ca36d4399f4276d0fd5a5c1d7d906ad2d7e5e861c7a58796ca08c73510fb5d806f15938b337f21e292d3eab92e25f1ed57a48906794cb2c6616220bde9bec526c5abc74a518ee6d92290105","kdf":"scrypt","kdfparams":{"dklen":32,"n":8192,"p":1,"r":8,"salt":"4a118a37f92754b0c472b9affc54a70f462d216b5e01a823c3e41ec234b96eba"},"mac":"132446b450cee5fe1c39f456c275cedeff72db61e84f9534de84ec462c745154"},"id":"380a7b4c-725e-4c3d-9667-50f9cdf43a94","version":3}"#;

// TODO: replace with a provider that runs `forc wallet new` once forc-wallet
// accepts a password non-interactively.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticWallet;

impl WalletProvider for StaticWallet {
  fn wallet(&self, _config: &ConfigurationResolver) -> Result<Vec<u8>, WalletError> {
    Ok(STATIC_WALLET.as_bytes().to_vec())
  }
}

/// Create `wallet_dir` and write the provider's keystore to `<wallet_dir>/.wallet`.
///
/// The bytes must parse as a JSON object; they are written unchanged.
pub fn initialize_wallet(
  provider: &dyn WalletProvider,
  config: &ConfigurationResolver,
  wallet_dir: &Path,
) -> Result<PathBuf, WalletError> {
  info!(dir = %wallet_dir.display(), "initializing deploy wallet");

  fs::create_dir_all(wallet_dir).map_err(|source| WalletError::CreateDir {
    path: wallet_dir.to_path_buf(),
    source,
  })?;

  let bytes = provider.wallet(config)?;
  serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&bytes)?;

  let wallet_file = wallet_dir.join(WALLET_FILENAME);
  fs::write(&wallet_file, &bytes).map_err(|source| WalletError::Write {
    path: wallet_file.clone(),
    source,
  })?;

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&wallet_file, fs::Permissions::from_mode(0o644)).map_err(|source| WalletError::Write {
      path: wallet_file.clone(),
      source,
    })?;
  }

  info!(path = %wallet_file.display(), "initialized deploy wallet");
  Ok(wallet_file)
}
