use super::rules::WalletError;
use super::session::Session;
use super::types::*;
use crate::{Error, Result};
use serde::de::IgnoredAny;
use tracing::{debug, info};

fn is_not_yet_accessible(err: &Error) -> bool {
    matches!(err, Error::Wallet(WalletError::NotYetAccessible { .. }))
}

/// A wallet of a session, locked or not.
#[derive(Debug, Clone)]
pub struct Wallet {
    session: Session,
    name: String,
}

impl Wallet {
    pub(crate) fn new(session: Session, name: String) -> Self {
        Self { session, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn params(&self) -> WalletParams<'_> {
        WalletParams {
            token: self.session.token(),
            wallet_name: &self.name,
        }
    }

    pub async fn open(&self) -> Result<()> {
        self.session
            .call::<IgnoredAny, _>("open", &self.params(), &self.name)
            .await?;
        Ok(())
    }

    /// Close the wallet in this session. It has to be opened again before use.
    pub async fn close(&self) -> Result<()> {
        self.session
            .call::<IgnoredAny, _>("close", &self.params(), &self.name)
            .await?;
        Ok(())
    }

    pub async fn lock(&self) -> Result<()> {
        self.session
            .call::<IgnoredAny, _>("lock", &self.params(), &self.name)
            .await?;
        Ok(())
    }

    /// Unlock with `password`.
    ///
    /// The service rejects unlocks for a short while after session creation;
    /// such rejections are retried through the session's delay guard.
    pub async fn unlock(&self, password: &str) -> Result<UnlockedWallet> {
        let params = UnlockParams {
            token: self.session.token(),
            wallet_name: &self.name,
            password,
        };
        let session = &self.session;
        let params = &params;
        let name = self.name.as_str();
        session
            .guard()
            .run(is_not_yet_accessible, move || {
                session.call::<IgnoredAny, _>("unlock", params, name)
            })
            .await?;
        info!(wallet = %self.name, "wallet unlocked");
        Ok(UnlockedWallet::new(self.clone()))
    }

    /// Unlock unless it already is.
    pub async fn ensure_unlocked(&self, password: &str) -> Result<UnlockedWallet> {
        match self.unlock(password).await {
            Err(Error::Wallet(WalletError::AlreadyUnlocked { .. })) => {
                debug!(wallet = %self.name, "wallet was already unlocked");
                Ok(UnlockedWallet::new(self.clone()))
            }
            other => other,
        }
    }

    pub async fn is_unlocked(&self) -> Result<bool> {
        let result: UnlockedResult = self
            .session
            .call("is_wallet_unlocked", &self.params(), &self.name)
            .await?;
        Ok(result.unlocked)
    }

    pub async fn public_keys(&self) -> Result<Vec<String>> {
        let params = PublicKeysParams {
            token: self.session.token(),
            wallet_name: Some(&self.name),
        };
        let keys: PublicKeys = self.session.call("get_public_keys", &params, &self.name).await?;
        Ok(keys.keys.into_iter().map(|k| k.public_key).collect())
    }

    pub async fn has_matching_private_key(&self, public_key: &str) -> Result<bool> {
        let params = KeyParams {
            token: self.session.token(),
            wallet_name: &self.name,
            public_key,
        };
        let result: ExistsResult = self
            .session
            .call("has_matching_private_key", &params, &self.name)
            .await?;
        Ok(result.exists)
    }
}

/// A wallet known to be unlocked; key operations live here.
#[derive(Debug, Clone)]
pub struct UnlockedWallet {
    wallet: Wallet,
}

impl UnlockedWallet {
    pub(crate) fn new(wallet: Wallet) -> Self {
        Self { wallet }
    }

    pub fn name(&self) -> &str {
        self.wallet.name()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Import a WIF private key, returning its public key.
    pub async fn import_key(&self, wif_key: &str) -> Result<String> {
        let params = ImportKeyParams {
            token: self.wallet.session.token(),
            wallet_name: self.name(),
            wif_key,
        };
        let imported: PublicKeyResult = self
            .wallet
            .session
            .call("import_key", &params, self.name())
            .await?;
        Ok(imported.public_key)
    }

    pub async fn remove_key(&self, public_key: &str) -> Result<()> {
        let params = KeyParams {
            token: self.wallet.session.token(),
            wallet_name: self.name(),
            public_key,
        };
        self.wallet
            .session
            .call::<IgnoredAny, _>("remove_key", &params, self.name())
            .await?;
        Ok(())
    }

    pub async fn public_keys(&self) -> Result<Vec<String>> {
        self.wallet.public_keys().await
    }

    pub async fn sign_digest(&self, sig_digest: &str, public_key: &str) -> Result<String> {
        let params = SignDigestParams {
            token: self.wallet.session.token(),
            sig_digest,
            public_key,
            wallet_name: Some(self.name()),
        };
        let signed: SignatureResult = self
            .wallet
            .session
            .call("sign_digest", &params, self.name())
            .await?;
        Ok(signed.signature)
    }

    pub async fn encrypt_data(
        &self,
        from_public_key: &str,
        to_public_key: &str,
        content: &str,
        nonce: Option<u64>,
    ) -> Result<String> {
        let params = EncryptParams {
            token: self.wallet.session.token(),
            wallet_name: self.name(),
            from_public_key,
            to_public_key,
            content,
            nonce,
        };
        let encrypted: EncryptResult = self
            .wallet
            .session
            .call("encrypt_data", &params, self.name())
            .await?;
        Ok(encrypted.encrypted_content)
    }

    pub async fn decrypt_data(
        &self,
        from_public_key: &str,
        to_public_key: &str,
        encrypted_content: &str,
    ) -> Result<String> {
        let params = DecryptParams {
            token: self.wallet.session.token(),
            wallet_name: self.name(),
            from_public_key,
            to_public_key,
            encrypted_content,
        };
        let decrypted: DecryptResult = self
            .wallet
            .session
            .call("decrypt_data", &params, self.name())
            .await?;
        Ok(decrypted.decrypted_content)
    }

    /// Lock the wallet, giving back the locked handle.
    pub async fn lock(self) -> Result<Wallet> {
        self.wallet.lock().await?;
        Ok(self.wallet)
    }
}
