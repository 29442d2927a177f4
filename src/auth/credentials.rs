use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "sensordeck";

/// Password storage in the OS keychain, so re-login after an expired
/// refresh token doesn't have to prompt again.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store(username: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    pub fn get_password(username: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    pub fn delete(username: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_get_delete_round_trip() {
        // In-memory keystore, so the test never touches the OS keychain
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());

        CredentialStore::store("alice", "alice123").unwrap();
        assert_eq!(CredentialStore::get_password("alice").unwrap(), "alice123");

        CredentialStore::delete("alice").unwrap();
        assert!(CredentialStore::get_password("alice").is_err());
    }
}
