use crate::error::CredentialError;
use git2::{CertificateCheckStatus, Cred, CredentialType, FetchOptions, RemoteCallbacks};
use std::fs;
use std::path::{Path, PathBuf};

/// SSH key used for clone and fetch
///
/// Host keys are never verified: the deployment accepts whatever key the git host
/// presents.
#[derive(Debug, Clone)]
pub struct SshCredentials {
    username: String,
    private_key: PathBuf,
    passphrase: Option<String>,
}

impl SshCredentials {
    /// Load key material, failing if the key file is missing or unreadable
    pub fn load(
        username: impl Into<String>,
        private_key: impl AsRef<Path>,
        passphrase: Option<String>,
    ) -> Result<Self, CredentialError> {
        let private_key = private_key.as_ref();
        let key_display = private_key.display().to_string();

        let metadata = fs::metadata(private_key).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CredentialError::KeyNotFound(key_display.clone()),
            _ => CredentialError::KeyUnreadable {
                path: key_display.clone(),
                reason: e.to_string(),
            },
        })?;
        if !metadata.is_file() {
            return Err(CredentialError::KeyUnreadable {
                path: key_display,
                reason: "not a regular file".to_string(),
            });
        }
        fs::File::open(private_key).map_err(|e| CredentialError::KeyUnreadable {
            path: key_display.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!("Loaded SSH key from {}", key_display);

        Ok(Self {
            username: username.into(),
            private_key: private_key.to_path_buf(),
            passphrase,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }

    /// Callbacks answering SSH key challenges and accepting any host key
    pub fn remote_callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let mut challenge = KeyChallenge::new(self);
        callbacks.credentials(move |_url, username_from_url, allowed| {
            challenge.answer(username_from_url, allowed)
        });
        callbacks.certificate_check(|_cert, host| {
            tracing::debug!("Skipping host key verification for {}", host);
            Ok(CertificateCheckStatus::CertificateOk)
        });
        callbacks
    }

    pub fn fetch_options(&self) -> FetchOptions<'_> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.remote_callbacks());
        options
    }
}

/// Offers the key once per connection
///
/// libgit2 asks again after the remote rejects a key, so a second SSH request fails
/// the transport.
struct KeyChallenge<'a> {
    credentials: &'a SshCredentials,
    attempts: usize,
}

impl<'a> KeyChallenge<'a> {
    fn new(credentials: &'a SshCredentials) -> Self {
        Self {
            credentials,
            attempts: 0,
        }
    }

    fn answer(
        &mut self,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        if !allowed.is_ssh_key() {
            return Cred::default();
        }
        self.attempts += 1;
        if self.attempts > 1 {
            tracing::warn!(
                "Remote rejected SSH key {}",
                self.credentials.private_key.display()
            );
            return Err(git2::Error::from_str("SSH key was rejected by the remote"));
        }
        let user = username_from_url.unwrap_or(&self.credentials.username);
        Cred::ssh_key(
            user,
            None,
            &self.credentials.private_key,
            self.credentials.passphrase.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_existing_key() {
        let dir = tempdir().unwrap();
        let key = dir.path().join("id_ed25519");
        fs::write(&key, "not really a key").unwrap();

        let creds = SshCredentials::load("git", &key, None).unwrap();
        assert_eq!(creds.username(), "git");
        assert_eq!(creds.private_key(), key.as_path());
    }

    #[test]
    fn test_missing_key() {
        let dir = tempdir().unwrap();
        let result = SshCredentials::load("git", dir.path().join("nope"), None);
        assert!(matches!(result, Err(CredentialError::KeyNotFound(_))));
    }

    #[test]
    fn test_directory_is_not_a_key() {
        let dir = tempdir().unwrap();
        let result = SshCredentials::load("git", dir.path(), None);
        assert!(matches!(result, Err(CredentialError::KeyUnreadable { .. })));
    }

    #[test]
    fn test_key_offered_once() {
        let dir = tempdir().unwrap();
        let key = dir.path().join("id_ed25519");
        fs::write(&key, "not really a key").unwrap();
        let creds = SshCredentials::load("git", &key, None).unwrap();

        let mut challenge = KeyChallenge::new(&creds);
        assert!(challenge.answer(Some("git"), CredentialType::SSH_KEY).is_ok());

        let err = challenge
            .answer(Some("git"), CredentialType::SSH_KEY)
            .err()
            .unwrap();
        assert!(err.message().contains("rejected"));
        assert_eq!(challenge.attempts, 2);
    }
}
