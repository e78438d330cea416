//! Credential extraction module.
//!
//! Recovers the desktop client's web session (an `xoxc-` token and the
//! encrypted `d` cookie) from its private storage.
//!
//! # Architecture
//!
//! - [`SecretProvider`]: Safe Storage passphrase source (Keychain in production)
//! - [`crypto`]: PBKDF2 key derivation and AES-128-CBC cookie decryption
//! - [`CookieStore`]: point lookups in a temp copy of the `Cookies` database
//! - [`session_log`]: `xoxc-` token scanning over LevelDB bytes
//! - [`workspace`]: `root-state.json` workspace discovery
//! - [`SlackCredentialExtractor`]: composes the above into [`Credentials`]

pub mod cookie_store;
pub mod crypto;
mod error;
mod extractor;
pub mod secret;
pub mod session_log;
mod types;
pub mod workspace;

pub use cookie_store::CookieStore;
pub use error::ExtractionError;
pub use extractor::{CredentialExtractor, SlackCredentialExtractor, SlackPaths};
pub use secret::{
    CachedSecretProvider, SecretProvider, SecurityCliSecretProvider, StaticSecretProvider,
};
pub use types::{Credentials, WorkspaceIcon, WorkspaceMetadata, mask_secret};
