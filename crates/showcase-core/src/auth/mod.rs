//! Backend credential ownership.

mod credential;

pub use credential::CredentialStore;
