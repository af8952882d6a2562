pub mod accounts;
pub mod handlers;
pub mod identity;
pub mod identity_toolkit;
pub mod profile;
pub mod provider;
pub mod session;
