//! Authentication for the identification backend
//!
//! This module provides the bearer-token credentials every backend call
//! carries, plus the interactive setup and status commands.
//!
//! # Examples
//!
//! ```rust,no_run
//! use birdsight::auth::{check_credentials, Credentials};
//!
//! if check_credentials() {
//!     let credentials = Credentials::from_env().unwrap();
//!     println!("Signed in as {:?}", credentials.user_id);
//! }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    check_credentials, get_auth_status, prompt_credentials, save_credentials,
    save_credentials_to, setup_credentials, show_auth_status, verify_credentials, AuthStatus,
    Credentials,
};
