//! Credential management for the identification backend
//!
//! The bearer token and the user identity come from the environment (loaded
//! from `.env` at startup). `auth setup` prompts for them and stores them in
//! a `.env` file with owner-only permissions.

use std::env;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use tracing::warn;

use crate::app::{BackendClient, ClientConfig};
use crate::constants::{auth, env as env_constants};
use crate::errors::{AuthError, AuthResult, ClientError};

/// Bearer token plus the identity used for usage counting and feedback
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            user_id,
        }
    }

    /// Read credentials from the process environment
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` if the token variable is unset or blank
    pub fn from_env() -> AuthResult<Self> {
        let token = env::var(env_constants::TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::MissingToken)?;
        let user_id = env::var(env_constants::USER_ID)
            .ok()
            .filter(|u| !u.trim().is_empty());

        Ok(Self { token, user_id })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Whether the token environment variable is set
    pub token_set: bool,
    /// Whether the user id environment variable is set
    pub user_id_set: bool,
    /// Whether .env file exists in current directory
    pub dotenv_file_exists: bool,
    /// Whether the token was accepted by the backend (None = not tested)
    pub credentials_valid: Option<bool>,
}

impl AuthStatus {
    /// Check if a token is available in the environment
    pub fn has_credentials(&self) -> bool {
        self.token_set
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.has_credentials(), self.credentials_valid) {
            (false, _) => "Missing token - run 'auth setup' to configure".to_string(),
            (true, None) => "Token configured but not verified".to_string(),
            (true, Some(true)) => "Token configured and verified".to_string(),
            (true, Some(false)) => "Token configured but rejected".to_string(),
        }
    }
}

/// Check current authentication status
pub fn get_auth_status() -> AuthStatus {
    AuthStatus {
        token_set: env::var(env_constants::TOKEN).is_ok(),
        user_id_set: env::var(env_constants::USER_ID).is_ok(),
        dotenv_file_exists: Path::new(auth::ENV_FILE_NAME).exists(),
        credentials_valid: None,
    }
}

/// Check if a token exists in environment variables
pub fn check_credentials() -> bool {
    env::var(env_constants::TOKEN).is_ok()
}

/// Validate token shape before storing it
fn validate_token(token: &str) -> AuthResult<()> {
    if token.len() < auth::MIN_TOKEN_LENGTH {
        return Err(AuthError::InvalidToken {
            reason: format!(
                "Token must be at least {} characters",
                auth::MIN_TOKEN_LENGTH
            ),
        });
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidToken {
            reason: "Token must not contain whitespace".to_string(),
        });
    }
    Ok(())
}

/// Prompt user for credentials interactively
pub fn prompt_credentials() -> AuthResult<Credentials> {
    let token = rpassword::prompt_password("API token: ")
        .map_err(|e| AuthError::CredentialStorage(io::Error::new(io::ErrorKind::Other, e)))?;
    let token = token.trim().to_string();
    validate_token(&token)?;

    print!("User id (optional): ");
    io::stdout().flush().map_err(AuthError::CredentialStorage)?;

    let mut user_id = String::new();
    io::stdin()
        .read_line(&mut user_id)
        .map_err(AuthError::CredentialStorage)?;
    let user_id = Some(user_id.trim().to_string()).filter(|u| !u.is_empty());

    Ok(Credentials { token, user_id })
}

/// Save credentials to the `.env` file in the current directory
pub fn save_credentials(credentials: &Credentials) -> AuthResult<()> {
    save_credentials_to(Path::new(auth::ENV_FILE_NAME), credentials)?;

    env::set_var(env_constants::TOKEN, &credentials.token);
    if let Some(user_id) = &credentials.user_id {
        env::set_var(env_constants::USER_ID, user_id);
    }

    println!("Credentials saved to {} file", auth::ENV_FILE_NAME);

    #[cfg(unix)]
    println!("File permissions set to owner-only (600)");

    #[cfg(not(unix))]
    println!(
        "Warning: File permissions not set (non-Unix system). Please ensure .env file is protected."
    );

    Ok(())
}

/// Write credentials into an env file, keeping unrelated lines
pub fn save_credentials_to(env_path: &Path, credentials: &Credentials) -> AuthResult<()> {
    let token_prefix = format!("{}=", env_constants::TOKEN);
    let user_prefix = format!("{}=", env_constants::USER_ID);
    let mut lines = Vec::new();

    if env_path.exists() {
        let reader = BufReader::new(File::open(env_path)?);
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.starts_with(&token_prefix) && !trimmed.starts_with(&user_prefix) {
                lines.push(line);
            }
        }
    }

    lines.push(format!("{}{}", token_prefix, credentials.token));
    if let Some(user_id) = &credentials.user_id {
        lines.push(format!("{}{}", user_prefix, user_id));
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(env_path)?;

    for line in lines {
        writeln!(file, "{}", line)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(auth::ENV_FILE_PERMISSIONS);
        file.set_permissions(perms).map_err(|_| AuthError::PermissionDenied {
            path: env_path.to_path_buf(),
        })?;
    }

    Ok(())
}

/// Check the token against the backend by reading the usage counter
///
/// Returns `Some(false)` when the backend rejects the token and `None` when
/// it could not be checked.
pub async fn verify_credentials(config: &ClientConfig) -> AuthResult<Option<bool>> {
    let credentials = Credentials::from_env()?;
    let Some(user_id) = credentials.user_id.clone() else {
        println!("No user id configured; skipping backend check.");
        return Ok(None);
    };

    println!("Verifying token with {}...", config.base_url);
    let client = match BackendClient::new(config, credentials) {
        Ok(client) => client,
        Err(e) => {
            warn!("Could not build backend client: {}", e);
            return Ok(None);
        }
    };

    match client.read_usage(&user_id).await {
        Ok(_) => Ok(Some(true)),
        Err(ClientError::Remote {
            status: 401 | 403, ..
        }) => Ok(Some(false)),
        Err(e) => {
            warn!("Token check failed: {}", e);
            Ok(None)
        }
    }
}

/// Interactive credential setup workflow
pub async fn setup_credentials(config: &ClientConfig) -> AuthResult<()> {
    println!("Birdsight Authentication Setup");
    println!("==============================");
    println!();
    println!("Your token will be stored in a .env file in the current directory.");
    println!();

    let status = get_auth_status();
    if status.has_credentials() {
        println!("Warning: A token is already configured.");
        print!("Do you want to replace it? [y/N]: ");
        io::stdout().flush().map_err(AuthError::CredentialStorage)?;

        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .map_err(AuthError::CredentialStorage)?;

        if !response.trim().to_lowercase().starts_with('y') {
            println!("Setup cancelled.");
            return Ok(());
        }
        println!();
    }

    let credentials = prompt_credentials()?;

    println!();
    save_credentials(&credentials)?;

    println!();
    match verify_credentials(config).await? {
        Some(true) => println!("Setup complete! Token accepted."),
        Some(false) => {
            println!("The backend rejected this token.");
            println!("   You can run 'auth setup' again to re-enter it.");
        }
        None => println!("Setup complete. The token could not be verified yet."),
    }

    Ok(())
}

/// Show current authentication status
pub async fn show_auth_status(config: &ClientConfig) -> AuthResult<()> {
    let mut status = get_auth_status();

    println!("Birdsight Authentication Status");
    println!("===============================");
    println!();
    println!("Token: {}", if status.token_set { "Set" } else { "Not set" });
    match env::var(env_constants::USER_ID) {
        Ok(user_id) => println!("User id: {}", user_id),
        Err(_) => println!("User id: Not set"),
    }
    println!(
        ".env file: {}",
        if status.dotenv_file_exists {
            "Exists"
        } else {
            "Not found"
        }
    );
    println!();

    if status.has_credentials() {
        status.credentials_valid = verify_credentials(config).await?;
        println!();
    }

    println!("Status: {}", status.status_message());

    if !status.has_credentials() || status.credentials_valid == Some(false) {
        println!();
        println!("To configure a token, run: birdsight auth setup");
    }

    Ok(())
}
