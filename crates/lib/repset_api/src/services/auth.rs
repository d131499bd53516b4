//! Signup and login flows over the account store.

use crate::accounts::{AccountRecord, AccountStore};
use crate::error::{AppError, AppResult};
use crate::models::{IdentityBody, TokenResponse};
use crate::services::token::{ACCESS_TOKEN_EXPIRY_SECS, generate_access_token};

/// bcrypt work factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AppError::Internal(e.to_string()))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    bcrypt::verify(password, hash).map_err(|e| AppError::Internal(e.to_string()))
}

fn build_token_response(account: &AccountRecord, access_token: String) -> TokenResponse {
    TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        identity: IdentityBody {
            id: account.id.to_string(),
            email: account.email.clone(),
        },
    }
}

/// Register a new account and sign it in.
pub async fn signup(
    accounts: &dyn AccountStore,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let pw_hash = hash_password(password)?;
    let account = AccountRecord::new(email, &pw_hash);
    accounts.insert(&account).await?;

    let access_token = generate_access_token(&account.id.to_string(), email, jwt_secret)
        .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))?;
    Ok(build_token_response(&account, access_token))
}

/// Authenticate with email + password.
pub async fn login(
    accounts: &dyn AccountStore,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let account = match accounts.find_by_email(email).await? {
        // Generic error for unknown email
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
        Some(a) => a,
    };

    // Generic error for wrong password
    if !verify_password(password, &account.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let access_token = generate_access_token(&account.id.to_string(), email, jwt_secret)
        .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))?;
    Ok(build_token_response(&account, access_token))
}
