use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        token::JwtKeys,
    },
    error::AuthError,
    store::{NewUser, User, UserStore},
};

/// Create an account with the given credentials.
///
/// The early duplicate check gives a friendly answer for the common case;
/// the store's uniqueness guarantee catches the race where two requests
/// register the same email at once.
pub async fn register(
    store: &dyn UserStore,
    email: &str,
    password: &str,
    full_name: Option<String>,
) -> Result<User, AuthError> {
    if store.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = hash_password(password).map_err(AuthError::Internal)?;
    let user = store
        .insert(NewUser {
            email: email.to_string(),
            password_hash,
            full_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Check an email/password pair against the store.
///
/// Unknown email and wrong password produce the same error so a caller
/// cannot probe which addresses have accounts.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = match store.find_by_email(email).await? {
        Some(user) => user,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password_hash) {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

/// Authenticate and mint a bearer token carrying the user's email.
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<String, AuthError> {
    let user = authenticate(store, email, password).await?;
    let token = keys
        .sign(&user.email)
        .map_err(|e| AuthError::Internal(e.into()))?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(token)
}

/// Resolve a bearer token back to its user.
///
/// A valid signature is not enough: the subject must still exist in the
/// store, so deleted accounts lose access even though tokens are stateless.
pub async fn resolve(
    store: &dyn UserStore,
    keys: &JwtKeys,
    token: &str,
) -> Result<User, AuthError> {
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        AuthError::InvalidToken
    })?;

    match store.find_by_email(&claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            warn!(subject = %claims.sub, "token subject no longer exists");
            Err(AuthError::InvalidToken)
        }
    }
}
