use crate::{
    authentication::cryptography::{hash_password, verify_password},
    error::{ApiError, StoreError},
    form::{clean_text, validate_email, validate_password, ProfilePayload, SignupPayload, TokenPayload},
    jwt::{SessionData, TokenIssuer},
    schema::{NewUser, User, UserProfile},
    store::Store,
};

/// Builds a user row from raw input: the email is required and normalized,
/// the password checked and hashed.
pub fn new_user(email: &str, password: &str, name: &str) -> Result<NewUser, ApiError> {
    let email = validate_email(email)?;
    validate_password(password)?;
    let name = match name.trim() {
        "" => String::new(),
        name => clean_text("name", name)?,
    };

    Ok(NewUser {
        email,
        password: hash_password(password)?,
        name,
        is_staff: false,
        is_superuser: false,
    })
}

fn email_taken(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict(_) => ApiError::invalid("email", "user with this email already exists."),
        e => e.into(),
    }
}

async fn register(user: NewUser, store: &dyn Store) -> Result<User, ApiError> {
    let mut tx = store.begin().await?;
    let user = tx.insert_user(&user).await.map_err(email_taken)?;
    tx.commit().await?;

    log::info!("Registered user {} ({})", user.id, user.email);
    Ok(user)
}

/// Signs up a user; the password is stored hashed.
pub async fn create_user(payload: SignupPayload, store: &dyn Store) -> Result<UserProfile, ApiError> {
    let user = new_user(&payload.email, &payload.password, &payload.name)?;
    let user = register(user, store).await?;

    Ok(UserProfile::from(&user))
}

pub async fn create_superuser(
    email: &str,
    password: &str,
    name: &str,
    store: &dyn Store,
) -> Result<User, ApiError> {
    let mut user = new_user(email, password, name)?;
    user.is_staff = true;
    user.is_superuser = true;

    register(user, store).await
}

/// Issues a token for valid credentials. Every failure looks the same to the
/// caller.
pub async fn login_user(
    payload: TokenPayload,
    store: &dyn Store,
    tokens: &TokenIssuer,
) -> Result<String, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::InvalidCredentials);
    }

    let email = validate_email(&payload.email).map_err(|_| ApiError::InvalidCredentials)?;
    let mut tx = store.begin().await?;
    let user = tx.find_user_by_email(&email).await?;
    drop(tx);

    let user = match user {
        Some(user) if user.is_active => user,
        _ => return Err(ApiError::InvalidCredentials),
    };

    if !verify_password(&payload.password, &user.password)? {
        log::debug!("Rejected password for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    tokens.issue(&user)
}

pub async fn get_profile(session: &SessionData, store: &dyn Store) -> Result<UserProfile, ApiError> {
    let mut tx = store.begin().await?;
    let user = tx
        .find_user(session.user_id)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    Ok(UserProfile::from(&user))
}

/// Updates the authenticated user. A full update requires email and password.
pub async fn update_profile(
    session: &SessionData,
    payload: ProfilePayload,
    full: bool,
    store: &dyn Store,
) -> Result<UserProfile, ApiError> {
    if full {
        if payload.email.is_none() {
            return Err(ApiError::invalid("email", "This field is required."));
        }
        if payload.password.is_none() {
            return Err(ApiError::invalid("password", "This field is required."));
        }
    }

    let mut tx = store.begin().await?;
    let mut user = tx
        .find_user(session.user_id)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    if let Some(email) = &payload.email {
        user.email = validate_email(email)?;
    }
    if let Some(name) = &payload.name {
        user.name = match name.trim() {
            "" => String::new(),
            name => clean_text("name", name)?,
        };
    }
    if let Some(password) = &payload.password {
        validate_password(password)?;
        user.password = hash_password(password)?;
    }

    tx.update_user(&user).await.map_err(email_taken)?;
    tx.commit().await?;

    log::info!("Updated profile of user {}", user.id);
    Ok(UserProfile::from(&user))
}
