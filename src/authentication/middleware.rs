use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::{constants::TOKEN_KEYWORDS, error::ApiError, jwt::SessionData, state::AppState};

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Extracts the token from an `Authorization: Token <token>` header.
/// `Bearer` is accepted as the keyword too.
fn parse_authorization(header: &str) -> Result<&str, ApiError> {
    let mut parts = header.split_whitespace();

    let keyword = parts.next().ok_or(ApiError::Unauthenticated)?;
    if !TOKEN_KEYWORDS
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(keyword))
    {
        return Err(ApiError::Unauthenticated);
    }

    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(token),
        _ => Err(ApiError::InvalidToken),
    }
}

async fn authenticate(header: Option<String>, state: AppState) -> Result<SessionData, Rejection> {
    let header = header.ok_or(ApiError::Unauthenticated)?;
    let token = parse_authorization(&header)?;
    let claims = state.tokens.verify(token)?;

    let mut tx = state.store.begin().await.map_err(ApiError::from)?;
    let user = tx
        .find_user(claims.user_id)
        .await
        .map_err(ApiError::from)?;
    drop(tx);

    match user {
        Some(user) if user.is_active => Ok(SessionData::from(&user)),
        Some(user) => {
            log::debug!("Rejected token of inactive user {}", user.id);
            Err(ApiError::InvalidToken.into())
        }
        None => Err(ApiError::InvalidToken.into()),
    }
}

/// Resolves the request's token to the user it was issued for.
pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(authenticate)
}
