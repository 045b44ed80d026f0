use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::constants::SESSION_COOKIE;
use crate::database::error::Error;

use super::jwt::{verify_session, SessionData};

/// Requires a valid session cookie; rejects with 401 otherwise.
pub fn with_session() -> impl Filter<Extract = (SessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>(SESSION_COOKIE).and_then(|session: String| async move {
        verify_session(&session).map_err(warp::reject::custom)
    })
}

/// Extracts a session when present and valid, `None` for anonymous callers.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Copy {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(|session: Option<String>| {
        session.and_then(|session| verify_session(&session).ok())
    })
}

/// Missing-cookie rejections surface as an invalid session, not a 404.
pub fn recover_missing_cookie(err: &Rejection) -> Option<Error> {
    err.find::<warp::reject::MissingCookie>()
        .map(|_| Error::InvalidSession(String::from("authentication required")))
}
