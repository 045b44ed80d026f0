use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::Error;
use crate::database::schema::User;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl SessionData {
    pub fn new(id: i32, email: String) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(24)).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }
}

fn signing_key() -> Hmac<Sha256> {
    let secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| String::from("secret"));
    Hmac::new_from_slice(secret.as_bytes()).unwrap()
}

pub fn generate_session(user: &User) -> String {
    let claims = SessionData::new(user.id, user.email.to_owned());

    claims.sign_with_key(&signing_key()).unwrap()
}

pub fn verify_session(token: &str) -> Result<SessionData, Error> {
    token
        .verify_with_key(&signing_key())
        .map_err(|_| Error::InvalidSession(String::from("invalid session token")))
        .map(|session: SessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(Error::InvalidSession(String::from("session expired")));
            }
            Ok(session)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Test"),
            last_name: String::from("Cook"),
            password: String::new(),
        }
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let token = generate_session(&user());
        let session = verify_session(&token).unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.email, "cook@example.com");
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_session("not-a-token").is_err());
    }
}
