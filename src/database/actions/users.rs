use sqlx::{Pool, Postgres};

use crate::authentication::{cryptography::verify_password, jwt::generate_session};
use crate::database::dto::UserRead;
use crate::database::error::Error;
use crate::database::schema::User;

use super::relations::is_following;

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: i32) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a user record; `password` is the argon2 hash, never the plain text.
/// Returns false when the email or username is already taken.
pub async fn register_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let query = sqlx::query(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING;
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .execute(pool)
    .await?;

    Ok(query.rows_affected() > 0)
}

pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(Error::validation("credentials", "invalid email or password")),
    };

    let authenticated = verify_password(password, &user.password)
        .map_err(|_| Error::validation("credentials", "invalid email or password"))?;
    if !authenticated {
        return Err(Error::validation("credentials", "invalid email or password"));
    }

    Ok(generate_session(&user))
}

/// Profile shape with `is_subscribed` evaluated against the viewer.
pub async fn get_user_read(
    user: User,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<UserRead, Error> {
    let is_subscribed = match viewer {
        Some(viewer) => is_following(viewer, user.id, pool).await?,
        None => false,
    };

    Ok(UserRead::from_user(user, is_subscribed))
}
