use std::convert::Infallible;

use sqlx::{Pool, Postgres};
use warp::http::{header, StatusCode};
use warp::{reply, Rejection, Reply};

use crate::authentication::cryptography::hash_password;
use crate::authentication::jwt::SessionData;
use crate::authentication::middleware::recover_missing_cookie;
use crate::constants::{SESSION_COOKIE, SHOPPING_LIST_FILENAME};
use crate::database::actions::recipes::RecipeFilters;
use crate::database::actions::{ingredients, recipes, relations, tags, users};
use crate::database::dto::{Credentials, NewIngredient, NewRecipe, NewUser, TinyRecipe};
use crate::database::error::Error;
use crate::database::pagination::PageContext;
use crate::database::schema::Recipe;
use crate::database::shopping_list;

type Pairs = Vec<(String, String)>;

fn pair<'a>(pairs: &'a Pairs, key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Query shape of the recipe listing. Repeated `tags` keys accumulate;
/// unparsable numbers are treated as absent.
#[derive(Debug, Default)]
pub struct RecipeListQuery {
    pub offset: i64,
    pub author: Option<i32>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeListQuery {
    pub fn from_pairs(pairs: &Pairs) -> Self {
        Self {
            offset: pair(pairs, "offset").and_then(|v| v.parse().ok()).unwrap_or(0),
            author: pair(pairs, "author").and_then(|v| v.parse().ok()),
            tags: pairs
                .iter()
                .filter(|(name, _)| name == "tags")
                .map(|(_, value)| value.clone())
                .collect(),
            is_favorited: pair(pairs, "is_favorited") == Some("1"),
            is_in_shopping_cart: pair(pairs, "is_in_shopping_cart") == Some("1"),
        }
    }
}

async fn lookup_recipe(id: i32, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    recipes::get_recipe(id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no recipe with id {id}")))
}

pub async fn list_recipes(
    pairs: Pairs,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let query = RecipeListQuery::from_pairs(&pairs);
    let viewer = session.as_ref().map(|s| s.user_id);

    // The viewer-bound flags only make sense with a session; anonymous
    // callers get the unfiltered listing, as the original did.
    let filters = RecipeFilters {
        author: query.author,
        tag_slugs: query.tags,
        favorited_by: if query.is_favorited { viewer } else { None },
        in_cart_of: if query.is_in_shopping_cart { viewer } else { None },
    };

    let page = recipes::fetch_recipes(&filters, query.offset, &pool).await?;

    let PageContext {
        rows,
        total_rows,
        next_offset,
        prev_offset,
    } = page;
    let mut reads = Vec::with_capacity(rows.len());
    for row in rows {
        reads.push(recipes::get_recipe_read(row.into(), viewer, &pool).await?);
    }

    Ok(reply::json(&PageContext {
        rows: reads,
        total_rows,
        next_offset,
        prev_offset,
    }))
}

pub async fn get_recipe(
    id: i32,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = lookup_recipe(id, &pool).await?;
    let viewer = session.map(|s| s.user_id);
    let read = recipes::get_recipe_read(recipe, viewer, &pool).await?;

    Ok(reply::json(&read))
}

pub async fn create_recipe(
    session: SessionData,
    input: NewRecipe,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::create_recipe(session.user_id, &input, &pool).await?;
    log::info!("user {} created recipe {}", session.user_id, recipe.id);

    let read = recipes::get_recipe_read(recipe, Some(session.user_id), &pool).await?;
    Ok(reply::with_status(reply::json(&read), StatusCode::CREATED))
}

pub async fn update_recipe(
    id: i32,
    session: SessionData,
    input: NewRecipe,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_mut(id, &session, &pool).await?;
    let updated = recipes::update_recipe(&recipe, &input, &pool).await?;

    let read = recipes::get_recipe_read(updated, Some(session.user_id), &pool).await?;
    Ok(reply::json(&read))
}

pub async fn delete_recipe(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = recipes::get_recipe_mut(id, &session, &pool).await?;
    recipes::delete_recipe(recipe.id, &pool).await?;
    log::info!("user {} deleted recipe {}", session.user_id, recipe.id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = lookup_recipe(id, &pool).await?;
    relations::add_favorite(session.user_id, recipe.id, &pool).await?;

    Ok(reply::with_status(
        reply::json(&TinyRecipe::from(recipe)),
        StatusCode::CREATED,
    ))
}

pub async fn remove_favorite(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = lookup_recipe(id, &pool).await?;
    relations::remove_favorite(session.user_id, recipe.id, &pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_cart(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = lookup_recipe(id, &pool).await?;
    relations::add_cart_entry(session.user_id, recipe.id, &pool).await?;

    Ok(reply::with_status(
        reply::json(&TinyRecipe::from(recipe)),
        StatusCode::CREATED,
    ))
}

pub async fn remove_from_cart(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = lookup_recipe(id, &pool).await?;
    relations::remove_cart_entry(session.user_id, recipe.id, &pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_shopping_cart(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let entries = shopping_list::aggregate(session.user_id, &pool).await?;
    let document = shopping_list::render(&entries);

    let reply = reply::with_header(document, header::CONTENT_TYPE, "text/plain; charset=utf-8");
    let reply = reply::with_header(
        reply,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );
    Ok(reply)
}

pub async fn subscribe(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let author = users::get_user_by_id(&pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no user with id {id}")))?;

    relations::follow_user(session.user_id, author.id, &pool).await?;
    let read = relations::get_subscription(author, None, &pool).await?;

    Ok(reply::with_status(reply::json(&read), StatusCode::CREATED))
}

pub async fn unsubscribe(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let author = users::get_user_by_id(&pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no user with id {id}")))?;

    relations::unfollow_user(session.user_id, author.id, &pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_subscriptions(
    pairs: Pairs,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let offset = pair(&pairs, "offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let recipes_limit = pair(&pairs, "recipes_limit").and_then(|v| v.parse().ok());

    let page = relations::fetch_subscriptions(session.user_id, offset, recipes_limit, &pool).await?;
    Ok(reply::json(&page))
}

pub async fn get_user(
    id: i32,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let user = users::get_user_by_id(&pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no user with id {id}")))?;

    let viewer = session.map(|s| s.user_id);
    let read = users::get_user_read(user, viewer, &pool).await?;
    Ok(reply::json(&read))
}

pub async fn current_user(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let user = users::get_user_by_id(&pool, session.user_id)
        .await?
        .ok_or_else(|| Error::InvalidSession(String::from("user no longer exists")))?;

    let read = users::get_user_read(user, Some(session.user_id), &pool).await?;
    Ok(reply::json(&read))
}

pub async fn list_tags(pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let list = tags::list_tags(&pool).await?;
    Ok(reply::json(&list))
}

pub async fn get_tag(id: i32, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let tag = tags::get_tag(id, &pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no tag with id {id}")))?;

    Ok(reply::json(&tag))
}

pub async fn list_ingredients(pairs: Pairs, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let prefix = pair(&pairs, "name");
    let list = ingredients::list_ingredients(prefix, &pool).await?;

    Ok(reply::json(&list))
}

pub async fn get_ingredient(id: i32, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::get_ingredient(id, &pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no ingredient with id {id}")))?;

    Ok(reply::json(&ingredient))
}

pub async fn import_ingredients(
    _session: SessionData,
    entries: Vec<NewIngredient>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let report = ingredients::import_ingredients(entries, &pool).await?;
    log::info!(
        "ingredient import: {} added, {} skipped",
        report.imported,
        report.skipped.len()
    );

    Ok(reply::with_status(reply::json(&report), StatusCode::CREATED))
}

pub async fn register(input: NewUser, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let hash = hash_password(&input.password)
        .map_err(|_| Error::validation("password", "could not hash password"))?;

    let created = users::register_user(
        &input.email,
        &input.username,
        &input.first_name,
        &input.last_name,
        &hash,
        &pool,
    )
    .await?;
    if !created {
        return Err(Error::Duplicate(String::from(
            "a user with this email or username already exists",
        ))
        .into());
    }

    let user = users::get_user_by_email(&pool, &input.email)
        .await?
        .ok_or_else(|| Error::NotFound(String::from("user was not created")))?;
    let read = users::get_user_read(user, None, &pool).await?;

    Ok(reply::with_status(reply::json(&read), StatusCode::CREATED))
}

pub async fn login(input: Credentials, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let token = users::login_user(&input.email, &input.password, &pool).await?;

    let reply = reply::json(&serde_json::json!({ "auth_token": token }));
    let reply = reply::with_header(
        reply,
        header::SET_COOKIE,
        format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/"),
    );
    Ok(reply)
}

/// Maps every rejection onto the JSON error envelope; the fallthrough 500
/// is logged because it means a bug, not a client mistake.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(error) = err.find::<Error>() {
        if let Error::Query(e) = error {
            log::error!("database error: {e}");
        }
        (error.status(), error.body())
    } else if let Some(error) = recover_missing_cookie(&err) {
        (error.status(), error.body())
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "errors": "not found" }),
        )
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "errors": "malformed request body" }),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "errors": "malformed query string" }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            serde_json::json!({ "errors": "method not allowed" }),
        )
    } else {
        log::error!("unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "errors": "internal server error" }),
        )
    };

    Ok(reply::with_status(reply::json(&body), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Pairs {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn recipe_query_collects_repeated_tags() {
        let query = RecipeListQuery::from_pairs(&pairs(&[
            ("tags", "breakfast"),
            ("tags", "vegan"),
            ("author", "3"),
        ]));
        assert_eq!(query.tags, vec!["breakfast", "vegan"]);
        assert_eq!(query.author, Some(3));
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn recipe_query_flags_require_exact_one() {
        let query = RecipeListQuery::from_pairs(&pairs(&[
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "true"),
        ]));
        assert!(query.is_favorited);
        assert!(!query.is_in_shopping_cart);
    }

    #[test]
    fn recipe_query_ignores_junk_numbers() {
        let query =
            RecipeListQuery::from_pairs(&pairs(&[("offset", "abc"), ("author", "many")]));
        assert_eq!(query.offset, 0);
        assert_eq!(query.author, None);
    }
}
