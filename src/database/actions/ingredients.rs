use sqlx::{Pool, Postgres};

use crate::database::dto::{ImportReport, NewIngredient};
use crate::database::error::Error;
use crate::database::schema::Ingredient;

/// Read-only listing with optional prefix search by name.
pub async fn list_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let list: Vec<Ingredient> = match prefix {
        Some(prefix) => {
            sqlx::query_as(
                "
                SELECT * FROM ingredients
                WHERE name ILIKE $1 || '%'
                ORDER BY name, measurement_unit
            ",
            )
            .bind(prefix)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, measurement_unit")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(list)
}

pub async fn get_ingredient(id: i32, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Bulk import: entries clashing with an existing (name, measurement_unit)
/// pair are skipped and reported by name, the rest are inserted.
pub async fn import_ingredients(
    entries: Vec<NewIngredient>,
    pool: &Pool<Postgres>,
) -> Result<ImportReport, Error> {
    let mut imported = 0;
    let mut skipped = vec![];

    for entry in entries {
        let query = sqlx::query(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING;
        ",
        )
        .bind(&entry.name)
        .bind(&entry.measurement_unit)
        .execute(pool)
        .await?;

        if query.rows_affected() > 0 {
            imported += 1;
        } else {
            skipped.push(entry.name);
        }
    }

    Ok(ImportReport { imported, skipped })
}
