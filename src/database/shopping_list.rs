use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::constants::SHOPPING_LIST_TITLE;
use crate::database::error::Error;

/// One consolidated line of the shopping list. Ingredients sharing a name but
/// measured in different units stay separate; there is no unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CartAmount {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Groups cart rows by (name, unit) with integer summation. The BTreeMap key
/// order gives the lexicographic (name, unit) ascending output the rendered
/// document's line numbering depends on.
pub fn consolidate(rows: impl IntoIterator<Item = CartAmount>) -> Vec<ShoppingListEntry> {
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();

    for row in rows {
        *groups
            .entry((row.name, row.measurement_unit))
            .or_insert(0) += i64::from(row.amount);
    }

    groups
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListEntry {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

/// Consolidated ingredient listing for every recipe in the user's cart.
pub async fn aggregate(user_id: i32, pool: &Pool<Postgres>) -> Result<Vec<ShoppingListEntry>, Error> {
    let rows: Vec<CartAmount> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, a.amount
        FROM cart_entries c
        INNER JOIN amounts a ON a.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = a.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(consolidate(rows))
}

/// Renders the listing as a titled, line-numbered document. Numbering starts
/// at 1 and increments per group; an empty cart yields the title alone.
pub fn render(entries: &[ShoppingListEntry]) -> String {
    let mut document = format!("{SHOPPING_LIST_TITLE}\n");

    for (line_no, entry) in entries.iter().enumerate() {
        document += &format!(
            "{}. {} - {} {}\n",
            line_no + 1,
            entry.name,
            entry.total_amount,
            entry.measurement_unit
        );
    }

    document
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartAmount {
        CartAmount {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_amounts_per_name_and_unit() {
        let entries = consolidate(vec![row("Flour", "g", 200), row("Flour", "g", 150)]);
        assert_eq!(
            entries,
            vec![ShoppingListEntry {
                name: "Flour".into(),
                measurement_unit: "g".into(),
                total_amount: 350,
            }]
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let entries = consolidate(vec![row("Sugar", "g", 100), row("Sugar", "tbsp", 2)]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].measurement_unit, "g");
        assert_eq!(entries[1].measurement_unit, "tbsp");
    }

    #[test]
    fn output_order_is_independent_of_input_order() {
        let forward = consolidate(vec![
            row("Flour", "g", 200),
            row("Sugar", "g", 100),
            row("Milk", "cups", 2),
        ]);
        let reversed = consolidate(vec![
            row("Milk", "cups", 2),
            row("Sugar", "g", 100),
            row("Flour", "g", 200),
        ]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn two_recipe_cart_scenario() {
        // R1: Flour 200g, Sugar 100g. R2: Flour 150g, Milk 2 cups.
        let entries = consolidate(vec![
            row("Flour", "g", 200),
            row("Sugar", "g", 100),
            row("Flour", "g", 150),
            row("Milk", "cups", 2),
        ]);

        let flat: Vec<(&str, &str, i64)> = entries
            .iter()
            .map(|e| (e.name.as_str(), e.measurement_unit.as_str(), e.total_amount))
            .collect();
        assert_eq!(
            flat,
            vec![("Flour", "g", 350), ("Milk", "cups", 2), ("Sugar", "g", 100)]
        );
    }

    #[test]
    fn render_numbers_groups_from_one() {
        let entries = consolidate(vec![
            row("Flour", "g", 200),
            row("Milk", "cups", 2),
            row("Flour", "g", 150),
        ]);
        let document = render(&entries);
        assert_eq!(
            document,
            format!("{SHOPPING_LIST_TITLE}\n1. Flour - 350 g\n2. Milk - 2 cups\n")
        );
    }

    #[test]
    fn empty_cart_renders_title_only() {
        let document = render(&[]);
        assert_eq!(document, format!("{SHOPPING_LIST_TITLE}\n"));
    }
}
