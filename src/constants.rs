pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 240;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 240;

pub const SHOPPING_LIST_TITLE: &str = "Список покупок";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const SESSION_COOKIE: &str = "session";
