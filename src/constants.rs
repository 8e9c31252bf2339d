pub const MIN_PASSWORD_LENGTH: usize = 5;
pub const MAX_FIELD_LENGTH: usize = 255;

pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";
pub const RECIPE_IMAGE_FIELD: &str = "image";

/// Keywords accepted in front of the token in the `Authorization` header.
pub const TOKEN_KEYWORDS: &[&str] = &["Token", "Bearer"];
