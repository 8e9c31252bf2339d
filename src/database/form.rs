use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::{
    constants::{MAX_FIELD_LENGTH, MIN_PASSWORD_LENGTH, PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS},
    error::ApiError,
    schema::{RecipeFilter, RecipeFields, Uuid},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupPayload {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfilePayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct LabelPayload {
    #[serde(default)]
    pub name: String,
}

/// Body of recipe create and update requests. Keys that are absent stay
/// `None`; unknown keys such as `user` are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<LabelPayload>>,
    pub ingredients: Option<Vec<LabelPayload>>,
}

impl RecipePayload {
    /// Fields for a new recipe; title, time and price are required.
    pub fn to_fields(&self) -> Result<RecipeFields, ApiError> {
        self.require_full()?;

        let mut fields = RecipeFields {
            title: String::new(),
            description: String::new(),
            time_minutes: 0,
            price: Decimal::ZERO,
            link: String::new(),
        };
        self.apply(&mut fields)?;

        Ok(fields)
    }

    pub fn require_full(&self) -> Result<(), ApiError> {
        if self.title.is_none() {
            return Err(ApiError::invalid("title", "This field is required."));
        }
        if self.time_minutes.is_none() {
            return Err(ApiError::invalid("time_minutes", "This field is required."));
        }
        if self.price.is_none() {
            return Err(ApiError::invalid("price", "This field is required."));
        }
        Ok(())
    }

    /// Writes every present field into `fields` after validating it.
    pub fn apply(&self, fields: &mut RecipeFields) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            fields.title = clean_text("title", title)?;
        }
        if let Some(description) = &self.description {
            fields.description = description.to_owned();
        }
        if let Some(time_minutes) = self.time_minutes {
            fields.time_minutes = validate_time_minutes(time_minutes)?;
        }
        if let Some(price) = self.price {
            fields.price = validate_price(price)?;
        }
        if let Some(link) = &self.link {
            fields.link = validate_link(link)?;
        }
        Ok(())
    }
}

/// Query string of the recipe list: comma separated tag and ingredient ids.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeQuery {
    pub fn to_filter(&self) -> Result<RecipeFilter, ApiError> {
        Ok(RecipeFilter {
            tags: parse_ids("tags", self.tags.as_deref())?,
            ingredients: parse_ids("ingredients", self.ingredients.as_deref())?,
        })
    }
}

fn parse_ids(field: &'static str, value: Option<&str>) -> Result<Option<Vec<Uuid>>, ApiError> {
    let value = match value.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(value) => value,
    };

    value
        .split(',')
        .map(|id| {
            id.trim()
                .parse::<Uuid>()
                .map_err(|_| ApiError::invalid(field, format!("Invalid id \"{}\".", id.trim())))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct LabelQuery {
    pub assigned_only: Option<u8>,
}

impl LabelQuery {
    pub fn assigned_only(&self) -> bool {
        self.assigned_only.unwrap_or(0) != 0
    }
}

/// Trims surrounding whitespace and rejects blank or overlong values.
pub fn clean_text(field: &'static str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::invalid(field, "This field may not be blank."));
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(ApiError::invalid(
            field,
            format!("Ensure this field has no more than {MAX_FIELD_LENGTH} characters."),
        ));
    }
    Ok(value.to_string())
}

fn validate_time_minutes(value: i64) -> Result<i32, ApiError> {
    if value < 0 {
        return Err(ApiError::invalid(
            "time_minutes",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    i32::try_from(value).map_err(|_| ApiError::invalid("time_minutes", "Value is too large."))
}

/// Prices carry at most 5 digits, 2 of them after the decimal point.
pub fn validate_price(value: Decimal) -> Result<Decimal, ApiError> {
    if value.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(ApiError::invalid(
            "price",
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        ));
    }

    let mut price = value;
    price.rescale(PRICE_DECIMAL_PLACES);

    let limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price.abs() >= limit {
        return Err(ApiError::invalid(
            "price",
            format!("Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."),
        ));
    }
    Ok(price)
}

/// An empty link is allowed; anything else must be an http(s) URL with a host.
fn validate_link(value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(ApiError::invalid(
            "link",
            format!("Ensure this field has no more than {MAX_FIELD_LENGTH} characters."),
        ));
    }

    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);
    if !valid {
        return Err(ApiError::invalid("link", "Enter a valid URL."));
    }
    Ok(value.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::invalid(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
        ));
    }
    Ok(())
}

/// Lowercases the domain part of an address, keeping the local part as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::invalid("email", "Users must have an email address."));
    }

    let valid = match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::invalid("email", "Enter a valid email address."));
    }
    if email.chars().count() > MAX_FIELD_LENGTH {
        return Err(ApiError::invalid(
            "email",
            format!("Ensure this field has no more than {MAX_FIELD_LENGTH} characters."),
        ));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn email_domain_is_lowercased() {
        let samples = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];

        for (email, expected) in samples {
            assert_eq!(normalize_email(email), expected);
        }
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("user@").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("pw").is_err());
        assert!(validate_password("pass1").is_ok());
    }

    #[test]
    fn price_is_rescaled_to_two_places() {
        let price = validate_price(Decimal::from_str("9.9").unwrap()).unwrap();
        assert_eq!(price.to_string(), "9.90");
    }

    #[test]
    fn price_precision_is_limited() {
        assert!(validate_price(Decimal::from_str("1.999").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("1000.00").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("999.99").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("4.250").unwrap()).is_ok());
    }

    #[test]
    fn create_requires_title() {
        let payload: RecipePayload =
            serde_json::from_str(r#"{"time_minutes": 5, "price": "1.00"}"#).unwrap();

        assert!(payload.to_fields().is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload: RecipePayload = serde_json::from_str(r#"{"title": "Soup", "user": 7}"#).unwrap();

        assert_eq!(payload.title.as_deref(), Some("Soup"));
        assert!(payload.tags.is_none());
    }

    #[test]
    fn empty_tag_list_differs_from_missing() {
        let payload: RecipePayload = serde_json::from_str(r#"{"tags": []}"#).unwrap();

        assert_eq!(payload.tags.map(|tags| tags.len()), Some(0));
        assert!(payload.ingredients.is_none());
    }

    #[test]
    fn filter_ids_are_comma_separated() {
        let query = RecipeQuery {
            tags: Some(String::from("1, 2")),
            ingredients: Some(String::new()),
        };
        let filter = query.to_filter().unwrap();

        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, None);
    }

    #[test]
    fn filter_rejects_non_numeric_ids() {
        let query = RecipeQuery {
            tags: Some(String::from("1,soup")),
            ingredients: None,
        };

        assert!(matches!(
            query.to_filter(),
            Err(ApiError::Validation {
                field: Some("tags"),
                ..
            })
        ));
    }

    #[test]
    fn link_must_be_a_web_url() {
        assert_eq!(validate_link("").unwrap(), "");
        assert_eq!(
            validate_link(" https://example.com/recipe.pdf ").unwrap(),
            "https://example.com/recipe.pdf"
        );
        assert!(validate_link("not a url").is_err());
        assert!(validate_link("ftp://example.com/recipe.pdf").is_err());
        assert!(validate_link("http://").is_err());
    }
}
