//! Catalog records.
//!
//! [`Meal`] is the catalog entry as stored and served by the catalog API.
//! [`MealDraft`] and [`MealPatch`] are the create/update inputs; they are
//! validated here, at the catalog boundary, so nothing downstream (the cart
//! included) has to re-check record shape. [`CartItem`] is the slim record
//! the cart keeps per line.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{MealId, Price};

/// Maximum length of a meal name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

/// Errors raised while validating catalog input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MealError {
    /// A required text field is empty or whitespace.
    #[error("{field} cannot be blank")]
    Blank {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A text field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// The image is not an absolute http(s) URL.
    #[error("image must be an http(s) URL: {0}")]
    InvalidImageUrl(String),
    /// The category is not one of [`MealCategory::ALL`].
    #[error("unknown meal category: {0}")]
    UnknownCategory(String),
    /// An update carried no fields.
    #[error("update must change at least one field")]
    EmptyPatch,
}

/// Dietary/menu category of a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum MealCategory {
    #[serde(rename = "Veg")]
    Veg,
    #[serde(rename = "Non-Veg")]
    NonVeg,
    #[serde(rename = "Vegan")]
    Vegan,
    #[serde(rename = "Gluten-Free")]
    GlutenFree,
    #[serde(rename = "Keto")]
    Keto,
    #[serde(rename = "Dessert")]
    Dessert,
    #[serde(rename = "Drinks")]
    Drinks,
    #[serde(rename = "Seafood")]
    Seafood,
    #[serde(rename = "Snacks")]
    Snacks,
    #[serde(rename = "Breakfast")]
    Breakfast,
}

impl MealCategory {
    /// Every category, in menu order.
    pub const ALL: [Self; 10] = [
        Self::Veg,
        Self::NonVeg,
        Self::Vegan,
        Self::GlutenFree,
        Self::Keto,
        Self::Dessert,
        Self::Drinks,
        Self::Seafood,
        Self::Snacks,
        Self::Breakfast,
    ];

    /// Canonical display/storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Veg => "Veg",
            Self::NonVeg => "Non-Veg",
            Self::Vegan => "Vegan",
            Self::GlutenFree => "Gluten-Free",
            Self::Keto => "Keto",
            Self::Dessert => "Dessert",
            Self::Drinks => "Drinks",
            Self::Seafood => "Seafood",
            Self::Snacks => "Snacks",
            Self::Breakfast => "Breakfast",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealCategory {
    type Err = MealError;

    /// Case-insensitive; `non-veg` and `NON-VEG` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MealError::UnknownCategory(s.to_owned()))
    }
}

impl TryFrom<String> for MealCategory {
    type Error = MealError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for MealCategory {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for MealCategory {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for MealCategory {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: MealId,
    pub name: String,
    pub cuisine: String,
    pub category: MealCategory,
    pub price: Price,
    /// Absolute URL of the meal photo.
    pub image: String,
    pub description: String,
    pub ingredients: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a meal. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDraft {
    pub name: String,
    pub cuisine: String,
    pub category: MealCategory,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub ingredients: String,
}

impl MealDraft {
    /// Validate and normalize (trim) the draft.
    ///
    /// # Errors
    ///
    /// Returns the first `MealError` found, checking fields in declaration order.
    pub fn validate(self) -> Result<Self, MealError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            cuisine: required("cuisine", &self.cuisine)?,
            category: self.category,
            price: self.price,
            image: validate_image(&self.image)?,
            description: required("description", &self.description)?,
            ingredients: required("ingredients", &self.ingredients)?,
        })
    }
}

/// Partial update for a meal. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MealPatch {
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub category: Option<MealCategory>,
    pub price: Option<Price>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<String>,
}

impl MealPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.cuisine.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.image.is_none()
            && self.description.is_none()
            && self.ingredients.is_none()
    }

    /// Validate and normalize the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns `MealError::EmptyPatch` if no field is set, otherwise the
    /// same errors as [`MealDraft::validate`] for the present fields.
    pub fn validate(self) -> Result<Self, MealError> {
        if self.is_empty() {
            return Err(MealError::EmptyPatch);
        }

        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            cuisine: self
                .cuisine
                .as_deref()
                .map(|v| required("cuisine", v))
                .transpose()?,
            category: self.category,
            price: self.price,
            image: self.image.as_deref().map(validate_image).transpose()?,
            description: self
                .description
                .as_deref()
                .map(|v| required("description", v))
                .transpose()?,
            ingredients: self
                .ingredients
                .as_deref()
                .map(|v| required("ingredients", v))
                .transpose()?,
        })
    }
}

/// What the cart keeps for each line: identity and price, plus whatever
/// display fields the caller had at hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: MealId,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// A cart item with no display fields.
    #[must_use]
    pub const fn new(id: MealId, price: Price) -> Self {
        Self {
            id,
            price,
            name: None,
            cuisine: None,
            image: None,
        }
    }
}

impl From<Meal> for CartItem {
    fn from(meal: Meal) -> Self {
        Self {
            id: meal.id,
            price: meal.price,
            name: Some(meal.name),
            cuisine: Some(meal.cuisine),
            image: Some(meal.image),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, MealError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MealError::Blank { field });
    }
    Ok(value.to_owned())
}

fn validate_name(value: &str) -> Result<String, MealError> {
    let name = required("name", value)?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(MealError::TooLong {
            field: "name",
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name)
}

fn validate_image(value: &str) -> Result<String, MealError> {
    let value = required("image", value)?;
    let url = Url::parse(&value).map_err(|e| MealError::InvalidImageUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MealError::InvalidImageUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    Ok(value)
}
