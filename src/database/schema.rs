use rust_decimal::Decimal;
use serde::Serialize;

pub type Uuid = i32;

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// A user row that has not been stored yet. `password` is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.to_owned(),
            email: user.email.to_owned(),
        }
    }
}

/// Tags and ingredients share one shape; the kind selects the tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    pub fn table(&self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(&self) -> &'static str {
        match self {
            LabelKind::Tag => "recipe_tags",
            LabelKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(&self) -> &'static str {
        match self {
            LabelKind::Tag => "tag_id",
            LabelKind::Ingredient => "ingredient_id",
        }
    }

    /// Payload key of this kind inside a recipe.
    pub fn field(&self) -> &'static str {
        self.table()
    }

    pub fn name(&self) -> &'static str {
        match self {
            LabelKind::Tag => "tag",
            LabelKind::Ingredient => "ingredient",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Label {
    pub id: Uuid,
    pub name: String,
    #[serde(skip)]
    pub user_id: Uuid,
}

/// A label joined with the recipe it is attached to.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct LinkedLabel {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
}

impl From<LinkedLabel> for Label {
    fn from(value: LinkedLabel) -> Self {
        Self {
            id: value.id,
            name: value.name,
            user_id: value.user_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

impl Recipe {
    pub fn fields(&self) -> RecipeFields {
        RecipeFields {
            title: self.title.to_owned(),
            description: self.description.to_owned(),
            time_minutes: self.time_minutes,
            price: self.price,
            link: self.link.to_owned(),
        }
    }

    pub fn assign(&mut self, fields: RecipeFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.time_minutes = fields.time_minutes;
        self.price = fields.price;
        self.link = fields.link;
    }
}

/// Scalar fields of a recipe, as inserted or updated.
#[derive(Clone, Debug, PartialEq)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<Uuid>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: LabelKind) -> Option<&[Uuid]> {
        match kind {
            LabelKind::Tag => self.tags.as_deref(),
            LabelKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecipeRow {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<Label>,
    pub ingredients: Vec<Label>,
}

impl RecipeRow {
    pub fn new(recipe: &Recipe, tags: Vec<Label>, ingredients: Vec<Label>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.to_owned(),
            tags,
            ingredients,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub row: RecipeRow,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecipeImage {
    pub id: Uuid,
    pub image: Option<String>,
}
