use async_trait::async_trait;

use crate::{
    error::StoreError,
    permissions::Owner,
    schema::{Label, LabelKind, LinkedLabel, NewUser, Recipe, RecipeFields, RecipeFilter, User, Uuid},
};

/// Persistent storage. All access happens inside a [`Transaction`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// A unit of work against the store. Changes become visible only after
/// [`Transaction::commit`]; dropping the transaction discards them.
///
/// Unique keys (user email, label name per owner) are reported as
/// [`StoreError::Conflict`].
#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError>;
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Labels of one owner, ordered by name descending.
    async fn list_labels(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        assigned_only: bool,
    ) -> Result<Vec<Label>, StoreError>;
    async fn find_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
    ) -> Result<Option<Label>, StoreError>;
    async fn find_label_by_name(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        name: &str,
    ) -> Result<Option<Label>, StoreError>;
    async fn insert_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        name: &str,
    ) -> Result<Label, StoreError>;
    async fn rename_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
        name: &str,
    ) -> Result<Option<Label>, StoreError>;
    async fn delete_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Recipes of one owner, newest first.
    async fn list_recipes(
        &mut self,
        owner: &Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, StoreError>;
    async fn find_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<Option<Recipe>, StoreError>;
    /// Like `find_recipe`, but holds the row until the transaction ends so
    /// concurrent writers of the same recipe queue up.
    async fn lock_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<Option<Recipe>, StoreError>;
    async fn insert_recipe(
        &mut self,
        owner: &Owner,
        fields: &RecipeFields,
    ) -> Result<Recipe, StoreError>;
    /// Writes every column except the owner, which never changes.
    async fn update_recipe(&mut self, owner: &Owner, recipe: &Recipe) -> Result<(), StoreError>;
    async fn delete_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<bool, StoreError>;

    /// Labels attached to any of the given recipes, ordered by label id.
    async fn recipe_labels(
        &mut self,
        kind: LabelKind,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<LinkedLabel>, StoreError>;
    /// Replaces the labels of one kind attached to a recipe.
    async fn set_recipe_labels(
        &mut self,
        kind: LabelKind,
        recipe_id: Uuid,
        label_ids: &[Uuid],
    ) -> Result<(), StoreError>;
}
