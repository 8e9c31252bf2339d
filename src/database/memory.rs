use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::StoreError,
    permissions::Owner,
    schema::{Label, LabelKind, LinkedLabel, NewUser, Recipe, RecipeFields, RecipeFilter, User, Uuid},
    store::{Store, Transaction},
};

#[derive(Clone, Default)]
struct State {
    sequences: HashMap<&'static str, Uuid>,
    users: BTreeMap<Uuid, User>,
    labels: BTreeMap<LabelKind, BTreeMap<Uuid, Label>>,
    recipes: BTreeMap<Uuid, Recipe>,
    // (kind, recipe id, label id)
    links: BTreeSet<(LabelKind, Uuid, Uuid)>,
}

impl State {
    fn next_id(&mut self, table: &'static str) -> Uuid {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn labels(&self, kind: LabelKind) -> impl Iterator<Item = &Label> {
        self.labels.get(&kind).into_iter().flat_map(|rows| rows.values())
    }

    fn labels_mut(&mut self, kind: LabelKind) -> &mut BTreeMap<Uuid, Label> {
        self.labels.entry(kind).or_default()
    }

    fn is_linked(&self, kind: LabelKind, recipe_id: Uuid, ids: &[Uuid]) -> bool {
        ids.iter()
            .any(|id| self.links.contains(&(kind, recipe_id, *id)))
    }
}

/// Store kept in process memory.
///
/// A transaction holds the store lock from `begin` until it is committed or
/// dropped and works on a private copy of the data, so transactions run one
/// at a time and a dropped transaction leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let draft = guard.clone();

        Ok(Box::new(MemoryTransaction { guard, draft }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    draft: State,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { mut guard, draft } = *self;
        *guard = draft;

        Ok(())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        if self.draft.users.values().any(|row| row.email == user.email) {
            return Err(StoreError::Conflict(String::from("users_email_key")));
        }

        let row = User {
            id: self.draft.next_id("users"),
            email: user.email.to_owned(),
            password: user.password.to_owned(),
            name: user.name.to_owned(),
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };
        self.draft.users.insert(row.id, row.clone());

        Ok(row)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.draft.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .draft
            .users
            .values()
            .find(|row| row.email == email)
            .cloned())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self
            .draft
            .users
            .values()
            .any(|row| row.id != user.id && row.email == user.email)
        {
            return Err(StoreError::Conflict(String::from("users_email_key")));
        }

        if let Some(row) = self.draft.users.get_mut(&user.id) {
            *row = user.clone();
        }
        Ok(())
    }

    async fn list_labels(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        assigned_only: bool,
    ) -> Result<Vec<Label>, StoreError> {
        let mut rows: Vec<Label> = self
            .draft
            .labels(kind)
            .filter(|label| owner.owns(label.user_id))
            .filter(|label| {
                !assigned_only
                    || self
                        .draft
                        .links
                        .iter()
                        .any(|(k, _, id)| *k == kind && *id == label.id)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name));

        Ok(rows)
    }

    async fn find_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
    ) -> Result<Option<Label>, StoreError> {
        Ok(self
            .draft
            .labels(kind)
            .find(|label| label.id == id && owner.owns(label.user_id))
            .cloned())
    }

    async fn find_label_by_name(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        name: &str,
    ) -> Result<Option<Label>, StoreError> {
        Ok(self
            .draft
            .labels(kind)
            .find(|label| label.name == name && owner.owns(label.user_id))
            .cloned())
    }

    async fn insert_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        name: &str,
    ) -> Result<Label, StoreError> {
        if self.find_label_by_name(kind, owner, name).await?.is_some() {
            return Err(StoreError::Conflict(format!("{}_user_id_name_key", kind.table())));
        }

        let label = Label {
            id: self.draft.next_id(kind.table()),
            name: name.to_string(),
            user_id: owner.id(),
        };
        self.draft.labels_mut(kind).insert(label.id, label.clone());

        Ok(label)
    }

    async fn rename_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
        name: &str,
    ) -> Result<Option<Label>, StoreError> {
        if let Some(existing) = self.find_label_by_name(kind, owner, name).await? {
            if existing.id != id {
                return Err(StoreError::Conflict(format!("{}_user_id_name_key", kind.table())));
            }
        }

        Ok(self
            .draft
            .labels_mut(kind)
            .get_mut(&id)
            .filter(|label| owner.owns(label.user_id))
            .map(|label| {
                label.name = name.to_string();
                label.clone()
            }))
    }

    async fn delete_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        if self.find_label(kind, owner, id).await?.is_none() {
            return Ok(false);
        }

        self.draft.labels_mut(kind).remove(&id);
        self.draft
            .links
            .retain(|(k, _, label_id)| !(*k == kind && *label_id == id));

        Ok(true)
    }

    async fn list_recipes(
        &mut self,
        owner: &Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, StoreError> {
        let state = &self.draft;

        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|recipe| owner.owns(recipe.user_id))
            .filter(|recipe| {
                [LabelKind::Tag, LabelKind::Ingredient]
                    .into_iter()
                    .all(|kind| match filter.ids(kind) {
                        Some(ids) => state.is_linked(kind, recipe.id, ids),
                        None => true,
                    })
            })
            .cloned()
            .collect())
    }

    async fn find_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        Ok(self
            .draft
            .recipes
            .get(&id)
            .filter(|recipe| owner.owns(recipe.user_id))
            .cloned())
    }

    async fn lock_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        // The store lock already serializes transactions.
        self.find_recipe(owner, id).await
    }

    async fn insert_recipe(
        &mut self,
        owner: &Owner,
        fields: &RecipeFields,
    ) -> Result<Recipe, StoreError> {
        let recipe = Recipe {
            id: self.draft.next_id("recipes"),
            user_id: owner.id(),
            title: fields.title.to_owned(),
            description: fields.description.to_owned(),
            time_minutes: fields.time_minutes,
            price: fields.price,
            link: fields.link.to_owned(),
            image: None,
        };
        self.draft.recipes.insert(recipe.id, recipe.clone());

        Ok(recipe)
    }

    async fn update_recipe(&mut self, owner: &Owner, recipe: &Recipe) -> Result<(), StoreError> {
        if let Some(row) = self
            .draft
            .recipes
            .get_mut(&recipe.id)
            .filter(|row| owner.owns(row.user_id))
        {
            let user_id = row.user_id;
            *row = recipe.clone();
            row.user_id = user_id;
        }
        Ok(())
    }

    async fn delete_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<bool, StoreError> {
        if self.find_recipe(owner, id).await?.is_none() {
            return Ok(false);
        }

        self.draft.recipes.remove(&id);
        self.draft
            .links
            .retain(|(_, recipe_id, _)| *recipe_id != id);

        Ok(true)
    }

    async fn recipe_labels(
        &mut self,
        kind: LabelKind,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<LinkedLabel>, StoreError> {
        let mut rows: Vec<LinkedLabel> = self
            .draft
            .links
            .iter()
            .filter(|(k, recipe_id, _)| *k == kind && recipe_ids.contains(recipe_id))
            .filter_map(|(_, recipe_id, label_id)| {
                self.draft
                    .labels
                    .get(&kind)
                    .and_then(|rows| rows.get(label_id))
                    .map(|label| LinkedLabel {
                        recipe_id: *recipe_id,
                        id: label.id,
                        name: label.name.to_owned(),
                        user_id: label.user_id,
                    })
            })
            .collect();
        rows.sort_by_key(|row| row.id);

        Ok(rows)
    }

    async fn set_recipe_labels(
        &mut self,
        kind: LabelKind,
        recipe_id: Uuid,
        label_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        self.draft
            .links
            .retain(|(k, id, _)| !(*k == kind && *id == recipe_id));
        for label_id in label_ids {
            self.draft.links.insert((kind, recipe_id, *label_id));
        }

        Ok(())
    }
}
