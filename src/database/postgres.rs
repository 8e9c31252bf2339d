use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, QueryBuilder};

use crate::{
    error::StoreError,
    permissions::Owner,
    schema::{Label, LabelKind, LinkedLabel, NewUser, Recipe, RecipeFields, RecipeFilter, User, Uuid},
    store::{Store, Transaction},
};

/// PostgreSQL backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;

        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let tx = self.pool.begin().await?;

        Ok(Box::new(PgTransaction { tx }))
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgTransaction { tx } = *self;
        tx.commit().await?;

        Ok(())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (email, password, name, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row)
    }

    async fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "
            UPDATE users
            SET email = $2, password = $3, name = $4, is_active = $5, is_staff = $6, is_superuser = $7
            WHERE id = $1
        ",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_labels(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        assigned_only: bool,
    ) -> Result<Vec<Label>, StoreError> {
        let assigned = if assigned_only {
            format!(
                "AND EXISTS (SELECT 1 FROM {} l WHERE l.{} = t.id)",
                kind.link_table(),
                kind.link_column()
            )
        } else {
            String::new()
        };

        let rows: Vec<Label> = sqlx::query_as(&format!(
            "SELECT t.* FROM {} t WHERE t.user_id = $1 {assigned} ORDER BY t.name DESC",
            kind.table()
        ))
        .bind(owner.id())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows)
    }

    async fn find_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
    ) -> Result<Option<Label>, StoreError> {
        let row: Option<Label> = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner.id())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn find_label_by_name(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        name: &str,
    ) -> Result<Option<Label>, StoreError> {
        let row: Option<Label> = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE user_id = $1 AND name = $2",
            kind.table()
        ))
        .bind(owner.id())
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn insert_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        name: &str,
    ) -> Result<Label, StoreError> {
        let row: Label = sqlx::query_as(&format!(
            "INSERT INTO {} (name, user_id) VALUES ($1, $2) RETURNING *",
            kind.table()
        ))
        .bind(name)
        .bind(owner.id())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn rename_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
        name: &str,
    ) -> Result<Option<Label>, StoreError> {
        let row: Option<Label> = sqlx::query_as(&format!(
            "UPDATE {} SET name = $1 WHERE id = $2 AND user_id = $3 RETURNING *",
            kind.table()
        ))
        .bind(name)
        .bind(id)
        .bind(owner.id())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn delete_label(
        &mut self,
        kind: LabelKind,
        owner: &Owner,
        id: Uuid,
    ) -> Result<bool, StoreError> {
        let query = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner.id())
        .execute(&mut *self.tx)
        .await?;

        Ok(query.rows_affected() > 0)
    }

    async fn list_recipes(
        &mut self,
        owner: &Owner,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT r.* FROM recipes r WHERE r.user_id = ");
        query.push_bind(owner.id());

        for kind in [LabelKind::Tag, LabelKind::Ingredient] {
            if let Some(ids) = filter.ids(kind) {
                query.push(format!(
                    " AND EXISTS (SELECT 1 FROM {} l WHERE l.recipe_id = r.id AND l.{} = ANY(",
                    kind.link_table(),
                    kind.link_column()
                ));
                query.push_bind(ids.to_vec());
                query.push("))");
            }
        }
        query.push(" ORDER BY r.id DESC");

        let rows: Vec<Recipe> = query
            .build_query_as()
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows)
    }

    async fn find_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        let row: Option<Recipe> =
            sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(owner.id())
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(row)
    }

    async fn lock_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        let row: Option<Recipe> =
            sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner.id())
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(row)
    }

    async fn insert_recipe(
        &mut self,
        owner: &Owner,
        fields: &RecipeFields,
    ) -> Result<Recipe, StoreError> {
        let row: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        ",
        )
        .bind(owner.id())
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.time_minutes)
        .bind(fields.price)
        .bind(&fields.link)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn update_recipe(&mut self, owner: &Owner, recipe: &Recipe) -> Result<(), StoreError> {
        sqlx::query(
            "
            UPDATE recipes
            SET title = $1, description = $2, time_minutes = $3, price = $4, link = $5, image = $6
            WHERE id = $7 AND user_id = $8
        ",
        )
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(&recipe.link)
        .bind(&recipe.image)
        .bind(recipe.id)
        .bind(owner.id())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_recipe(&mut self, owner: &Owner, id: Uuid) -> Result<bool, StoreError> {
        let query = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .execute(&mut *self.tx)
            .await?;

        Ok(query.rows_affected() > 0)
    }

    async fn recipe_labels(
        &mut self,
        kind: LabelKind,
        recipe_ids: &[Uuid],
    ) -> Result<Vec<LinkedLabel>, StoreError> {
        let rows: Vec<LinkedLabel> = sqlx::query_as(&format!(
            "
            SELECT l.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.user_id AS user_id
            FROM {} l
            INNER JOIN {} t ON t.id = l.{}
            WHERE l.recipe_id = ANY($1)
            ORDER BY t.id
        ",
            kind.link_table(),
            kind.table(),
            kind.link_column()
        ))
        .bind(recipe_ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows)
    }

    async fn set_recipe_labels(
        &mut self,
        kind: LabelKind,
        recipe_id: Uuid,
        label_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        sqlx::query(&format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table()))
            .bind(recipe_id)
            .execute(&mut *self.tx)
            .await?;

        if label_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(&format!(
            "
            INSERT INTO {} (recipe_id, {})
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
        ",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(label_ids.to_vec())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}
