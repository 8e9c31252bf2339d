use std::collections::HashMap;

use crate::{
    actions::labels::resolve_labels,
    error::ApiError,
    form::{LabelPayload, RecipePayload},
    media::MediaStore,
    permissions::{owned, Owner},
    schema::{Label, LabelKind, Recipe, RecipeDetail, RecipeFilter, RecipeImage, RecipeRow, Uuid},
    store::{Store, Transaction},
};

/// Labels of one kind attached to the given recipes, grouped per recipe.
async fn load_labels(
    tx: &mut dyn Transaction,
    kind: LabelKind,
    recipe_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Label>>, ApiError> {
    let mut hashmap: HashMap<Uuid, Vec<Label>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(hashmap);
    }

    tx.recipe_labels(kind, recipe_ids)
        .await?
        .into_iter()
        .for_each(|row| hashmap.entry(row.recipe_id).or_default().push(row.into()));

    Ok(hashmap)
}

async fn detail(
    tx: &mut dyn Transaction,
    recipe: Recipe,
    media: &MediaStore,
) -> Result<RecipeDetail, ApiError> {
    let ids = [recipe.id];
    let tags = load_labels(tx, LabelKind::Tag, &ids)
        .await?
        .remove(&recipe.id)
        .unwrap_or_default();
    let ingredients = load_labels(tx, LabelKind::Ingredient, &ids)
        .await?
        .remove(&recipe.id)
        .unwrap_or_default();

    Ok(RecipeDetail {
        row: RecipeRow::new(&recipe, tags, ingredients),
        image: recipe.image.as_deref().map(|reference| media.url(reference)),
        description: recipe.description,
    })
}

/// Applies the nested label list of one kind, if the payload carries one.
/// An empty list clears the associations; a missing one leaves them alone.
async fn attach_labels(
    tx: &mut dyn Transaction,
    owner: &Owner,
    recipe_id: Uuid,
    kind: LabelKind,
    entries: Option<&[LabelPayload]>,
) -> Result<(), ApiError> {
    let Some(entries) = entries else {
        return Ok(());
    };

    let labels = resolve_labels(tx, owner, kind, entries).await?;
    let ids: Vec<Uuid> = labels.iter().map(|label| label.id).collect();
    tx.set_recipe_labels(kind, recipe_id, &ids).await?;

    Ok(())
}

pub async fn list_recipes(
    owner: &Owner,
    filter: &RecipeFilter,
    store: &dyn Store,
) -> Result<Vec<RecipeRow>, ApiError> {
    let mut tx = store.begin().await?;
    let recipes = tx.list_recipes(owner, filter).await?;

    let ids: Vec<Uuid> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut tags = load_labels(&mut *tx, LabelKind::Tag, &ids).await?;
    let mut ingredients = load_labels(&mut *tx, LabelKind::Ingredient, &ids).await?;

    Ok(recipes
        .iter()
        .map(|recipe| {
            RecipeRow::new(
                recipe,
                tags.remove(&recipe.id).unwrap_or_default(),
                ingredients.remove(&recipe.id).unwrap_or_default(),
            )
        })
        .collect())
}

pub async fn get_recipe(
    owner: &Owner,
    id: Uuid,
    store: &dyn Store,
    media: &MediaStore,
) -> Result<RecipeDetail, ApiError> {
    let mut tx = store.begin().await?;
    let recipe = owned(tx.find_recipe(owner, id).await?)?;

    detail(&mut *tx, recipe, media).await
}

/// Creates a recipe for `owner` together with its nested tags and
/// ingredients, all in one transaction.
pub async fn create_recipe(
    owner: &Owner,
    payload: RecipePayload,
    store: &dyn Store,
    media: &MediaStore,
) -> Result<RecipeDetail, ApiError> {
    let fields = payload.to_fields()?;

    let mut tx = store.begin().await?;
    let recipe = tx.insert_recipe(owner, &fields).await?;
    attach_labels(&mut *tx, owner, recipe.id, LabelKind::Tag, payload.tags.as_deref()).await?;
    attach_labels(
        &mut *tx,
        owner,
        recipe.id,
        LabelKind::Ingredient,
        payload.ingredients.as_deref(),
    )
    .await?;

    let detail = detail(&mut *tx, recipe, media).await?;
    tx.commit().await?;

    log::info!("Created recipe {} for user {}", detail.row.id, owner.id());
    Ok(detail)
}

/// Updates the fields present in `payload`. A full update additionally
/// requires every mandatory field. The owner is never changed.
pub async fn update_recipe(
    owner: &Owner,
    id: Uuid,
    payload: RecipePayload,
    full: bool,
    store: &dyn Store,
    media: &MediaStore,
) -> Result<RecipeDetail, ApiError> {
    let mut tx = store.begin().await?;
    let mut recipe = owned(tx.find_recipe(owner, id).await?)?;

    if full {
        payload.require_full()?;
    }
    let mut fields = recipe.fields();
    payload.apply(&mut fields)?;
    recipe.assign(fields);

    tx.update_recipe(owner, &recipe).await?;
    attach_labels(&mut *tx, owner, recipe.id, LabelKind::Tag, payload.tags.as_deref()).await?;
    attach_labels(
        &mut *tx,
        owner,
        recipe.id,
        LabelKind::Ingredient,
        payload.ingredients.as_deref(),
    )
    .await?;

    let detail = detail(&mut *tx, recipe, media).await?;
    tx.commit().await?;

    Ok(detail)
}

/// Deletes a recipe and its associations. Tags and ingredients stay.
pub async fn delete_recipe(
    owner: &Owner,
    id: Uuid,
    store: &dyn Store,
    media: &MediaStore,
) -> Result<(), ApiError> {
    let mut tx = store.begin().await?;
    let recipe = owned(tx.find_recipe(owner, id).await?)?;
    tx.delete_recipe(owner, id).await?;
    tx.commit().await?;

    if let Some(image) = recipe.image {
        media.remove(&image).await;
    }

    log::info!("Deleted recipe {id} of user {}", owner.id());
    Ok(())
}

async fn save_recipe(
    mut tx: Box<dyn Transaction>,
    owner: &Owner,
    recipe: &Recipe,
) -> Result<(), ApiError> {
    tx.update_recipe(owner, recipe).await?;
    tx.commit().await?;

    Ok(())
}

/// Stores `bytes` as the recipe's image. Nothing changes unless the bytes
/// decode as an image.
pub async fn upload_recipe_image(
    owner: &Owner,
    id: Uuid,
    bytes: &[u8],
    store: &dyn Store,
    media: &MediaStore,
) -> Result<RecipeImage, ApiError> {
    let mut tx = store.begin().await?;
    let mut recipe = owned(tx.lock_recipe(owner, id).await?)?;

    let reference = media.save_recipe_image(bytes).await?;
    let previous = recipe.image.replace(reference.to_owned());

    if let Err(e) = save_recipe(tx, owner, &recipe).await {
        media.remove(&reference).await;
        return Err(e);
    }
    if let Some(previous) = previous {
        media.remove(&previous).await;
    }

    log::info!("Attached image {reference} to recipe {id}");
    Ok(RecipeImage {
        id: recipe.id,
        image: Some(media.url(&reference)),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use temp_dir::TempDir;

    use super::*;
    use crate::memory::MemoryStore;

    fn payload(value: serde_json::Value) -> RecipePayload {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> RecipePayload {
        payload(json!({
            "title": "Sample recipe",
            "time_minutes": 22,
            "price": "5.25",
            "description": "Sample description",
            "link": "http://example.com/recipe.pdf",
        }))
    }

    fn names(labels: &[Label]) -> Vec<&str> {
        labels.iter().map(|label| label.name.as_str()).collect()
    }

    #[tokio::test]
    async fn created_recipe_belongs_to_owner() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);

        let detail = create_recipe(&owner, sample(), &store, &media).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let recipe = tx.find_recipe(&owner, detail.row.id).await.unwrap().unwrap();
        assert_eq!(recipe.user_id, owner.id());
        assert_eq!(recipe.price, Decimal::new(525, 2));
        assert_eq!(detail.image, None);
    }

    #[tokio::test]
    async fn nested_tags_are_created_and_reused() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);

        let mut tx = store.begin().await.unwrap();
        let indian = tx.insert_label(LabelKind::Tag, &owner, "Indian").await.unwrap();
        tx.commit().await.unwrap();

        let mut recipe = sample();
        recipe.tags = Some(vec![
            LabelPayload { name: String::from("Indian") },
            LabelPayload { name: String::from("Dinner") },
        ]);
        let detail = create_recipe(&owner, recipe, &store, &media).await.unwrap();

        assert_eq!(detail.row.tags.len(), 2);
        assert!(detail.row.tags.contains(&indian));
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.list_labels(LabelKind::Tag, &owner, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_list_clears_and_missing_list_keeps() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);

        let mut recipe = sample();
        recipe.ingredients = Some(vec![LabelPayload { name: String::from("Salt") }]);
        recipe.tags = Some(vec![LabelPayload { name: String::from("Lunch") }]);
        let id = create_recipe(&owner, recipe, &store, &media).await.unwrap().row.id;

        let detail = update_recipe(&owner, id, payload(json!({ "tags": [] })), false, &store, &media)
            .await
            .unwrap();

        assert!(detail.row.tags.is_empty());
        assert_eq!(names(&detail.row.ingredients), vec!["Salt"]);
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.list_labels(LabelKind::Tag, &owner, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn full_update_requires_mandatory_fields() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);
        let id = create_recipe(&owner, sample(), &store, &media).await.unwrap().row.id;

        let result = update_recipe(
            &owner,
            id,
            payload(json!({ "title": "New title" })),
            true,
            &store,
            &media,
        )
        .await;

        assert!(matches!(
            result,
            Err(ApiError::Validation {
                field: Some("time_minutes"),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn other_owners_recipe_is_not_found() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);
        let other = Owner::new(2);
        let id = create_recipe(&other, sample(), &store, &media).await.unwrap().row.id;

        assert!(matches!(
            get_recipe(&owner, id, &store, &media).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            delete_recipe(&owner, id, &store, &media).await,
            Err(ApiError::NotFound)
        ));
        assert!(get_recipe(&other, id, &store, &media).await.is_ok());
    }

    #[tokio::test]
    async fn filter_matches_any_listed_tag() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);

        let mut vegan = sample();
        vegan.tags = Some(vec![LabelPayload { name: String::from("Vegan") }]);
        let vegan = create_recipe(&owner, vegan, &store, &media).await.unwrap();
        create_recipe(&owner, sample(), &store, &media).await.unwrap();

        let filter = RecipeFilter {
            tags: Some(vec![vegan.row.tags[0].id]),
            ingredients: None,
        };
        let rows = list_recipes(&owner, &filter, &store).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, vegan.row.id);
    }

    #[tokio::test]
    async fn invalid_upload_leaves_recipe_untouched() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);
        let id = create_recipe(&owner, sample(), &store, &media).await.unwrap().row.id;

        let result = upload_recipe_image(&owner, id, b"notanimage", &store, &media).await;

        assert!(matches!(
            result,
            Err(ApiError::Validation {
                field: Some("image"),
                ..
            })
        ));
        let detail = get_recipe(&owner, id, &store, &media).await.unwrap();
        assert_eq!(detail.image, None);
    }

    #[tokio::test]
    async fn replaced_image_is_removed() {
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(dir.path(), "media");
        let store = MemoryStore::new();
        let owner = Owner::new(1);
        let id = create_recipe(&owner, sample(), &store, &media).await.unwrap().row.id;

        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        upload_recipe_image(&owner, id, &png, &store, &media).await.unwrap();
        let first = {
            let mut tx = store.begin().await.unwrap();
            tx.lock_recipe(&owner, id).await.unwrap().unwrap().image.unwrap()
        };
        upload_recipe_image(&owner, id, &png, &store, &media).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let second = tx.find_recipe(&owner, id).await.unwrap().unwrap().image.unwrap();
        assert_ne!(first, second);
        assert!(!dir.path().join(&first).exists());
        assert!(dir.path().join(&second).exists());
    }
}
