use std::collections::HashSet;

use crate::{
    error::{ApiError, StoreError},
    form::{clean_text, LabelPayload},
    permissions::{owned, Owner},
    schema::{Label, LabelKind, Uuid},
    store::{Store, Transaction},
};

fn name_taken(kind: LabelKind, e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict(_) => ApiError::invalid(
            "name",
            format!("A {} with this name already exists.", kind.name()),
        ),
        e => e.into(),
    }
}

pub async fn list_labels(
    kind: LabelKind,
    owner: &Owner,
    assigned_only: bool,
    store: &dyn Store,
) -> Result<Vec<Label>, ApiError> {
    let mut tx = store.begin().await?;
    let rows = tx.list_labels(kind, owner, assigned_only).await?;

    Ok(rows)
}

pub async fn create_label(
    kind: LabelKind,
    owner: &Owner,
    payload: LabelPayload,
    store: &dyn Store,
) -> Result<Label, ApiError> {
    let name = clean_text("name", &payload.name)?;

    let mut tx = store.begin().await?;
    let label = tx
        .insert_label(kind, owner, &name)
        .await
        .map_err(|e| name_taken(kind, e))?;
    tx.commit().await?;

    log::info!("Created {} {} for user {}", kind.name(), label.id, owner.id());
    Ok(label)
}

pub async fn get_label(
    kind: LabelKind,
    owner: &Owner,
    id: Uuid,
    store: &dyn Store,
) -> Result<Label, ApiError> {
    let mut tx = store.begin().await?;

    owned(tx.find_label(kind, owner, id).await?)
}

/// Renames a label. Only the name can change.
pub async fn update_label(
    kind: LabelKind,
    owner: &Owner,
    id: Uuid,
    payload: LabelPayload,
    store: &dyn Store,
) -> Result<Label, ApiError> {
    let mut tx = store.begin().await?;
    owned(tx.find_label(kind, owner, id).await?)?;

    let name = clean_text("name", &payload.name)?;
    let label = tx
        .rename_label(kind, owner, id, &name)
        .await
        .map_err(|e| name_taken(kind, e))?;
    let label = owned(label)?;
    tx.commit().await?;

    Ok(label)
}

/// Deletes a label and detaches it from every recipe.
pub async fn delete_label(
    kind: LabelKind,
    owner: &Owner,
    id: Uuid,
    store: &dyn Store,
) -> Result<(), ApiError> {
    let mut tx = store.begin().await?;
    if !tx.delete_label(kind, owner, id).await? {
        return Err(ApiError::NotFound);
    }
    tx.commit().await?;

    log::info!("Deleted {} {id} of user {}", kind.name(), owner.id());
    Ok(())
}

/// Turns the names embedded in a recipe payload into label rows of `owner`.
///
/// A name the owner already uses is reused as is; any other name gets a new
/// row. Repeated names resolve to one row. The result keeps the order in
/// which names first appear.
pub async fn resolve_labels(
    tx: &mut dyn Transaction,
    owner: &Owner,
    kind: LabelKind,
    entries: &[LabelPayload],
) -> Result<Vec<Label>, ApiError> {
    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(entries.len());

    for entry in entries {
        let name = clean_text("name", &entry.name).map_err(|_| {
            ApiError::invalid(kind.field(), format!("Every {} needs a name.", kind.name()))
        })?;
        if !seen.insert(name.to_owned()) {
            continue;
        }

        let label = match tx.find_label_by_name(kind, owner, &name).await? {
            Some(label) => label,
            None => {
                log::debug!("Creating {} '{name}' for user {}", kind.name(), owner.id());
                tx.insert_label(kind, owner, &name)
                    .await
                    .map_err(|e| name_taken(kind, e))?
            }
        };
        labels.push(label);
    }

    Ok(labels)
}
