use crate::{error::ApiError, jwt::SessionData, schema::Uuid};

/// The user a query is scoped to.
///
/// Every owner-scoped store operation takes an `Owner`, and the only way to
/// get one outside this crate is from an authenticated [`SessionData`]. Rows
/// that belong to anyone else are therefore never visible to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner(Uuid);

impl Owner {
    pub(crate) fn new(user_id: Uuid) -> Self {
        Self(user_id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }

    pub fn owns(&self, user_id: Uuid) -> bool {
        self.0 == user_id
    }
}

impl SessionData {
    pub fn owner(&self) -> Owner {
        Owner(self.user_id)
    }
}

/// Rows outside the owner's scope are reported as missing, not forbidden,
/// so their existence does not leak.
pub fn owned<T>(row: Option<T>) -> Result<T, ApiError> {
    row.ok_or(ApiError::NotFound)
}
