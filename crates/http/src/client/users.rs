//! User administration and profile client methods

use super::{ApiRequest, CanteenClient, ClientError};
use crate::types::{
    AddAllergyRequest, AdminUpdateUserRequest, Ingredient, ListParams, Page, UpdateUserRequest,
    User, UserRole,
};

impl CanteenClient {
    /// List users, optionally filtered by role
    pub async fn list_users(
        &self,
        params: &ListParams,
        role: Option<UserRole>,
    ) -> Result<Page<User>, ClientError> {
        let role = role.map(|r| match r {
            UserRole::Student => "student",
            UserRole::Cook => "cook",
            UserRole::Admin => "admin",
        });
        let request = ApiRequest::get("/users")
            .paged(params, 20, 100)
            .query_opt("role", role);
        self.execute(request).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, ClientError> {
        self.execute(ApiRequest::get(format!("/users/{user_id}"))).await
    }

    /// Change role or ban state (admin only)
    pub async fn update_user_admin(
        &self,
        user_id: i64,
        update: &AdminUpdateUserRequest,
    ) -> Result<User, ClientError> {
        let request = ApiRequest::patch(format!("/users/{user_id}")).json(update)?;
        self.execute(request).await
    }

    /// Update the signed-in user's own profile
    pub async fn update_profile(&self, update: &UpdateUserRequest) -> Result<User, ClientError> {
        let request = ApiRequest::patch("/users/me").json(update)?;
        self.execute(request).await
    }

    pub async fn allergies(&self) -> Result<Vec<Ingredient>, ClientError> {
        let allergies: Option<Vec<Ingredient>> =
            self.execute(ApiRequest::get("/users/me/allergies")).await?;
        Ok(allergies.unwrap_or_default())
    }

    pub async fn add_allergy(&self, ingredient_id: i64) -> Result<Ingredient, ClientError> {
        let request =
            ApiRequest::post("/users/me/allergies").json(&AddAllergyRequest { ingredient_id })?;
        self.execute(request).await
    }

    pub async fn remove_allergy(&self, ingredient_id: i64) -> Result<(), ClientError> {
        let request = ApiRequest::delete("/users/me/allergies").query("ingredient_id", ingredient_id);
        self.execute_unit(request).await
    }
}
