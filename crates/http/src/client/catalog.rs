//! Dishes, ingredients and menus

use super::{ApiRequest, CanteenClient, ClientError, FormField};
use crate::types::{
    CreateDishRequest, CreateIngredientRequest, CreateMenuRequest, Dish, DishDetail, DishImage,
    Ingredient, ListParams, Menu, MenuDetail, Page, UpdateDishRequest, UpdateIngredientRequest,
    UpdateMenuRequest,
};
use serde::Serialize;

/// Dish create/update forms carry the JSON payload in a `dish_data` text part
fn dish_form<T: Serialize>(data: &T, image: Option<&DishImage>) -> Result<Vec<FormField>, ClientError> {
    let mut fields = vec![FormField::Text {
        name: "dish_data".to_string(),
        value: serde_json::to_string(data)?,
    }];
    if let Some(image) = image {
        fields.push(FormField::File {
            name: "image".to_string(),
            file_name: image.file_name.clone(),
            mime_type: image.mime_type.clone(),
            bytes: image.bytes.clone(),
        });
    }
    Ok(fields)
}

impl CanteenClient {
    pub async fn list_dishes(&self, params: &ListParams) -> Result<Page<Dish>, ClientError> {
        self.execute(ApiRequest::get("/dishes").paged(params, 20, 100))
            .await
    }

    pub async fn get_dish(&self, id: i64) -> Result<DishDetail, ClientError> {
        self.execute(ApiRequest::get(format!("/dishes/{id}"))).await
    }

    pub async fn create_dish(
        &self,
        dish: &CreateDishRequest,
        image: Option<&DishImage>,
    ) -> Result<Dish, ClientError> {
        let request = ApiRequest::post("/dishes").multipart(dish_form(dish, image)?);
        self.execute(request).await
    }

    pub async fn update_dish(
        &self,
        id: i64,
        update: &UpdateDishRequest,
        image: Option<&DishImage>,
    ) -> Result<DishDetail, ClientError> {
        let request = ApiRequest::patch(format!("/dishes/{id}")).multipart(dish_form(update, image)?);
        self.execute(request).await
    }

    pub async fn delete_dish(&self, id: i64) -> Result<(), ClientError> {
        self.execute_unit(ApiRequest::delete(format!("/dishes/{id}")))
            .await
    }

    pub async fn list_ingredients(&self, params: &ListParams) -> Result<Page<Ingredient>, ClientError> {
        self.execute(ApiRequest::get("/ingredients").paged(params, 50, 100))
            .await
    }

    pub async fn get_ingredient(&self, id: i64) -> Result<Ingredient, ClientError> {
        self.execute(ApiRequest::get(format!("/ingredients/{id}")))
            .await
    }

    pub async fn create_ingredient(
        &self,
        ingredient: &CreateIngredientRequest,
    ) -> Result<Ingredient, ClientError> {
        self.execute(ApiRequest::post("/ingredients").json(ingredient)?)
            .await
    }

    pub async fn update_ingredient(
        &self,
        id: i64,
        update: &UpdateIngredientRequest,
    ) -> Result<Ingredient, ClientError> {
        self.execute(ApiRequest::patch(format!("/ingredients/{id}")).json(update)?)
            .await
    }

    pub async fn delete_ingredient(&self, id: i64) -> Result<(), ClientError> {
        self.execute_unit(ApiRequest::delete(format!("/ingredients/{id}")))
            .await
    }

    pub async fn list_menus(&self) -> Result<Vec<Menu>, ClientError> {
        self.execute(ApiRequest::get("/menu")).await
    }

    pub async fn get_menu(&self, id: i64) -> Result<MenuDetail, ClientError> {
        self.execute(ApiRequest::get(format!("/menu/{id}"))).await
    }

    pub async fn create_menu(&self, menu: &CreateMenuRequest) -> Result<Menu, ClientError> {
        self.execute(ApiRequest::post("/menu").json(menu)?).await
    }

    pub async fn update_menu(
        &self,
        id: i64,
        update: &UpdateMenuRequest,
    ) -> Result<MenuDetail, ClientError> {
        self.execute(ApiRequest::patch(format!("/menu/{id}")).json(update)?)
            .await
    }

    pub async fn delete_menu(&self, id: i64) -> Result<(), ClientError> {
        self.execute_unit(ApiRequest::delete(format!("/menu/{id}")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dish_form_embeds_json_payload() {
        let dish = CreateDishRequest {
            name: "Porridge".into(),
            price: 45.0,
            ingredients: vec![],
        };
        let image = DishImage {
            file_name: "porridge.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        };

        let fields = dish_form(&dish, Some(&image)).unwrap();
        assert_eq!(fields.len(), 2);
        match &fields[0] {
            FormField::Text { name, value } => {
                assert_eq!(name, "dish_data");
                let decoded: serde_json::Value = serde_json::from_str(value).unwrap();
                assert_eq!(decoded["name"], "Porridge");
            }
            FormField::File { .. } => panic!("expected the JSON part first"),
        }
        assert!(matches!(&fields[1], FormField::File { name, .. } if name == "image"));
    }
}
