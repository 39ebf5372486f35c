//! Orders, procurement applications and subscriptions

use super::{ApiRequest, CanteenClient, ClientError};
use crate::types::{
    Application, ApplicationDetail, ApplicationRejectRequest, CreateApplicationRequest,
    CreateOrderRequest, DateRange, ListParams, Order, OrderDetail, OrderStatus, Page,
    PurchaseSubscriptionRequest, Subscription,
};
use serde_json::Value;

/// Filters for the order listing
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<i64>,
    pub range: DateRange,
}

impl CanteenClient {
    pub async fn list_orders(
        &self,
        params: &ListParams,
        filter: &OrderFilter,
    ) -> Result<Page<Order>, ClientError> {
        let request = ApiRequest::get("/orders")
            .paged(params, 20, 100)
            .query_opt("status", filter.status.map(OrderStatus::as_str))
            .query_opt("user_id", filter.user_id)
            .query_opt("date_from", filter.range.date_from.as_deref())
            .query_opt("date_to", filter.range.date_to.as_deref());
        self.execute(request).await
    }

    pub async fn get_order(&self, id: i64) -> Result<OrderDetail, ClientError> {
        self.execute(ApiRequest::get(format!("/orders/{id}"))).await
    }

    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<OrderDetail, ClientError> {
        self.execute(ApiRequest::post("/orders").json(order)?).await
    }

    pub async fn cancel_order(&self, id: i64) -> Result<OrderDetail, ClientError> {
        self.execute(ApiRequest::post(format!("/orders/{id}/cancel")))
            .await
    }

    pub async fn confirm_order_receipt(&self, id: i64) -> Result<OrderDetail, ClientError> {
        self.execute(ApiRequest::post(format!("/orders/{id}/confirm-receipt")))
            .await
    }

    /// Mark an order as served (kitchen staff)
    pub async fn serve_order(&self, id: i64) -> Result<OrderDetail, ClientError> {
        self.execute(ApiRequest::post(format!("/orders/{id}/serve")))
            .await
    }

    pub async fn list_applications(
        &self,
        params: &ListParams,
        status: Option<OrderStatus>,
    ) -> Result<Page<Application>, ClientError> {
        let request = ApiRequest::get("/applications")
            .paged(params, 20, 100)
            .query_opt("status", status.map(OrderStatus::as_str));
        self.execute(request).await
    }

    pub async fn get_application(&self, id: i64) -> Result<ApplicationDetail, ClientError> {
        self.execute(ApiRequest::get(format!("/applications/{id}")))
            .await
    }

    pub async fn create_application(
        &self,
        application: &CreateApplicationRequest,
    ) -> Result<Application, ClientError> {
        self.execute(ApiRequest::post("/applications").json(application)?)
            .await
    }

    pub async fn approve_application(&self, id: i64) -> Result<Application, ClientError> {
        self.execute(ApiRequest::post(format!("/applications/{id}/approve")))
            .await
    }

    pub async fn reject_application(
        &self,
        id: i64,
        rejection: &ApplicationRejectRequest,
    ) -> Result<Application, ClientError> {
        let request = ApiRequest::post(format!("/applications/{id}/reject")).json(rejection)?;
        self.execute(request).await
    }

    pub async fn my_subscription(&self) -> Result<Subscription, ClientError> {
        self.execute(ApiRequest::get("/subscriptions/my")).await
    }

    pub async fn purchase_subscription(&self, days: u32) -> Result<Subscription, ClientError> {
        let request =
            ApiRequest::post("/subscriptions/purchase").json(&PurchaseSubscriptionRequest { days })?;
        self.execute(request).await
    }

    /// The cancel endpoint's body is not stable, so it is returned untyped
    pub async fn cancel_subscription(&self) -> Result<Value, ClientError> {
        self.execute(ApiRequest::post("/subscriptions/cancel")).await
    }
}
