//! Reviews, reports and statistics

use super::{ApiRequest, CanteenClient, ClientError};
use crate::types::{
    AttendanceStatistics, CostsReport, CreateReviewRequest, DateRange, DishStatistics, ListParams,
    NutritionReport, Page, PaymentStatistics, Review, UpdateReviewRequest,
};

fn ranged(request: ApiRequest, range: &DateRange) -> ApiRequest {
    request
        .query_opt("date_from", range.date_from.as_deref())
        .query_opt("date_to", range.date_to.as_deref())
}

impl CanteenClient {
    pub async fn list_reviews(
        &self,
        params: &ListParams,
        dish_id: Option<i64>,
    ) -> Result<Page<Review>, ClientError> {
        let request = ApiRequest::get("/reviews")
            .paged(params, 20, 100)
            .query_opt("dish_id", dish_id);
        self.execute(request).await
    }

    pub async fn create_review(
        &self,
        dish_id: i64,
        review: &CreateReviewRequest,
    ) -> Result<Review, ClientError> {
        self.execute(ApiRequest::post(format!("/reviews/{dish_id}")).json(review)?)
            .await
    }

    pub async fn update_review(
        &self,
        review_id: i64,
        update: &UpdateReviewRequest,
    ) -> Result<Review, ClientError> {
        self.execute(ApiRequest::patch(format!("/reviews/{review_id}")).json(update)?)
            .await
    }

    pub async fn delete_review(&self, review_id: i64) -> Result<(), ClientError> {
        self.execute_unit(ApiRequest::delete(format!("/reviews/{review_id}")))
            .await
    }

    pub async fn costs_report(&self, range: &DateRange) -> Result<CostsReport, ClientError> {
        self.execute(ranged(ApiRequest::get("/reports/costs"), range))
            .await
    }

    pub async fn nutrition_report(&self, range: &DateRange) -> Result<NutritionReport, ClientError> {
        self.execute(ranged(ApiRequest::get("/reports/nutrition"), range))
            .await
    }

    pub async fn payment_statistics(
        &self,
        range: &DateRange,
    ) -> Result<PaymentStatistics, ClientError> {
        self.execute(ranged(ApiRequest::get("/statistics/payments"), range))
            .await
    }

    pub async fn attendance_statistics(
        &self,
        range: &DateRange,
    ) -> Result<AttendanceStatistics, ClientError> {
        self.execute(ranged(ApiRequest::get("/statistics/attendance"), range))
            .await
    }

    pub async fn dish_statistics(&self, range: &DateRange) -> Result<DishStatistics, ClientError> {
        self.execute(ranged(ApiRequest::get("/statistics/dishes"), range))
            .await
    }
}
