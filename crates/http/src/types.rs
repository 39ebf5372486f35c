//! Request and response types of the canteen REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
    pub email: String,
    pub password: String,
}

/// Body of the refresh and logout endpoints
#[derive(Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Cook,
    Admin,
}

/// Account as returned by `/users` and `/users/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub registered_at: Option<String>,
    #[serde(default)]
    pub banned: Option<bool>,
    #[serde(default)]
    pub subscription_start: Option<String>,
    #[serde(default)]
    pub subscription_days: Option<i64>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub is_banned: Option<bool>,
    #[serde(default)]
    pub allergies: Vec<Ingredient>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddAllergyRequest {
    pub ingredient_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    Kg,
    L,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub measure: Measure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub price: f64,
    pub measure: Measure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIngredientRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<Measure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishIngredient {
    pub ingredient: Ingredient,
    pub amount_thousandth_measure: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishDetail {
    #[serde(flatten)]
    pub dish: Dish,
    #[serde(default)]
    pub ingredients: Vec<DishIngredient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishIngredientLink {
    pub ingredient_id: i64,
    pub amount_thousandth_measure: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDishRequest {
    pub name: String,
    pub price: f64,
    pub ingredients: Vec<DishIngredientLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDishRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<DishIngredientLink>>,
}

/// Image attached to a dish create/update form
#[derive(Debug, Clone)]
pub struct DishImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDetail {
    #[serde(flatten)]
    pub menu: Menu,
    #[serde(default)]
    pub items: Vec<Dish>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMenuRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMenuRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Paid,
    Served,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Served => "served",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub ordered_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDish {
    pub dish: Dish,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub dishes: Vec<OrderDish>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDishLink {
    pub dish_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub dishes: Vec<OrderDishLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub dish_id: i64,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub content: Option<String>,
    pub datetime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserShort {
    pub id: i64,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub patronymic: Option<String>,
}

/// Procurement application filed by the kitchen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub applicant: Option<UserShort>,
    pub datetime: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationProduct {
    pub ingredient: Ingredient,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    #[serde(default)]
    pub products: Vec<ApplicationProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationProductLink {
    pub ingredient_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationRequest {
    pub products: Vec<ApplicationProductLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationRejectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: i64,
    pub subscription_start: String,
    pub subscription_days: i64,
    pub days_remaining: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseSubscriptionRequest {
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatistics {
    pub total_amount: f64,
    pub orders_count: u64,
    pub subscriptions_count: u64,
    pub average_order_amount: f64,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceByDay {
    pub date: String,
    pub served: u64,
    pub paid: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStatistics {
    pub total_served: u64,
    pub total_paid: u64,
    pub attendance_rate: f64,
    #[serde(default)]
    pub by_date: Vec<AttendanceByDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishStatistic {
    pub dish: Dish,
    pub orders_count: u64,
    #[serde(default)]
    pub average_rating: Option<f64>,
    pub reviews_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishStatistics {
    #[serde(default)]
    pub dishes: Vec<DishStatistic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostsReport {
    pub from: String,
    pub to: String,
    pub procurement_applications: u64,
    pub estimated_total_cost_kopecks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionDishBreakdown {
    pub dish_id: i64,
    pub dish_name: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionReport {
    pub from: String,
    pub to: String,
    pub served_orders: u64,
    #[serde(default)]
    pub dishes_breakdown: Vec<NutritionDishBreakdown>,
}

/// Date window for reports and statistics (ISO dates)
#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

/// A push notification addressed to the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub read: bool,
}

/// Unread counter, accepted either as `{"count": n}` or a bare number
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum UnreadCount {
    Object { count: u64 },
    Bare(u64),
}

impl UnreadCount {
    pub const fn get(self) -> u64 {
        match self {
            Self::Object { count } | Self::Bare(count) => count,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    pub pages: u32,
}

/// Paging and filter parameters shared by the listing endpoints
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// Timestamps arrive either as RFC 3339 or as naive ISO strings in UTC
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}
