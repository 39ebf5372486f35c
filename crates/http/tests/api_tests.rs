//! Request shapes of the typed endpoints: paths, query strings and multipart forms

use canteen_core::TokenPair;
use canteen_http::client::orders::OrderFilter;
use canteen_http::types::{
    CreateDishRequest, DateRange, DishImage, DishIngredientLink, ListParams, OrderStatus,
    UpdateDishRequest,
};
use canteen_http::CanteenClient;
use serde_json::json;
use wiremock::matchers::{
    body_string_contains, header, header_regex, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_in(server: &MockServer) -> CanteenClient {
    let client = CanteenClient::new(server.uri()).unwrap();
    client
        .session()
        .store(&TokenPair::new("A1", "R1"))
        .unwrap();
    client
}

fn page(items: serde_json::Value, page: u32, limit: u32) -> serde_json::Value {
    json!({ "items": items, "total": 1, "page": page, "limit": limit, "pages": 1 })
}

fn dish_json() -> serde_json::Value {
    json!({ "id": 4, "name": "Porridge", "price": 45.0 })
}

fn notification_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Order ready",
        "body": "Pick it up",
        "created_at": "2024-03-01T12:00:00"
    })
}

fn march() -> DateRange {
    DateRange {
        date_from: Some("2024-03-01".into()),
        date_to: Some("2024-03-31".into()),
    }
}

fn image() -> DishImage {
    DishImage {
        file_name: "porridge.png".into(),
        mime_type: "image/png".into(),
        bytes: b"fake-png-bytes".to_vec(),
    }
}

#[tokio::test]
async fn test_list_dishes_sends_paging_and_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dishes"))
        .and(query_param("page", "3"))
        .and(query_param("limit", "100"))
        .and(query_param("search", "soup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([dish_json()]), 3, 100)))
        .expect(1)
        .mount(&server)
        .await;

    let client = CanteenClient::new(server.uri()).unwrap();
    let params = ListParams {
        page: Some(3),
        limit: Some(500),
        search: Some("soup".into()),
    };
    let dishes = client.list_dishes(&params).await.unwrap();

    assert_eq!(dishes.page, 3);
    assert_eq!(dishes.items[0].name, "Porridge");
}

#[tokio::test]
async fn test_list_defaults_page_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dishes"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "20"))
        .and(query_param_is_missing("search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 1, 20)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ingredients"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 1, 50)))
        .expect(1)
        .mount(&server)
        .await;

    let client = CanteenClient::new(server.uri()).unwrap();
    let params = ListParams::default();
    assert!(client.list_dishes(&params).await.unwrap().items.is_empty());
    assert!(client.list_ingredients(&params).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_create_dish_posts_multipart_with_payload_and_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dishes"))
        .and(header("authorization", "Bearer A1"))
        .and(header_regex("content-type", "^multipart/form-data; boundary=.+"))
        .and(body_string_contains(r#"name="dish_data""#))
        .and(body_string_contains(r#""name":"Porridge""#))
        .and(body_string_contains(r#""ingredient_id":7"#))
        .and(body_string_contains(r#"name="image"; filename="porridge.png""#))
        .and(body_string_contains("image/png"))
        .and(body_string_contains("fake-png-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dish_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let dish = CreateDishRequest {
        name: "Porridge".into(),
        price: 45.0,
        ingredients: vec![DishIngredientLink {
            ingredient_id: 7,
            amount_thousandth_measure: 150,
        }],
    };
    let created = client.create_dish(&dish, Some(&image())).await.unwrap();
    assert_eq!(created.id, 4);
}

#[tokio::test]
async fn test_update_dish_patches_multipart_without_image() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/dishes/4"))
        .and(header_regex("content-type", "^multipart/form-data; boundary=.+"))
        .and(body_string_contains(r#"name="dish_data""#))
        .and(body_string_contains(r#"{"price":50.0}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "name": "Porridge", "price": 50.0, "ingredients": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let update = UpdateDishRequest {
        price: Some(50.0),
        ..UpdateDishRequest::default()
    };
    let updated = client.update_dish(4, &update, None).await.unwrap();

    assert_eq!(updated.dish.price, 50.0);
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains(r#"name="image""#));
}

#[tokio::test]
async fn test_list_orders_sends_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .and(query_param("status", "served"))
        .and(query_param("user_id", "12"))
        .and(query_param("date_from", "2024-03-01"))
        .and(query_param("date_to", "2024-03-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{
                "id": 9,
                "user_id": 12,
                "ordered_at": "2024-03-02T08:00:00",
                "status": "served"
            }]),
            2,
            20,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let params = ListParams {
        page: Some(2),
        ..ListParams::default()
    };
    let filter = OrderFilter {
        status: Some(OrderStatus::Served),
        user_id: Some(12),
        range: march(),
    };
    let orders = client.list_orders(&params, &filter).await.unwrap();

    assert_eq!(orders.items[0].status, OrderStatus::Served);
    assert_eq!(orders.items[0].completed_at, None);
}

#[tokio::test]
async fn test_reports_send_date_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports/costs"))
        .and(query_param("date_from", "2024-03-01"))
        .and(query_param("date_to", "2024-03-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "from": "2024-03-01",
            "to": "2024-03-31",
            "procurement_applications": 3,
            "estimated_total_cost_kopecks": 125_000
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports/nutrition"))
        .and(query_param("date_from", "2024-03-01"))
        .and(query_param("date_to", "2024-03-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "from": "2024-03-01",
            "to": "2024-03-31",
            "served_orders": 40,
            "dishes_breakdown": [{ "dish_id": 4, "dish_name": "Porridge", "quantity": 40 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let costs = client.costs_report(&march()).await.unwrap();
    assert_eq!(costs.estimated_total_cost_kopecks, 125_000);

    let nutrition = client.nutrition_report(&march()).await.unwrap();
    assert_eq!(nutrition.dishes_breakdown[0].quantity, 40);
}

#[tokio::test]
async fn test_statistics_send_date_range_and_omit_open_ends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/statistics/payments"))
        .and(query_param("date_from", "2024-03-01"))
        .and(query_param("date_to", "2024-03-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_amount": 900.0,
            "orders_count": 20,
            "subscriptions_count": 2,
            "average_order_amount": 45.0,
            "period": { "from": "2024-03-01", "to": "2024-03-31" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statistics/attendance"))
        .and(query_param("date_from", "2024-03-01"))
        .and(query_param_is_missing("date_to"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_served": 18,
            "total_paid": 20,
            "attendance_rate": 0.9
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statistics/dishes"))
        .and(query_param_is_missing("date_from"))
        .and(query_param_is_missing("date_to"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dishes": [{ "dish": dish_json(), "orders_count": 20, "reviews_count": 0 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let payments = client.payment_statistics(&march()).await.unwrap();
    assert_eq!(payments.orders_count, 20);

    let from_only = DateRange {
        date_from: Some("2024-03-01".into()),
        date_to: None,
    };
    let attendance = client.attendance_statistics(&from_only).await.unwrap();
    assert!(attendance.by_date.is_empty());

    let dishes = client.dish_statistics(&DateRange::default()).await.unwrap();
    assert_eq!(dishes.dishes[0].average_rating, None);
}

#[tokio::test]
async fn test_notifications_accepts_a_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([notification_json(2), notification_json(1)])),
        )
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let ids: Vec<i64> = client
        .list_notifications()
        .await
        .unwrap()
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_notifications_accepts_a_single_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(notification_json(5)))
        .mount(&server)
        .await;

    let client = signed_in(&server);
    let notifications = client.list_notifications().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, 5);
    assert!(!notifications[0].read);
}

#[tokio::test]
async fn test_notifications_accepts_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let client = signed_in(&server);
    assert!(client.list_notifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unread_count_accepts_object_and_bare_number() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 4 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(6)))
        .mount(&server)
        .await;

    let client = signed_in(&server);
    assert_eq!(client.unread_notification_count().await.unwrap(), 4);
    assert_eq!(client.unread_notification_count().await.unwrap(), 6);
}
