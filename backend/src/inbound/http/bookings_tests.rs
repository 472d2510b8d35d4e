//! Tests for booking HTTP handlers.

use actix_web::http::StatusCode;
use actix_web::{test as actix_test, web, App};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::*;
use crate::domain::ports::{MockBookingCommand, UnconfiguredPaymentGateway};
use crate::domain::BookingDraft;

fn booking_fixture() -> Booking {
    Booking::new(BookingDraft {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        room_id: Uuid::new_v4(),
        equipment: vec![],
        makeup_rooms: vec![],
        starts_at: Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap(),
        people_count: 2,
        promo_code: None,
        original_price: 2200.0,
        total_price: 2200.0,
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    })
    .unwrap()
}

fn test_app(
    command: MockBookingCommand,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::new(Arc::new(command), Arc::new(UnconfiguredPaymentGateway));
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api/v1")
            .service(create_booking)
            .service(register_payment)
            .service(set_on_site_payment)
            .service(start_online_payment)
            .service(update_status)
            .service(add_items),
    )
}

fn valid_create_body() -> Value {
    json!({
        "userId": Uuid::new_v4().to_string(),
        "roomId": Uuid::new_v4().to_string(),
        "startsAt": "2026-03-03T10:00:00Z",
        "endsAt": "2026-03-03T12:00:00Z",
        "peopleCount": 2
    })
}

#[actix_rt::test]
async fn create_booking_returns_created_payload() {
    let mut command = MockBookingCommand::new();
    command
        .expect_create_booking()
        .returning(|_| Ok(booking_fixture()));
    let app = actix_test::init_service(test_app(command)).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(valid_create_body())
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["paymentStatus"], "unpaid");
    assert_eq!(body["totalPrice"], 2200.0);
}

#[actix_rt::test]
async fn create_booking_rejects_malformed_room_id() {
    let app = actix_test::init_service(test_app(MockBookingCommand::new())).await;

    let mut body = valid_create_body();
    body["roomId"] = json!("not-a-uuid");
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], "roomId");
}

#[actix_rt::test]
async fn conflict_from_use_case_maps_to_409() {
    let mut command = MockBookingCommand::new();
    command
        .expect_create_booking()
        .returning(|_| Err(Error::conflict("room is already booked")));
    let app = actix_test::init_service(test_app(command)).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(valid_create_body())
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[actix_rt::test]
async fn register_payment_rejects_non_positive_amount() {
    let app = actix_test::init_service(test_app(MockBookingCommand::new())).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/bookings/{}/payments", Uuid::new_v4()))
        .set_json(json!({ "amount": -10.0 }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["code"], "invalid_amount");
}

#[actix_rt::test]
async fn on_site_payment_rejects_online_method() {
    let app = actix_test::init_service(test_app(MockBookingCommand::new())).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!(
            "/api/v1/bookings/{}/on-site-payment",
            Uuid::new_v4()
        ))
        .set_json(json!({ "method": "online" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    // "online" parses as a method but is rejected as an enum value here:
    // the endpoint accepts on-site methods only.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn update_status_rejects_unknown_status() {
    let app = actix_test::init_service(test_app(MockBookingCommand::new())).await;

    let request = actix_test::TestRequest::patch()
        .uri(&format!("/api/v1/bookings/{}/status", Uuid::new_v4()))
        .set_json(json!({ "status": "archived" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["code"], "invalid_enum_value");
}

#[actix_rt::test]
async fn add_items_requires_at_least_one_item() {
    let app = actix_test::init_service(test_app(MockBookingCommand::new())).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/bookings/{}/items", Uuid::new_v4()))
        .set_json(json!({ "equipment": [], "makeupRooms": [] }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn not_found_from_use_case_maps_to_404() {
    let mut command = MockBookingCommand::new();
    command
        .expect_start_online_payment()
        .returning(|id| Err(Error::not_found(format!("booking {id} does not exist"))));
    let app = actix_test::init_service(test_app(command)).await;

    let request = actix_test::TestRequest::post()
        .uri(&format!(
            "/api/v1/bookings/{}/online-payment",
            Uuid::new_v4()
        ))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
