//! Booking HTTP handlers.
//!
//! ```text
//! POST  /api/v1/bookings
//! POST  /api/v1/bookings/{id}/payments
//! POST  /api/v1/bookings/{id}/on-site-payment
//! POST  /api/v1/bookings/{id}/online-payment
//! PATCH /api/v1/bookings/{id}/status
//! POST  /api/v1/bookings/{id}/items
//! ```

use std::str::FromStr;

use actix_web::{patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{CreateBookingRequest, PaymentIntent};
use crate::domain::{
    Booking, BookingStatus, EquipmentSelection, Error, MakeupRoomSelection, PaymentMethod,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    invalid_enum_error, parse_positive_amount, parse_positive_quantity, parse_rfc3339_timestamp,
    parse_uuid, FieldName,
};
use crate::inbound::http::ApiResult;

/// Requested equipment units.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSelectionBody {
    #[schema(format = "uuid")]
    pub equipment_id: String,
    pub quantity: u32,
}

/// Requested makeup room units and hours.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MakeupRoomSelectionBody {
    #[schema(format = "uuid")]
    pub makeup_room_id: String,
    pub quantity: u32,
    pub hours: f64,
}

/// Request payload for creating a booking.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequestBody {
    #[schema(format = "uuid")]
    pub user_id: String,
    #[schema(format = "uuid")]
    pub room_id: String,
    #[schema(format = "date-time")]
    pub starts_at: String,
    #[schema(format = "date-time")]
    pub ends_at: String,
    pub people_count: u32,
    #[serde(default)]
    pub equipment: Vec<EquipmentSelectionBody>,
    #[serde(default)]
    pub makeup_rooms: Vec<MakeupRoomSelectionBody>,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// Booking representation returned by every booking endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponseBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub user_id: String,
    #[schema(format = "uuid")]
    pub room_id: String,
    #[schema(format = "date-time")]
    pub starts_at: String,
    #[schema(format = "date-time")]
    pub ends_at: String,
    pub status: String,
    pub payment_status: String,
    pub is_half_paid: bool,
    pub payment_method: String,
    pub original_price: f64,
    pub total_price: f64,
    pub discount: f64,
    pub paid_amount: f64,
    pub people_count: u32,
    pub equipment: Vec<EquipmentSelectionBody>,
    pub makeup_rooms: Vec<MakeupRoomSelectionBody>,
    pub promo_code: Option<String>,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<Booking> for BookingResponseBody {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            user_id: booking.user_id.to_string(),
            room_id: booking.room_id.to_string(),
            starts_at: booking.starts_at.to_rfc3339(),
            ends_at: booking.ends_at.to_rfc3339(),
            status: booking.status.as_str().to_owned(),
            payment_status: booking.payment_status.as_str().to_owned(),
            is_half_paid: booking.is_half_paid,
            payment_method: booking.payment_method.as_str().to_owned(),
            original_price: booking.original_price,
            total_price: booking.total_price,
            discount: booking.discount,
            paid_amount: booking.paid_amount,
            people_count: booking.people_count,
            equipment: booking
                .equipment
                .iter()
                .map(|item| EquipmentSelectionBody {
                    equipment_id: item.equipment_id.to_string(),
                    quantity: item.quantity,
                })
                .collect(),
            makeup_rooms: booking
                .makeup_rooms
                .iter()
                .map(|item| MakeupRoomSelectionBody {
                    makeup_room_id: item.makeup_room_id.to_string(),
                    quantity: item.quantity,
                    hours: item.hours,
                })
                .collect(),
            promo_code: booking.promo_code,
            created_at: booking.created_at.to_rfc3339(),
        }
    }
}

fn parse_equipment(items: Vec<EquipmentSelectionBody>) -> Result<Vec<EquipmentSelection>, Error> {
    items
        .into_iter()
        .map(|item| {
            Ok(EquipmentSelection {
                equipment_id: parse_uuid(item.equipment_id, FieldName::new("equipmentId"))?,
                quantity: parse_positive_quantity(item.quantity, FieldName::new("quantity"))?,
            })
        })
        .collect()
}

fn parse_makeup_rooms(
    items: Vec<MakeupRoomSelectionBody>,
) -> Result<Vec<MakeupRoomSelection>, Error> {
    items
        .into_iter()
        .map(|item| {
            Ok(MakeupRoomSelection {
                makeup_room_id: parse_uuid(item.makeup_room_id, FieldName::new("makeupRoomId"))?,
                quantity: parse_positive_quantity(item.quantity, FieldName::new("quantity"))?,
                hours: parse_positive_amount(item.hours, FieldName::new("hours"))?,
            })
        })
        .collect()
}

fn parse_create_request(body: CreateBookingRequestBody) -> Result<CreateBookingRequest, Error> {
    Ok(CreateBookingRequest {
        user_id: parse_uuid(body.user_id, FieldName::new("userId"))?,
        room_id: parse_uuid(body.room_id, FieldName::new("roomId"))?,
        starts_at: parse_rfc3339_timestamp(body.starts_at, FieldName::new("startsAt"))?,
        ends_at: parse_rfc3339_timestamp(body.ends_at, FieldName::new("endsAt"))?,
        people_count: body.people_count,
        equipment: parse_equipment(body.equipment)?,
        makeup_rooms: parse_makeup_rooms(body.makeup_rooms)?,
        promo_code: body.promo_code,
    })
}

/// Create a booking: availability checks, pricing, and notification
/// scheduling all run inside the use-case.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = CreateBookingRequestBody,
    responses(
        (status = 201, description = "Booking created", body = BookingResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Referenced resource missing", body = Error),
        (status = 409, description = "Room or items unavailable", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["bookings"],
    operation_id = "createBooking"
)]
#[post("/bookings")]
pub async fn create_booking(
    state: web::Data<HttpState>,
    payload: web::Json<CreateBookingRequestBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_create_request(payload.into_inner())?;
    let booking = state.bookings.create_booking(request).await?;
    Ok(HttpResponse::Created().json(BookingResponseBody::from(booking)))
}

/// Request payload for registering a payment manually.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPaymentRequestBody {
    pub amount: f64,
}

/// Record a confirmed payment amount (admin or reconciliation path).
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payments",
    request_body = RegisterPaymentRequestBody,
    params(("id" = String, Path, format = "uuid", description = "Booking id")),
    responses(
        (status = 200, description = "Payment recorded", body = BookingResponseBody),
        (status = 400, description = "Invalid amount", body = Error),
        (status = 404, description = "Booking missing", body = Error),
        (status = 409, description = "Concurrent modification", body = Error)
    ),
    tags = ["bookings"],
    operation_id = "registerPayment"
)]
#[post("/bookings/{id}/payments")]
pub async fn register_payment(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RegisterPaymentRequestBody>,
) -> ApiResult<HttpResponse> {
    let booking_id = parse_uuid(path.into_inner(), FieldName::new("id"))?;
    let amount = parse_positive_amount(payload.amount, FieldName::new("amount"))?;
    let booking = state.bookings.register_payment(booking_id, amount).await?;
    Ok(HttpResponse::Ok().json(BookingResponseBody::from(booking)))
}

/// Request payload for choosing an on-site payment method.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnSitePaymentRequestBody {
    /// `on_site_cash` or `on_site_card`.
    pub method: String,
}

/// Record that the booking will be paid at the studio.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/on-site-payment",
    request_body = OnSitePaymentRequestBody,
    params(("id" = String, Path, format = "uuid", description = "Booking id")),
    responses(
        (status = 200, description = "Payment method recorded", body = BookingResponseBody),
        (status = 400, description = "Not an on-site method", body = Error),
        (status = 404, description = "Booking missing", body = Error),
        (status = 409, description = "Booking already finalised", body = Error)
    ),
    tags = ["bookings"],
    operation_id = "setOnSitePayment"
)]
#[post("/bookings/{id}/on-site-payment")]
pub async fn set_on_site_payment(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<OnSitePaymentRequestBody>,
) -> ApiResult<HttpResponse> {
    let booking_id = parse_uuid(path.into_inner(), FieldName::new("id"))?;
    let method = PaymentMethod::from_str(&payload.method)
        .ok()
        .filter(|method| method.is_on_site())
        .ok_or_else(|| {
            invalid_enum_error(
                FieldName::new("method"),
                &payload.method,
                "on_site_cash, on_site_card",
            )
        })?;
    let booking = state
        .bookings
        .set_on_site_payment(booking_id, method)
        .await?;
    Ok(HttpResponse::Ok().json(BookingResponseBody::from(booking)))
}

/// Payment intent returned for online payment starts.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponseBody {
    pub payment_id: String,
    pub confirmation_url: Option<String>,
    pub amount: f64,
}

impl From<PaymentIntent> for PaymentIntentResponseBody {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            payment_id: intent.payment_id,
            confirmation_url: intent.confirmation_url,
            amount: intent.amount,
        }
    }
}

/// Create a gateway payment intent for the outstanding amount.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/online-payment",
    params(("id" = String, Path, format = "uuid", description = "Booking id")),
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponseBody),
        (status = 404, description = "Booking missing", body = Error),
        (status = 409, description = "On-site booking or already paid", body = Error),
        (status = 503, description = "Gateway unavailable", body = Error)
    ),
    tags = ["bookings"],
    operation_id = "startOnlinePayment"
)]
#[post("/bookings/{id}/online-payment")]
pub async fn start_online_payment(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let booking_id = parse_uuid(path.into_inner(), FieldName::new("id"))?;
    let intent = state.bookings.start_online_payment(booking_id).await?;
    Ok(HttpResponse::Ok().json(PaymentIntentResponseBody::from(intent)))
}

/// Request payload for status overrides.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequestBody {
    /// `pending`, `confirmed`, `cancelled`, or `completed`.
    pub status: String,
}

/// Apply a guarded status transition.
#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}/status",
    request_body = UpdateStatusRequestBody,
    params(("id" = String, Path, format = "uuid", description = "Booking id")),
    responses(
        (status = 200, description = "Status updated", body = BookingResponseBody),
        (status = 400, description = "Unknown status", body = Error),
        (status = 404, description = "Booking missing", body = Error),
        (status = 409, description = "Illegal transition", body = Error)
    ),
    tags = ["bookings"],
    operation_id = "updateBookingStatus"
)]
#[patch("/bookings/{id}/status")]
pub async fn update_status(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<UpdateStatusRequestBody>,
) -> ApiResult<HttpResponse> {
    let booking_id = parse_uuid(path.into_inner(), FieldName::new("id"))?;
    let status = BookingStatus::from_str(&payload.status).map_err(|_| {
        invalid_enum_error(
            FieldName::new("status"),
            &payload.status,
            "pending, confirmed, cancelled, completed",
        )
    })?;
    let booking = state.bookings.update_status(booking_id, status).await?;
    Ok(HttpResponse::Ok().json(BookingResponseBody::from(booking)))
}

/// Request payload for adding items to an existing booking.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemsRequestBody {
    #[serde(default)]
    pub equipment: Vec<EquipmentSelectionBody>,
    #[serde(default)]
    pub makeup_rooms: Vec<MakeupRoomSelectionBody>,
}

/// Add equipment or makeup rooms to an existing booking; the whole booking
/// is re-priced.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/items",
    request_body = AddItemsRequestBody,
    params(("id" = String, Path, format = "uuid", description = "Booking id")),
    responses(
        (status = 200, description = "Items added and booking re-priced", body = BookingResponseBody),
        (status = 400, description = "Invalid selection", body = Error),
        (status = 404, description = "Booking or item missing", body = Error),
        (status = 409, description = "Insufficient capacity or terminal booking", body = Error)
    ),
    tags = ["bookings"],
    operation_id = "addBookingItems"
)]
#[post("/bookings/{id}/items")]
pub async fn add_items(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<AddItemsRequestBody>,
) -> ApiResult<HttpResponse> {
    let booking_id = parse_uuid(path.into_inner(), FieldName::new("id"))?;
    let body = payload.into_inner();
    let equipment = parse_equipment(body.equipment)?;
    let makeup_rooms = parse_makeup_rooms(body.makeup_rooms)?;
    if equipment.is_empty() && makeup_rooms.is_empty() {
        return Err(Error::invalid_request(
            "at least one equipment or makeup room item is required",
        ));
    }
    let booking = state
        .bookings
        .add_items(booking_id, equipment, makeup_rooms)
        .await?;
    Ok(HttpResponse::Ok().json(BookingResponseBody::from(booking)))
}

#[cfg(test)]
#[path = "bookings_tests.rs"]
mod tests;
