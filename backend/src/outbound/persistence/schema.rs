//! Diesel table definitions for the PostgreSQL schema.
//!
//! Must match the migrations exactly. The `bookings` table additionally
//! carries an exclusion constraint (btree_gist) over `(room_id, tstzrange)`
//! for occupying statuses, and `notifications` a partial unique index over
//! `(booking_id, kind)` for non-terminal rows; neither is expressible here.

diesel::table! {
    /// Bookings with embedded item selections (jsonb).
    bookings (id) {
        id -> Uuid,
        user_id -> Uuid,
        room_id -> Uuid,
        equipment -> Jsonb,
        makeup_rooms -> Jsonb,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        status -> Varchar,
        payment_status -> Varchar,
        is_half_paid -> Bool,
        payment_method -> Varchar,
        original_price -> Float8,
        total_price -> Float8,
        discount -> Float8,
        paid_amount -> Float8,
        people_count -> Int4,
        promo_code -> Nullable<Varchar>,
        cancelled_at -> Nullable<Timestamptz>,
        cancellation_reason -> Nullable<Text>,
        created_at -> Timestamptz,
        /// Optimistic-concurrency version.
        version -> Int4,
    }
}

diesel::table! {
    /// Durable delayed-notification store drained by the delivery worker.
    notifications (id) {
        id -> Uuid,
        booking_id -> Uuid,
        user_id -> Uuid,
        kind -> Varchar,
        status -> Varchar,
        scheduled_for -> Timestamptz,
        sent_at -> Nullable<Timestamptz>,
        attempts -> Int4,
        max_attempts -> Int4,
        last_error -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Bookable rooms with their tariff columns.
    rooms (id) {
        id -> Uuid,
        name -> Varchar,
        weekday_morning_rate -> Nullable<Float8>,
        weekday_evening_rate -> Nullable<Float8>,
        weekend_rate -> Nullable<Float8>,
        default_rate -> Nullable<Float8>,
        is_deleted -> Bool,
    }
}

diesel::table! {
    /// Rentable equipment, priced per day.
    equipment (id) {
        id -> Uuid,
        name -> Varchar,
        price_per_day -> Float8,
        total_quantity -> Int4,
        is_deleted -> Bool,
    }
}

diesel::table! {
    /// Makeup rooms, priced per hour.
    makeup_rooms (id) {
        id -> Uuid,
        name -> Varchar,
        price_per_hour -> Float8,
        total_quantity -> Int4,
        is_deleted -> Bool,
    }
}

diesel::table! {
    /// Customers reachable over SMS.
    customers (id) {
        id -> Uuid,
        name -> Varchar,
        phone -> Varchar,
    }
}

diesel::table! {
    /// Flat-amount promo codes.
    promo_codes (code) {
        code -> Varchar,
        discount_amount -> Float8,
        active -> Bool,
        expires_at -> Nullable<Timestamptz>,
        usage_limit -> Nullable<Int4>,
        usage_count -> Int4,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    bookings,
    notifications,
    rooms,
    equipment,
    makeup_rooms,
    customers,
    promo_codes,
);
