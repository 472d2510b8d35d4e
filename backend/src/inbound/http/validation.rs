//! Shared validation helpers for inbound HTTP adapters.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidTimestamp,
    InvalidAmount,
    InvalidQuantity,
    InvalidEnumValue,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidAmount => "invalid_amount",
            ErrorCode::InvalidQuantity => "invalid_quantity",
            ErrorCode::InvalidEnumValue => "invalid_enum_value",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

fn field_error(
    field: FieldName,
    message: impl Into<String>,
    code: ErrorCode,
    value: impl Into<String>,
) -> Error {
    Error::invalid_request(message.into()).with_details(json!({
        "field": field.as_str(),
        "value": value.into(),
        "code": code.as_str(),
    }))
}

pub(crate) fn parse_uuid(value: String, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(&value).map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            value,
        )
    })
}

pub(crate) fn parse_rfc3339_timestamp(
    value: String,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| {
            field_error(
                field,
                format!("{} must be an RFC 3339 timestamp", field.as_str()),
                ErrorCode::InvalidTimestamp,
                value,
            )
        })
}

/// Money amounts must be finite and strictly positive.
pub(crate) fn parse_positive_amount(value: f64, field: FieldName) -> Result<f64, Error> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(field_error(
            field,
            format!("{} must be a positive amount", field.as_str()),
            ErrorCode::InvalidAmount,
            value.to_string(),
        ))
    }
}

pub(crate) fn parse_positive_quantity(value: u32, field: FieldName) -> Result<u32, Error> {
    if value > 0 {
        Ok(value)
    } else {
        Err(field_error(
            field,
            format!("{} must be at least 1", field.as_str()),
            ErrorCode::InvalidQuantity,
            value.to_string(),
        ))
    }
}

pub(crate) fn invalid_enum_error(field: FieldName, value: &str, expected: &str) -> Error {
    field_error(
        field,
        format!("{} must be one of: {expected}", field.as_str()),
        ErrorCode::InvalidEnumValue,
        value,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_uuid_with_field_details() {
        let err = parse_uuid("not-a-uuid".to_owned(), FieldName::new("roomId")).unwrap_err();
        let details = err.details().expect("details");
        assert_eq!(details["field"], "roomId");
        assert_eq!(details["code"], "invalid_uuid");
    }

    #[test]
    fn accepts_rfc3339_with_offset() {
        let parsed = parse_rfc3339_timestamp(
            "2026-03-02T14:00:00+03:00".to_owned(),
            FieldName::new("startsAt"),
        )
        .unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-02T11:00:00+00:00");
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(parse_positive_amount(bad, FieldName::new("amount")).is_err());
        }
        assert_eq!(
            parse_positive_amount(100.5, FieldName::new("amount")).unwrap(),
            100.5
        );
    }

    #[test]
    fn rejects_zero_quantity() {
        assert!(parse_positive_quantity(0, FieldName::new("quantity")).is_err());
        assert_eq!(
            parse_positive_quantity(3, FieldName::new("quantity")).unwrap(),
            3
        );
    }
}
