use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

use super::customer::CUSTOMER_ID_MAX;
use super::ValidationError;

/// Order row as listed under a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[sqlx(rename = "OrderID")]
    pub order_id: i32,
    #[sqlx(rename = "OrderDate")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub order_date: Option<NaiveDateTime>,
    #[sqlx(rename = "ShippedDate")]
    #[serde(serialize_with = "serialize_timestamp")]
    pub shipped_date: Option<NaiveDateTime>,
}

/// Wire format for order dates; sub-second precision is dropped
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn serialize_timestamp<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.collect_str(&ts.format(TIMESTAMP_FORMAT)),
        None => serializer.serialize_none(),
    }
}

/// Body of `POST /orders`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateRequest {
    pub order_id: i32,
    pub customer_id: String,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub shipped_date: Option<String>,
}

/// Body of `PUT /orders/:id`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdateRequest {
    pub customer_id: String,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub shipped_date: Option<String>,
}

/// Replacement values for the mutable columns of an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChanges {
    pub customer_id: String,
    pub order_date: Option<NaiveDateTime>,
    pub shipped_date: Option<NaiveDateTime>,
}

/// Validated order ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_id: i32,
    pub fields: OrderChanges,
}

impl OrderCreateRequest {
    /// The customer id only has to be present here. An id that cannot exist is
    /// reported by the store as an unknown customer.
    pub fn into_new_order(self) -> Result<NewOrder, ValidationError> {
        let fields = OrderChanges::parse(
            self.customer_id,
            None,
            self.order_date,
            self.shipped_date,
        )?;
        Ok(NewOrder {
            order_id: self.order_id,
            fields,
        })
    }
}

impl OrderUpdateRequest {
    pub fn into_changes(self) -> Result<OrderChanges, ValidationError> {
        OrderChanges::parse(
            self.customer_id,
            Some(CUSTOMER_ID_MAX),
            self.order_date,
            self.shipped_date,
        )
    }
}

impl OrderChanges {
    fn parse(
        customer_id: String,
        customer_id_max: Option<usize>,
        order_date: Option<String>,
        shipped_date: Option<String>,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        match customer_id_max {
            Some(max) => errors.check_required("customerId", &customer_id, max),
            None => {
                errors.check_present("customerId", &customer_id);
            }
        }
        let order_date = parse_optional(&mut errors, "orderDate", order_date.as_deref());
        let shipped_date = parse_optional(&mut errors, "shippedDate", shipped_date.as_deref());
        errors.into_result()?;

        Ok(Self {
            customer_id,
            order_date,
            shipped_date,
        })
    }
}

fn parse_optional(
    errors: &mut ValidationError,
    field: &str,
    raw: Option<&str>,
) -> Option<NaiveDateTime> {
    let raw = raw?;
    match parse_timestamp(raw) {
        Some(ts) => Some(ts),
        None => {
            errors.add(field, format!("Invalid date-time: {}", raw));
            None
        }
    }
}

/// Parse an ISO-8601 date-time. Local forms (`2024-01-31T10:15:00`, optional
/// fraction, or minutes precision) are taken as-is; RFC 3339 values with an
/// offset are converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<NaiveDateTime>() {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(ts);
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc())
}
