use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

pub const CUSTOMER_ID_MAX: usize = 5;
pub const COMPANY_NAME_MAX: usize = 40;
pub const CONTACT_NAME_MAX: usize = 30;
pub const COUNTRY_MAX: usize = 15;

/// Row of the `Customers` table and its wire representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Older clients send this as `id`
    #[serde(alias = "id")]
    #[sqlx(rename = "CustomerID")]
    pub customer_id: String,
    #[sqlx(rename = "CompanyName")]
    pub company_name: String,
    #[serde(default)]
    #[sqlx(rename = "ContactName")]
    pub contact_name: Option<String>,
    #[serde(default)]
    #[sqlx(rename = "Country")]
    pub country: Option<String>,
}

impl Customer {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        errors.check_required("customerId", &self.customer_id, CUSTOMER_ID_MAX);
        errors.check_required("companyName", &self.company_name, COMPANY_NAME_MAX);
        errors.check_optional("contactName", self.contact_name.as_deref(), CONTACT_NAME_MAX);
        errors.check_optional("country", self.country.as_deref(), COUNTRY_MAX);
        errors.into_result()
    }

    /// Replace the mutable columns; the id is kept
    pub fn apply(&mut self, update: &CustomerUpdate) {
        self.company_name = update.company_name.clone();
        self.contact_name = update.contact_name.clone();
        self.country = update.country.clone();
    }
}

/// Body of `PUT /customers/:id`. A `customerId` in the body is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub company_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl CustomerUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        errors.check_required("companyName", &self.company_name, COMPANY_NAME_MAX);
        errors.check_optional("contactName", self.contact_name.as_deref(), CONTACT_NAME_MAX);
        errors.check_optional("country", self.country.as_deref(), COUNTRY_MAX);
        errors.into_result()
    }
}
