use std::fmt;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::DomainError;

/// Catalog identifier of a product. The API sends it either as a JSON number
/// or as a string, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form required by the order submission payload.
    pub fn to_wire(&self) -> Result<i64, DomainError> {
        self.0
            .parse()
            .map_err(|_| DomainError::Validation(format!("product id '{}' is not numeric", self.0)))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => ProductId::from(n),
            RawId::Text(s) => ProductId::new(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "productId")]
    pub product_id: ProductId,
    #[serde(alias = "productName", default)]
    pub product_name: String,
    pub price: BigDecimal,
    #[serde(alias = "barCode", default)]
    pub bar_code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(alias = "imagePath", default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(alias = "customerId")]
    pub customer_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(alias = "addressId")]
    pub address_id: i64,
    #[serde(alias = "customerId")]
    pub customer_id: i64,
    #[serde(default)]
    pub label: String,
}
