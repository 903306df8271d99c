use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::Money;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of a catalog product at the moment of resolution.
///
/// Every attribute is optional; a missing attribute is a first-class state
/// for the condition evaluator, not an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSnapshot {
    pub id: ProductId,

    pub regular_price: Option<Money>,
    pub sale_price: Option<Money>,
    pub price: Option<Money>,
    pub stock_quantity: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub average_rating: Option<Decimal>,
    pub review_count: Option<Decimal>,
    pub total_sales: Option<Decimal>,

    pub sku: Option<String>,
    pub tax_class: Option<String>,
    pub shipping_class: Option<String>,

    pub featured: Option<bool>,
    pub on_sale: Option<bool>,
    #[serde(rename = "virtual")]
    pub is_virtual: Option<bool>,
    pub downloadable: Option<bool>,

    pub stock_status: Option<String>,
    pub product_type: Option<String>,
    pub tax_status: Option<String>,

    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
}

/// Declared type of a product property; decides which operators apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Numeric,
    Text,
    Boolean,
    Select,
    Date,
}

impl PropertyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    RegularPrice,
    SalePrice,
    #[serde(alias = "current_price")]
    Price,
    StockQuantity,
    Weight,
    Length,
    Width,
    Height,
    AverageRating,
    ReviewCount,
    TotalSales,
    Sku,
    TaxClass,
    ShippingClass,
    Featured,
    OnSale,
    Virtual,
    Downloadable,
    StockStatus,
    ProductType,
    TaxStatus,
    DateCreated,
    DateModified,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 23] = [
        Self::RegularPrice,
        Self::SalePrice,
        Self::Price,
        Self::StockQuantity,
        Self::Weight,
        Self::Length,
        Self::Width,
        Self::Height,
        Self::AverageRating,
        Self::ReviewCount,
        Self::TotalSales,
        Self::Sku,
        Self::TaxClass,
        Self::ShippingClass,
        Self::Featured,
        Self::OnSale,
        Self::Virtual,
        Self::Downloadable,
        Self::StockStatus,
        Self::ProductType,
        Self::TaxStatus,
        Self::DateCreated,
        Self::DateModified,
    ];

    pub fn property_type(self) -> PropertyType {
        match self {
            Self::RegularPrice
            | Self::SalePrice
            | Self::Price
            | Self::StockQuantity
            | Self::Weight
            | Self::Length
            | Self::Width
            | Self::Height
            | Self::AverageRating
            | Self::ReviewCount
            | Self::TotalSales => PropertyType::Numeric,
            Self::Sku | Self::TaxClass | Self::ShippingClass => PropertyType::Text,
            Self::Featured | Self::OnSale | Self::Virtual | Self::Downloadable => {
                PropertyType::Boolean
            }
            Self::StockStatus | Self::ProductType | Self::TaxStatus => PropertyType::Select,
            Self::DateCreated | Self::DateModified => PropertyType::Date,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegularPrice => "regular_price",
            Self::SalePrice => "sale_price",
            Self::Price => "price",
            Self::StockQuantity => "stock_quantity",
            Self::Weight => "weight",
            Self::Length => "length",
            Self::Width => "width",
            Self::Height => "height",
            Self::AverageRating => "average_rating",
            Self::ReviewCount => "review_count",
            Self::TotalSales => "total_sales",
            Self::Sku => "sku",
            Self::TaxClass => "tax_class",
            Self::ShippingClass => "shipping_class",
            Self::Featured => "featured",
            Self::OnSale => "on_sale",
            Self::Virtual => "virtual",
            Self::Downloadable => "downloadable",
            Self::StockStatus => "stock_status",
            Self::ProductType => "product_type",
            Self::TaxStatus => "tax_status",
            Self::DateCreated => "date_created",
            Self::DateModified => "date_modified",
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PropertyKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized == "current_price" {
            return Ok(Self::Price);
        }
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| format!("unknown product property `{value}`"))
    }
}

/// A borrowed attribute value pulled out of a [`ProductSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttributeValue<'a> {
    Number(Decimal),
    Text(&'a str),
    Boolean(bool),
    Select(&'a str),
    Date(DateTime<Utc>),
}

impl ProductSnapshot {
    pub fn new(id: ProductId) -> Self {
        Self { id, ..Self::default() }
    }

    /// Price the storefront currently charges: `price`, falling back to the
    /// sale price and then the regular price.
    pub fn active_price(&self) -> Option<Money> {
        self.price.or(self.sale_price).or(self.regular_price)
    }

    pub fn attribute(&self, key: PropertyKey) -> Option<AttributeValue<'_>> {
        let number = |value: Option<Decimal>| value.map(AttributeValue::Number);
        let boolean = |value: Option<bool>| value.map(AttributeValue::Boolean);
        let date = |value: Option<DateTime<Utc>>| value.map(AttributeValue::Date);

        match key {
            PropertyKey::RegularPrice => number(self.regular_price),
            PropertyKey::SalePrice => number(self.sale_price),
            PropertyKey::Price => number(self.active_price()),
            PropertyKey::StockQuantity => number(self.stock_quantity),
            PropertyKey::Weight => number(self.weight),
            PropertyKey::Length => number(self.length),
            PropertyKey::Width => number(self.width),
            PropertyKey::Height => number(self.height),
            PropertyKey::AverageRating => number(self.average_rating),
            PropertyKey::ReviewCount => number(self.review_count),
            PropertyKey::TotalSales => number(self.total_sales),
            PropertyKey::Sku => self.sku.as_deref().map(AttributeValue::Text),
            PropertyKey::TaxClass => self.tax_class.as_deref().map(AttributeValue::Text),
            PropertyKey::ShippingClass => self.shipping_class.as_deref().map(AttributeValue::Text),
            PropertyKey::Featured => boolean(self.featured),
            PropertyKey::OnSale => boolean(self.on_sale),
            PropertyKey::Virtual => boolean(self.is_virtual),
            PropertyKey::Downloadable => boolean(self.downloadable),
            PropertyKey::StockStatus => self.stock_status.as_deref().map(AttributeValue::Select),
            PropertyKey::ProductType => self.product_type.as_deref().map(AttributeValue::Select),
            PropertyKey::TaxStatus => self.tax_status.as_deref().map(AttributeValue::Select),
            PropertyKey::DateCreated => date(self.date_created),
            PropertyKey::DateModified => date(self.date_modified),
        }
    }
}
