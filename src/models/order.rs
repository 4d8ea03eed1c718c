use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::normalize::{ConversionError, Field, FieldReader, FieldType, Record};
use crate::sheets::Cell;

// ---------------------------------------------------------------------------
// OrderRecord — One order line as returned by the orders endpoint
// ---------------------------------------------------------------------------

/// `id` is expected to be unique but nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub order_number: String,
    pub store_id: i64,
    pub store_url: String,
    #[serde(rename = "Order_date")]
    pub order_date: Option<NaiveDateTime>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<NaiveDateTime>,
    pub country: String,
    pub full_name: String,
    pub shipping: String,
    pub city: String,
    pub variant_id: i64,
    pub title: String,
    pub sku: String,
    pub quantity: i64,
    pub payment_method: String,
    pub status: String,
    pub substatus: String,
    pub tag: String,
    #[serde(rename = "OP_remarks")]
    pub op_remarks: String,
    #[serde(rename = "Courier_tracking_id")]
    pub courier_tracking_id: Option<String>,
    #[serde(rename = "Landing_Tag")]
    pub landing_tag: Option<String>,
    pub shipment_date: Option<NaiveDateTime>,
    pub approved_date: Option<NaiveDateTime>,
    pub shipment_date_log: Option<NaiveDateTime>,
}

const ORDER_SCHEMA: &[Field] = &[
    Field::new("id", FieldType::Integer),
    Field::new("order_number", FieldType::Text),
    Field::new("store_id", FieldType::Integer),
    Field::new("store_url", FieldType::Text),
    Field::new("Order_date", FieldType::DateTime),
    Field::new("updatedAt", FieldType::DateTime),
    Field::new("country", FieldType::Text),
    Field::new("full_name", FieldType::Text),
    Field::new("shipping", FieldType::Text),
    Field::new("city", FieldType::Text),
    Field::new("variant_id", FieldType::Integer),
    Field::new("title", FieldType::Text),
    Field::new("sku", FieldType::Text),
    Field::new("quantity", FieldType::Integer),
    Field::new("payment_method", FieldType::Text),
    Field::new("status", FieldType::Text),
    Field::new("substatus", FieldType::Text),
    Field::new("tag", FieldType::Text),
    Field::new("OP_remarks", FieldType::Text),
    Field::new("Courier_tracking_id", FieldType::NullableText),
    Field::new("Landing_Tag", FieldType::NullableText),
    Field::new("shipment_date", FieldType::DateTime),
    Field::new("approved_date", FieldType::DateTime),
    Field::new("shipment_date_log", FieldType::DateTime),
];

impl Record for OrderRecord {
    const DATASET: &'static str = "orders";

    fn schema() -> &'static [Field] {
        ORDER_SCHEMA
    }

    fn from_raw(r: &mut FieldReader<'_>) -> Result<Self, ConversionError> {
        Ok(Self {
            id: r.integer("id")?,
            order_number: r.text("order_number")?,
            store_id: r.integer("store_id")?,
            store_url: r.text("store_url")?,
            order_date: r.datetime("Order_date")?,
            updated_at: r.datetime("updatedAt")?,
            country: r.text("country")?,
            full_name: r.text("full_name")?,
            shipping: r.text("shipping")?,
            city: r.text("city")?,
            variant_id: r.integer("variant_id")?,
            title: r.text("title")?,
            sku: r.text("sku")?,
            quantity: r.integer("quantity")?,
            payment_method: r.text("payment_method")?,
            status: r.text("status")?,
            substatus: r.text("substatus")?,
            tag: r.text("tag")?,
            op_remarks: r.text("OP_remarks")?,
            courier_tracking_id: r.nullable_text("Courier_tracking_id")?,
            landing_tag: r.nullable_text("Landing_Tag")?,
            shipment_date: r.datetime("shipment_date")?,
            approved_date: r.datetime("approved_date")?,
            shipment_date_log: r.datetime("shipment_date_log")?,
        })
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::Int(self.id),
            Cell::from(&self.order_number),
            Cell::Int(self.store_id),
            Cell::from(&self.store_url),
            Cell::from(&self.order_date),
            Cell::from(&self.updated_at),
            Cell::from(&self.country),
            Cell::from(&self.full_name),
            Cell::from(&self.shipping),
            Cell::from(&self.city),
            Cell::Int(self.variant_id),
            Cell::from(&self.title),
            Cell::from(&self.sku),
            Cell::Int(self.quantity),
            Cell::from(&self.payment_method),
            Cell::from(&self.status),
            Cell::from(&self.substatus),
            Cell::from(&self.tag),
            Cell::from(&self.op_remarks),
            Cell::from(&self.courier_tracking_id),
            Cell::from(&self.landing_tag),
            Cell::from(&self.shipment_date),
            Cell::from(&self.approved_date),
            Cell::from(&self.shipment_date_log),
        ]
    }
}
