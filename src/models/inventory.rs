use serde::{Deserialize, Serialize};

use crate::normalize::{ConversionError, Field, FieldReader, FieldType, Record};
use crate::sheets::Cell;

// ---------------------------------------------------------------------------
// InventoryRecord — Stock level for one SKU
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: String,
    pub quantity: i64,
}

const INVENTORY_SCHEMA: &[Field] = &[
    Field::new("sku", FieldType::Text),
    Field::new("quantity", FieldType::Integer),
];

impl Record for InventoryRecord {
    const DATASET: &'static str = "inventory";

    fn schema() -> &'static [Field] {
        INVENTORY_SCHEMA
    }

    fn from_raw(reader: &mut FieldReader<'_>) -> Result<Self, ConversionError> {
        Ok(Self {
            sku: reader.text("sku")?,
            quantity: reader.integer("quantity")?,
        })
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![Cell::from(&self.sku), Cell::Int(self.quantity)]
    }
}
