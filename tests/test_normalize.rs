//! Field conversion and record normalization.

mod common;

use chrono::NaiveDate;
use rstest::rstest;
use serde_json::{json, Value};

use orders_sheets_sync::normalize::{to_datetime, to_integer, to_text, FieldType};
use orders_sheets_sync::{
    normalize, Cell, ConversionMode, InventoryRecord, OrderRecord, Record,
};

// ---------------------------------------------------------------------------
// Value conversions
// ---------------------------------------------------------------------------

#[rstest]
#[case(json!(3), 3)]
#[case(json!(-12), -12)]
#[case(json!(4.0), 4)]
#[case(json!("3"), 3)]
#[case(json!(" 42 "), 42)]
#[case(json!("7.0"), 7)]
#[case(json!("7.00"), 7)]
#[case(json!("12345678901234567.0"), 12345678901234567)]
#[case(json!("-9223372036854775808"), i64::MIN)]
#[case(json!(9007199254740992.0), 9007199254740992)]
fn integer_accepts_integral_values(#[case] value: Value, #[case] expected: i64) {
    assert_eq!(to_integer(&value), Ok(expected));
}

#[rstest]
#[case(json!("bad"))]
#[case(json!("3.5"))]
#[case(json!(2.25))]
#[case(json!(true))]
#[case(json!([1]))]
#[case(json!({"n": 1}))]
#[case(json!(9223372036854775808u64))]
#[case(json!("9223372036854775808"))]
#[case(json!(9223372036854775808.0))]
#[case(json!(1e300))]
#[case(json!("1e3"))]
#[case(json!("7.05"))]
fn integer_rejects_non_integral_values(#[case] value: Value) {
    assert!(to_integer(&value).is_err());
}

#[rstest]
#[case(json!("A100"), "A100")]
#[case(json!(""), "")]
#[case(json!(1001), "1001")]
#[case(json!(false), "false")]
fn text_renders_scalars(#[case] value: Value, #[case] expected: &str) {
    assert_eq!(to_text(&value).unwrap(), expected);
}

#[test]
fn text_rejects_compound_values() {
    assert!(to_text(&json!(["a"])).is_err());
    assert!(to_text(&json!({"a": 1})).is_err());
}

#[rstest]
#[case("2024-03-05T10:20:30Z")]
#[case("2024-03-05T10:20:30+05:00")]
#[case("2024-03-05T10:20:30.250")]
#[case("2024-03-05 10:20:30")]
#[case("2024-03-05T10:20:30")]
fn datetime_accepts_common_formats(#[case] raw: &str) {
    let dt = to_datetime(&json!(raw)).unwrap();
    assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert_eq!(dt.format("%H:%M:%S").to_string(), "10:20:30");
}

#[test]
fn datetime_bare_date_is_midnight() {
    let dt = to_datetime(&json!("2024-03-05")).unwrap();
    assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-05 00:00:00");
}

#[test]
fn datetime_rejects_garbage_and_numbers() {
    assert!(to_datetime(&json!("yesterday")).is_err());
    assert!(to_datetime(&json!(1709634030)).is_err());
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[test]
fn inventory_bad_quantity_defaults_to_zero() {
    let raw = common::raw_records(json!([{"sku": "SKU-1", "quantity": "bad"}]));
    let out = normalize::<InventoryRecord>(&raw, ConversionMode::Lenient).unwrap();

    assert_eq!(
        out.records,
        vec![InventoryRecord {
            sku: "SKU-1".to_string(),
            quantity: 0
        }]
    );
    assert_eq!(out.issues.len(), 1);
    let issue = &out.issues[0];
    assert_eq!(issue.index, 0);
    assert_eq!(issue.field, "quantity");
    assert_eq!(issue.expected, FieldType::Integer);
    assert_eq!(issue.value, json!("bad"));
}

#[test]
fn missing_fields_take_defaults_without_issues() {
    let raw = common::raw_records(json!([{"sku": "SKU-2"}, {"quantity": 5}, {"sku": null, "quantity": ""}]));
    let out = normalize::<InventoryRecord>(&raw, ConversionMode::Lenient).unwrap();

    assert!(out.issues.is_empty());
    assert_eq!(out.records[0].quantity, 0);
    assert_eq!(out.records[1].sku, "");
    assert_eq!(out.records[1].quantity, 5);
    assert_eq!(out.records[2], InventoryRecord { sku: String::new(), quantity: 0 });
}

#[test]
fn output_length_matches_input_length() {
    let raw = common::raw_records(json!([
        {"sku": "A", "quantity": "1"},
        {"sku": ["x"], "quantity": "nope"},
        {},
        {"sku": "D", "quantity": 4.5}
    ]));
    let out = normalize::<InventoryRecord>(&raw, ConversionMode::Lenient).unwrap();

    assert_eq!(out.records.len(), 4);
    let issue_fields: Vec<(usize, &str)> = out
        .issues
        .iter()
        .map(|i| (i.index, i.field.as_str()))
        .collect();
    assert_eq!(
        issue_fields,
        vec![(1, "sku"), (1, "quantity"), (3, "quantity")]
    );
}

#[test]
fn well_formed_inventory_is_lossless() {
    let raw = common::raw_records(json!([
        {"sku": "SKU-1", "quantity": 10},
        {"sku": "SKU-2", "quantity": "0"}
    ]));
    let out = normalize::<InventoryRecord>(&raw, ConversionMode::Lenient).unwrap();
    assert!(out.issues.is_empty());
    assert_eq!(out.records[0].sku, "SKU-1");
    assert_eq!(out.records[0].quantity, 10);
    assert_eq!(out.records[1].sku, "SKU-2");
    assert_eq!(out.records[1].quantity, 0);
}

#[test]
fn strict_mode_returns_first_failure() {
    let raw = common::raw_records(json!([
        {"sku": "ok", "quantity": 1},
        {"sku": "SKU-1", "quantity": "bad"}
    ]));
    let err = normalize::<InventoryRecord>(&raw, ConversionMode::Strict).unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.field, "quantity");
    assert!(err.to_string().contains("record 1"));
}

#[test]
fn empty_input_is_fine() {
    let out = normalize::<InventoryRecord>(&[], ConversionMode::Strict).unwrap();
    assert!(out.records.is_empty());
    assert!(out.issues.is_empty());
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

fn full_order() -> Value {
    json!({
        "id": "1",
        "order_number": "A100",
        "store_id": "5",
        "store_url": "shop.example.test",
        "Order_date": "2024-03-05T10:20:30Z",
        "updatedAt": "2024-03-06 08:00:00",
        "country": "PK",
        "full_name": "Sara Khan",
        "shipping": "Standard",
        "city": "Lahore",
        "variant_id": "9",
        "title": "Blue Mug",
        "sku": "MUG-BLUE",
        "quantity": "3",
        "payment_method": "COD",
        "status": "Delivered",
        "substatus": "",
        "tag": "repeat",
        "OP_remarks": "call before delivery",
        "Courier_tracking_id": null,
        "Landing_Tag": "spring",
        "shipment_date": "2024-03-07",
        "approved_date": null,
        "shipment_date_log": "not a date"
    })
}

#[test]
fn order_fields_are_typed() {
    let raw = common::raw_records(json!([full_order()]));
    let out = normalize::<OrderRecord>(&raw, ConversionMode::Lenient).unwrap();
    let order = &out.records[0];

    assert_eq!(order.id, 1);
    assert_eq!(order.store_id, 5);
    assert_eq!(order.variant_id, 9);
    assert_eq!(order.quantity, 3);
    assert_eq!(order.order_number, "A100");
    assert_eq!(order.op_remarks, "call before delivery");
    assert_eq!(order.substatus, "");
    assert_eq!(order.courier_tracking_id, None);
    assert_eq!(order.landing_tag.as_deref(), Some("spring"));
    assert_eq!(
        order.order_date.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-03-05 10:20:30"
    );
    assert_eq!(
        order.shipment_date.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-03-07 00:00:00"
    );
    assert_eq!(order.approved_date, None);
    assert_eq!(order.shipment_date_log, None);

    assert_eq!(out.issues.len(), 1);
    assert_eq!(out.issues[0].field, "shipment_date_log");
    assert_eq!(out.issues[0].expected, FieldType::DateTime);
}

#[test]
fn order_row_follows_schema_order() {
    let raw = common::raw_records(json!([full_order()]));
    let out = normalize::<OrderRecord>(&raw, ConversionMode::Lenient).unwrap();
    let row = out.records[0].to_row();
    let headers = OrderRecord::headers();

    assert_eq!(row.len(), headers.len());
    assert_eq!(headers[0], "id");
    assert_eq!(row[0], Cell::Int(1));
    let col = |name: &str| headers.iter().position(|h| *h == name).unwrap();
    assert_eq!(row[col("order_number")], Cell::Text("A100".into()));
    assert_eq!(row[col("quantity")], Cell::Int(3));
    assert_eq!(row[col("Courier_tracking_id")], Cell::Empty);
    assert_eq!(row[col("Order_date")], Cell::Text("2024-03-05 10:20:30".into()));
}

#[test]
fn order_schema_covers_every_field_once() {
    let headers = OrderRecord::headers();
    let mut sorted = headers.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), headers.len());
    assert_eq!(headers.len(), 24);
}
