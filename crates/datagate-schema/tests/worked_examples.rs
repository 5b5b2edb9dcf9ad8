//! End-to-end validation scenarios through the public API.

use std::sync::Arc;

use datagate_schema::{
    Constraint, DumpOptions, Element, ErrorKind, Field, FieldType, FieldValue, ModelConfig, Path,
    Rejection, Schema,
};
use serde_json::json;

fn user_schema() -> Arc<Schema> {
    Schema::builder("User")
        .field(Field::new("id", FieldType::int()))
        .field(Field::new("name", FieldType::string()).default("Doe"))
        .build()
        .unwrap()
}

#[test]
fn test_lax_coercion_and_defaults() {
    let instance = user_schema().validate(&json!({"id": "123"})).unwrap();
    assert_eq!(instance.get("id"), Some(&FieldValue::Int(123)));
    assert_eq!(instance.get("name"), Some(&FieldValue::from("Doe")));
    assert_eq!(instance.dump(&DumpOptions::new()), json!({"id": 123, "name": "Doe"}));
    assert_eq!(
        instance.dump(&DumpOptions::new().exclude_unset(true)),
        json!({"id": 123})
    );
    assert_eq!(
        instance.fields_set().iter().collect::<Vec<_>>(),
        vec!["id"]
    );
}

#[test]
fn test_single_constraint_failure() {
    let schema = Schema::builder("Person")
        .field(Field::new("age", FieldType::int()).constraint(Constraint::ge(0)))
        .build()
        .unwrap();
    let report = schema.validate(&json!({"age": -5})).unwrap_err();
    assert_eq!(report.len(), 1);
    let error = &report.errors()[0];
    assert_eq!(error.loc, Path::root().child("age"));
    assert_eq!(error.kind, ErrorKind::Constraint);
    assert_eq!(error.code, "greater_than_equal");
    assert_eq!(error.input, json!(-5));
}

#[test]
fn test_errors_accumulate_in_declaration_order() {
    let schema = Schema::builder("Taster")
        .field(Field::new("id", FieldType::int()))
        .field(Field::new("tastes", FieldType::map(FieldType::int())))
        .build()
        .unwrap();
    let report = schema.validate(&json!({"id": "not an int"})).unwrap_err();
    let summary: Vec<(String, ErrorKind)> = report
        .errors()
        .iter()
        .map(|e| (e.loc.to_string(), e.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("id".to_string(), ErrorKind::Coercion),
            ("tastes".to_string(), ErrorKind::MissingField),
        ]
    );
}

#[test]
fn test_nested_error_path_is_spliced() {
    let address = Schema::builder("Address")
        .field(Field::new("street", FieldType::string()))
        .field(Field::new("postal", FieldType::string()).pattern(r"^\d{5}$"))
        .build()
        .unwrap();
    let customer = Schema::builder("Customer")
        .field(Field::new("email", FieldType::string()).constraint(Constraint::email().unwrap()))
        .field(Field::new("address", FieldType::model(address)))
        .build()
        .unwrap();
    let order = Schema::builder("Order")
        .field(Field::new("customer", FieldType::model(customer)))
        .build()
        .unwrap();

    let report = order
        .validate(&json!({
            "customer": {
                "email": "ada@example.com",
                "address": {"street": "1 Loop Rd", "postal": "ABC"},
            }
        }))
        .unwrap_err();
    assert_eq!(report.len(), 1);
    let error = &report.errors()[0];
    assert_eq!(error.kind, ErrorKind::Constraint);
    assert_eq!(
        error.loc,
        ["customer", "address", "postal"].into_iter().collect::<Path>()
    );
    assert_eq!(error.input, json!("ABC"));
}

#[test]
fn test_order_with_items_and_totals() {
    let item = Schema::builder("OrderItem")
        .field(Field::new("product", FieldType::string()).constraint(Constraint::min_length(1)))
        .field(
            Field::new("quantity", FieldType::int())
                .constraint(Constraint::gt(0))
                .constraint(Constraint::le(100)),
        )
        .field(Field::new("price", FieldType::decimal()).constraint(Constraint::gt(0)))
        .build()
        .unwrap();
    let order = Schema::builder("Order")
        .field(Field::new("order_id", FieldType::string()).pattern(r"^ORD-\d{6}$"))
        .field(
            Field::new("items", FieldType::list(FieldType::model(item)))
                .constraint(Constraint::min_items(1)),
        )
        .field(Field::new("placed_at", FieldType::timestamp()))
        .field(Field::optional("coupon", FieldType::string()))
        .model_validator("total_cap", |record| {
            let total: i64 = record
                .get("items")
                .and_then(FieldValue::as_list)
                .unwrap_or_default()
                .iter()
                .filter_map(FieldValue::as_record)
                .filter_map(|item| item.get("quantity").and_then(FieldValue::as_int))
                .sum();
            if total > 150 {
                Err(Rejection::new(format!("order has {total} units, at most 150 allowed")))
            } else {
                Ok(record)
            }
        })
        .build()
        .unwrap();

    let instance = order
        .validate(&json!({
            "order_id": "ORD-000123",
            "items": [
                {"product": "Widget", "quantity": "2", "price": "19.99"},
                {"product": "Gadget", "quantity": 1, "price": 5},
            ],
            "placed_at": "2024-05-01 09:30",
        }))
        .unwrap();
    assert_eq!(
        instance.dump(&DumpOptions::new().exclude_none(true)),
        json!({
            "order_id": "ORD-000123",
            "items": [
                {"product": "Widget", "quantity": 2, "price": "19.99"},
                {"product": "Gadget", "quantity": 1, "price": "5"},
            ],
            "placed_at": "2024-05-01T09:30:00Z",
        })
    );

    let report = order
        .validate(&json!({
            "order_id": "ORD-1",
            "items": [
                {"product": "", "quantity": 0, "price": "-1"},
                {"product": "Gadget", "quantity": 1},
            ],
            "placed_at": "soon",
        }))
        .unwrap_err();
    let locs: Vec<String> = report.errors().iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(
        locs,
        vec![
            "order_id",
            "items[0].product",
            "items[0].quantity",
            "items[0].price",
            "items[1].price",
            "placed_at",
        ]
    );

    let report = order
        .validate(&json!({
            "order_id": "ORD-000124",
            "items": [
                {"product": "Bolt", "quantity": 100, "price": "0.10"},
                {"product": "Nut", "quantity": 100, "price": "0.05"},
            ],
            "placed_at": "2024-05-01T09:30:00Z",
        }))
        .unwrap_err();
    assert_eq!(report.len(), 1);
    assert!(report.errors()[0].loc.is_root());
    assert_eq!(
        report.errors()[0].message,
        "Value error, order has 200 units, at most 150 allowed"
    );
}

#[test]
fn test_strict_schema_rejects_lax_inputs() {
    let schema = Schema::builder("Strict")
        .config(ModelConfig {
            strict: true,
            ..ModelConfig::default()
        })
        .field(Field::new("id", FieldType::int()))
        .field(Field::new("active", FieldType::boolean()))
        .field(Field::new("ratio", FieldType::float()).strict(false))
        .build()
        .unwrap();
    let report = schema
        .validate(&json!({"id": "1", "active": "true", "ratio": "0.5"}))
        .unwrap_err();
    let codes: Vec<&str> = report.errors().iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, vec!["int_type", "bool_type"]);
}

#[test]
fn test_strip_whitespace_applies_before_constraints() {
    let schema = Schema::builder("Login")
        .config(ModelConfig {
            strip_whitespace: true,
            ..ModelConfig::default()
        })
        .field(Field::new("user", FieldType::string()).constraint(Constraint::max_length(5)))
        .build()
        .unwrap();
    let instance = schema.validate(&json!({"user": "  alice  "})).unwrap();
    assert_eq!(instance.get("user"), Some(&FieldValue::from("alice")));
}

#[test]
fn test_element_constraints_on_mapping_values() {
    let schema = Schema::builder("Inventory")
        .field(Field::new(
            "stock",
            FieldType::map(Element::new(FieldType::int()).constrain(Constraint::ge(0))),
        ))
        .build()
        .unwrap();
    let report = schema
        .validate(&json!({"stock": {"bolts": 10, "nuts": -2, "gears": "x"}}))
        .unwrap_err();
    let summary: Vec<(String, &str)> = report
        .errors()
        .iter()
        .map(|e| (e.loc.to_string(), e.code.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("stock.nuts".to_string(), "greater_than_equal"),
            ("stock.gears".to_string(), "int_parsing"),
        ]
    );
}

#[test]
fn test_report_serializes_as_error_list() {
    let report = user_schema().validate(&json!({"id": [1]})).unwrap_err();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(
        json,
        json!({
            "schema": "User",
            "errors": [{
                "loc": ["id"],
                "kind": "coercion",
                "code": "int_type",
                "msg": "Input should be a valid integer",
                "input": [1],
            }],
        })
    );
    assert!(report.to_string().starts_with("1 validation error for schema 'User':"));
}
