//! # Validation Engine
//!
//! Walks a schema's fields in declaration order against an untyped input,
//! coercing, constraint-checking and running field validators, and only then
//! running whole-instance validators. Every failure is recorded; nothing
//! short-circuits except a non-mapping input.
//!
//! Each record level (the top-level input and every nested schema value)
//! validates into its own [`ErrorCollector`] with paths relative to itself.
//! The parent absorbs a nested collector under the nested field's location,
//! so a nested failure surfaces at e.g. `customer.address.postal`.

use std::collections::BTreeSet;

use datagate_core::{FieldValue, Path, PathSegment, Record};
use serde_json::Value;

use crate::coerce::{self, CoerceMode, CoercionError};
use crate::field::{FieldDescriptor, ValidationInfo};
use crate::project::plain_value;
use crate::report::{ErrorCollector, FieldError, ValidationReport};
use crate::schema::{ExtraFields, ModelConfig, Schema, SiblingVisibility};
use crate::types::{self, Element, FieldType};

/// Validate `raw` against `schema`, producing the record or the full report.
pub(crate) fn validate(schema: &Schema, raw: &Value) -> Result<Record, ValidationReport> {
    let mut collector = ErrorCollector::new();
    let record = validate_record(schema, raw, &mut collector);
    match collector.into_report(schema.name()) {
        Some(report) => {
            tracing::debug!(schema = %schema.name(), errors = report.len(), "validation failed");
            Err(report)
        }
        None => {
            tracing::trace!(
                schema = %schema.name(),
                explicit = record.fields_set().len(),
                "validation succeeded"
            );
            Ok(record)
        }
    }
}

/// Coerce `raw` to `ty` outside of any schema, with element constraints
/// applied. Used to check declared defaults and enumerations.
///
/// # Errors
///
/// Returns every failure found, with paths relative to `raw`.
pub fn coerce_type(ty: &FieldType, raw: &Value, mode: CoerceMode) -> Result<FieldValue, Vec<FieldError>> {
    let mut collector = ErrorCollector::new();
    coerce_value(ty, raw, mode, &Path::root(), &mut collector).ok_or_else(|| collector.into_errors())
}

/// Validate one record level. The returned record is only meaningful when
/// nothing was pushed onto `collector`.
fn validate_record(schema: &Schema, raw: &Value, collector: &mut ErrorCollector) -> Record {
    let Value::Object(input) = raw else {
        collector.push(FieldError::structural(Path::root(), raw));
        return Record::new();
    };
    let config = schema.config();
    let mut record = Record::new();

    for field in schema.fields() {
        let loc = Path::root().child(field.name());
        let source = input.get(field.name());
        let (value, explicit) = match source {
            Some(raw_value) => {
                let before = collector.len();
                let mode = CoerceMode {
                    strict: field.strict().unwrap_or(config.strict),
                    strip_whitespace: config.strip_whitespace,
                };
                let Some(value) = coerce_value(field.ty(), raw_value, mode, &loc, collector) else {
                    continue;
                };
                for constraint in field.constraints() {
                    if let Err(err) = constraint.check(&value) {
                        collector.push(FieldError::constraint(loc.clone(), &err, raw_value));
                    }
                }
                if collector.len() > before {
                    continue;
                }
                (value, true)
            }
            None => match field.default() {
                None => {
                    collector.push(FieldError::missing(loc));
                    continue;
                }
                Some(default) => {
                    let value = default.produce();
                    if !field.ty().accepts(&value) {
                        collector.push(FieldError::custom(
                            loc,
                            "default_type",
                            format!("Default value should be a valid {}", field.ty()),
                            plain_value(&value),
                        ));
                        continue;
                    }
                    if !config.validate_defaults {
                        record.insert(field.name(), value, false);
                        continue;
                    }
                    (value, false)
                }
            },
        };

        if field.validators().is_empty() {
            record.insert(field.name(), value, explicit);
            continue;
        }
        let error_input = match source {
            Some(raw_value) => raw_value.clone(),
            None => plain_value(&value),
        };
        match run_field_validators(field, value, &record, config) {
            Ok(value) => record.insert(field.name(), value, explicit),
            Err((code, message)) => collector.push(FieldError::custom(loc, code, message, error_input)),
        }
    }

    if config.extra == ExtraFields::Forbid {
        for (key, value) in input {
            if schema.field(key).is_none() {
                collector.push(FieldError::extra(Path::root().child(key.as_str()), value));
            }
        }
    }

    if !collector.is_empty() {
        return record;
    }
    run_model_validators(schema, raw, record, collector)
}

fn run_field_validators(
    field: &FieldDescriptor,
    mut value: FieldValue,
    record: &Record,
    config: &ModelConfig,
) -> Result<FieldValue, (&'static str, String)> {
    let explicit;
    let data = match config.validators_see {
        SiblingVisibility::Processed => record,
        SiblingVisibility::Explicit => {
            explicit = record.explicit_only();
            &explicit
        }
    };
    let info = ValidationInfo {
        field: field.name(),
        data,
        config,
    };
    for validator in field.validators() {
        value = validator
            .call(value, &info)
            .map_err(|message| ("value_error", format!("Value error, {message}")))?;
        if !field.ty().accepts(&value) {
            return Err((
                "validator_type_changed",
                format!(
                    "Validator '{}' returned a {}, expected {}",
                    validator.name(),
                    value.kind(),
                    field.ty()
                ),
            ));
        }
    }
    Ok(value)
}

/// Run whole-instance validators in order, stopping at the first failure.
/// Provenance is carried over from the field pass.
fn run_model_validators(
    schema: &Schema,
    raw: &Value,
    mut record: Record,
    collector: &mut ErrorCollector,
) -> Record {
    for validator in schema.model_validators() {
        let provenance = record.fields_set().clone();
        match (validator.func)(record) {
            Ok(adjusted) if types::conforms(schema, &adjusted) => {
                record = restore_provenance(adjusted, &provenance);
            }
            Ok(_) => {
                collector.push(FieldError::custom(
                    Path::root(),
                    "validator_type_changed",
                    format!(
                        "Model validator '{}' changed the fields or field types of the record",
                        validator.name
                    ),
                    raw.clone(),
                ));
                return Record::new();
            }
            Err(rejection) => {
                let input = lookup(raw, &rejection.loc).cloned().unwrap_or(Value::Null);
                tracing::trace!(
                    schema = %schema.name(),
                    validator = %validator.name,
                    "model validator rejected record"
                );
                collector.push(FieldError::custom(
                    rejection.loc,
                    "value_error",
                    format!("Value error, {}", rejection.message),
                    input,
                ));
                return Record::new();
            }
        }
    }
    record
}

fn restore_provenance(adjusted: Record, provenance: &BTreeSet<String>) -> Record {
    let mut restored = Record::new();
    for (name, value) in adjusted.into_fields() {
        let explicit = provenance.contains(&name);
        restored.insert(name, value, explicit);
    }
    restored
}

fn lookup<'a>(raw: &'a Value, loc: &Path) -> Option<&'a Value> {
    loc.segments().iter().try_fold(raw, |current, segment| match segment {
        PathSegment::Key(key) => current.get(key.as_str()),
        PathSegment::Index(index) => current.get(*index),
    })
}

/// Coerce `raw` to `ty`, recording failures under `loc`. Returns `None`
/// exactly when at least one failure was recorded.
fn coerce_value(
    ty: &FieldType,
    raw: &Value,
    mode: CoerceMode,
    loc: &Path,
    collector: &mut ErrorCollector,
) -> Option<FieldValue> {
    match ty {
        FieldType::Optional(_) if raw.is_null() => Some(FieldValue::Null),
        FieldType::Optional(inner) => coerce_value(inner, raw, mode, loc, collector),
        FieldType::Scalar(scalar) => match coerce::coerce(*scalar, raw, mode) {
            Ok(value) => Some(value),
            Err(err) => {
                collector.push(FieldError::coercion(loc.clone(), &err, raw));
                None
            }
        },
        FieldType::List(element) => {
            let Value::Array(items) = raw else {
                collector.push(FieldError::coercion(loc.clone(), &CoercionError::ListType, raw));
                return None;
            };
            let mut out = Vec::with_capacity(items.len());
            let mut clean = true;
            for (index, item) in items.iter().enumerate() {
                match coerce_element(element, item, mode, &loc.child(index), collector) {
                    Some(value) => out.push(value),
                    None => clean = false,
                }
            }
            clean.then_some(FieldValue::List(out))
        }
        FieldType::Map(element) => {
            let Value::Object(entries) = raw else {
                collector.push(FieldError::coercion(loc.clone(), &CoercionError::MapType, raw));
                return None;
            };
            let mut out = Vec::with_capacity(entries.len());
            let mut clean = true;
            for (key, item) in entries {
                match coerce_element(element, item, mode, &loc.child(key.as_str()), collector) {
                    Some(value) => out.push((key.clone(), value)),
                    None => clean = false,
                }
            }
            clean.then_some(FieldValue::Map(out))
        }
        FieldType::Model(schema) => {
            let mut nested = ErrorCollector::new();
            let record = validate_record(schema, raw, &mut nested);
            if nested.is_empty() {
                Some(FieldValue::Model(record))
            } else {
                collector.absorb(nested, loc);
                None
            }
        }
    }
}

fn coerce_element(
    element: &Element,
    raw: &Value,
    mode: CoerceMode,
    loc: &Path,
    collector: &mut ErrorCollector,
) -> Option<FieldValue> {
    let value = coerce_value(&element.ty, raw, mode, loc, collector)?;
    let mut clean = true;
    for constraint in &element.constraints {
        if let Err(err) = constraint.check(&value) {
            collector.push(FieldError::constraint(loc.clone(), &err, raw));
            clean = false;
        }
    }
    clean.then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::field::Field;
    use crate::report::ErrorKind;
    use crate::schema::Rejection;
    use serde_json::json;
    use std::sync::Arc;

    fn codes(report: &ValidationReport) -> Vec<(String, &str)> {
        report
            .errors()
            .iter()
            .map(|e| (e.loc.to_string(), e.code.as_str()))
            .collect()
    }

    #[test]
    fn test_non_mapping_input_is_structural() {
        let schema = Schema::builder("User")
            .field(Field::new("id", FieldType::int()))
            .build()
            .unwrap();
        let report = schema.validate(&json!([1, 2])).unwrap_err();
        assert_eq!(report.len(), 1);
        assert_eq!(report.errors()[0].kind, ErrorKind::Structural);
        assert!(report.errors()[0].loc.is_root());
    }

    #[test]
    fn test_all_constraints_evaluated() {
        let schema = Schema::builder("Code")
            .field(
                Field::new("code", FieldType::string())
                    .constraint(Constraint::min_length(5))
                    .pattern("^[A-Z]+$"),
            )
            .build()
            .unwrap();
        let report = schema.validate(&json!({"code": "ab"})).unwrap_err();
        assert_eq!(
            codes(&report),
            vec![
                ("code".to_string(), "string_too_short"),
                ("code".to_string(), "string_pattern_mismatch"),
            ]
        );
    }

    #[test]
    fn test_element_errors_are_index_qualified() {
        let schema = Schema::builder("Bag")
            .field(Field::new(
                "counts",
                FieldType::list(Element::new(FieldType::int()).constrain(Constraint::gt(0))),
            ))
            .build()
            .unwrap();
        let report = schema.validate(&json!({"counts": [1, "x", -3]})).unwrap_err();
        assert_eq!(
            codes(&report),
            vec![
                ("counts[1]".to_string(), "int_parsing"),
                ("counts[2]".to_string(), "greater_than"),
            ]
        );
    }

    #[test]
    fn test_map_errors_are_key_qualified() {
        let schema = Schema::builder("Tastes")
            .field(Field::new("tastes", FieldType::map(FieldType::int())))
            .build()
            .unwrap();
        let report = schema.validate(&json!({"tastes": {"wine": 9, "beer": "lots"}})).unwrap_err();
        assert_eq!(codes(&report), vec![("tastes.beer".to_string(), "int_parsing")]);
    }

    #[test]
    fn test_nested_non_mapping_does_not_abort_parent() {
        let address = Schema::builder("Address")
            .field(Field::new("postal", FieldType::string()))
            .build()
            .unwrap();
        let schema = Schema::builder("Customer")
            .field(Field::new("address", FieldType::model(address)))
            .field(Field::new("age", FieldType::int()))
            .build()
            .unwrap();
        let report = schema.validate(&json!({"address": "nowhere"})).unwrap_err();
        assert_eq!(
            codes(&report),
            vec![("address".to_string(), "model_type"), ("age".to_string(), "missing")]
        );
        assert_eq!(report.errors()[0].kind, ErrorKind::Structural);
    }

    #[test]
    fn test_defaults_skip_coercion_and_constraints() {
        let schema = Schema::builder("Limits")
            .field(Field::new("max", FieldType::int()).constraint(Constraint::ge(10)).default(1i64))
            .build()
            .unwrap();
        let instance = schema.validate(&json!({})).unwrap();
        assert_eq!(instance.get("max"), Some(&FieldValue::Int(1)));
        assert!(instance.fields_set().is_empty());
    }

    #[test]
    fn test_field_validator_adjusts_value() {
        let schema = Schema::builder("User")
            .field(
                Field::new("name", FieldType::string()).validator("title_case", |value, _| {
                    let name = value.as_str().unwrap_or_default();
                    let mut chars = name.chars();
                    let titled = match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                        None => String::new(),
                    };
                    Ok(FieldValue::Str(titled))
                }),
            )
            .build()
            .unwrap();
        let instance = schema.validate(&json!({"name": "alice"})).unwrap();
        assert_eq!(instance.get("name"), Some(&FieldValue::from("Alice")));
    }

    #[test]
    fn test_field_validator_type_change_rejected() {
        let schema = Schema::builder("User")
            .field(Field::new("age", FieldType::int()).validator("stringify", |v, _| {
                Ok(FieldValue::Str(format!("{v:?}")))
            }))
            .build()
            .unwrap();
        let report = schema.validate(&json!({"age": 3})).unwrap_err();
        assert_eq!(codes(&report), vec![("age".to_string(), "validator_type_changed")]);
    }

    #[test]
    fn test_validator_sees_processed_siblings() {
        let schema = Schema::builder("Signup")
            .field(Field::new("password", FieldType::string()))
            .field(Field::new("confirm", FieldType::string()).validator("matches", |value, info| {
                if info.data.get("password") == Some(&value) {
                    Ok(value)
                } else {
                    Err("passwords do not match".into())
                }
            }))
            .build()
            .unwrap();
        assert!(schema.validate(&json!({"password": "s3cret", "confirm": "s3cret"})).is_ok());
        let report = schema
            .validate(&json!({"password": "s3cret", "confirm": "secret"}))
            .unwrap_err();
        assert_eq!(report.errors()[0].message, "Value error, passwords do not match");
        assert_eq!(report.errors()[0].input, json!("secret"));
    }

    #[test]
    fn test_validator_explicit_visibility_hides_defaults() {
        let config = ModelConfig {
            validators_see: SiblingVisibility::Explicit,
            ..ModelConfig::default()
        };
        let schema = Schema::builder("Probe")
            .config(config)
            .field(Field::new("region", FieldType::string()).default("eu"))
            .field(Field::new("probe", FieldType::boolean()).validator("sees_region", |value, info| {
                if info.data.contains("region") {
                    Err("region should be hidden".into())
                } else {
                    Ok(value)
                }
            }))
            .build()
            .unwrap();
        assert!(schema.validate(&json!({"probe": true})).is_ok());
        assert!(schema.validate(&json!({"probe": true, "region": "us"})).is_err());
    }

    #[test]
    fn test_validate_defaults_off_skips_validators() {
        let config = ModelConfig {
            validate_defaults: false,
            ..ModelConfig::default()
        };
        let schema = Schema::builder("Flags")
            .config(config)
            .field(
                Field::new("flag", FieldType::boolean())
                    .default(false)
                    .validator("never", |_, _| Err("should not run".into())),
            )
            .build()
            .unwrap();
        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({"flag": true})).is_err());
    }

    #[test]
    fn test_model_validators_only_run_when_fields_clean() {
        let schema = Schema::builder("Range")
            .field(Field::new("lo", FieldType::int()))
            .field(Field::new("hi", FieldType::int()))
            .model_validator("ordered", |record| {
                let lo = record.get("lo").and_then(FieldValue::as_int);
                let hi = record.get("hi").and_then(FieldValue::as_int);
                if lo <= hi {
                    Ok(record)
                } else {
                    Err(Rejection::new("lo must not exceed hi").at(Path::root().child("hi")))
                }
            })
            .build()
            .unwrap();
        let report = schema.validate(&json!({"lo": 5, "hi": 1})).unwrap_err();
        assert_eq!(codes(&report), vec![("hi".to_string(), "value_error")]);
        assert_eq!(report.errors()[0].input, json!(1));

        let report = schema.validate(&json!({"lo": "x", "hi": 1})).unwrap_err();
        assert_eq!(codes(&report), vec![("lo".to_string(), "int_parsing")]);
    }

    #[test]
    fn test_model_validators_stop_at_first_rejection() {
        let schema = Schema::builder("Chain")
            .field(Field::new("n", FieldType::int()))
            .model_validator("first", |_| Err("first".into()))
            .model_validator("second", |_| Err("second".into()))
            .build()
            .unwrap();
        let report = schema.validate(&json!({"n": 1})).unwrap_err();
        assert_eq!(report.len(), 1);
        assert!(report.errors()[0].loc.is_root());
    }

    #[test]
    fn test_model_validator_keeps_provenance() {
        let schema = Schema::builder("Totals")
            .field(Field::new("net", FieldType::int()))
            .field(Field::new("gross", FieldType::int()).default(0i64))
            .model_validator("derive_gross", |mut record| {
                let net = record.get("net").and_then(FieldValue::as_int).unwrap_or(0);
                record.set("gross", FieldValue::Int(net * 2));
                Ok(record)
            })
            .build()
            .unwrap();
        let instance = schema.validate(&json!({"net": 21})).unwrap();
        assert_eq!(instance.get("gross"), Some(&FieldValue::Int(42)));
        assert!(instance.record().is_set("net"));
        assert!(!instance.record().is_set("gross"));
    }

    #[test]
    fn test_model_validator_shape_change_rejected() {
        let schema = Schema::builder("Shape")
            .field(Field::new("n", FieldType::int()))
            .model_validator("sneaky", |mut record| {
                record.set("n", FieldValue::from("one"));
                Ok(record)
            })
            .build()
            .unwrap();
        let report = schema.validate(&json!({"n": 1})).unwrap_err();
        assert_eq!(codes(&report), vec![("(root)".to_string(), "validator_type_changed")]);
    }

    #[test]
    fn test_extra_forbid_reports_in_input_order() {
        let config = ModelConfig {
            extra: ExtraFields::Forbid,
            ..ModelConfig::default()
        };
        let schema = Schema::builder("Strict")
            .config(config)
            .field(Field::new("id", FieldType::int()))
            .build()
            .unwrap();
        let report = schema
            .validate(&json!({"zeta": 1, "id": "x", "alpha": 2}))
            .unwrap_err();
        assert_eq!(
            codes(&report),
            vec![
                ("id".to_string(), "int_parsing"),
                ("zeta".to_string(), "extra_forbidden"),
                ("alpha".to_string(), "extra_forbidden"),
            ]
        );
    }

    #[test]
    fn test_optional_accepts_null_and_checks_inner() {
        let schema = Schema::builder("Profile")
            .field(Field::optional("age", FieldType::int()).constraint(Constraint::ge(0)))
            .build()
            .unwrap();
        let instance = schema.validate(&json!({"age": null})).unwrap();
        assert_eq!(instance.get("age"), Some(&FieldValue::Null));
        assert!(instance.record().is_set("age"));
        assert!(schema.validate(&json!({"age": -1})).is_err());
    }

    #[test]
    fn test_factory_output_checked() {
        let schema = Schema::builder("Bad")
            .field(Field::new("n", FieldType::int()).default_factory(|| FieldValue::from("x")))
            .build()
            .unwrap();
        let report = schema.validate(&json!({})).unwrap_err();
        assert_eq!(codes(&report), vec![("n".to_string(), "default_type")]);
    }

    #[test]
    fn test_coerce_type_standalone() {
        let ty = FieldType::list(FieldType::decimal());
        let value = coerce_type(&ty, &json!(["1.5", 2]), CoerceMode::lax()).unwrap();
        assert_eq!(value.as_list().map(<[FieldValue]>::len), Some(2));
        let errors = coerce_type(&ty, &json!(["x"]), CoerceMode::lax()).unwrap_err();
        assert_eq!(errors[0].loc.to_string(), "[0]");
    }

    #[test]
    fn test_schema_shared_across_threads() {
        let schema = Schema::builder("Shared")
            .field(Field::new("n", FieldType::int()))
            .build()
            .unwrap();
        let handles: Vec<_> = (0..4i64)
            .map(|i| {
                let schema = Arc::clone(&schema);
                std::thread::spawn(move || schema.validate(&json!({"n": i})).is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
