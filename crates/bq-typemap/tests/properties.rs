//! Property tests across parsing, conversion and batching.

use bq_typemap::batch::{BatchLimits, ColumnValue, PendingWriteCommand, TableRef, WriteBatchPlanner};
use bq_typemap::core::{Fields, Geography, ModelValue, RecordValue, TypeDescriptor, WireValue};
use bq_typemap::typemap::{FieldSpec, RecordShape};
use bq_typemap::{parse_store_type, ModelType, TypeMappingRegistry};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =========================================================================
// Strategies
// =========================================================================

/// Scalar spellings accepted by the grammar, including argument lists and
/// non-canonical casing.
const GRAMMAR_SCALARS: &[&str] = &[
    "INT64",
    "STRING",
    "BOOL",
    "FLOAT64",
    "DATE",
    "DATETIME",
    "TIME",
    "BYTES",
    "TIMESTAMP",
    "JSON",
    "GEOGRAPHY",
    "BIGNUMERIC",
    "NUMERIC(38, 9)",
    "STRING(100)",
    "int64",
];

/// Scalars with a value strategy in `arb_scalar`.
const VALUE_SCALARS: &[&str] = &[
    "INT64",
    "STRING",
    "BOOL",
    "FLOAT64",
    "NUMERIC",
    "BIGNUMERIC",
    "DATE",
    "DATETIME",
    "TIMESTAMP",
    "TIME",
    "BYTES",
    "JSON",
];

/// Value scalars the default registry resolves.
fn value_scalars() -> Vec<&'static str> {
    let mut scalars = VALUE_SCALARS.to_vec();
    if cfg!(feature = "spatial") {
        scalars.push("GEOGRAPHY");
    }
    scalars
}

/// Days from the common era of 0001-01-01 and 9999-12-31.
const FIRST_DAY: i32 = 1;
const LAST_DAY: i32 = 3_652_059;

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (FIRST_DAY..=LAST_DAY).prop_map(|days| NaiveDate::from_num_days_from_ce_opt(days).unwrap())
}

fn arb_time() -> impl Strategy<Value = NaiveTime> {
    (0u32..86_400, 0u32..1_000_000).prop_map(|(secs, micros)| {
        NaiveTime::from_num_seconds_from_midnight_opt(secs, micros * 1_000).unwrap()
    })
}

fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        r#"[a-z "\\\n]{0,6}"#.prop_map(serde_json::Value::from),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(serde_json::Value::from),
            prop::collection::vec(("[a-z]{1,3}", inner), 0..3)
                .prop_map(|entries| serde_json::Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn arb_scalar(name: &str) -> BoxedStrategy<ModelValue> {
    match name {
        "INT64" => any::<i64>().prop_map(ModelValue::Int64).boxed(),
        "STRING" => ".{0,8}".prop_map(ModelValue::String).boxed(),
        "BOOL" => any::<bool>().prop_map(ModelValue::Bool).boxed(),
        "FLOAT64" => (-1.0e9f64..1.0e9).prop_map(ModelValue::Float64).boxed(),
        "NUMERIC" | "BIGNUMERIC" => (any::<i64>(), 0u32..10)
            .prop_map(|(mantissa, scale)| ModelValue::Numeric(Decimal::new(mantissa, scale)))
            .boxed(),
        "DATE" => arb_date().prop_map(ModelValue::Date).boxed(),
        "DATETIME" => (arb_date(), arb_time())
            .prop_map(|(date, time)| ModelValue::DateTime(NaiveDateTime::new(date, time)))
            .boxed(),
        "TIMESTAMP" => (-62_135_596_800_000_000i64..253_402_300_800_000_000)
            .prop_map(|micros| ModelValue::Timestamp(DateTime::from_timestamp_micros(micros).unwrap()))
            .boxed(),
        "TIME" => arb_time().prop_map(ModelValue::Time).boxed(),
        "BYTES" => prop::collection::vec(any::<u8>(), 0..16)
            .prop_map(ModelValue::Bytes)
            .boxed(),
        "JSON" => arb_json().prop_map(ModelValue::Json).boxed(),
        "GEOGRAPHY" => (-180i32..180, -90i32..90)
            .prop_map(|(x, y)| ModelValue::Geography(Geography::from_wkt(format!("POINT({} {})", x, y))))
            .boxed(),
        other => unreachable!("no value strategy for {}", other),
    }
}

fn arb_field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[A-Za-z_][A-Za-z0-9_]{0,6}",
        1 => "[a-z][a-z ,<>()]{0,4}[a-z]",
    ]
}

fn arb_grammar_descriptor() -> impl Strategy<Value = TypeDescriptor> {
    let leaf = prop::sample::select(GRAMMAR_SCALARS).prop_map(TypeDescriptor::scalar);
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeDescriptor::array),
            prop::collection::vec((arb_field_name(), inner), 0..4)
                .prop_map(|fields| TypeDescriptor::structure(fields)),
        ]
    })
}

/// Descriptors the builtin registry resolves; struct field names are unique
/// ignoring case and use mixed casing.
fn arb_value_descriptor() -> impl Strategy<Value = TypeDescriptor> {
    let leaf = prop::sample::select(value_scalars()).prop_map(TypeDescriptor::scalar);
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeDescriptor::array),
            prop::collection::vec(inner, 0..4).prop_map(|types| {
                TypeDescriptor::structure(
                    types
                        .into_iter()
                        .enumerate()
                        .map(|(i, ty)| (format!("Field{}", i), ty)),
                )
            }),
        ]
    })
}

fn arb_value(desc: &TypeDescriptor) -> BoxedStrategy<ModelValue> {
    let present = match desc {
        TypeDescriptor::Scalar(name) => arb_scalar(name),
        TypeDescriptor::Array(element) => prop::collection::vec(arb_value(element), 0..3)
            .prop_map(ModelValue::List)
            .boxed(),
        TypeDescriptor::Struct(fields) => {
            let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
            let values: Vec<BoxedStrategy<ModelValue>> =
                fields.iter().map(|f| arb_value(&f.ty)).collect();
            values
                .prop_map(move |vs| {
                    ModelValue::Anonymous(names.iter().cloned().zip(vs).collect())
                })
                .boxed()
        }
    };
    prop_oneof![1 => Just(ModelValue::Null), 6 => present].boxed()
}

fn arb_typed_value() -> impl Strategy<Value = (TypeDescriptor, ModelValue)> {
    arb_value_descriptor().prop_flat_map(|desc| {
        let values = arb_value(&desc);
        (Just(desc), values)
    })
}

/// Lower-case every struct field name, as the service does in responses.
fn lowercase_names(wire: &WireValue) -> WireValue {
    match wire {
        WireValue::Array(items) => WireValue::Array(items.iter().map(lowercase_names).collect()),
        WireValue::Struct(fields) => {
            let lowered: Fields<WireValue> = fields
                .iter()
                .map(|(name, v)| (name.to_lowercase(), lowercase_names(v)))
                .collect();
            WireValue::Struct(lowered)
        }
        other => other.clone(),
    }
}

// =========================================================================
// Registered record layouts
// =========================================================================

/// Property layout of a registered record tree.
#[derive(Debug, Clone)]
enum Layout {
    Scalar(&'static str),
    List(Box<Layout>),
    /// Properties `Field{i}` with their required flag.
    Record {
        name: String,
        fields: Vec<(Layout, bool)>,
    },
}

fn arb_layout() -> impl Strategy<Value = Layout> {
    let leaf = prop::sample::select(value_scalars()).prop_map(Layout::Scalar);
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|element| Layout::List(Box::new(element))),
            prop::collection::vec((inner, any::<bool>()), 1..4).prop_map(|fields| Layout::Record {
                name: String::new(),
                fields,
            }),
        ]
    })
}

fn name_records(layout: &mut Layout, next: &mut usize) {
    match layout {
        Layout::Scalar(_) => {}
        Layout::List(element) => name_records(element, next),
        Layout::Record { name, fields } => {
            *name = format!("Rec{}", next);
            *next += 1;
            for (field, _) in fields {
                name_records(field, next);
            }
        }
    }
}

/// Store type generated from the layout, in property order.
fn layout_descriptor(layout: &Layout) -> TypeDescriptor {
    match layout {
        Layout::Scalar(name) => TypeDescriptor::scalar(*name),
        Layout::List(element) => TypeDescriptor::array(layout_descriptor(element)),
        Layout::Record { fields, .. } => TypeDescriptor::structure(
            fields
                .iter()
                .enumerate()
                .map(|(i, (field, _))| (format!("Field{}", i), layout_descriptor(field))),
        ),
    }
}

/// Same store type with struct fields rotated and lower-cased, as an
/// existing table may declare them.
fn store_order(layout: &Layout, seed: &mut u64) -> TypeDescriptor {
    match layout {
        Layout::Scalar(name) => TypeDescriptor::scalar(*name),
        Layout::List(element) => TypeDescriptor::array(store_order(element, seed)),
        Layout::Record { fields, .. } => {
            *seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let shift = (*seed >> 33) as usize % fields.len();
            let mut named: Vec<(String, TypeDescriptor)> = fields
                .iter()
                .enumerate()
                .map(|(i, (field, _))| (format!("field{}", i), store_order(field, seed)))
                .collect();
            named.rotate_left(shift);
            TypeDescriptor::structure(named)
        }
    }
}

/// Register every record in the layout and return the root model type.
///
/// Decimal properties default to NUMERIC, so properties holding BIGNUMERIC
/// name their store type.
fn register_layout(registry: &mut TypeMappingRegistry, layout: &Layout) -> ModelType {
    match layout {
        Layout::Scalar(name) => registry
            .find_store_mapping(name)
            .unwrap()
            .model_type()
            .clone(),
        Layout::List(element) => ModelType::list(register_layout(registry, element)),
        Layout::Record { name, fields } => {
            let mut shape = RecordShape::new(name.as_str());
            for (i, (field, required)) in fields.iter().enumerate() {
                let mut spec = FieldSpec::new(format!("Field{}", i), register_layout(registry, field));
                if *required {
                    spec = spec.required();
                }
                let store_type = layout_descriptor(field).to_string();
                if store_type.contains("BIGNUMERIC") {
                    spec = spec.with_store_type(store_type);
                }
                shape = shape.field(spec);
            }
            registry.register_record(shape).unwrap();
            ModelType::record(name.as_str())
        }
    }
}

fn arb_layout_value(layout: &Layout) -> BoxedStrategy<ModelValue> {
    match layout {
        Layout::Scalar(name) => arb_scalar(name),
        Layout::List(element) => prop::collection::vec(arb_property_value(element, false), 0..3)
            .prop_map(ModelValue::List)
            .boxed(),
        Layout::Record { name, fields } => {
            let name = name.clone();
            let values: Vec<BoxedStrategy<ModelValue>> = fields
                .iter()
                .map(|(field, required)| arb_property_value(field, *required))
                .collect();
            values
                .prop_map(move |vs| {
                    let record = vs
                        .into_iter()
                        .enumerate()
                        .fold(RecordValue::new(name.as_str()), |record, (i, v)| {
                            record.with(format!("Field{}", i), v)
                        });
                    ModelValue::Record(record)
                })
                .boxed()
        }
    }
}

fn arb_property_value(layout: &Layout, required: bool) -> BoxedStrategy<ModelValue> {
    if required {
        arb_layout_value(layout)
    } else {
        prop_oneof![1 => Just(ModelValue::Null), 6 => arb_layout_value(layout)].boxed()
    }
}

/// A root record layout (up to four levels deep) with a value of it.
fn arb_record_case() -> impl Strategy<Value = (Layout, ModelValue)> {
    prop::collection::vec((arb_layout(), any::<bool>()), 1..4)
        .prop_map(|fields| {
            let mut root = Layout::Record {
                name: String::new(),
                fields,
            };
            name_records(&mut root, &mut 0);
            root
        })
        .prop_flat_map(|layout| {
            let value = arb_layout_value(&layout);
            (Just(layout), value)
        })
}

fn json_len<T: serde::Serialize>(value: &T) -> usize {
    serde_json::to_string(value).unwrap().len()
}

// =========================================================================
// Properties
// =========================================================================

proptest! {
    #[test]
    fn test_display_parses_back(desc in arb_grammar_descriptor()) {
        let text = desc.to_string();
        let parsed = parse_store_type(&text);
        prop_assert!(parsed.is_ok(), "failed to parse {}: {:?}", text, parsed);
        prop_assert_eq!(parsed.unwrap(), desc);
    }

    #[test]
    fn test_wire_round_trip((desc, value) in arb_typed_value()) {
        let registry = TypeMappingRegistry::with_builtins();
        let mapping = registry.find_store_mapping(&desc.to_string()).unwrap();

        let wire = mapping.to_wire(&value).unwrap();
        let back = mapping.from_wire(&wire).unwrap();
        prop_assert!(
            mapping.values_equal(&value, &back),
            "{} round trip changed {:?} into {:?}",
            desc,
            value,
            back
        );
    }

    #[test]
    fn test_lowercase_wire_names_decode_identically((desc, value) in arb_typed_value()) {
        let registry = TypeMappingRegistry::with_builtins();
        let mapping = registry.find_store_mapping(&desc.to_string()).unwrap();

        let wire = mapping.to_wire(&value).unwrap();
        let exact = mapping.from_wire(&wire).unwrap();
        let lowered = mapping.from_wire(&lowercase_names(&wire)).unwrap();
        prop_assert!(mapping.values_equal(&exact, &lowered));
    }

    #[test]
    fn test_literal_renders_for_every_value((desc, value) in arb_typed_value()) {
        let registry = TypeMappingRegistry::with_builtins();
        let mapping = registry.find_store_mapping(&desc.to_string()).unwrap();

        let literal = mapping.generate_literal(&value).unwrap();
        if value.is_null() {
            prop_assert_eq!(literal, "NULL");
        } else if desc.is_composite() {
            prop_assert!(literal.starts_with(mapping.store_type()));
        }
    }

    #[test]
    fn test_wire_estimate_covers_json_encoding((desc, value) in arb_typed_value()) {
        let registry = TypeMappingRegistry::with_builtins();
        let mapping = registry.find_store_mapping(&desc.to_string()).unwrap();

        let wire = mapping.to_wire(&value).unwrap();
        prop_assert!(
            json_len(&wire) <= wire.estimated_size(),
            "{} encodes to {} bytes, estimated {}",
            desc,
            json_len(&wire),
            wire.estimated_size()
        );
    }

    #[test]
    fn test_registered_records_round_trip((layout, value) in arb_record_case()) {
        let mut registry = TypeMappingRegistry::with_builtins();
        let model = register_layout(&mut registry, &layout);
        let mapping = registry.find_mapping(&model).unwrap();
        prop_assert_eq!(mapping.store_type(), layout_descriptor(&layout).to_string());

        let wire = mapping.to_wire(&value).unwrap();
        let back = mapping.from_wire(&wire).unwrap();
        prop_assert!(
            mapping.values_equal(&value, &back),
            "{} round trip changed {:?} into {:?}",
            mapping.store_type(),
            value,
            back
        );

        let lowered = mapping.from_wire(&lowercase_names(&wire)).unwrap();
        prop_assert!(mapping.values_equal(&value, &lowered));
    }

    #[test]
    fn test_registered_records_follow_store_order(
        (layout, value) in arb_record_case(),
        seed in any::<u64>(),
    ) {
        let mut registry = TypeMappingRegistry::with_builtins();
        let model = register_layout(&mut registry, &layout);
        let store = store_order(&layout, &mut seed.clone());
        let mapping = registry.find_mapping_for(&model, &store.to_string()).unwrap();
        prop_assert_eq!(mapping.store_type(), store.to_string());

        let wire = mapping.to_wire(&value).unwrap();
        let (WireValue::Struct(written), TypeDescriptor::Struct(declared)) = (&wire, &store) else {
            return Err(TestCaseError::fail(format!("expected a struct, got {:?}", wire)));
        };
        let written: Vec<&str> = written.iter().map(|(name, _)| name).collect();
        let declared: Vec<&str> = declared.iter().map(|f| f.name.as_str()).collect();
        prop_assert_eq!(written, declared);

        let back = mapping.from_wire(&wire).unwrap();
        prop_assert!(mapping.values_equal(&value, &back));

        let literal = mapping.generate_literal(&value).unwrap();
        prop_assert!(literal.starts_with(mapping.store_type()));
    }

    #[test]
    fn test_batches_respect_limits(
        names in prop::collection::vec(r#"[a-z\\"\x00-\x1f]{0,120}"#, 1..40),
        literal_rows in prop::collection::vec(any::<bool>(), 40),
        max_payload_bytes in 300usize..3000,
        max_parameters in 2usize..20,
    ) {
        let registry = TypeMappingRegistry::with_builtins();
        let id = registry.find_mapping(&ModelType::Int64).unwrap();
        let name = registry.find_mapping(&ModelType::String).unwrap();
        let limits = BatchLimits {
            max_payload_bytes,
            max_parameters,
            row_overhead_bytes: 8,
        };

        let mut planner = WriteBatchPlanner::new(limits);
        let mut accepted_rows = 0;
        let mut bound_ids = Vec::new();
        for (i, text) in names.iter().enumerate() {
            let column = ColumnValue::new("name", name.clone(), text.as_str());
            let column = if literal_rows[i] { column.as_literal() } else { column };
            let command = PendingWriteCommand::insert(TableRef::new("people"))
                .column("id", id.clone(), i as i64)
                .with_column(column);
            if planner.add(command).is_ok() {
                accepted_rows += 1;
                if !literal_rows[i] {
                    bound_ids.push(i as i64);
                }
            }
        }

        let batches = planner.finish();
        let mut written = Vec::new();
        for batch in &batches {
            prop_assert!(batch.estimated_bytes <= max_payload_bytes);
            prop_assert!(batch.parameters.len() <= max_parameters);
            let bound: usize = batch.parameters.iter().map(|p| p.estimated_size()).sum();
            prop_assert!(batch.sql.len() + bound <= batch.estimated_bytes);

            let encoded: usize =
                json_len(&batch.sql) + batch.parameters.iter().map(|p| json_len(&p.value)).sum::<usize>();
            prop_assert!(
                encoded <= batch.estimated_bytes,
                "statement encodes to {} bytes, estimated {}",
                encoded,
                batch.estimated_bytes
            );

            for (i, parameter) in batch.parameters.iter().enumerate() {
                prop_assert_eq!(&parameter.name, &format!("p{}", i));
                prop_assert!(json_len(&parameter.value) <= parameter.estimated_size());
                if let WireValue::Int64(v) = parameter.value {
                    written.push(v);
                }
            }
        }
        prop_assert_eq!(batches.iter().map(|b| b.row_count()).sum::<usize>(), accepted_rows);
        prop_assert_eq!(written, bound_ids);
    }
}
