//! GEOGRAPHY support.
//!
//! Registers a scalar codec mapping `ModelType::Opaque("Geography")` to the
//! `GEOGRAPHY` store type. Values travel as Well-Known Text and are always
//! written as `ST_GEOGFROMTEXT('...')` literals.

use crate::core::identifier::quote_string;
use crate::core::{Geography, ModelValue, WireValue};
use crate::dialect::scalar::ScalarCodec;
use crate::error::{Result, TypeMapError};
use crate::typemap::{ModelType, TypeMappingRegistry};

/// Model type name used for spatial values.
pub const GEOGRAPHY_MODEL: &str = "Geography";

/// Codec for the `GEOGRAPHY` store type.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeographyCodec;

/// Collapse whitespace and upper-case so equivalent WKT compares equal.
fn normalize_wkt(wkt: &str) -> String {
    let mut out = String::with_capacity(wkt.len());
    for token in wkt.split_whitespace() {
        let joined = out.is_empty()
            || out.ends_with(&['(', ','][..])
            || token.starts_with(&['(', ')', ','][..]);
        if !joined {
            out.push(' ');
        }
        out.push_str(&token.to_ascii_uppercase());
    }
    out
}

impl GeographyCodec {
    fn wkt<'a>(&self, value: &'a ModelValue) -> Result<&'a str> {
        match value {
            ModelValue::Geography(g) => Ok(g.as_wkt()),
            ModelValue::String(s) => Ok(s),
            other => Err(TypeMapError::field_mismatch(
                "",
                format!("expected GEOGRAPHY value, found {}", other.kind()),
            )),
        }
    }
}

impl ScalarCodec for GeographyCodec {
    fn store_type(&self) -> &str {
        "GEOGRAPHY"
    }

    fn model_type(&self) -> ModelType {
        ModelType::opaque(GEOGRAPHY_MODEL)
    }

    fn to_wire(&self, value: &ModelValue) -> Result<WireValue> {
        Ok(WireValue::Geography(self.wkt(value)?.to_string()))
    }

    fn from_wire(&self, wire: &WireValue) -> Result<ModelValue> {
        match wire {
            WireValue::Geography(wkt) | WireValue::String(wkt) => {
                Ok(ModelValue::Geography(Geography::from_wkt(wkt.clone())))
            }
            other => Err(TypeMapError::field_mismatch(
                "",
                format!("expected GEOGRAPHY value, found {}", other.kind()),
            )),
        }
    }

    fn literal(&self, value: &ModelValue) -> Result<String> {
        Ok(format!("ST_GEOGFROMTEXT({})", quote_string(self.wkt(value)?)))
    }

    fn values_equal(&self, a: &ModelValue, b: &ModelValue) -> bool {
        match (self.wkt(a), self.wkt(b)) {
            (Ok(x), Ok(y)) => normalize_wkt(x) == normalize_wkt(y),
            _ => a == b,
        }
    }

    fn requires_literal(&self) -> bool {
        true
    }
}

/// Register the GEOGRAPHY codec.
pub fn register(registry: &mut TypeMappingRegistry) {
    registry.register_scalar(GeographyCodec);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        let value = ModelValue::Geography(Geography::from_wkt("POINT(-122.35 47.62)"));
        assert_eq!(
            GeographyCodec.literal(&value).unwrap(),
            "ST_GEOGFROMTEXT('POINT(-122.35 47.62)')"
        );
    }

    #[test]
    fn test_from_wire_accepts_text() {
        let decoded = GeographyCodec
            .from_wire(&WireValue::String("POINT(1 2)".into()))
            .unwrap();
        assert_eq!(decoded, ModelValue::Geography(Geography::from_wkt("POINT(1 2)")));
    }

    #[test]
    fn test_equality_normalizes_whitespace() {
        let a = ModelValue::Geography(Geography::from_wkt("POINT(1 2)"));
        let b = ModelValue::Geography(Geography::from_wkt("point( 1   2 )"));
        let c = ModelValue::Geography(Geography::from_wkt("POINT(2 1)"));
        assert!(GeographyCodec.values_equal(&a, &b));
        assert!(!GeographyCodec.values_equal(&a, &c));
    }

    #[test]
    fn test_always_literal() {
        assert!(GeographyCodec.requires_literal());
    }

    #[test]
    fn test_register() {
        let mut registry = TypeMappingRegistry::new();
        register(&mut registry);
        let mapping = registry.find_store_mapping("geography").unwrap();
        assert!(mapping.requires_literal());
        assert_eq!(mapping.model_type(), &ModelType::opaque(GEOGRAPHY_MODEL));
    }
}
