//! Scalar rewrites and format directives.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::{Number, Value as Json};
use vc_graph::Value;
use vc_schema::{Format, IdGenerator, IdentityDecl, PropertyDescriptor, Role, Shape};
use vc_schema::TypeDescriptor;

use crate::SerializeFeatures;

/// `2^53 - 1`, the largest integer a double holds exactly.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
/// `-(2^53 - 1)`.
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

// -----------------------------------------------------------------------------
// Special cases

/// Rewrites of non-finite floats and dates enabled by `features`.
///
/// Returns `None` when the value passes through unchanged.
pub(crate) fn special_case(value: &Value, features: SerializeFeatures) -> Option<Value> {
    match *value {
        Value::Float(f) if f.is_nan() && features.contains(SerializeFeatures::WRITE_NAN_AS_ZERO) => {
            Some(Value::Int(0))
        }
        Value::Float(f)
            if f == f64::INFINITY
                && features.contains(
                    SerializeFeatures::WRITE_POSITIVE_INFINITY_AS_NUMBER_MAX_SAFE_INTEGER,
                ) =>
        {
            Some(Value::Int(MAX_SAFE_INTEGER))
        }
        Value::Float(f)
            if f == f64::NEG_INFINITY
                && features.contains(
                    SerializeFeatures::WRITE_NEGATIVE_INFINITY_AS_NUMBER_MIN_SAFE_INTEGER,
                ) =>
        {
            Some(Value::Int(MIN_SAFE_INTEGER))
        }
        Value::Date(ms) if features.contains(SerializeFeatures::WRITE_DATES_AS_TIMESTAMPS) => {
            Some(Value::Int(ms))
        }
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Dates

/// RFC 3339 text with millisecond precision in UTC.
pub(crate) fn date_to_text(ms: i64) -> Result<String, String> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| format!("date {ms} is out of range"))
}

/// Formats with a `chrono` strftime pattern, in UTC.
pub(crate) fn date_with_pattern(ms: i64, pattern: &str) -> Result<String, String> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format(pattern).to_string())
        .ok_or_else(|| format!("date {ms} is out of range"))
}

/// Parses RFC 3339 text, or text matching `pattern` (a date-time, or a bare
/// date taken at midnight UTC).
pub(crate) fn date_from_text(text: &str, pattern: Option<&str>) -> Result<i64, String> {
    if let Some(pattern) = pattern {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(dt.and_utc().timestamp_millis());
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, pattern)
            && let Some(dt) = date.and_hms_opt(0, 0, 0)
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
        return Err(format!("`{text}` does not match the date pattern `{pattern}`"));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("`{text}` is not an RFC 3339 date: {e}"))
}

// -----------------------------------------------------------------------------
// Output shapes

fn truthy(json: &Json) -> bool {
    match json {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(items) => !items.is_empty(),
        Json::Object(map) => !map.is_empty(),
    }
}

/// Applies a format directive to an already written value.
///
/// `value` is the graph value `json` was written from; dates are formatted
/// from it directly.
pub(crate) fn reshape_out(format: &Format, value: &Value, json: Json) -> Result<Json, String> {
    if let Value::Date(ms) = *value {
        match format.shape {
            Shape::Number => return Ok(Json::from(ms)),
            Shape::String => {
                return match &format.pattern {
                    Some(pattern) => date_with_pattern(ms, pattern).map(Json::String),
                    None => date_to_text(ms).map(Json::String),
                };
            }
            _ => {}
        }
    }

    Ok(match (format.shape, json) {
        (_, Json::Null) => Json::Null,
        (Shape::Boolean, json) => Json::Bool(truthy(&json)),
        (Shape::Number, Json::Bool(b)) => Json::from(u8::from(b)),
        (Shape::Number, Json::String(s)) => parse_number(&s)
            .map(Json::Number)
            .ok_or_else(|| format!("`{s}` is not a number"))?,
        (Shape::Number, json @ Json::Number(_)) => json,
        (Shape::Number, json) => return Err(format!("cannot write {json} as a number")),
        (Shape::String, Json::String(s)) => Json::String(s),
        (Shape::String, json) => Json::String(json.to_string()),
        (Shape::Object, Json::Array(items)) => Json::Object(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
        (Shape::Scalar, Json::Array(mut items)) if items.len() == 1 => items.remove(0),
        (_, json) => json,
    })
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

// -----------------------------------------------------------------------------
// Input shapes

/// Undoes a format directive before the value is read.
///
/// Objects written as arrays are rebuilt by the deserializer, which knows
/// their type.
pub(crate) fn reshape_in<'j>(format: &Format, json: &'j Json) -> Result<Cow<'j, Json>, String> {
    Ok(match (format.shape, json) {
        (Shape::Object, Json::Object(map)) => {
            let mut entries: Vec<(usize, &Json)> = Vec::with_capacity(map.len());
            for (key, v) in map {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| format!("key `{key}` of an object-shaped list is not an index"))?;
                entries.push((index, v));
            }
            entries.sort_by_key(|(i, _)| *i);
            Cow::Owned(Json::Array(entries.into_iter().map(|(_, v)| v.clone()).collect()))
        }
        (Shape::Scalar, Json::Array(_)) | (Shape::Scalar, Json::Null) => Cow::Borrowed(json),
        (Shape::Scalar, json) => Cow::Owned(Json::Array(alloc::vec![json.clone()])),
        _ => Cow::Borrowed(json),
    })
}

// -----------------------------------------------------------------------------
// Positional objects

/// Properties of `desc` in the order they take when the object is written
/// as an array.
///
/// Alphabetic sorting requested per call is ignored so that both directions
/// agree. The any-property and back references have no position.
pub(crate) fn positional_properties(desc: &TypeDescriptor) -> Vec<&PropertyDescriptor> {
    desc.ordered_properties(false)
        .into_iter()
        .filter(|p| {
            !p.is_ignored()
                && p.access_mode().readable()
                && !matches!(p.role(), Role::BackReference(_))
                && desc.any_property() != Some(p.name())
        })
        .collect()
}

/// The generated id of `desc`, written right after the type id of an
/// object in array form. Property-based ids keep their property's position.
pub(crate) fn positional_id(desc: &TypeDescriptor) -> Option<&IdentityDecl> {
    desc.identity()
        .filter(|decl| decl.generator != IdGenerator::Property)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vc_graph::Value;
    use vc_schema::{Access, Format, IdGenerator, IdentityDecl, PropertyDescriptor, PropertyType};
    use vc_schema::{Shape, TypeDescriptor};

    use super::{MAX_SAFE_INTEGER, positional_id, positional_properties};
    use super::{reshape_in, reshape_out, special_case};
    use super::{date_from_text, date_to_text};
    use crate::SerializeFeatures;

    #[test]
    fn special_numbers() {
        let all = SerializeFeatures::all();
        assert_eq!(special_case(&Value::Float(f64::NAN), all), Some(Value::Int(0)));
        assert_eq!(
            special_case(&Value::Float(f64::INFINITY), all),
            Some(Value::Int(MAX_SAFE_INTEGER))
        );
        assert_eq!(
            special_case(&Value::Float(f64::NEG_INFINITY), all),
            Some(Value::Int(-MAX_SAFE_INTEGER))
        );
        assert_eq!(special_case(&Value::Float(1.5), all), None);
        assert_eq!(special_case(&Value::Float(f64::NAN), SerializeFeatures::empty()), None);
        assert_eq!(special_case(&Value::Date(42), all), Some(Value::Int(42)));
    }

    #[test]
    fn dates() {
        assert_eq!(date_to_text(0).unwrap(), "1970-01-01T00:00:00.000Z");
        assert_eq!(date_from_text("1970-01-01T00:00:01.500Z", None), Ok(1500));
        assert_eq!(date_from_text("1970-01-02", Some("%Y-%m-%d")), Ok(86_400_000));
        assert!(date_from_text("yesterday", None).is_err());

        let day = Format::new(Shape::String).with_pattern("%Y-%m-%d");
        assert_eq!(reshape_out(&day, &Value::Date(86_400_000), json!(86_400_000)), Ok(json!("1970-01-02")));
    }

    #[test]
    fn shapes_out() {
        let array = Format::new(Shape::Array);
        assert_eq!(reshape_out(&array, &Value::Null, json!([1, 2])), Ok(json!([1, 2])));
        let boolean = Format::new(Shape::Boolean);
        assert_eq!(reshape_out(&boolean, &Value::Null, json!("")), Ok(json!(false)));
        let number = Format::new(Shape::Number);
        assert_eq!(reshape_out(&number, &Value::Null, json!(true)), Ok(json!(1)));
        assert_eq!(reshape_out(&number, &Value::Null, json!("2.5")), Ok(json!(2.5)));
        assert!(reshape_out(&number, &Value::Null, json!("abc")).is_err());
        let string = Format::new(Shape::String);
        assert_eq!(reshape_out(&string, &Value::Null, json!(12)), Ok(json!("12")));
        let object = Format::new(Shape::Object);
        assert_eq!(
            reshape_out(&object, &Value::Null, json!(["a", "b"])),
            Ok(json!({"0": "a", "1": "b"}))
        );
        let scalar = Format::new(Shape::Scalar);
        assert_eq!(reshape_out(&scalar, &Value::Null, json!(["a"])), Ok(json!("a")));
        assert_eq!(reshape_out(&scalar, &Value::Null, json!(["a", "b"])), Ok(json!(["a", "b"])));
    }

    #[test]
    fn shapes_in() {
        let object = Format::new(Shape::Object);
        assert_eq!(
            reshape_in(&object, &json!({"1": "b", "0": "a"})).unwrap().into_owned(),
            json!(["a", "b"])
        );
        assert!(reshape_in(&object, &json!({"first": "a"})).is_err());

        let scalar = Format::new(Shape::Scalar);
        assert_eq!(reshape_in(&scalar, &json!("a")).unwrap().into_owned(), json!(["a"]));
    }

    #[test]
    fn positional_layout() {
        let desc = TypeDescriptor::builder("Point")
            .identity(IdentityDecl::new(IdGenerator::IntSequence))
            .property(PropertyDescriptor::new("z", PropertyType::Int))
            .property(PropertyDescriptor::new("x", PropertyType::Int))
            .property(PropertyDescriptor::new("hidden", PropertyType::Int).ignored())
            .property(PropertyDescriptor::new("secret", PropertyType::Int).access(Access::WriteOnly))
            .alphabetic()
            .build();

        let names: alloc::vec::Vec<_> = positional_properties(&desc)
            .into_iter()
            .map(PropertyDescriptor::output_name)
            .collect();
        assert_eq!(names, ["x", "z"]);
        assert_eq!(positional_id(&desc).map(|d| d.property.as_str()), Some("@id"));
    }
}
