use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use serde_json::json;
use vc_graph::{Instance, ObjectGraph, Value, ValueKind};
use vc_schema::{Conversion, ConvertError, Converters, Creator, CreatorParam};
use vc_schema::{PropertyDescriptor, PropertyType, TypeDescriptor, TypeMatch, TypeRegistry};

use super::{read, registry, write};
use crate::{DeserializeFeatures, DeserializeOptions, ErrorKind, SerializeOptions};

fn int(args: &mut impl Iterator<Item = Value>) -> i64 {
    args.next().and_then(|v| v.as_int()).unwrap_or(0)
}

// -----------------------------------------------------------------------------
// Creators

fn points() -> TypeRegistry {
    registry([TypeDescriptor::builder("Point")
        .property(PropertyDescriptor::new("x", PropertyType::Int))
        .property(PropertyDescriptor::new("y", PropertyType::Int))
        .property(PropertyDescriptor::new("label", PropertyType::String))
        .creator(Creator::properties(
            [
                CreatorParam::new("x", PropertyType::Int).required(),
                CreatorParam::new("y", PropertyType::Int),
            ],
            |args: Vec<Value>| {
                let mut args = args.into_iter();
                let (x, y) = (int(&mut args), int(&mut args));
                Ok(Instance::new("Point").with("x", x * 10).with("y", y * 10))
            },
        ))
        .creator(
            Creator::properties(Vec::<CreatorParam>::new(), |_| {
                Ok(Instance::new("Point").with("x", 0).with("y", 0))
            })
            .named("origin"),
        )
        .build()])
}

#[test]
fn property_creator_binds_arguments() {
    let registry = points();
    let ty = PropertyType::object("Point");
    let mut graph = ObjectGraph::new();

    let back = read(
        &registry,
        &mut graph,
        &json!({"x": 1, "y": 2, "label": "p"}),
        &ty,
        &DeserializeOptions::new(),
    )
    .unwrap();
    let point = graph.resolve(&back).unwrap();
    // Bound keys are not set a second time.
    assert_eq!(point.get("x"), Some(&Value::Int(10)));
    assert_eq!(point.get("y"), Some(&Value::Int(20)));
    assert_eq!(point.get("label").and_then(Value::as_str), Some("p"));
}

#[test]
fn missing_creator_argument() {
    let registry = points();
    let ty = PropertyType::object("Point");
    let input = json!({"y": 2});
    let mut graph = ObjectGraph::new();

    let err = read(&registry, &mut graph, &input, &ty, &DeserializeOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredValue);
    assert_eq!(err.path(), "$.x");

    let lenient =
        DeserializeOptions::new().disable(DeserializeFeatures::FAIL_ON_MISSING_CREATOR_PROPERTIES);
    let back = read(&registry, &mut graph, &input, &ty, &lenient).unwrap();
    assert_eq!(graph.resolve(&back).unwrap().get("x"), Some(&Value::Int(0)));
}

#[test]
fn named_creator() {
    let registry = points();
    let mut graph = ObjectGraph::new();
    let options = DeserializeOptions::new().with_creator("origin");

    let back = read(
        &registry,
        &mut graph,
        &json!({"label": "o", "y": 3}),
        &PropertyType::object("Point"),
        &options,
    )
    .unwrap();
    let point = graph.resolve(&back).unwrap();
    assert_eq!(point.get("x"), Some(&Value::Int(0)));
    assert_eq!(point.get("y"), Some(&Value::Int(3)));
    assert_eq!(point.get("label").and_then(Value::as_str), Some("o"));
}

#[test]
fn value_property_with_delegating_creator() {
    let registry = registry([
        TypeDescriptor::builder("Money")
            .value_property("cents")
            .property(PropertyDescriptor::new("cents", PropertyType::Int))
            .creator(Creator::delegating(PropertyType::Int, |args| {
                let cents = args.into_iter().next().unwrap_or_default();
                Ok(Instance::new("Money").with("cents", cents))
            }))
            .build(),
        TypeDescriptor::builder("Order")
            .property(PropertyDescriptor::new("total", PropertyType::object("Money")))
            .build(),
    ]);
    let ty = PropertyType::object("Order");

    let mut graph = ObjectGraph::new();
    let money = graph.insert(Instance::new("Money").with("cents", 1250));
    let order = Value::Object(graph.insert(Instance::new("Order").with("total", Value::Object(money))));

    let json = write(&registry, &graph, &order, &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json, json!({"total": 1250}));

    let mut parsed = ObjectGraph::new();
    let back = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    assert!(parsed.same_shape(&back, &graph, &order));
}

// -----------------------------------------------------------------------------
// Injection

#[test]
fn injected_values() {
    let registry = registry([TypeDescriptor::builder("Ticket")
        .property(PropertyDescriptor::new("id", PropertyType::Int))
        .property(PropertyDescriptor::new("clock", PropertyType::Int).inject("now", false))
        .property(PropertyDescriptor::new("source", PropertyType::String).inject("src", true))
        .build()]);
    let ty = PropertyType::object("Ticket");
    let options = DeserializeOptions::new().inject("now", 99).inject("src", "api");

    let mut graph = ObjectGraph::new();
    let full = read(
        &registry,
        &mut graph,
        &json!({"id": 1, "clock": 5, "source": "web"}),
        &ty,
        &options,
    )
    .unwrap();
    let ticket = graph.resolve(&full).unwrap();
    assert_eq!(ticket.get("clock"), Some(&Value::Int(99)));
    assert_eq!(ticket.get("source").and_then(Value::as_str), Some("web"));

    let bare = read(&registry, &mut graph, &json!({"id": 2}), &ty, &options).unwrap();
    let ticket = graph.resolve(&bare).unwrap();
    assert_eq!(ticket.get("clock"), Some(&Value::Int(99)));
    assert_eq!(ticket.get("source").and_then(Value::as_str), Some("api"));
}

#[test]
fn injected_creator_argument() {
    let registry = registry([TypeDescriptor::builder("Session")
        .property(PropertyDescriptor::new("user", PropertyType::String))
        .creator(Creator::properties(
            [
                CreatorParam::new("user", PropertyType::String).required(),
                CreatorParam::new("tenant", PropertyType::String).injected("tenant"),
            ],
            |args| {
                let mut args = args.into_iter();
                let user = args.next().unwrap_or_default();
                let tenant = args.next().unwrap_or_default();
                Ok(Instance::new("Session").with("user", user).with("tenant", tenant))
            },
        ))
        .build()]);

    let mut graph = ObjectGraph::new();
    let options = DeserializeOptions::new().inject("tenant", "acme");
    let back = read(
        &registry,
        &mut graph,
        &json!({"user": "ann"}),
        &PropertyType::object("Session"),
        &options,
    )
    .unwrap();
    let session = graph.resolve(&back).unwrap();
    assert_eq!(session.get("user").and_then(Value::as_str), Some("ann"));
    assert_eq!(session.get("tenant").and_then(Value::as_str), Some("acme"));
}

// -----------------------------------------------------------------------------
// Converters

#[test]
fn global_converters_run_in_order() {
    let registry = registry([
        TypeDescriptor::builder("Secret")
            .property(PropertyDescriptor::new("pin", PropertyType::Int))
            .build(),
        TypeDescriptor::builder("Card")
            .property(PropertyDescriptor::new("holder", PropertyType::String))
            .property(PropertyDescriptor::new("secret", PropertyType::object("Secret")))
            .build(),
    ]);

    let mut converters = Converters::new();
    converters
        .add_serializer(TypeMatch::Kind(ValueKind::String), 1, |value, _| {
            let text = value.as_str().unwrap_or_default();
            Ok(Conversion::Replace(Value::String(alloc::format!("{text}!"))))
        })
        .add_serializer(TypeMatch::Kind(ValueKind::String), 0, |value, _| {
            let text = value.as_str().unwrap_or_default().to_uppercase();
            Ok(Conversion::Replace(Value::String(text)))
        })
        .add_serializer(TypeMatch::Type("Secret".to_string()), 0, |_, _| {
            Ok(Conversion::Done(json!("***")))
        });

    let mut graph = ObjectGraph::new();
    let secret = graph.insert(Instance::new("Secret").with("pin", 1234));
    let card = Value::Object(graph.insert(
        Instance::new("Card")
            .with("holder", "ann")
            .with("secret", Value::Object(secret)),
    ));

    let options = SerializeOptions::new().with_converters(converters);
    let json = write(&registry, &graph, &card, &PropertyType::object("Card"), &options).unwrap();
    assert_eq!(json, json!({"holder": "ANN!", "secret": "***"}));
}

#[test]
fn global_deserializer_builds_objects() {
    let registry = registry([
        TypeDescriptor::builder("Color")
            .property(PropertyDescriptor::new("hex", PropertyType::String))
            .build(),
        TypeDescriptor::builder("Theme")
            .property(PropertyDescriptor::new("fg", PropertyType::object("Color")))
            .build(),
    ]);

    let mut converters = Converters::new();
    converters.add_deserializer(TypeMatch::Type("Color".to_string()), 0, |json, graph| {
        match json.as_str() {
            Some(hex) => {
                let key = graph.insert(Instance::new("Color").with("hex", hex));
                Ok(Conversion::Done(Value::Object(key)))
            }
            None => Ok(Conversion::Pass),
        }
    });
    let options = DeserializeOptions::new().with_converters(converters);
    let ty = PropertyType::object("Theme");

    let mut graph = ObjectGraph::new();
    for input in [json!({"fg": "#fff"}), json!({"fg": {"hex": "#fff"}})] {
        let back = read(&registry, &mut graph, &input, &ty, &options).unwrap();
        let fg = graph.resolve(&back).unwrap().get("fg").cloned().unwrap();
        assert_eq!(
            graph.resolve(&fg).unwrap().get("hex").and_then(Value::as_str),
            Some("#fff")
        );
    }
}

#[test]
fn property_converters() {
    let registry = registry([TypeDescriptor::builder("Badge")
        .property(
            PropertyDescriptor::new("level", PropertyType::Int)
                .serialize_with(|value, _| Ok(json!(alloc::format!("L{}", value.as_int().unwrap_or(0)))))
                .deserialize_with(|json, _| {
                    json.as_str()
                        .and_then(|s| s.strip_prefix('L'))
                        .and_then(|s| s.parse::<i64>().ok())
                        .map(Value::Int)
                        .ok_or_else(|| ConvertError::new("expected `L<n>`"))
                }),
        )
        .property(
            PropertyDescriptor::new("tags", PropertyType::list(PropertyType::String))
                .serialize_elements_with(|value, _| {
                    Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
                })
                .deserialize_elements_with(|json, _| {
                    Ok(Value::String(json.as_str().unwrap_or_default().to_lowercase()))
                }),
        )
        .build()]);
    let ty = PropertyType::object("Badge");

    let mut graph = ObjectGraph::new();
    let badge = Value::Object(graph.insert(
        Instance::new("Badge")
            .with("level", 3)
            .with("tags", vec!["gold", "early"]),
    ));
    let json = write(&registry, &graph, &badge, &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json, json!({"level": "L3", "tags": ["GOLD", "EARLY"]}));

    let mut parsed = ObjectGraph::new();
    let back = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    assert!(parsed.same_shape(&back, &graph, &badge));

    let err = read(
        &registry,
        &mut parsed,
        &json!({"level": 3}),
        &ty,
        &DeserializeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);
    assert_eq!(err.path(), "$.level");
    assert_eq!(err.type_name(), "Badge");
}

// -----------------------------------------------------------------------------
// Input policies

fn users() -> TypeRegistry {
    registry([
        TypeDescriptor::builder("User")
            .property(PropertyDescriptor::new("name", PropertyType::String).required().alias("login"))
            .property(PropertyDescriptor::new("age", PropertyType::Int))
            .property(PropertyDescriptor::new("admin", PropertyType::Bool))
            .property(PropertyDescriptor::new("role", PropertyType::String).default_value("guest"))
            .property(PropertyDescriptor::new("tags", PropertyType::list(PropertyType::String)))
            .property(PropertyDescriptor::new("cache", PropertyType::Any).ignored())
            .build(),
        TypeDescriptor::builder("LooseUser")
            .ignore_unknown()
            .property(PropertyDescriptor::new("name", PropertyType::String))
            .build(),
    ])
}

#[test]
fn required_properties_and_defaults() {
    let registry = users();
    let ty = PropertyType::object("User");
    let mut graph = ObjectGraph::new();

    let err = read(&registry, &mut graph, &json!({"age": 3}), &ty, &DeserializeOptions::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredValue);
    assert_eq!(err.path(), "$.name");

    let back = read(&registry, &mut graph, &json!({"login": "ann"}), &ty, &DeserializeOptions::new())
        .unwrap();
    let user = graph.resolve(&back).unwrap();
    assert_eq!(user.get("name").and_then(Value::as_str), Some("ann"));
    assert_eq!(user.get("role").and_then(Value::as_str), Some("guest"));
}

#[test]
fn unknown_properties() {
    let registry = users();
    let input = json!({"name": "ann", "bogus": 1, "cache": {"x": 1}});
    let mut graph = ObjectGraph::new();

    let err = read(
        &registry,
        &mut graph,
        &input,
        &PropertyType::object("User"),
        &DeserializeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProperty);
    assert_eq!(err.path(), "$.bogus");

    let lenient = DeserializeOptions::new().disable(DeserializeFeatures::FAIL_ON_UNKNOWN_PROPERTIES);
    let back = read(&registry, &mut graph, &input, &PropertyType::object("User"), &lenient).unwrap();
    let user = graph.resolve(&back).unwrap();
    assert!(user.get("bogus").is_none());
    assert!(user.get("cache").is_none());

    let back = read(
        &registry,
        &mut graph,
        &json!({"name": "bob", "extra": true}),
        &PropertyType::object("LooseUser"),
        &DeserializeOptions::new(),
    )
    .unwrap();
    assert_eq!(graph.resolve(&back).unwrap().len(), 1);
}

#[test]
fn scalar_coercions() {
    let registry = users();
    let ty = PropertyType::object("User");
    let mut graph = ObjectGraph::new();

    let back = read(
        &registry,
        &mut graph,
        &json!({"name": 42, "age": "7", "admin": "true", "tags": "solo"}),
        &ty,
        &DeserializeOptions::new().enable(DeserializeFeatures::ACCEPT_SINGLE_VALUE_AS_ARRAY),
    )
    .unwrap();
    let user = graph.resolve(&back).unwrap();
    assert_eq!(user.get("name").and_then(Value::as_str), Some("42"));
    assert_eq!(user.get("age"), Some(&Value::Int(7)));
    assert_eq!(user.get("admin"), Some(&Value::Bool(true)));
    assert_eq!(user.get("tags"), Some(&Value::from(vec!["solo"])));

    let err = read(
        &registry,
        &mut graph,
        &json!({"name": "ann", "tags": "solo"}),
        &ty,
        &DeserializeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    assert_eq!(err.path(), "$.tags");
}

#[test]
fn null_for_primitives() {
    let registry = users();
    let ty = PropertyType::object("User");
    let input = json!({"name": "ann", "age": null});
    let mut graph = ObjectGraph::new();

    let back = read(&registry, &mut graph, &input, &ty, &DeserializeOptions::new()).unwrap();
    assert_eq!(graph.resolve(&back).unwrap().get("age"), Some(&Value::Null));

    let strict = DeserializeOptions::new().enable(DeserializeFeatures::FAIL_ON_NULL_FOR_PRIMITIVES);
    let err = read(&registry, &mut graph, &input, &ty, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredValue);
    assert_eq!(err.path(), "$.age");
}

#[test]
fn failed_call_leaves_graph_untouched() {
    let registry = registry([
        TypeDescriptor::builder("Leaf")
            .property(PropertyDescriptor::new("v", PropertyType::Int))
            .build(),
        TypeDescriptor::builder("Holder")
            .property(PropertyDescriptor::new("a", PropertyType::object("Leaf")))
            .property(PropertyDescriptor::new("n", PropertyType::Int))
            .build(),
    ]);
    let mut graph = ObjectGraph::new();
    let existing = graph.insert(Instance::new("Leaf").with("v", 0));

    let err = read(
        &registry,
        &mut graph,
        &json!({"a": {"v": 1}, "n": "many"}),
        &PropertyType::object("Holder"),
        &DeserializeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    assert_eq!(err.path(), "$.n");
    assert_eq!(graph.len(), 1);
    assert!(graph.contains(existing));
}

#[test]
fn ignored_types_are_null() {
    let registry = registry([
        TypeDescriptor::builder("Handle").ignored().build(),
        TypeDescriptor::builder("Job")
            .property(PropertyDescriptor::new("name", PropertyType::String))
            .property(PropertyDescriptor::new("handle", PropertyType::object("Handle")))
            .build(),
    ]);
    let ty = PropertyType::object("Job");

    let mut graph = ObjectGraph::new();
    let handle = graph.insert(Instance::new("Handle"));
    let job = Value::Object(graph.insert(
        Instance::new("Job")
            .with("name", "build")
            .with("handle", Value::Object(handle)),
    ));
    let json = write(&registry, &graph, &job, &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json, json!({"name": "build", "handle": null}));

    let mut parsed = ObjectGraph::new();
    let back = read(
        &registry,
        &mut parsed,
        &json!({"name": "build", "handle": {}}),
        &ty,
        &DeserializeOptions::new(),
    )
    .unwrap();
    assert_eq!(parsed.resolve(&back).unwrap().get("handle"), Some(&Value::Null));
    assert_eq!(parsed.len(), 1);
}
