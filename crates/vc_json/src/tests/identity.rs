use alloc::string::ToString;
use alloc::vec;

use serde_json::json;
use vc_graph::{Instance, ObjectGraph, ObjectKey, Value};
use vc_schema::{Format, IdGenerator, IdentityDecl, Polymorphism, PropertyDescriptor};
use vc_schema::{PropertyType, Shape, TypeDescriptor, TypeIdStrategy};

use super::{read, registry, write};
use crate::{DeserializeOptions, ErrorKind, SerializeFeatures, SerializeOptions};

fn object(graph: &ObjectGraph, key: ObjectKey, name: &str) -> Option<ObjectKey> {
    graph.field(key, name).and_then(Value::as_object)
}

fn library() -> vc_schema::TypeRegistry {
    registry([
        TypeDescriptor::builder("Author")
            .identity(IdentityDecl::new(IdGenerator::IntSequence))
            .property(PropertyDescriptor::new("name", PropertyType::String))
            .build(),
        TypeDescriptor::builder("Book")
            .property(PropertyDescriptor::new("title", PropertyType::String))
            .property(PropertyDescriptor::new("author", PropertyType::object("Author")))
            .build(),
        TypeDescriptor::builder("Shelf")
            .property(PropertyDescriptor::new("favorite", PropertyType::object("Author")))
            .property(PropertyDescriptor::new("book", PropertyType::object("Book")))
            .build(),
    ])
}

#[test]
fn shared_identity_written_once_then_referenced() {
    let registry = library();
    let mut graph = ObjectGraph::new();
    let author = graph.insert(Instance::new("Author").with("name", "Le Guin"));
    let book = graph.insert(
        Instance::new("Book")
            .with("title", "Earthsea")
            .with("author", Value::Object(author)),
    );
    let shelf = graph.insert(
        Instance::new("Shelf")
            .with("favorite", Value::Object(author))
            .with("book", Value::Object(book)),
    );

    let ty = PropertyType::object("Shelf");
    let options = SerializeOptions::new();
    let json = write(&registry, &graph, &Value::Object(shelf), &ty, &options).unwrap();
    assert_eq!(
        json.to_string(),
        r#"{"favorite":{"@id":1,"name":"Le Guin"},"book":{"title":"Earthsea","author":1}}"#
    );

    // Ids restart with every call.
    let again = write(&registry, &graph, &Value::Object(shelf), &ty, &options).unwrap();
    assert_eq!(again, json);

    let mut parsed = ObjectGraph::new();
    let root = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    let root = root.as_object().unwrap();
    let favorite = object(&parsed, root, "favorite").unwrap();
    let book = object(&parsed, root, "book").unwrap();

    assert_eq!(object(&parsed, book, "author"), Some(favorite));
    assert_eq!(parsed.len(), 3);
    assert_eq!(
        parsed.field(favorite, "name").and_then(Value::as_str),
        Some("Le Guin")
    );
}

fn nodes(identity: bool) -> vc_schema::TypeRegistry {
    let mut node = TypeDescriptor::builder("Node")
        .property(PropertyDescriptor::new("name", PropertyType::String))
        .property(PropertyDescriptor::new("next", PropertyType::object("Node")));
    if identity {
        node = node.identity(IdentityDecl::new(IdGenerator::IntSequence));
    }
    registry([node.build()])
}

#[test]
fn self_reference_without_identity_is_a_cycle() {
    let registry = nodes(false);
    let mut graph = ObjectGraph::new();
    let a = graph.insert(Instance::new("Node").with("name", "a"));
    let b = graph.insert(Instance::new("Node").with("name", "b").with("next", Value::Object(a)));
    graph.set_field(a, "next", Value::Object(b));

    let ty = PropertyType::object("Node");
    let err = write(&registry, &graph, &Value::Object(a), &ty, &SerializeOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cycle);
    assert_eq!(err.type_name(), "Node");
    assert_eq!(err.path(), "$.next.next");

    let lenient = SerializeOptions::new().enable(SerializeFeatures::WRITE_SELF_REFERENCES_AS_NULL);
    let json = write(&registry, &graph, &Value::Object(a), &ty, &lenient).unwrap();
    assert_eq!(json, json!({"name": "a", "next": {"name": "b", "next": null}}));
}

#[test]
fn siblings_sharing_an_object_are_not_a_cycle() {
    let registry = registry([
        TypeDescriptor::builder("Leaf")
            .property(PropertyDescriptor::new("v", PropertyType::Int))
            .build(),
        TypeDescriptor::builder("Pair")
            .property(PropertyDescriptor::new("left", PropertyType::object("Leaf")))
            .property(PropertyDescriptor::new("right", PropertyType::object("Leaf")))
            .build(),
    ]);
    let mut graph = ObjectGraph::new();
    let leaf = graph.insert(Instance::new("Leaf").with("v", 1));
    let pair = graph.insert(
        Instance::new("Pair")
            .with("left", Value::Object(leaf))
            .with("right", Value::Object(leaf)),
    );

    let json = write(
        &registry,
        &graph,
        &Value::Object(pair),
        &PropertyType::object("Pair"),
        &SerializeOptions::new(),
    )
    .unwrap();
    assert_eq!(json, json!({"left": {"v": 1}, "right": {"v": 1}}));
}

#[test]
fn identity_breaks_self_reference() {
    let registry = nodes(true);
    let mut graph = ObjectGraph::new();
    let a = graph.insert(Instance::new("Node").with("name", "a"));
    graph.set_field(a, "next", Value::Object(a));

    let ty = PropertyType::object("Node");
    let json = write(&registry, &graph, &Value::Object(a), &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json.to_string(), r#"{"@id":1,"name":"a","next":1}"#);

    let mut parsed = ObjectGraph::new();
    let root = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    let root = root.as_object().unwrap();
    assert_eq!(object(&parsed, root, "next"), Some(root));
    assert_eq!(parsed.len(), 1);
}

fn owners() -> vc_schema::TypeRegistry {
    registry([
        TypeDescriptor::builder("User")
            .property(PropertyDescriptor::new("name", PropertyType::String))
            .property(
                PropertyDescriptor::new("items", PropertyType::list(PropertyType::object("Item")))
                    .forward_reference("items"),
            )
            .build(),
        TypeDescriptor::builder("Item")
            .property(PropertyDescriptor::new("title", PropertyType::String))
            .property(
                PropertyDescriptor::new("owner", PropertyType::object("User"))
                    .back_reference("items"),
            )
            .build(),
    ])
}

#[test]
fn back_references_are_restored_from_the_owner() {
    let registry = owners();
    let mut graph = ObjectGraph::new();
    let user = graph.insert(Instance::new("User").with("name", "ann"));
    let pen = graph.insert(Instance::new("Item").with("title", "pen").with("owner", Value::Object(user)));
    let ink = graph.insert(Instance::new("Item").with("title", "ink").with("owner", Value::Object(user)));
    graph.set_field(user, "items", Value::List(vec![Value::Object(pen), Value::Object(ink)]));

    let ty = PropertyType::object("User");
    let json = write(&registry, &graph, &Value::Object(user), &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(
        json.to_string(),
        r#"{"name":"ann","items":[{"title":"pen"},{"title":"ink"}]}"#
    );
    assert!(!json.to_string().contains("owner"));

    let mut parsed = ObjectGraph::new();
    let root = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    let root = root.as_object().unwrap();
    let items = parsed.field(root, "items").and_then(Value::as_list).unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        let item = item.as_object().unwrap();
        assert_eq!(object(&parsed, item, "owner"), Some(root));
    }
}

fn people() -> vc_schema::TypeRegistry {
    registry([
        TypeDescriptor::builder("Person")
            .identity(IdentityDecl::new(IdGenerator::Property).property("id"))
            .property(PropertyDescriptor::new("id", PropertyType::String))
            .property(PropertyDescriptor::new("name", PropertyType::String))
            .build(),
        TypeDescriptor::builder("Meeting")
            .property(PropertyDescriptor::new("first", PropertyType::object("Person")))
            .property(PropertyDescriptor::new("second", PropertyType::object("Person")))
            .build(),
    ])
}

#[test]
fn property_identity_is_written_once() {
    let registry = people();
    let mut graph = ObjectGraph::new();
    let ann = graph.insert(Instance::new("Person").with("id", "p1").with("name", "Ann"));
    let meeting = graph.insert(
        Instance::new("Meeting")
            .with("first", Value::Object(ann))
            .with("second", Value::Object(ann)),
    );

    let json = write(
        &registry,
        &graph,
        &Value::Object(meeting),
        &PropertyType::object("Meeting"),
        &SerializeOptions::new(),
    )
    .unwrap();
    assert_eq!(
        json.to_string(),
        r#"{"first":{"id":"p1","name":"Ann"},"second":"p1"}"#
    );
}

#[test]
fn reference_before_definition_is_filled_later() {
    let registry = people();
    let json = json!({"first": "p1", "second": {"id": "p1", "name": "Ann"}});

    let mut graph = ObjectGraph::new();
    let ty = PropertyType::object("Meeting");
    let root = read(&registry, &mut graph, &json, &ty, &DeserializeOptions::new()).unwrap();
    let root = root.as_object().unwrap();

    let first = object(&graph, root, "first").unwrap();
    assert_eq!(object(&graph, root, "second"), Some(first));
    assert_eq!(graph.field(first, "name").and_then(Value::as_str), Some("Ann"));
    assert_eq!(graph.len(), 2);
}

#[test]
fn reference_never_defined_fails_and_rolls_back() {
    let registry = people();
    let json = json!({"first": "p9", "second": null});

    let mut graph = ObjectGraph::new();
    let err = read(
        &registry,
        &mut graph,
        &json,
        &PropertyType::object("Meeting"),
        &DeserializeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedId);
    assert_eq!(err.type_name(), "Person");
    assert!(graph.is_empty());
}

#[test]
fn id_reused_by_another_type_is_rejected() {
    let registry = registry([
        TypeDescriptor::builder("Left")
            .identity(IdentityDecl::new(IdGenerator::IntSequence))
            .property(PropertyDescriptor::new("n", PropertyType::String))
            .build(),
        TypeDescriptor::builder("Right")
            .identity(IdentityDecl::new(IdGenerator::IntSequence))
            .property(PropertyDescriptor::new("n", PropertyType::String))
            .build(),
        TypeDescriptor::builder("Holder")
            .property(PropertyDescriptor::new("a", PropertyType::object("Left")))
            .property(PropertyDescriptor::new("b", PropertyType::object("Right")))
            .build(),
    ]);
    let json = json!({"a": {"@id": 1, "n": "x"}, "b": {"@id": 1, "n": "y"}});

    let mut graph = ObjectGraph::new();
    let err = read(
        &registry,
        &mut graph,
        &json,
        &PropertyType::object("Holder"),
        &DeserializeOptions::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeResolution);
    assert_eq!(err.path(), "$.b");
    assert_eq!(err.type_name(), "Right");
}

fn kennel() -> vc_schema::TypeRegistry {
    let animal = TypeDescriptor::builder("Animal")
        .property(PropertyDescriptor::new("name", PropertyType::String))
        .polymorphism(
            Polymorphism::new(TypeIdStrategy::Property)
                .subtype("Dog")
                .subtype("Cat"),
        )
        .build();
    let dog = TypeDescriptor::builder("Dog")
        .extend(&animal)
        .identity(IdentityDecl::new(IdGenerator::IntSequence))
        .build();
    let cat = TypeDescriptor::builder("Cat").extend(&animal).build();
    registry([animal, dog, cat])
}

#[test]
fn identity_declared_on_subtype() {
    let registry = kennel();
    let mut graph = ObjectGraph::new();
    let rex = graph.insert(Instance::new("Dog").with("name", "Rex"));
    let pets = Value::List(vec![Value::Object(rex), Value::Object(rex)]);
    let ty = PropertyType::list(PropertyType::object("Animal"));

    let json = write(&registry, &graph, &pets, &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json.to_string(), r#"[{"@id":1,"name":"Rex","@type":"Dog"},1]"#);

    let mut parsed = ObjectGraph::new();
    let back = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    let items = back.as_list().unwrap();
    assert_eq!(items[0], items[1]);
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.resolve(&items[0]).map(Instance::type_name), Some("Dog"));
    assert!(parsed.same_shape(&back, &graph, &pets));
}

#[test]
fn subtype_identity_referenced_before_definition() {
    let registry = kennel();
    let ty = PropertyType::list(PropertyType::object("Animal"));
    let json = json!([1, {"@id": 1, "name": "Rex", "@type": "Dog"}]);

    let mut graph = ObjectGraph::new();
    let back = read(&registry, &mut graph, &json, &ty, &DeserializeOptions::new()).unwrap();
    let items = back.as_list().unwrap();
    assert_eq!(items[0], items[1]);
    let rex = graph.resolve(&items[0]).unwrap();
    assert_eq!(rex.type_name(), "Dog");
    assert_eq!(rex.get("name").and_then(Value::as_str), Some("Rex"));

    let dangling = json!([{"@id": 1, "name": "Rex", "@type": "Dog"}, 2]);
    let mut graph = ObjectGraph::new();
    let err = read(&registry, &mut graph, &dangling, &ty, &DeserializeOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedId);
    assert!(graph.is_empty());
}

#[test]
fn identity_in_array_shape() {
    let point = TypeDescriptor::builder("Point")
        .identity(IdentityDecl::new(IdGenerator::IntSequence))
        .property(PropertyDescriptor::new("x", PropertyType::Int))
        .property(PropertyDescriptor::new("y", PropertyType::Int))
        .build();
    let line = TypeDescriptor::builder("Line")
        .property(
            PropertyDescriptor::new("from", PropertyType::object("Point"))
                .format(Format::new(Shape::Array)),
        )
        .property(
            PropertyDescriptor::new("to", PropertyType::object("Point"))
                .format(Format::new(Shape::Array)),
        )
        .build();
    let registry = registry([point, line]);

    let mut graph = ObjectGraph::new();
    let origin = graph.insert(Instance::new("Point").with("x", 3).with("y", 4));
    let root = Value::Object(graph.insert(
        Instance::new("Line")
            .with("from", Value::Object(origin))
            .with("to", Value::Object(origin)),
    ));
    let ty = PropertyType::object("Line");

    let json = write(&registry, &graph, &root, &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json, json!({"from": [1, 3, 4], "to": 1}));

    let mut parsed = ObjectGraph::new();
    let back = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    let back = back.as_object().unwrap();
    let from = object(&parsed, back, "from").unwrap();
    assert_eq!(object(&parsed, back, "to"), Some(from));
    assert_eq!(parsed.field(from, "y").and_then(Value::as_int), Some(4));
    assert_eq!(parsed.len(), 2);
}

#[test]
fn polymorphic_identity_in_array_shape() {
    let mut registry = kennel();
    let walk = TypeDescriptor::builder("Walk")
        .property(
            PropertyDescriptor::new("lead", PropertyType::object("Animal"))
                .format(Format::new(Shape::Array)),
        )
        .property(
            PropertyDescriptor::new("follow", PropertyType::object("Animal"))
                .format(Format::new(Shape::Array)),
        )
        .build();
    registry.register(walk).unwrap();

    let mut graph = ObjectGraph::new();
    let rex = graph.insert(Instance::new("Dog").with("name", "Rex"));
    let root = Value::Object(graph.insert(
        Instance::new("Walk")
            .with("lead", Value::Object(rex))
            .with("follow", Value::Object(rex)),
    ));
    let ty = PropertyType::object("Walk");

    let json = write(&registry, &graph, &root, &ty, &SerializeOptions::new()).unwrap();
    assert_eq!(json, json!({"lead": ["Dog", 1, "Rex"], "follow": 1}));

    let mut parsed = ObjectGraph::new();
    let back = read(&registry, &mut parsed, &json, &ty, &DeserializeOptions::new()).unwrap();
    let back = back.as_object().unwrap();
    let lead = object(&parsed, back, "lead").unwrap();
    assert_eq!(object(&parsed, back, "follow"), Some(lead));
    assert_eq!(parsed.type_of(lead), Some("Dog"));
    assert!(parsed.same_shape(&Value::Object(back), &graph, &root));
}
