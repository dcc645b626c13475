use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use serde_json::{Map, Value as Json};
use vc_graph::Value;
use vc_schema::{PropertyDescriptor, PropertyType, SchemaRegistry, Shape, TypeDescriptor};
use vc_schema::{TypeIdStrategy, Unwrap};

use super::DeserializeDriver;
use super::driver::{ANY, json_kind};
use crate::format::{date_from_text, positional_id, positional_properties, reshape_in};
use crate::resolve::{fallback_type, type_from_id};
use crate::{Error, ErrorKind, KeyPath};

impl<'a, R: SchemaRegistry + ?Sized> DeserializeDriver<'a, R> {
    pub(super) fn read_property(
        &mut self,
        owner: &TypeDescriptor,
        prop: &PropertyDescriptor,
        json: &Json,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        if let Some(deserializer) = prop.deserializer() {
            return deserializer
                .call(json, self.graph)
                .map_err(|e| self.error(ErrorKind::Conversion, owner.name(), path, e.message()));
        }

        if prop.is_raw() {
            return Ok(match json {
                Json::Null => Value::Null,
                json => Value::String(json.to_string()),
            });
        }

        let json = match prop.format_directive() {
            Some(format) => {
                if let (PropertyType::Date, Json::String(text), Some(pattern)) =
                    (prop.ty(), json, format.pattern.as_deref())
                {
                    return date_from_text(text, Some(pattern))
                        .map(Value::Date)
                        .map_err(|m| self.error(ErrorKind::Conversion, owner.name(), path, m));
                }
                match (format.shape, prop.ty().object_name(), json) {
                    (Shape::Array, Some(name), Json::Array(items)) => {
                        Cow::Owned(self.keyed_object(name, items, path)?)
                    }
                    _ => reshape_in(format, json)
                        .map_err(|m| self.error(ErrorKind::Shape, owner.name(), path, m))?,
                }
            }
            None => Cow::Borrowed(json),
        };

        let element = prop.ty().element().unwrap_or(&ANY);
        match (prop.ty(), &*json, prop.element_deserializer()) {
            (PropertyType::List(_), Json::Array(items), Some(each)) => {
                self.read_list(items, element, Some(each), path)
            }
            (PropertyType::Map(key, _), Json::Object(map), Some(each)) => {
                self.read_map(map, key, element, Some(each), path)
            }
            _ => self.read_value(&json, prop.ty(), path),
        }
    }

    /// Rebuilds the keyed form of an object of type `name` written as an
    /// array: the type id when the type is polymorphic, the generated id,
    /// then one element per positional property. `null` elements are left
    /// out so the object reads them as absent.
    fn keyed_object(&mut self, name: &str, items: &[Json], path: &KeyPath) -> Result<Json, Error> {
        let registry = self.registry;
        let Some(base) = registry.describe(name) else {
            return Err(self.error(
                ErrorKind::TypeResolution,
                name,
                path,
                format!("type `{name}` is not registered"),
            ));
        };

        let mut items = items.iter();
        let (desc, type_id) = match base.polymorphism() {
            Some(poly) => {
                let id = match items.next() {
                    Some(Json::String(id)) => id.as_str(),
                    Some(other) => {
                        return Err(self.error(
                            ErrorKind::Shape,
                            name,
                            &path.index(0),
                            format!("type id must be a string, found {}", json_kind(other)),
                        ));
                    }
                    None => {
                        return Err(self.error(
                            ErrorKind::Shape,
                            name,
                            path,
                            "an empty array cannot hold a polymorphic value",
                        ));
                    }
                };
                // An unknown id is reported by the keyed read below.
                let desc = type_from_id(registry, base, poly, id)
                    .unwrap_or_else(|| fallback_type(registry, base, poly));
                (desc, Some((poly, id)))
            }
            None => (base, None),
        };

        let mut map = Map::new();
        if let Some(decl) = positional_id(desc)
            && let Some(id) = items.next()
        {
            map.insert(decl.property.clone(), id.clone());
        }
        let props = positional_properties(desc);
        let rest = items.as_slice();
        if rest.len() > props.len() {
            return Err(self.error(
                ErrorKind::Shape,
                desc.name(),
                path,
                format!(
                    "array of {} values for an object of {} positions",
                    rest.len(),
                    props.len()
                ),
            ));
        }
        for (prop, item) in props.into_iter().zip(rest) {
            if !item.is_null() {
                map.insert(prop.output_name().into(), item.clone());
            }
        }

        let Some((poly, id)) = type_id else {
            return Ok(Json::Object(map));
        };
        Ok(match poly.strategy {
            TypeIdStrategy::Property | TypeIdStrategy::ExistingProperty => {
                if !map.contains_key(&poly.property) {
                    map.insert(poly.property.clone(), Json::String(id.into()));
                }
                Json::Object(map)
            }
            TypeIdStrategy::WrapperObject => {
                let mut wrapper = Map::new();
                wrapper.insert(id.into(), Json::Object(map));
                Json::Object(wrapper)
            }
            TypeIdStrategy::WrapperArray => Json::Array(vec![Json::String(id.into()), Json::Object(map)]),
        })
    }

    /// Folds flattened keys back into the unwrapped property they came from.
    ///
    /// A key is folded when it carries the property's prefix and suffix and
    /// the remainder is an input name of the nested type. Keys naming a
    /// property of `desc` itself are never folded.
    pub(super) fn unflatten(
        &self,
        desc: &TypeDescriptor,
        input: Vec<(String, Json)>,
    ) -> Vec<(String, Json)> {
        let registry = self.registry;
        let unwrapped: Vec<(&PropertyDescriptor, &Unwrap, Option<&TypeDescriptor>)> = desc
            .properties()
            .iter()
            .filter_map(|p| {
                let unwrap = p.unwrap_info()?;
                let nested = p.ty().object_name().and_then(|name| registry.describe(name));
                Some((p, unwrap, nested))
            })
            .collect();
        if unwrapped.is_empty() {
            return input;
        }

        let mut nested: Vec<Map<String, Json>> = unwrapped.iter().map(|_| Map::new()).collect();
        let mut out = Vec::with_capacity(input.len());
        for (k, v) in input {
            if desc.property_by_input(&k).is_some() {
                out.push((k, v));
                continue;
            }
            let target = unwrapped.iter().enumerate().find_map(|(i, (_, unwrap, inner))| {
                let key = unwrap.unwrap_key(&k)?;
                let known = inner.is_none_or(|d| d.property_by_input(key).is_some());
                known.then(|| (i, String::from(key)))
            });
            match target {
                Some((i, key)) => {
                    nested[i].insert(key, v);
                }
                None => out.push((k, v)),
            }
        }

        for ((prop, ..), map) in unwrapped.iter().zip(nested) {
            if !map.is_empty() {
                out.push((prop.output_name().into(), Json::Object(map)));
            }
        }
        out
    }
}
