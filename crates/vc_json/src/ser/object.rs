use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use serde_json::{Map, Value as Json};

use vc_graph::{ObjectKey, Value};
use vc_schema::{IdGenerator, Polymorphism, PropertyDescriptor, PropertyType, Role};
use vc_schema::{SchemaRegistry, Shape, TypeDescriptor, TypeIdStrategy};

use super::SerializeDriver;
use super::driver::ANY;
use crate::context::Branch;
use crate::format::{positional_id, positional_properties, reshape_out};
use crate::resolve::type_id_of;
use crate::{Error, ErrorKind, PropertyFilter, SerializeFeatures};

static NULL: Value = Value::Null;

/// How the fields of an object are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Layout {
    /// A JSON object keyed by output names.
    Keyed,
    /// A JSON array, see [`positional_properties`].
    Positional,
}

// -----------------------------------------------------------------------------
// Objects

impl<'a, R: SchemaRegistry + ?Sized> SerializeDriver<'a, R> {
    pub(super) fn write_object(
        &mut self,
        key: ObjectKey,
        hint: &PropertyType,
        branch: &Branch<'a>,
        layout: Layout,
    ) -> Result<Json, Error> {
        let graph = self.graph;
        let registry = self.registry;

        let Some(type_name) = graph.type_of(key) else {
            return Err(self.error(
                ErrorKind::Schema,
                &hint.to_string(),
                branch,
                "object handle is not part of the graph",
            ));
        };
        let Some(desc) = registry.describe(type_name) else {
            return Err(self.error(
                ErrorKind::Schema,
                type_name,
                branch,
                format!("type `{type_name}` is not registered"),
            ));
        };

        if let Some(id) = self.identities.lookup(key) {
            #[cfg(all(debug_assertions, feature = "debug"))]
            log::trace!("{}: `{type_name}` written as id {id}", branch.path);
            return Ok(id.clone());
        }

        if branch.is_on_path(key) {
            if self
                .options
                .features()
                .contains(SerializeFeatures::WRITE_SELF_REFERENCES_AS_NULL)
            {
                log::warn!("{}: self reference to `{type_name}` written as null", branch.path);
                return Ok(Json::Null);
            }
            return Err(self.error(
                ErrorKind::Cycle,
                type_name,
                branch,
                "object is reached again through its own properties",
            ));
        }

        if desc.is_ignored() {
            return Ok(Json::Null);
        }

        #[cfg(all(debug_assertions, feature = "debug"))]
        {
            log::trace!("{}: write `{type_name}`", branch.path);
            self.stack.push(type_name);
        }

        let result = match layout {
            Layout::Positional if desc.value_property().is_none() => {
                self.write_positional(key, desc, hint, branch)
            }
            _ => self.write_fields(key, desc, hint, branch),
        };

        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.pop();

        result
    }

    fn write_fields(
        &mut self,
        key: ObjectKey,
        desc: &'a TypeDescriptor,
        hint: &PropertyType,
        branch: &Branch<'a>,
    ) -> Result<Json, Error> {
        let graph = self.graph;
        let options = self.options;

        let mut scope = branch.clone();
        scope.enter(key);

        if let Some(name) = desc.value_property() {
            let Some(prop) = desc.property(name) else {
                return Err(self.error(
                    ErrorKind::Schema,
                    desc.name(),
                    branch,
                    format!("value property `{name}` is not declared"),
                ));
            };
            let value = graph.field(key, prop.name()).unwrap_or(&NULL);
            return self.write_property(desc, prop, value, &scope);
        }

        let mut out = Map::new();

        // Identity goes first.
        let id_slot = desc
            .identity()
            .filter(|decl| decl.generator == IdGenerator::Property)
            .map(|decl| decl.property.as_str());
        if let Some((name, id)) = self.assign_identity(key, desc, &scope, branch)? {
            out.insert(name.into(), id);
        }

        let poly = self.polymorphism(desc, hint);
        let filter = self.property_filter(desc, branch);

        if desc.prepends() {
            self.write_appends(desc, &mut out, &scope)?;
        }

        let alphabetic = options
            .features()
            .contains(SerializeFeatures::SORT_PROPERTIES_ALPHABETICALLY);
        for prop in desc.ordered_properties(alphabetic) {
            if prop.is_ignored()
                || !prop.access_mode().readable()
                || matches!(prop.role(), Role::BackReference(_))
                || id_slot == Some(prop.name())
                || desc.any_property() == Some(prop.name())
                || !options.in_view(prop)
                || filter.is_some_and(|f| !f.includes(prop))
            {
                continue;
            }
            let value = graph.field(key, prop.name()).unwrap_or(&NULL);
            if !desc.inclusion_of(prop).includes(value) {
                continue;
            }

            let child = scope.key(prop.output_name()).with_filter(prop.filter_id());
            let json = self.write_property(desc, prop, value, &child)?;

            let Some(unwrap) = prop.unwrap_info() else {
                out.insert(prop.output_name().into(), json);
                continue;
            };
            match json {
                Json::Object(inner) => {
                    for (k, v) in inner {
                        out.insert(unwrap.wrap_key(&k), v);
                    }
                }
                Json::Null => {}
                other => {
                    return Err(self.error(
                        ErrorKind::Shape,
                        desc.name(),
                        &child,
                        format!("an unwrapped property must be an object, found {other}"),
                    ));
                }
            }
        }

        if let Some(any) = desc.any_property() {
            self.write_any(desc, graph.field(key, any).unwrap_or(&NULL), &mut out, &scope)?;
        }

        if !desc.prepends() {
            self.write_appends(desc, &mut out, &scope)?;
        }

        let Some(poly) = poly else {
            return Ok(Json::Object(out));
        };
        let id = type_id_of(poly, desc);
        Ok(match poly.strategy {
            TypeIdStrategy::Property => {
                if !out.contains_key(&poly.property) {
                    out.insert(poly.property.clone(), Json::String(id.into()));
                }
                Json::Object(out)
            }
            TypeIdStrategy::ExistingProperty => Json::Object(out),
            TypeIdStrategy::WrapperObject => {
                let mut wrapper = Map::new();
                wrapper.insert(id.into(), Json::Object(out));
                Json::Object(wrapper)
            }
            TypeIdStrategy::WrapperArray => {
                Json::Array(vec![Json::String(id.into()), Json::Object(out)])
            }
        })
    }

    /// Writes `desc` as an array: the type id when the value is
    /// polymorphic, the generated id, then every positional property.
    ///
    /// Absent values and values outside the active view or filter are
    /// `null` so that positions stay fixed. Inclusion policies, the
    /// any-property, appended attributes and flattening do not apply.
    fn write_positional(
        &mut self,
        key: ObjectKey,
        desc: &'a TypeDescriptor,
        hint: &PropertyType,
        branch: &Branch<'a>,
    ) -> Result<Json, Error> {
        let graph = self.graph;
        let options = self.options;

        let mut scope = branch.clone();
        scope.enter(key);

        // Only the declared type's polymorphism is read back from arrays.
        let registry = self.registry;
        let poly = match hint.object_name() {
            Some(base) => registry.describe(base).and_then(TypeDescriptor::polymorphism),
            None => desc.polymorphism(),
        };

        let mut out = Vec::new();
        if let Some(poly) = poly {
            out.push(Json::String(type_id_of(poly, desc).into()));
        }
        let id = self.assign_identity(key, desc, &scope, branch)?;
        if positional_id(desc).is_some()
            && let Some((_, id)) = id
        {
            out.push(id);
        }

        let filter = self.property_filter(desc, branch);
        for prop in positional_properties(desc) {
            let value = graph.field(key, prop.name()).unwrap_or(&NULL);
            if !options.in_view(prop) || filter.is_some_and(|f| !f.includes(prop)) {
                out.push(Json::Null);
                continue;
            }
            let child = scope.key(prop.output_name()).with_filter(prop.filter_id());
            out.push(self.write_property(desc, prop, value, &child)?);
        }
        Ok(Json::Array(out))
    }

    /// Assigns the id of an identity-declared object. Runs before any child
    /// is written so that children referring back to the object emit the id.
    ///
    /// Returns the output key of the id and the id.
    fn assign_identity(
        &mut self,
        key: ObjectKey,
        desc: &'a TypeDescriptor,
        scope: &Branch<'a>,
        branch: &Branch<'a>,
    ) -> Result<Option<(&'a str, Json)>, Error> {
        let graph = self.graph;
        let Some(decl) = desc.identity() else {
            return Ok(None);
        };
        let (name, own) = match decl.generator {
            IdGenerator::Property => {
                let prop = desc.property(&decl.property);
                let value = graph.field(key, &decl.property).unwrap_or(&NULL);
                let own = self.write_value(value, prop.map_or(&ANY, |p| p.ty()), scope)?;
                let name = prop.map_or(decl.property.as_str(), |p| p.output_name());
                (name, Some(own))
            }
            IdGenerator::IntSequence | IdGenerator::Uuid => (decl.property.as_str(), None),
        };
        let id = self
            .identities
            .assign(key, decl, own)
            .map_err(|m| self.error(ErrorKind::Schema, desc.name(), branch, m))?;
        Ok(Some((name, id)))
    }

    /// The polymorphism declaration governing `desc` written as `hint`.
    fn polymorphism(&self, desc: &'a TypeDescriptor, hint: &PropertyType) -> Option<&'a Polymorphism> {
        let registry = self.registry;
        hint.object_name()
            .and_then(|base| registry.describe(base))
            .and_then(TypeDescriptor::polymorphism)
            .or(desc.polymorphism())
    }

    fn property_filter(&self, desc: &'a TypeDescriptor, branch: &Branch<'a>) -> Option<&'a PropertyFilter> {
        let options = self.options;
        let id = desc.filter_id().or(branch.filter())?;
        let filter = options.filter(id);
        if filter.is_none() {
            log::debug!("filter `{id}` is not configured, including every property");
        }
        filter
    }

    // -------------------------------------------------------------------------
    // Properties

    pub(super) fn write_property(
        &mut self,
        owner: &TypeDescriptor,
        prop: &'a PropertyDescriptor,
        value: &Value,
        branch: &Branch<'a>,
    ) -> Result<Json, Error> {
        if let Some(serializer) = prop.serializer() {
            return serializer
                .call(value, self.graph)
                .map_err(|e| self.error(ErrorKind::Conversion, owner.name(), branch, e.message()));
        }

        if prop.is_raw()
            && let Value::String(text) = value
        {
            return serde_json::from_str(text).map_err(|e| {
                self.error(
                    ErrorKind::Shape,
                    owner.name(),
                    branch,
                    format!("raw value is not valid JSON: {e}"),
                )
            });
        }

        let format = prop.format_directive();
        let layout = match format {
            Some(format) if format.shape == Shape::Array => Layout::Positional,
            _ => Layout::Keyed,
        };

        let element = prop.ty().element().unwrap_or(&ANY);
        let json = match (value, prop.element_serializer()) {
            (Value::List(items), Some(each)) => self.write_list(items, element, Some(each), branch)?,
            (Value::Map(entries), Some(each)) => {
                self.write_map(entries, element, Some(each), branch)?
            }
            _ => self.write_value_as(value, prop.ty(), branch, layout)?,
        };

        match format {
            Some(format) => reshape_out(format, value, json)
                .map_err(|m| self.error(ErrorKind::Shape, owner.name(), branch, m)),
            None => Ok(json),
        }
    }

    fn write_any(
        &mut self,
        desc: &TypeDescriptor,
        bag: &Value,
        out: &mut Map<String, Json>,
        scope: &Branch<'a>,
    ) -> Result<(), Error> {
        let entries = match bag {
            Value::Null => return Ok(()),
            Value::Map(entries) => entries,
            other => {
                return Err(self.error(
                    ErrorKind::Shape,
                    desc.name(),
                    scope,
                    format!("any-property slot must hold a map, found {}", other.kind()),
                ));
            }
        };
        for (k, v) in entries {
            let Some(k) = k.as_key() else {
                return Err(self.error(
                    ErrorKind::Shape,
                    desc.name(),
                    scope,
                    format!("a {} cannot be a property name", k.kind()),
                ));
            };
            if out.contains_key(&k) {
                continue;
            }
            let json = self.write_value(v, &ANY, &scope.key(&k))?;
            out.insert(k, json);
        }
        Ok(())
    }

    fn write_appends(
        &mut self,
        desc: &TypeDescriptor,
        out: &mut Map<String, Json>,
        scope: &Branch<'a>,
    ) -> Result<(), Error> {
        let options = self.options;
        for attr in desc.append_attrs() {
            let value = match options.attribute(&attr.value) {
                Some(value) => value,
                None if attr.required => {
                    return Err(self.error(
                        ErrorKind::RequiredValue,
                        desc.name(),
                        scope,
                        format!("attribute `{}` is required but was not supplied", attr.value),
                    ));
                }
                None => &NULL,
            };
            if !attr.inclusion.includes(value) {
                continue;
            }
            let json = self.write_value(value, &ANY, &scope.key(attr.output_name()))?;
            out.insert(attr.output_name().into(), json);
        }
        Ok(())
    }
}
