use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde_json::Value as Json;
use vc_graph::{Instance, ObjectKey, Value};
use vc_schema::{Creator, CreatorMode, CreatorParam, IdGenerator, IdentityDecl, Polymorphism};
use vc_schema::{PropertyDescriptor, Role, SchemaRegistry, TypeDescriptor, TypeIdStrategy};

use super::DeserializeDriver;
use super::driver::{ANY, json_kind};
use crate::identity::id_text;
use crate::resolve::{fallback_type, type_from_id};
use crate::{DeserializeFeatures, Error, ErrorKind, KeyPath, pairing};

/// The input key holding the id of `desc`.
fn id_key<'d>(desc: &'d TypeDescriptor, decl: &'d IdentityDecl) -> &'d str {
    match decl.generator {
        IdGenerator::Property => desc
            .property(&decl.property)
            .map_or(decl.property.as_str(), PropertyDescriptor::output_name),
        IdGenerator::IntSequence | IdGenerator::Uuid => decl.property.as_str(),
    }
}

/// Removes `key` from `input`, keeping the order of the rest.
fn take(input: &mut Vec<(String, Json)>, key: &str) -> Option<Json> {
    let index = input.iter().position(|(k, _)| k == key)?;
    Some(input.remove(index).1)
}

// -----------------------------------------------------------------------------
// Objects

impl<'a, R: SchemaRegistry + ?Sized> DeserializeDriver<'a, R> {
    pub(super) fn read_object(
        &mut self,
        json: &Json,
        type_name: &str,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let registry = self.registry;
        let Some(base) = registry.describe(type_name) else {
            return Err(self.error(
                ErrorKind::Schema,
                type_name,
                path,
                format!("type `{type_name}` is not registered"),
            ));
        };

        if let Some(decl) = base.identity()
            && let Some(id) = id_text(json)
        {
            return self.read_reference(base, decl, &id, path);
        }

        if base.identity().is_none()
            && let Some(poly) = base.polymorphism()
            && let Some(id) = id_text(json)
        {
            let scopes = self.subtype_scopes(poly);
            if !scopes.is_empty() {
                return self.read_subtype_reference(base, &scopes, &id, path);
            }
        }

        let (desc, body) = match base.polymorphism() {
            Some(poly) => self.resolve_subtype(base, poly, json, path)?,
            None => (base, Cow::Borrowed(json)),
        };

        #[cfg(all(debug_assertions, feature = "debug"))]
        {
            log::trace!("{path}: read `{}`", desc.name());
            self.stack.push(desc.name());
        }

        let result = self.read_body(desc, &body, path);

        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.pop();

        result
    }

    /// A scalar standing for an identity-declared object.
    fn read_reference(
        &mut self,
        base: &TypeDescriptor,
        decl: &IdentityDecl,
        id: &str,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        let registry = self.registry;
        let scope = decl.scope_name();
        let known = self
            .identities
            .lookup(scope, id)
            .map(|e| (e.key, e.type_name.clone(), e.resolved));

        match known {
            Some((key, ty, resolved)) => {
                let compatible = registry.is_assignable(&ty, base.name())
                    || (!resolved && registry.is_assignable(base.name(), &ty));
                if !compatible {
                    return Err(self.error(
                        ErrorKind::TypeResolution,
                        base.name(),
                        path,
                        format!("id `{id}` refers to a `{ty}`"),
                    ));
                }
                Ok(Value::Object(key))
            }
            None => {
                let key = self.reserve(base.name());
                self.identities.reserve(scope, id, key, base.name());
                #[cfg(all(debug_assertions, feature = "debug"))]
                log::trace!("{path}: id `{id}` referenced before its definition");
                Ok(Value::Object(key))
            }
        }
    }

    /// Identity scopes declared below a polymorphic base that declares none
    /// itself, in subtype table order.
    fn subtype_scopes(&self, poly: &'a Polymorphism) -> Vec<&'a str> {
        let registry = self.registry;
        let mut scopes: Vec<&'a str> = Vec::new();
        let mut pending: Vec<&'a str> =
            poly.subtypes.iter().rev().map(|s| s.type_name.as_str()).collect();
        let mut seen: Vec<&'a str> = Vec::new();
        while let Some(name) = pending.pop() {
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            let Some(desc) = registry.describe(name) else {
                continue;
            };
            if let Some(decl) = desc.identity()
                && !scopes.contains(&decl.scope_name())
            {
                scopes.push(decl.scope_name());
            }
            if let Some(inner) = desc.polymorphism() {
                pending.extend(inner.subtypes.iter().rev().map(|s| s.type_name.as_str()));
            }
        }
        scopes
    }

    /// A scalar standing for an object whose identity is declared on a
    /// subtype of `base`.
    ///
    /// An id not seen yet is reserved as a placeholder only when every
    /// subtype shares one scope; otherwise the scope it belongs to is
    /// unknown.
    fn read_subtype_reference(
        &mut self,
        base: &TypeDescriptor,
        scopes: &[&str],
        id: &str,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        let registry = self.registry;
        let mut mismatch = None;
        for scope in scopes {
            let Some(entry) = self.identities.lookup(scope, id) else {
                continue;
            };
            if registry.is_assignable(&entry.type_name, base.name())
                || (!entry.resolved && registry.is_assignable(base.name(), &entry.type_name))
            {
                return Ok(Value::Object(entry.key));
            }
            mismatch.get_or_insert_with(|| entry.type_name.clone());
        }

        match (mismatch, scopes) {
            (Some(ty), _) => Err(self.error(
                ErrorKind::TypeResolution,
                base.name(),
                path,
                format!("id `{id}` refers to a `{ty}`"),
            )),
            (None, [scope]) => {
                let key = self.reserve(base.name());
                self.identities.reserve(scope, id, key, base.name());
                #[cfg(all(debug_assertions, feature = "debug"))]
                log::trace!("{path}: id `{id}` referenced before its definition");
                Ok(Value::Object(key))
            }
            (None, _) => Err(self.error(
                ErrorKind::UnresolvedId,
                base.name(),
                path,
                format!("id `{id}` is not defined before its use and its subtype is unknown"),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Polymorphism

    /// Extracts the discriminator per the wrapper convention and resolves
    /// the subtype it names. Returns the target type and the remaining body.
    fn resolve_subtype<'j>(
        &mut self,
        base: &'a TypeDescriptor,
        poly: &'a Polymorphism,
        json: &'j Json,
        path: &KeyPath,
    ) -> Result<(&'a TypeDescriptor, Cow<'j, Json>), Error> {
        let registry = self.registry;
        let features = self.options.features();

        let (id, body): (Option<&'j str>, Cow<'j, Json>) = match poly.strategy {
            TypeIdStrategy::Property | TypeIdStrategy::ExistingProperty => {
                let Json::Object(map) = json else {
                    return Err(self.error(
                        ErrorKind::Shape,
                        base.name(),
                        path,
                        format!(
                            "expected an object carrying `{}`, found {}",
                            poly.property,
                            json_kind(json)
                        ),
                    ));
                };
                match map.get(&poly.property) {
                    None => (None, Cow::Borrowed(json)),
                    Some(Json::String(id)) if poly.strategy == TypeIdStrategy::Property => {
                        let rest = map
                            .iter()
                            .filter(|(k, _)| **k != poly.property)
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect();
                        (Some(id.as_str()), Cow::Owned(Json::Object(rest)))
                    }
                    Some(Json::String(id)) => (Some(id.as_str()), Cow::Borrowed(json)),
                    Some(other) => {
                        return Err(self.error(
                            ErrorKind::Shape,
                            base.name(),
                            &path.key(&poly.property),
                            format!("type id must be a string, found {}", json_kind(other)),
                        ));
                    }
                }
            }
            TypeIdStrategy::WrapperObject => {
                let single = json
                    .as_object()
                    .filter(|map| map.len() == 1)
                    .and_then(|map| map.iter().next());
                let Some((id, inner)) = single else {
                    return Err(self.error(
                        ErrorKind::Shape,
                        base.name(),
                        path,
                        format!(
                            "expected a single-key object wrapping the value, found {}",
                            json_kind(json)
                        ),
                    ));
                };
                (Some(id.as_str()), Cow::Borrowed(inner))
            }
            TypeIdStrategy::WrapperArray => match json.as_array().map(Vec::as_slice) {
                Some([Json::String(id), inner]) => (Some(id.as_str()), Cow::Borrowed(inner)),
                Some(items) => {
                    return Err(self.error(
                        ErrorKind::Shape,
                        base.name(),
                        path,
                        format!(
                            "expected a [type id, value] pair, found an array of {} elements",
                            items.len()
                        ),
                    ));
                }
                None => {
                    return Err(self.error(
                        ErrorKind::Shape,
                        base.name(),
                        path,
                        format!("expected a [type id, value] pair, found {}", json_kind(json)),
                    ));
                }
            },
        };

        let desc = match id {
            Some(id) => match type_from_id(registry, base, poly, id) {
                Some(desc) => desc,
                None if features.contains(DeserializeFeatures::FAIL_ON_INVALID_SUBTYPE) => {
                    return Err(self.error(
                        ErrorKind::TypeResolution,
                        base.name(),
                        path,
                        format!("`{id}` is not a known subtype"),
                    ));
                }
                None => {
                    let fallback = fallback_type(registry, base, poly);
                    log::warn!(
                        "{path}: unknown type id `{id}` for `{}`, reading as `{}`",
                        base.name(),
                        fallback.name()
                    );
                    fallback
                }
            },
            None if features.contains(DeserializeFeatures::FAIL_ON_MISSING_TYPE_ID) => {
                return Err(self.error(
                    ErrorKind::TypeResolution,
                    base.name(),
                    path,
                    format!("missing type id property `{}`", poly.property),
                ));
            }
            None => {
                let fallback = fallback_type(registry, base, poly);
                log::warn!(
                    "{path}: no type id for `{}`, reading as `{}`",
                    base.name(),
                    fallback.name()
                );
                fallback
            }
        };
        Ok((desc, body))
    }

    // -------------------------------------------------------------------------
    // Body

    fn read_body(
        &mut self,
        desc: &'a TypeDescriptor,
        body: &Json,
        path: &KeyPath,
    ) -> Result<Value, Error> {
        let registry = self.registry;
        let options = self.options;
        let features = options.features();

        let mut identity: Option<(&'a str, String)> = None;
        if let Some(decl) = desc.identity()
            && let Json::Object(map) = body
            && let Some(id) = map.get(id_key(desc, decl)).and_then(id_text)
        {
            let known = self
                .identities
                .lookup(decl.scope_name(), &id)
                .map(|e| (e.key, e.type_name.clone(), e.resolved));
            match known {
                Some((key, ty, true)) if ty == desc.name() => return Ok(Value::Object(key)),
                Some((_, ty, true)) => {
                    return Err(self.error(
                        ErrorKind::TypeResolution,
                        desc.name(),
                        path,
                        format!("id `{id}` already refers to a `{ty}`"),
                    ));
                }
                Some((_, ty, false)) if !registry.is_assignable(desc.name(), &ty) => {
                    return Err(self.error(
                        ErrorKind::TypeResolution,
                        desc.name(),
                        path,
                        format!("id `{id}` is referenced as a `{ty}`"),
                    ));
                }
                _ => {}
            }
            identity = Some((decl.scope_name(), id));
        }

        if desc.is_ignored() {
            return Ok(Value::Null);
        }

        let generated_id = desc
            .identity()
            .filter(|decl| decl.generator != IdGenerator::Property)
            .map(|decl| decl.property.as_str());

        let creator = match options.creator() {
            Some(name) => desc.creator(Some(name)).or_else(|| desc.creator(None)),
            None => desc.creator(None),
        };

        if let Some(creator) = creator
            && let CreatorMode::Delegating(ty) = creator.mode()
        {
            let stripped;
            let input = match (body, generated_id) {
                (Json::Object(map), Some(id_key)) if map.contains_key(id_key) => {
                    stripped = Json::Object(
                        map.iter()
                            .filter(|(k, _)| *k != id_key)
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    );
                    &stripped
                }
                _ => body,
            };
            let arg = self.read_value(input, ty, path)?;
            let instance = creator
                .create(vec![arg])
                .map_err(|e| self.error(ErrorKind::Conversion, desc.name(), path, e.message()))?;
            let key = self.materialize(desc, instance, identity.as_ref());
            return Ok(Value::Object(key));
        }

        let Json::Object(map) = body else {
            return Err(self.error(
                ErrorKind::Shape,
                desc.name(),
                path,
                format!("expected an object, found {}", json_kind(body)),
            ));
        };

        let mut input: Vec<(String, Json)> = map
            .iter()
            .filter(|(k, _)| Some(k.as_str()) != generated_id)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        input = self.unflatten(desc, input);

        // Creator arguments are taken out first; their keys are not set again.
        let params: &[CreatorParam] = match creator.map(Creator::mode) {
            Some(CreatorMode::Properties(params)) => params,
            _ => &[],
        };
        let raw_args: Vec<Option<Json>> = params
            .iter()
            .map(|p| match p.inject {
                Some(_) => None,
                None => take(&mut input, &p.property),
            })
            .collect();

        let mut fields: Vec<(&'a PropertyDescriptor, Json)> = Vec::with_capacity(input.len());
        let mut unknown: Vec<(String, Json)> = Vec::new();
        for (k, v) in input {
            match desc.property_by_input(&k) {
                Some(prop) => {
                    if prop.is_ignored()
                        || !prop.access_mode().writable()
                        || matches!(prop.role(), Role::BackReference(_))
                        || !options.in_view(prop)
                    {
                        #[cfg(all(debug_assertions, feature = "debug"))]
                        log::trace!("{path}: input key `{k}` dropped");
                        continue;
                    }
                    fields.push((prop, v));
                }
                None if desc.polymorphism().is_some_and(|p| p.property == k) => {}
                None => unknown.push((k, v)),
            }
        }

        if desc.any_property().is_none()
            && !desc.ignores_unknown()
            && features.contains(DeserializeFeatures::FAIL_ON_UNKNOWN_PROPERTIES)
            && let Some((k, _)) = unknown.first()
        {
            return Err(self.error(
                ErrorKind::UnknownProperty,
                desc.name(),
                &path.key(k),
                format!("`{}` has no property `{k}`", desc.name()),
            ));
        }

        let mut injected: Vec<(&'a PropertyDescriptor, Value)> = Vec::new();
        for prop in desc.properties() {
            let Some(inject) = prop.injection() else {
                continue;
            };
            let Some(value) = options.injectable(&inject.key) else {
                continue;
            };
            match fields.iter().position(|(p, _)| p.name() == prop.name()) {
                Some(_) if inject.use_input => continue,
                Some(index) => {
                    fields.remove(index);
                }
                None => {}
            }
            injected.push((prop, value.clone()));
        }

        for prop in desc.properties() {
            if !prop.is_required()
                || prop.is_ignored()
                || !prop.access_mode().writable()
                || matches!(prop.role(), Role::BackReference(_))
                || prop.default().is_some()
            {
                continue;
            }
            let present = fields.iter().any(|(p, _)| p.name() == prop.name())
                || injected.iter().any(|(p, _)| p.name() == prop.name())
                || params
                    .iter()
                    .zip(&raw_args)
                    .any(|(param, raw)| raw.is_some() && prop.input_names().any(|n| n == param.property));
            if !present {
                return Err(self.error(
                    ErrorKind::RequiredValue,
                    desc.name(),
                    &path.key(prop.output_name()),
                    format!("required property `{}` is missing", prop.output_name()),
                ));
            }
        }

        let instance = match creator {
            Some(creator) => self.call_creator(desc, creator, params, raw_args, path)?,
            None => Instance::new(desc.name()),
        };
        let key = self.materialize(desc, instance, identity.as_ref());

        for (prop, value) in injected {
            self.graph.set_field(key, prop.name(), value);
        }

        for (prop, json) in fields {
            let child = path.key(prop.output_name());
            let value = self.read_property(desc, prop, &json, &child)?;
            if matches!(prop.role(), Role::ForwardReference(_)) {
                pairing::link(self.graph, registry, key, prop, &value)
                    .map_err(|m| self.error(ErrorKind::Schema, desc.name(), &child, m))?;
            }
            self.graph.set_field(key, prop.name(), value);
        }

        match desc.any_property() {
            Some(any) => {
                let element = desc
                    .property(any)
                    .and_then(|p| p.ty().element())
                    .unwrap_or(&ANY);
                for (k, json) in unknown {
                    let value = self.read_value(&json, element, &path.key(&k))?;
                    if let Some(instance) = self.graph.get_mut(key) {
                        match instance.get_mut(any) {
                            Some(Value::Map(entries)) => entries.push((Value::String(k), value)),
                            _ => {
                                instance.set(any, Value::Map(vec![(Value::String(k), value)]));
                            }
                        }
                    }
                }
            }
            None => {
                for (k, _) in unknown {
                    log::warn!("{path}: unknown property `{k}` of `{}` dropped", desc.name());
                }
            }
        }

        for prop in desc.properties() {
            if let Some(default) = prop.default()
                && !prop.is_ignored()
                && self.graph.field(key, prop.name()).is_none()
            {
                self.graph.set_field(key, prop.name(), default.clone());
            }
        }

        Ok(Value::Object(key))
    }

    // -------------------------------------------------------------------------
    // Creation

    fn call_creator(
        &mut self,
        desc: &TypeDescriptor,
        creator: &Creator,
        params: &[CreatorParam],
        raw_args: Vec<Option<Json>>,
        path: &KeyPath,
    ) -> Result<Instance, Error> {
        let options = self.options;
        let strict = options
            .features()
            .contains(DeserializeFeatures::FAIL_ON_MISSING_CREATOR_PROPERTIES);

        let mut args = Vec::with_capacity(params.len());
        for (param, raw) in params.iter().zip(raw_args) {
            let child = path.key(&param.property);
            let arg = match (&param.inject, raw) {
                (Some(key), _) => options.injectable(key).cloned(),
                (None, Some(json)) => Some(self.read_value(&json, &param.ty, &child)?),
                (None, None) => None,
            };
            let arg = match arg {
                Some(value) => value,
                None if param.required && strict => {
                    return Err(self.error(
                        ErrorKind::RequiredValue,
                        desc.name(),
                        &child,
                        format!("creator argument `{}` is missing", param.property),
                    ));
                }
                None => {
                    if param.required {
                        log::warn!("{child}: creator argument `{}` is missing, using null", param.property);
                    }
                    Value::Null
                }
            };
            args.push(arg);
        }

        creator
            .create(args)
            .map_err(|e| self.error(ErrorKind::Conversion, desc.name(), path, e.message()))
    }

    /// Moves `instance` into the graph, filling the placeholder of its id if
    /// one was reserved, and records the id.
    fn materialize(
        &mut self,
        desc: &TypeDescriptor,
        instance: Instance,
        identity: Option<&(&str, String)>,
    ) -> ObjectKey {
        let placeholder = identity
            .and_then(|(scope, id)| self.identities.lookup(scope, id))
            .filter(|entry| !entry.resolved)
            .map(|entry| entry.key);

        let key = match placeholder {
            Some(key) => {
                self.graph.replace(key, instance);
                key
            }
            None => self.allocate(instance),
        };
        if let Some((scope, id)) = identity {
            self.identities.resolve(scope, id, key, desc.name());
        }
        key
    }
}
