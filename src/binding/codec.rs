//! Catalog-driven conversion between configuration objects and XML.
//!
//! Two shapes are handled here:
//!
//! - the flat document form used by the backing file, one
//!   `<Member>value</Member>` leaf per config property
//!   ([`load_properties`], [`store_properties`]);
//! - the property tree used for introspection and bulk updates
//!   ([`format_object_as_xml`], [`update_object_from_xml`]).
//!
//! Failures are isolated per member: they are logged and the walk moves on
//! to the next member.

use std::time::Instant;

use tracing::{debug, warn};

use super::catalog::PropertyDescriptor;
use super::reflect::{Member, Reflect, ReflectError};
use super::value::{parse_bool, ConfigValue};
use crate::xml::{XmlElement, XmlError};


pub const PROPERTY: &str = "property";
pub const VALID: &str = "valid";

pub const NAME: &str = "name";
pub const DISPLAY_NAME: &str = "display-name";
pub const DESCRIPTION: &str = "description";
pub const CATEGORY: &str = "category";
pub const READ_ONLY: &str = "read-only";
pub const CUSTOM_EDITOR: &str = "custom-editor";
pub const VALUE: &str = "value";
pub const DEFAULT_VALUE: &str = "default-value";
pub const TYPE: &str = "type";
pub const VALID_VALUE_COUNT: &str = "valid-value-count";

/// Nested objects deeper than this are neither exported nor updated.
pub const MAX_DEPTH: usize = 32;


/// Assigns every config property its declared default.
pub fn apply_defaults<T: Reflect + ?Sized>(target: &mut T) {
    let started = Instant::now();
    let catalog = target.catalog();

    for descriptor in catalog.config_properties() {
        let Some(default) = descriptor.typed_default() else {
            continue;
        };

        let result = default
            .map_err(ReflectError::from)
            .and_then(|value| target.set_member(descriptor.name, value));

        if let Err(error) = result {
            warn!(
                type_name = catalog.type_name(),
                member = descriptor.name,
                %error,
                "Failed to apply default value."
            );
        }
    }

    debug!(
        "Time to set defaults on type {}: {}ms",
        catalog.type_name(),
        started.elapsed().as_millis()
    );
}

/// Reads config properties from the leaves of a root's document subtree.
///
/// Members that have no leaf keep their current value.
pub fn load_properties<T: Reflect + ?Sized>(target: &mut T, subtree: &XmlElement) {
    let started = Instant::now();
    let catalog = target.catalog();

    for leaf in &subtree.children {
        let Some(descriptor) = catalog.config_property(&leaf.name) else {
            debug!(
                type_name = catalog.type_name(),
                "Unable to find config property '{}'.", leaf.name
            );
            continue;
        };

        let result = ConfigValue::from(leaf.inner_text().into_owned())
            .convert(descriptor.kind)
            .map_err(ReflectError::from)
            .and_then(|value| target.set_member(descriptor.name, value));

        if let Err(error) = result {
            warn!(
                type_name = catalog.type_name(),
                member = descriptor.name,
                %error,
                "Failed to load property."
            );
        }
    }

    debug!(
        "Time to load properties on type {}: {}ms",
        catalog.type_name(),
        started.elapsed().as_millis()
    );
}

/// Writes every config property into a leaf of the root's document subtree,
/// creating leaves that do not exist yet.
pub fn store_properties<T: Reflect + ?Sized>(source: &T, subtree: &mut XmlElement) {
    let started = Instant::now();
    let catalog = source.catalog();

    for descriptor in catalog.config_properties() {
        match source.get_member(descriptor.name, None) {
            Ok(Some(Member::Value(value))) => {
                subtree
                    .ensure_child(descriptor.name)
                    .set_inner_text(value.to_string());
            }
            Ok(Some(Member::Object(_))) => {
                warn!(
                    type_name = catalog.type_name(),
                    member = descriptor.name,
                    "Nested objects cannot be stored as config properties."
                );
            }
            Ok(None) => {
                debug!(
                    type_name = catalog.type_name(),
                    member = descriptor.name,
                    "Property has no value, not storing it."
                );
            }
            Err(error) => {
                warn!(
                    type_name = catalog.type_name(),
                    member = descriptor.name,
                    %error,
                    "Failed to store property."
                );
            }
        }
    }

    debug!(
        "Time to store properties on type {}: {}ms",
        catalog.type_name(),
        started.elapsed().as_millis()
    );
}


/// Exports the browsable members of `source` as `<property>` nodes.
pub fn export_object<T: Reflect + ?Sized>(source: &T) -> Vec<XmlElement> {
    walk_object_tree(source, 0)
}

/// Exports `source` as a complete document whose root element is `root_name`.
pub fn format_object_as_xml<T: Reflect + ?Sized>(
    source: &T,
    root_name: &str,
) -> Result<String, XmlError> {
    let mut root = XmlElement::new(root_name);
    root.children = export_object(source);

    root.to_document_string()
}

fn walk_object_tree<T: Reflect + ?Sized>(source: &T, depth: usize) -> Vec<XmlElement> {
    let catalog = source.catalog();
    let mut nodes = Vec::new();

    for descriptor in catalog.browsable() {
        let mut node = XmlElement::new(PROPERTY).with_attribute(NAME, descriptor.name);

        if let Err(error) = export_member(source, descriptor, &mut node, depth) {
            warn!(
                type_name = catalog.type_name(),
                member = descriptor.name,
                %error,
                "Walk tree: failed to export member."
            );
        }

        nodes.push(node);
    }

    nodes
}

fn export_member<T: Reflect + ?Sized>(
    source: &T,
    descriptor: &PropertyDescriptor,
    node: &mut XmlElement,
    depth: usize,
) -> Result<(), ReflectError> {
    if let Some(display_name) = descriptor.display_name {
        node.set_attribute(DISPLAY_NAME, display_name);
    }
    if let Some(description) = descriptor.description {
        node.set_attribute(DESCRIPTION, description);
    }
    if let Some(category) = descriptor.category {
        node.set_attribute(CATEGORY, category);
    }
    node.set_attribute(READ_ONLY, descriptor.read_only.to_string());

    if let Some(editor) = &descriptor.custom_editor {
        node.set_attribute(CUSTOM_EDITOR, editor.text);

        if let Some(hook) = editor.get {
            source.custom_editor_get(hook, node)?;
        }

        return Ok(());
    }

    let member = match source.get_member(descriptor.name, None) {
        Ok(member) => member,
        Err(error) => {
            warn!(
                type_name = source.catalog().type_name(),
                member = descriptor.name,
                %error,
                "Walk tree: failed to read member value."
            );
            None
        }
    };

    // Both attributes carry the current value; clients read `default-value`
    // as "what the field holds now".
    if let Some(Member::Value(value)) = &member {
        let value = value.to_string();
        node.set_attribute(VALUE, value.as_str());
        node.set_attribute(DEFAULT_VALUE, value);
    }

    if !descriptor.exclude_type {
        node.set_attribute(TYPE, descriptor.type_name);
    }

    match member {
        Some(Member::Object(child)) if descriptor.recurse => {
            if depth >= MAX_DEPTH {
                warn!(
                    member = descriptor.name,
                    depth, "Walk tree: nesting too deep, not exporting children."
                );
            } else {
                node.children.extend(walk_object_tree(child, depth + 1));
            }
        }
        _ => {
            if let Some(provider) = descriptor.valid_value_provider {
                let valid_values = source.valid_values(provider)?;

                node.set_attribute(VALID_VALUE_COUNT, valid_values.len().to_string());
                for valid_value in valid_values {
                    node.children
                        .push(XmlElement::new(VALID).with_attribute(VALUE, valid_value));
                }
            }
        }
    }

    Ok(())
}


/// Applies the `<property>` children of `parent` onto `target`.
pub fn update_object_from_xml<T: Reflect + ?Sized>(target: &mut T, parent: &XmlElement) {
    update_at_depth(target, parent, 0);
}

fn update_at_depth<T: Reflect + ?Sized>(target: &mut T, parent: &XmlElement, depth: usize) {
    for node in parent.children_named(PROPERTY) {
        if node.attribute(READ_ONLY).and_then(parse_bool) == Some(true) {
            continue;
        }

        if let Err(error) = update_member(target, node, depth) {
            warn!(
                type_name = target.catalog().type_name(),
                member = node.attribute(NAME).unwrap_or_default(),
                %error,
                "Update from XML: failed to apply property."
            );
        }
    }
}

fn update_member<T: Reflect + ?Sized>(
    target: &mut T,
    node: &XmlElement,
    depth: usize,
) -> Result<(), ReflectError> {
    let Some(name) = node.attribute(NAME) else {
        debug!("Update from XML: property node has no name.");
        return Ok(());
    };

    let catalog = target.catalog();
    let descriptor = catalog
        .get(name)
        .ok_or_else(|| target.unknown_member(name))?;

    if node.children_named(PROPERTY).next().is_some() {
        if depth >= MAX_DEPTH {
            warn!(member = name, depth, "Update from XML: nesting too deep, skipping.");
            return Ok(());
        }

        // Absent sub-objects are never created by an update.
        if let Some(child) = target.get_member_mut(name, None)? {
            update_at_depth(child, node, depth + 1);
        }

        return Ok(());
    }

    if descriptor.read_only {
        debug!(member = name, "Update from XML: member is read-only, skipping.");
        return Ok(());
    }

    let set_hook = descriptor
        .custom_editor
        .as_ref()
        .and_then(|editor| editor.set);

    match (set_hook, node.attribute(VALUE)) {
        (Some(hook), _) if node.has_content() => target.custom_editor_set(hook, node),
        (_, Some(value)) => {
            let converted = ConfigValue::from(value).convert(descriptor.kind)?;
            target.set_member(name, converted)
        }
        _ => Ok(()),
    }
}
