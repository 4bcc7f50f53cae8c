//! Static per-type descriptors of the members that take part in
//! persistence and introspection.
//!
//! Every configuration type owns exactly one [`Catalog`], usually kept in a
//! `once_cell::sync::Lazy` static next to the type, so the descriptors are
//! built once and never re-derived on access.
//!
//! A catalog answers two different visibility questions:
//! - [`Catalog::browsable`] lists the members shown by export (broad),
//! - [`Catalog::config_properties`] lists the members that are given
//!   defaults, loaded, stored and written through paths (narrow).

use thiserror::Error;

use super::value::{ConfigValue, ConversionError, ValueKind};


/// A custom editor attached to a member. The hook names are dispatched by
/// [`Reflect::custom_editor_get`][super::Reflect::custom_editor_get] and
/// [`Reflect::custom_editor_set`][super::Reflect::custom_editor_set].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEditor {
    pub text: &'static str,
    pub get: Option<&'static str>,
    pub set: Option<&'static str>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: ValueKind,
    pub type_name: &'static str,

    pub config_property: bool,
    pub default_value: Option<&'static str>,

    pub display_name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub category: Option<&'static str>,
    pub read_only: bool,
    pub browsable: bool,

    pub recurse: bool,
    pub exclude_type: bool,
    pub custom_editor: Option<CustomEditor>,
    pub valid_value_provider: Option<&'static str>,
}

impl PropertyDescriptor {
    /// A browsable, non-persisted member.
    pub fn new(name: &'static str, kind: ValueKind, type_name: &'static str) -> Self {
        Self {
            name,
            kind,
            type_name,
            config_property: false,
            default_value: None,
            display_name: None,
            description: None,
            category: None,
            read_only: false,
            browsable: true,
            recurse: false,
            exclude_type: false,
            custom_editor: None,
            valid_value_provider: None,
        }
    }

    /// Marks the member as a config property with the given default.
    pub fn config(mut self, default_value: &'static str) -> Self {
        self.config_property = true;
        self.default_value = Some(default_value);
        self
    }

    /// Marks the member as a config property that has no default.
    pub fn config_without_default(mut self) -> Self {
        self.config_property = true;
        self
    }

    pub fn display_name(mut self, display_name: &'static str) -> Self {
        self.display_name = Some(display_name);
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn category(mut self, category: &'static str) -> Self {
        self.category = Some(category);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.browsable = false;
        self
    }

    pub fn recurse(mut self) -> Self {
        self.recurse = true;
        self
    }

    pub fn exclude_type(mut self) -> Self {
        self.exclude_type = true;
        self
    }

    pub fn custom_editor(
        mut self,
        text: &'static str,
        get: Option<&'static str>,
        set: Option<&'static str>,
    ) -> Self {
        self.custom_editor = Some(CustomEditor { text, get, set });
        self
    }

    pub fn valid_values(mut self, provider: &'static str) -> Self {
        self.valid_value_provider = Some(provider);
        self
    }

    /// Whether a path write may assign this member.
    pub fn is_writable(&self) -> bool {
        self.config_property && !self.read_only && self.kind != ValueKind::Object
    }

    /// The declared default converted to the declared kind, if there is one.
    pub fn typed_default(&self) -> Option<Result<ConfigValue, ConversionError>> {
        self.default_value
            .map(|default| ConfigValue::from(default).convert(self.kind))
    }
}


#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("{type_name}.{member}: default {default:?} is not a valid {kind}")]
    InvalidDefault {
        type_name: &'static str,
        member: &'static str,
        default: &'static str,
        kind: ValueKind,
        #[source]
        source: ConversionError,
    },

    #[error("{type_name}.{member}: nested objects cannot be config properties")]
    ObjectConfigProperty {
        type_name: &'static str,
        member: &'static str,
    },

    #[error("{type_name}.{member}: only nested objects can be recursed into")]
    ScalarRecurse {
        type_name: &'static str,
        member: &'static str,
    },

    #[error("{type_name}.{member} is declared more than once")]
    DuplicateMember {
        type_name: &'static str,
        member: &'static str,
    },

    #[error("{type_name}.{member} is declared but get_member doesn't know it")]
    Unreadable {
        type_name: &'static str,
        member: &'static str,
    },

    #[error("{type_name}.{member} is writable but set_member can't assign it")]
    Unassignable {
        type_name: &'static str,
        member: &'static str,
    },
}


#[derive(Debug, Clone)]
pub struct Catalog {
    type_name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

impl Catalog {
    pub fn new(type_name: &'static str, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            type_name,
            properties,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|descriptor| descriptor.name == name)
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn browsable(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|descriptor| descriptor.browsable)
    }

    pub fn config_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .filter(|descriptor| descriptor.config_property)
    }

    /// Returns the config property with the given name, if any.
    pub fn config_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.get(name).filter(|descriptor| descriptor.config_property)
    }

    /// Checks the declarations against each other. An empty result means the
    /// catalog is consistent.
    pub fn validate(&self) -> Vec<CatalogError> {
        let mut problems = Vec::new();

        for (position, descriptor) in self.properties.iter().enumerate() {
            let type_name = self.type_name;
            let member = descriptor.name;

            if self.properties[..position]
                .iter()
                .any(|earlier| earlier.name == member)
            {
                problems.push(CatalogError::DuplicateMember { type_name, member });
            }

            if descriptor.kind == ValueKind::Object {
                if descriptor.config_property {
                    problems.push(CatalogError::ObjectConfigProperty { type_name, member });
                }
            } else if descriptor.recurse {
                problems.push(CatalogError::ScalarRecurse { type_name, member });
            }

            if descriptor.kind != ValueKind::Object {
                if let (Some(default), Some(Err(source))) =
                    (descriptor.default_value, descriptor.typed_default())
                {
                    problems.push(CatalogError::InvalidDefault {
                        type_name,
                        member,
                        default,
                        kind: descriptor.kind,
                        source,
                    });
                }
            }
        }

        problems
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::new(
            "Sample",
            vec![
                PropertyDescriptor::new("Count", ValueKind::Int, "i32").config("5"),
                PropertyDescriptor::new("Label", ValueKind::Text, "String"),
                PropertyDescriptor::new("Secret", ValueKind::Text, "String")
                    .config("x")
                    .hidden(),
            ],
        )
    }

    #[test]
    fn visibility_subsets_are_independent() {
        let catalog = sample();

        let browsable: Vec<_> = catalog.browsable().map(|d| d.name).collect();
        let persisted: Vec<_> = catalog.config_properties().map(|d| d.name).collect();

        assert_eq!(browsable, vec!["Count", "Label"]);
        assert_eq!(persisted, vec!["Count", "Secret"]);
    }

    #[test]
    fn typed_default_uses_declared_kind() {
        let catalog = sample();
        let count = catalog.get("Count").unwrap();

        assert_eq!(count.typed_default(), Some(Ok(ConfigValue::Int(5))));
        assert_eq!(catalog.get("Label").unwrap().typed_default(), None);
    }

    #[test]
    fn writable_requires_config_property_and_not_read_only() {
        let plain = PropertyDescriptor::new("A", ValueKind::Int, "i32");
        let persisted = plain.clone().config("1");
        let locked = persisted.clone().read_only();

        assert!(!plain.is_writable());
        assert!(persisted.is_writable());
        assert!(!locked.is_writable());
    }

    #[test]
    fn validation_reports_inconsistent_declarations() {
        let catalog = Catalog::new(
            "Broken",
            vec![
                PropertyDescriptor::new("Count", ValueKind::Int, "i32").config("five"),
                PropertyDescriptor::new("Child", ValueKind::Object, "Child")
                    .config_without_default(),
                PropertyDescriptor::new("Flag", ValueKind::Bool, "bool").recurse(),
                PropertyDescriptor::new("Flag", ValueKind::Bool, "bool"),
            ],
        );

        let problems = catalog.validate();

        assert_eq!(problems.len(), 4);
        assert!(matches!(problems[0], CatalogError::InvalidDefault { member: "Count", .. }));
        assert!(matches!(
            problems[1],
            CatalogError::ObjectConfigProperty { member: "Child", .. }
        ));
        assert!(matches!(problems[2], CatalogError::ScalarRecurse { member: "Flag", .. }));
        assert!(matches!(problems[3], CatalogError::DuplicateMember { member: "Flag", .. }));
        assert!(sample().validate().is_empty());
    }
}
