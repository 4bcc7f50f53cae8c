//! Name-based member access over configuration objects.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use super::catalog::{Catalog, CatalogError};
use super::value::{ConfigValue, ConversionError};
use crate::xml::XmlElement;


/// The bracketed argument of a path segment: `Deck[2]` or `Slot["A"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indexer {
    Position(u64),
    Key(String),
}

impl Display for Indexer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Indexer::Position(position) => write!(f, "[{}]", position),
            Indexer::Key(key) => write!(f, "[\"{}\"]", key),
        }
    }
}


#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("{type_name} has no member named {member:?}")]
    UnknownMember {
        type_name: &'static str,
        member: String,
    },

    #[error("{type_name}.{member} cannot be indexed with {indexer}")]
    UnsupportedIndexer {
        type_name: &'static str,
        member: String,
        indexer: Indexer,
    },

    #[error("{type_name}.{member} requires an indexer")]
    IndexerRequired {
        type_name: &'static str,
        member: String,
    },

    #[error("{type_name}.{member} cannot be assigned")]
    NotAssignable {
        type_name: &'static str,
        member: String,
    },

    #[error("{type_name}.{member} is not a nested object")]
    NotAnObject {
        type_name: &'static str,
        member: String,
    },

    #[error("{type_name} has no hook named {hook:?}")]
    UnknownHook {
        type_name: &'static str,
        hook: String,
    },

    #[error("invalid value for {member}: {reason}")]
    InvalidValue { member: String, reason: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}


/// What a member access produced: a plain value or a borrowed nested object.
pub enum Member<'a> {
    Value(ConfigValue),
    Object(&'a dyn Reflect),
}

impl<'a> Member<'a> {
    pub fn value(&self) -> Option<&ConfigValue> {
        match self {
            Member::Value(value) => Some(value),
            Member::Object(_) => None,
        }
    }

    pub fn into_value(self) -> Option<ConfigValue> {
        match self {
            Member::Value(value) => Some(value),
            Member::Object(_) => None,
        }
    }

    pub fn object(&self) -> Option<&'a dyn Reflect> {
        match self {
            Member::Value(_) => None,
            Member::Object(object) => Some(*object),
        }
    }
}

impl fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Member::Object(object) => f
                .debug_tuple("Object")
                .field(&object.catalog().type_name())
                .finish(),
        }
    }
}


/// Member access by name, implemented per concrete type with an explicit
/// `match` over member names.
///
/// `Ok(None)` means the member exists but currently has no value (an unset
/// optional sub-object, an indexer that matches nothing).
pub trait Reflect {
    fn catalog(&self) -> &'static Catalog;

    fn get_member(
        &self,
        name: &str,
        index: Option<&Indexer>,
    ) -> Result<Option<Member<'_>>, ReflectError>;

    /// Mutable access to a nested object member.
    fn get_member_mut(
        &mut self,
        name: &str,
        _index: Option<&Indexer>,
    ) -> Result<Option<&mut dyn Reflect>, ReflectError> {
        Err(ReflectError::NotAnObject {
            type_name: self.catalog().type_name(),
            member: name.to_string(),
        })
    }

    /// Assigns a value that has already been converted to the member's
    /// declared kind.
    fn set_member(&mut self, name: &str, value: ConfigValue) -> Result<(), ReflectError>;

    /// Fills a `<property>` node with custom editor content.
    fn custom_editor_get(&self, hook: &str, _node: &mut XmlElement) -> Result<(), ReflectError> {
        Err(self.unknown_hook(hook))
    }

    /// Applies custom editor content from an update node.
    fn custom_editor_set(&mut self, hook: &str, _node: &XmlElement) -> Result<(), ReflectError> {
        Err(self.unknown_hook(hook))
    }

    fn valid_values(&self, provider: &str) -> Result<Vec<String>, ReflectError> {
        Err(self.unknown_hook(provider))
    }

    fn unknown_member(&self, name: &str) -> ReflectError {
        ReflectError::UnknownMember {
            type_name: self.catalog().type_name(),
            member: name.to_string(),
        }
    }

    fn unknown_hook(&self, hook: &str) -> ReflectError {
        ReflectError::UnknownHook {
            type_name: self.catalog().type_name(),
            hook: hook.to_string(),
        }
    }
}


/// Rejects an indexer on a member that does not take one.
pub fn no_indexer(
    owner: &dyn Reflect,
    name: &str,
    index: Option<&Indexer>,
) -> Result<(), ReflectError> {
    match index {
        None => Ok(()),
        Some(indexer) => Err(ReflectError::UnsupportedIndexer {
            type_name: owner.catalog().type_name(),
            member: name.to_string(),
            indexer: indexer.clone(),
        }),
    }
}

/// Checks a catalog against the `Reflect` implementation of one instance.
///
/// Every declared member must be readable. Writable members must also be
/// assignable, which is checked by assigning them their current value.
/// Members that need an indexer or are currently absent are skipped.
pub fn check_members<T: Reflect + ?Sized>(object: &mut T) -> Vec<CatalogError> {
    let catalog = object.catalog();
    let type_name = catalog.type_name();
    let mut problems = Vec::new();

    for descriptor in catalog.properties() {
        let member = descriptor.name;

        let current = match object.get_member(member, None) {
            Ok(Some(Member::Value(value))) => Some(value),
            Err(ReflectError::UnknownMember { .. }) => {
                problems.push(CatalogError::Unreadable { type_name, member });
                continue;
            }
            _ => None,
        };

        let Some(current) = current.filter(|_| descriptor.is_writable()) else {
            continue;
        };

        if let Err(ReflectError::UnknownMember { .. } | ReflectError::NotAssignable { .. }) =
            object.set_member(member, current)
        {
            problems.push(CatalogError::Unassignable { type_name, member });
        }
    }

    problems
}
