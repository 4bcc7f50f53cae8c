//! Dotted path expressions resolved against live configuration objects.
//!
//! # Path Syntax
//!
//! - Dotted members: `Door.OpenTimeout`
//! - Positional indexers: `Deck[2].Label`
//! - Keyed indexers: `Deck[2].Slot["A"].Offset`
//!
//! Resolution never fails loudly: a malformed path, an unknown member or an
//! indexer that matches nothing all resolve to "absent" on read and to a
//! dropped write. The reason is logged at debug level.

use thiserror::Error;
use tracing::debug;

use super::reflect::{Indexer, Member, Reflect, ReflectError};
use super::value::ConfigValue;


/// One `identifier[indexer]` step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub index: Option<Indexer>,
}

impl PathSegment {
    pub fn member<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed<S: Into<String>>(name: S, index: Indexer) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}


#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("the path is empty")]
    Empty,

    #[error("segment {position} has no member name")]
    MissingName { position: usize },

    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedCharacter { found: char, offset: usize },

    #[error("the indexer of segment {position} is never closed")]
    UnclosedIndexer { position: usize },

    #[error("invalid indexer {indexer:?}: expected a quoted string or an unsigned integer")]
    InvalidIndexer { indexer: String },
}


/// Parses `segment('.'segment)*` where `segment := identifier('['indexer']')?`
/// and `indexer := quoted-string | unsigned-integer`.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }

    let mut segments = Vec::new();
    let mut chars = path.char_indices().peekable();

    loop {
        let position = segments.len();

        let mut name = String::new();
        while let Some(&(_, ch)) = chars.peek() {
            if matches!(ch, '.' | '[' | ']' | '"') {
                break;
            }
            name.push(ch);
            chars.next();
        }

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PathError::MissingName { position });
        }

        let mut index = None;
        if let Some(&(_, '[')) = chars.peek() {
            chars.next();

            let mut raw = String::new();
            let mut in_quotes = false;
            let mut closed = false;

            for (_, ch) in chars.by_ref() {
                match ch {
                    '"' => {
                        in_quotes = !in_quotes;
                        raw.push(ch);
                    }
                    ']' if !in_quotes => {
                        closed = true;
                        break;
                    }
                    _ => raw.push(ch),
                }
            }

            if !closed {
                return Err(PathError::UnclosedIndexer { position });
            }

            index = Some(parse_indexer(&raw)?);
        }

        segments.push(PathSegment { name, index });

        match chars.next() {
            None => break,
            Some((_, '.')) => continue,
            Some((offset, found)) => {
                return Err(PathError::UnexpectedCharacter { found, offset });
            }
        }
    }

    Ok(segments)
}

fn parse_indexer(raw: &str) -> Result<Indexer, PathError> {
    let trimmed = raw.trim();

    if let Some(key) = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Ok(Indexer::Key(key.to_string()));
    }

    trimmed
        .parse::<u64>()
        .map(Indexer::Position)
        .map_err(|_| PathError::InvalidIndexer {
            indexer: raw.to_string(),
        })
}


/// Walks `path` from `root` and returns what the last segment names.
///
/// Any absent step or failure ends the walk with `None`.
pub fn resolve_for_read<'a, T>(path: &str, root: &'a T) -> Option<Member<'a>>
where
    T: Reflect + ?Sized,
{
    let segments = match parse_path(path) {
        Ok(segments) => segments,
        Err(error) => {
            debug!(path, %error, "Path could not be parsed.");
            return None;
        }
    };

    let (first, rest) = segments.split_first()?;
    let mut current = step(
        path,
        first,
        root.get_member(&first.name, first.index.as_ref()),
    )?;

    for segment in rest {
        let Member::Object(object) = current else {
            debug!(path, member = %segment.name, "Path continues past a plain value.");
            return None;
        };

        current = step(
            path,
            segment,
            object.get_member(&segment.name, segment.index.as_ref()),
        )?;
    }

    Some(current)
}

fn step<M>(
    path: &str,
    segment: &PathSegment,
    result: Result<Option<M>, ReflectError>,
) -> Option<M> {
    match result {
        Ok(Some(member)) => Some(member),
        Ok(None) => {
            debug!(path, member = %segment.name, "Path step resolved to nothing.");
            None
        }
        Err(error) => {
            debug!(path, %error, "Path step failed.");
            None
        }
    }
}

/// Walks all but the last segment of `path` and assigns `value` to the member
/// named by the last one, converted to its declared kind.
///
/// The last segment must be a plain, writable config property of the object
/// reached. Returns whether the assignment took place.
pub fn resolve_for_write<T>(path: &str, root: &mut T, value: ConfigValue) -> bool
where
    T: Reflect + ?Sized,
{
    let segments = match parse_path(path) {
        Ok(segments) => segments,
        Err(error) => {
            debug!(path, %error, "Path could not be parsed, dropping write.");
            return false;
        }
    };

    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    if last.index.is_some() {
        debug!(path, "Indexed members cannot be assigned, dropping write.");
        return false;
    }

    let result = match parents.split_first() {
        None => assign(root, &last.name, value),
        Some((first, rest)) => {
            let Some(mut current) = step(
                path,
                first,
                root.get_member_mut(&first.name, first.index.as_ref()),
            ) else {
                return false;
            };

            for segment in rest {
                current = match step(
                    path,
                    segment,
                    current.get_member_mut(&segment.name, segment.index.as_ref()),
                ) {
                    Some(next) => next,
                    None => return false,
                };
            }

            assign(current, &last.name, value)
        }
    };

    match result {
        Ok(()) => true,
        Err(error) => {
            debug!(path, %error, "Assignment failed, dropping write.");
            false
        }
    }
}

fn assign<T: Reflect + ?Sized>(
    target: &mut T,
    name: &str,
    value: ConfigValue,
) -> Result<(), ReflectError> {
    let catalog = target.catalog();

    let descriptor = catalog
        .get(name)
        .ok_or_else(|| target.unknown_member(name))?;

    if !descriptor.is_writable() {
        return Err(ReflectError::NotAssignable {
            type_name: catalog.type_name(),
            member: name.to_string(),
        });
    }

    let converted = value.convert(descriptor.kind)?;
    target.set_member(name, converted)
}
