use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub visibility: Visibility,
    pub star_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub owner: Owner,
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Owner,
    Repository { index: usize },
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Owner => f.write_str("owner"),
            Entity::Repository { index } => write!(f, "repository[{index}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    Missing,
    WrongType,
    OutOfRange,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("NormalizationError: {entity}.{field}: {problem:?}")]
pub struct NormalizationError {
    pub entity: Entity,
    pub field: &'static str,
    pub problem: Problem,
}

impl NormalizationError {
    fn new(entity: Entity, field: &'static str, problem: Problem) -> Self {
        Self {
            entity,
            field,
            problem,
        }
    }
}

/// Maps the identity payload and the repository list to a [`Snapshot`].
///
/// Every repository gets the identity's id as `owner_id`. A repository id
/// that appears twice keeps its first position and its last values.
pub fn normalize_snapshot(
    identity: &Value,
    resources: &[Value],
) -> Result<Snapshot, NormalizationError> {
    let owner = normalize_owner(identity)?;

    let mut repositories: Vec<Repository> = Vec::with_capacity(resources.len());
    let mut positions: HashMap<i64, usize> = HashMap::with_capacity(resources.len());

    for (index, raw) in resources.iter().enumerate() {
        let repository = normalize_repository(raw, index, owner.id)?;
        match positions.get(&repository.id) {
            Some(&position) => repositories[position] = repository,
            None => {
                positions.insert(repository.id, repositories.len());
                repositories.push(repository);
            }
        }
    }

    Ok(Snapshot {
        owner,
        repositories,
    })
}

pub fn normalize_owner(identity: &Value) -> Result<Owner, NormalizationError> {
    let entity = Entity::Owner;
    let fields = as_object(identity, entity)?;

    Ok(Owner {
        id: required_i64(fields, entity, "id")?,
        name: required_str(fields, entity, "name")?,
        email: optional_str(fields, entity, "email")?,
    })
}

pub fn normalize_repository(
    raw: &Value,
    index: usize,
    owner_id: i64,
) -> Result<Repository, NormalizationError> {
    let entity = Entity::Repository { index };
    let fields = as_object(raw, entity)?;

    let visibility = match fields.get("private") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Visibility::Public,
        Some(Value::Bool(true)) => Visibility::Private,
        Some(_) => return Err(NormalizationError::new(entity, "private", Problem::WrongType)),
    };

    let stars = required_i64(fields, entity, "stargazers_count")?;
    let star_count = i32::try_from(stars)
        .ok()
        .filter(|count| *count >= 0)
        .ok_or(NormalizationError::new(
            entity,
            "stargazers_count",
            Problem::OutOfRange,
        ))?;

    Ok(Repository {
        id: required_i64(fields, entity, "id")?,
        owner_id,
        name: required_str(fields, entity, "name")?,
        visibility,
        star_count,
    })
}

fn as_object(value: &Value, entity: Entity) -> Result<&Map<String, Value>, NormalizationError> {
    value
        .as_object()
        .ok_or(NormalizationError::new(entity, "<root>", Problem::WrongType))
}

fn required_i64(
    fields: &Map<String, Value>,
    entity: Entity,
    field: &'static str,
) -> Result<i64, NormalizationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(NormalizationError::new(entity, field, Problem::Missing)),
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or(NormalizationError::new(entity, field, Problem::OutOfRange)),
        Some(_) => Err(NormalizationError::new(entity, field, Problem::WrongType)),
    }
}

fn required_str(
    fields: &Map<String, Value>,
    entity: Entity,
    field: &'static str,
) -> Result<String, NormalizationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(NormalizationError::new(entity, field, Problem::Missing)),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(NormalizationError::new(entity, field, Problem::WrongType)),
    }
}

fn optional_str(
    fields: &Map<String, Value>,
    entity: Entity,
    field: &'static str,
) -> Result<Option<String>, NormalizationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(NormalizationError::new(entity, field, Problem::WrongType)),
    }
}
