use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A request body that may hold a single object or a list of them.
///
/// Create endpoints accept both shapes. Callers normalize with
/// [`OneOrMany::into_vec`] and answer in the shape they were given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn is_one(&self) -> bool {
        matches!(self, Self::One(_))
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }

    /// Wrap `items` in the shape the caller used: a single object when `one` is set.
    pub fn from_vec(mut items: Vec<T>, one: bool) -> Self {
        if one && items.len() == 1 {
            Self::One(items.remove(0))
        } else {
            Self::Many(items)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParentId {
    Id(i64),
    Text(String),
}

/// Deserialize a parent reference where `0`, `null` and `"null"` mean "no parent".
pub fn deserialize_parent_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawParentId>::deserialize(deserializer)? {
        None | Some(RawParentId::Id(0)) => Ok(None),
        Some(RawParentId::Id(id)) if id > 0 => Ok(Some(id)),
        Some(RawParentId::Id(id)) => Err(D::Error::custom(format!("invalid parent id {id}"))),
        Some(RawParentId::Text(text)) => match text.trim() {
            "" | "0" | "null" => Ok(None),
            other => other
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid parent id {other:?}"))),
        },
    }
}

/// Deserialize a patch field where an explicit `null` clears the value.
///
/// Use with `#[serde(default)]`: a missing field stays `None` (keep), `null`
/// becomes `Some(None)` (clear) and a value becomes `Some(Some(v))` (set).
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
