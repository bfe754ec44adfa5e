use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::ids::{Entity, Id};

/// Opaque token naming the stored revision of a document. The empty
/// version marks a document that has never been saved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
pub struct Version(String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "T: Entity")]
pub struct DocMeta<T> {
    #[serde(rename = "_id")]
    pub id: Id<T>,
    #[serde(rename = "_version", default)]
    pub version: Version,
    #[serde(skip)]
    pub _phantom: PhantomData<T>,
}

pub trait HasMeta: Sized {
    fn meta(&self) -> &DocMeta<Self>;
    fn meta_mut(&mut self) -> &mut DocMeta<Self>;
}

impl<T> Default for DocMeta<T> {
    fn default() -> Self {
        let id = Default::default();
        let version = Default::default();
        let _phantom = Default::default();
        DocMeta {
            id,
            version,
            _phantom,
        }
    }
}

impl<T> DocMeta<T> {
    pub fn new_with_id(id: Id<T>) -> Self {
        DocMeta {
            id,
            ..Default::default()
        }
    }

    pub fn is_new(&self) -> bool {
        self.version == Version::default()
    }
}

impl Version {
    pub(crate) fn of_counter(n: u64) -> Self {
        Version(format!("{:x}", n))
    }
}

impl std::str::FromStr for Version {
    type Err = std::convert::Infallible;
    fn from_str(val: &str) -> Result<Self, Self::Err> {
        Ok(Version(val.to_string()))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str(&self.0)
    }
}
