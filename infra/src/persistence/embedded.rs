use std::path::Path;

use anyhow::{Context, Result};
use log::*;
use serde::{de::DeserializeOwned, Serialize};

use super::{key_prefix, ConcurrencyError, Storage, Stored};
use crate::documents::{HasMeta, Version};
use crate::ids::{Entity, Id};

/// Documents in an embedded sled tree. Handles are cheap clones of the same
/// underlying database, so the pool just hands out copies.
#[derive(Debug, Clone)]
pub struct SledDocuments {
    db: sled::Db,
}

#[derive(Debug, Clone)]
pub struct SledConnectionManager {
    db: sled::Db,
}

impl SledConnectionManager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Open sled database at {:?}", path);
        let db = sled::open(path).with_context(|| format!("open sled at {:?}", path))?;
        Ok(SledConnectionManager { db })
    }

    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("open temporary sled")?;
        Ok(SledConnectionManager { db })
    }
}

impl r2d2::ManageConnection for SledConnectionManager {
    type Connection = SledDocuments;
    type Error = sled::Error;

    fn connect(&self) -> Result<SledDocuments, sled::Error> {
        Ok(SledDocuments {
            db: self.db.clone(),
        })
    }

    fn is_valid(&self, _: &mut SledDocuments) -> Result<(), sled::Error> {
        Ok(())
    }

    fn has_broken(&self, _: &mut SledDocuments) -> bool {
        false
    }
}

impl Storage for SledDocuments {
    fn setup(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>> {
        match self.db.get(id.to_string())? {
            Some(body) => {
                let doc = serde_json::from_slice(&body).with_context(|| format!("decode {}", id))?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn save<D: Serialize + Entity + HasMeta>(&self, document: &mut D) -> Result<()> {
        let key = document.meta().id.to_string();
        let current = self.db.get(&key)?;
        let stored_version = match current.as_ref() {
            Some(body) => serde_json::from_slice::<Stored>(body)?.version,
            None => Version::default(),
        };
        let exists = current.is_some();
        if exists == document.meta().is_new() || stored_version != document.meta().version {
            warn!(
                "Save of {} expected version {:?}; found {:?}",
                key,
                document.meta().version,
                current.as_ref().map(|_| &stored_version)
            );
            return Err(ConcurrencyError.into());
        }

        let version = Version::of_counter(self.db.generate_id()?);
        let mut json = serde_json::to_value(&*document)?;
        json["_version"] = serde_json::to_value(&version)?;
        let body = serde_json::to_vec(&json)?;

        if let Err(e) = self.db.compare_and_swap(&key, current, Some(body))? {
            warn!("Lost race saving {}: {:?}", key, e.current);
            return Err(ConcurrencyError.into());
        }
        trace!("Saved {} at {}", key, version);
        document.meta_mut().version = version;
        Ok(())
    }

    fn delete<D: Entity>(&self, id: &Id<D>) -> Result<bool> {
        let removed = self.db.remove(id.to_string())?;
        debug!("Delete {} -> {}", id, removed.is_some());
        Ok(removed.is_some())
    }

    fn list<D: DeserializeOwned + Entity>(&self) -> Result<Vec<D>> {
        self.db
            .scan_prefix(key_prefix::<D>())
            .map(|item| -> Result<D> {
                let (key, body) = item?;
                let doc = serde_json::from_slice(&body)
                    .with_context(|| format!("decode {}", String::from_utf8_lossy(&key)))?;
                Ok(doc)
            })
            .collect()
    }
}
