use std::cell::RefCell;

use anyhow::Result;
use log::*;
use postgres::{Client, NoTls, Row};
use r2d2_postgres::PostgresConnectionManager;
use serde::{de::DeserializeOwned, Serialize};

use super::{key_prefix, ConcurrencyError, Storage};
use crate::documents::{HasMeta, Version};
use crate::ids::{Entity, Id};

const SETUP_SQL: &str = include_str!("persistence.sql");
const LOAD_SQL: &str = "SELECT body FROM documents WHERE id = $1";
const LIST_SQL: &str = "SELECT body FROM documents WHERE id LIKE $1";
const DELETE_SQL: &str = "DELETE FROM documents WHERE id = $1";
const INSERT_SQL: &str = "WITH a as (
                            SELECT $1::jsonb as body
                            )
                            INSERT INTO documents (id, body)
                            SELECT a.body ->> '_id', jsonb_set(a.body, '{_version}', to_jsonb(to_hex(txid_current())))
                            FROM a
                            WHERE NOT EXISTS (
                                SELECT 1 FROM documents d where d.id = a.body ->> '_id'
                            )";
const UPDATE_SQL: &str = "WITH a as (
                            SELECT $1::jsonb as body
                            )
                            UPDATE documents AS d
                                SET body = jsonb_set(a.body, '{_version}', to_jsonb(to_hex(txid_current())))
                                FROM a
                                WHERE id = a.body ->> '_id'
                                AND d.body -> '_version' = a.body -> '_version'";

/// Documents stored as `jsonb` rows in a single PostgreSQL table.
pub struct Documents {
    connection: RefCell<Client>,
}

pub struct DocumentConnectionManager {
    inner: PostgresConnectionManager<NoTls>,
}

impl DocumentConnectionManager {
    pub fn new(inner: PostgresConnectionManager<NoTls>) -> Self {
        DocumentConnectionManager { inner }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        let config = url.parse::<postgres::Config>()?;
        let inner = PostgresConnectionManager::new(config, NoTls);
        Ok(DocumentConnectionManager { inner })
    }
}

impl r2d2::ManageConnection for DocumentConnectionManager {
    type Connection = Documents;
    type Error = postgres::Error;

    fn connect(&self) -> Result<Documents, postgres::Error> {
        let connection = RefCell::new(self.inner.connect()?);
        Ok(Documents { connection })
    }

    fn is_valid(&self, conn: &mut Documents) -> Result<(), postgres::Error> {
        self.inner.is_valid(conn.connection.get_mut())
    }

    fn has_broken(&self, conn: &mut Documents) -> bool {
        self.inner.has_broken(conn.connection.get_mut())
    }
}

impl Documents {
    pub fn client_mut(&mut self) -> &mut Client {
        self.connection.get_mut()
    }
}

fn body_of<D: DeserializeOwned>(row: &Row) -> Result<D> {
    let json: serde_json::Value = row.try_get(0)?;
    Ok(serde_json::from_value(json)?)
}

impl Storage for Documents {
    fn setup(&self) -> Result<()> {
        self.connection.borrow_mut().batch_execute(SETUP_SQL)?;
        Ok(())
    }

    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>> {
        let rows = self
            .connection
            .borrow_mut()
            .query(LOAD_SQL, &[&id.to_string()])?;

        match rows.first() {
            Some(row) => Ok(Some(body_of(row)?)),
            None => Ok(None),
        }
    }

    fn save<D: Serialize + Entity + HasMeta>(&self, document: &mut D) -> Result<()> {
        let json = serde_json::to_value(&*document)?;
        let mut connection = self.connection.borrow_mut();
        let mut t = connection.transaction()?;
        let sql = if document.meta().is_new() {
            INSERT_SQL
        } else {
            UPDATE_SQL
        };
        let nrows = t.execute(sql, &[&json])?;
        debug!("Save of {} modified {} rows", document.meta().id, nrows);
        if nrows != 1 {
            warn!("Save impacted {} rows not 1", nrows);
            return Err(ConcurrencyError.into());
        }

        let row = t.query_one("SELECT to_hex(txid_current())", &[])?;
        let version: String = row.try_get(0)?;
        t.commit()?;

        document.meta_mut().version = version.parse::<Version>()?;
        Ok(())
    }

    fn delete<D: Entity>(&self, id: &Id<D>) -> Result<bool> {
        let nrows = self
            .connection
            .borrow_mut()
            .execute(DELETE_SQL, &[&id.to_string()])?;
        debug!("Delete {} modified {} rows", id, nrows);
        Ok(nrows > 0)
    }

    fn list<D: DeserializeOwned + Entity>(&self) -> Result<Vec<D>> {
        let pattern = format!("{}%", key_prefix::<D>());
        let rows = self
            .connection
            .borrow_mut()
            .query(LIST_SQL, &[&pattern])?;
        rows.iter().map(body_of::<D>).collect()
    }
}
