use anyhow::Result;
use err_derive::Error;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::documents::{HasMeta, Version};
use crate::ids::{Entity, Id};

mod pg;
mod embedded;

pub use self::pg::{DocumentConnectionManager, Documents};
pub use self::embedded::{SledConnectionManager, SledDocuments};

#[derive(Error, Debug, PartialEq, Eq)]
#[error(display = "stale version")]
pub struct ConcurrencyError;

/// A document store: JSON bodies keyed by their `_id`, with optimistic
/// versioning on write.
///
/// Saving a document whose version is the default only succeeds if nothing
/// is stored under that id yet; otherwise the stored version must match the
/// one the document carries. On success the document is updated with its
/// new version.
pub trait Storage {
    fn setup(&self) -> Result<()>;
    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>>;
    fn save<D: Serialize + Entity + HasMeta>(&self, document: &mut D) -> Result<()>;
    /// Returns whether anything was removed.
    fn delete<D: Entity>(&self, id: &Id<D>) -> Result<bool>;
    /// All documents of one kind, in no particular order.
    fn list<D: DeserializeOwned + Entity>(&self) -> Result<Vec<D>>;
}

#[derive(Deserialize)]
struct Stored {
    #[serde(rename = "_version", default)]
    version: Version,
}

fn key_prefix<D: Entity>() -> String {
    format!("{}-", D::PREFIX)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::documents::DocMeta;
    use crate::ids::IdGen;
    use log::*;

    #[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
    pub(crate) struct ADocument {
        #[serde(flatten)]
        pub(crate) meta: DocMeta<ADocument>,
        pub(crate) name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
    pub(crate) struct Other {
        #[serde(flatten)]
        pub(crate) meta: DocMeta<Other>,
    }

    impl Entity for ADocument {
        const PREFIX: &'static str = "adocument";
    }

    impl HasMeta for ADocument {
        fn meta(&self) -> &DocMeta<Self> {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut DocMeta<Self> {
            &mut self.meta
        }
    }

    impl Entity for Other {
        const PREFIX: &'static str = "other";
    }

    impl HasMeta for Other {
        fn meta(&self) -> &DocMeta<Self> {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut DocMeta<Self> {
            &mut self.meta
        }
    }

    fn doc(idgen: &IdGen, name: &str) -> ADocument {
        ADocument {
            meta: DocMeta::new_with_id(idgen.generate()),
            name: name.to_string(),
        }
    }

    fn assert_stale(err: anyhow::Error) {
        assert_eq!(
            err.root_cause().downcast_ref::<ConcurrencyError>(),
            Some(&ConcurrencyError),
            "Error: {:?}",
            err
        );
    }

    // Shared across backends; each backend's tests hand in a fresh store.

    pub(crate) fn load_missing_document_should_return_none<S: Storage>(docs: &S) {
        let loaded = docs
            .load::<ADocument>(&IdGen::new().generate())
            .expect("load");
        assert_eq!(None, loaded);
    }

    pub(crate) fn save_load<S: Storage>(docs: &S) {
        let idgen = IdGen::new();
        let mut some_doc = doc(&idgen, "Dave");

        // Surround it with other documents, so we don't find it by accident.
        for i in 0..4 {
            docs.save(&mut doc(&idgen, &format!("before {}", i)))
                .expect("save");
        }
        docs.save(&mut some_doc).expect("save");
        for i in 0..4 {
            docs.save(&mut doc(&idgen, &format!("after {}", i)))
                .expect("save");
        }

        let loaded = docs.load(&some_doc.meta.id).expect("load");
        info!("Loaded document: {:?}", loaded);

        assert_eq!(Some(some_doc), loaded);
    }

    pub(crate) fn should_update_on_overwrite<S: Storage>(docs: &S) {
        let mut some_doc = doc(&IdGen::new(), "Version 1");
        docs.save(&mut some_doc).expect("save original");
        assert!(!some_doc.meta.is_new());

        some_doc.name = "Version 2".to_string();
        docs.save(&mut some_doc).expect("save modified");

        let loaded = docs.load::<ADocument>(&some_doc.meta.id).expect("load");
        assert_eq!(Some("Version 2".to_string()), loaded.map(|d| d.name));
    }

    pub(crate) fn should_fail_on_overwrite_with_new<S: Storage>(docs: &S) {
        let mut some_doc = doc(&IdGen::new(), "Version 1");
        docs.save(&mut some_doc).expect("save original");

        let mut modified_doc = ADocument {
            meta: DocMeta::new_with_id(some_doc.meta.id),
            name: "Version 2".to_string(),
        };
        let err = docs.save(&mut modified_doc).expect_err("save should fail");
        assert_stale(err);
    }

    pub(crate) fn should_fail_on_overwrite_with_stale_version<S: Storage>(docs: &S) {
        let mut some_doc = doc(&IdGen::new(), "Version 1");
        docs.save(&mut some_doc).expect("save original");
        let mut stale = some_doc.clone();

        some_doc.name = "Version 2".to_string();
        docs.save(&mut some_doc).expect("save modified");

        stale.name = "Version 2b".to_string();
        let err = docs.save(&mut stale).expect_err("save should fail");
        assert_stale(err);
    }

    pub(crate) fn should_fail_on_new_document_with_nonzero_version<S: Storage>(docs: &S) {
        let mut some_doc = doc(&IdGen::new(), "Version 1");
        some_doc.meta.version = "garbage".parse().expect("version");

        let err = docs.save(&mut some_doc).expect_err("save should fail");
        assert_stale(err);
    }

    pub(crate) fn list_returns_only_documents_of_one_kind<S: Storage>(docs: &S) {
        let idgen = IdGen::new();
        let mut a = doc(&idgen, "a");
        let mut b = doc(&idgen, "b");
        docs.save(&mut a).expect("save a");
        docs.save(&mut b).expect("save b");
        docs.save(&mut Other {
            meta: DocMeta::new_with_id(idgen.generate()),
        })
        .expect("save other");

        let mut names = docs
            .list::<ADocument>()
            .expect("list")
            .into_iter()
            .map(|d| d.name)
            .collect::<Vec<_>>();
        names.sort();

        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    pub(crate) fn delete_removes_document<S: Storage>(docs: &S) {
        let mut some_doc = doc(&IdGen::new(), "doomed");
        docs.save(&mut some_doc).expect("save");

        assert!(docs.delete(&some_doc.meta.id).expect("delete"));
        assert!(!docs.delete(&some_doc.meta.id).expect("delete again"));
        assert_eq!(
            None,
            docs.load::<ADocument>(&some_doc.meta.id).expect("load")
        );
    }
}
