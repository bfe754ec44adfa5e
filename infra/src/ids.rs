use std::cmp::Ordering;
use std::convert::TryInto;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use data_encoding::{BASE64URL_NOPAD, HEXLOWER};
use err_derive::Error;
use rand::distributions::{Distribution, Standard};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const ID_LEN: usize = 16;
const DIVIDER: &str = "-";

pub struct Id<T> {
    val: [u8; ID_LEN],
    phantom: PhantomData<T>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error(display = "Invalid prefix")]
    InvalidPrefix,
    #[error(display = "Unparseable Id")]
    Unparseable,
}

/// Names the kind of document an `Id` refers to; the prefix is how the kind
/// shows up in the string form, and how storage scans for all documents of
/// one kind.
pub trait Entity {
    const PREFIX: &'static str;
}

/// Hands out time-ordered identifiers: the high half is the creation
/// instant in microseconds, the low half is random.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    _private: (),
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { _private: () }
    }

    pub fn generate<T>(&self) -> Id<T> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let micros = now.as_micros() as u64;
        let mut val = [0u8; ID_LEN];
        val[..8].copy_from_slice(&micros.to_be_bytes());
        val[8..].copy_from_slice(&rand::random::<u64>().to_be_bytes());
        Id {
            val,
            phantom: PhantomData,
        }
    }
}

impl<T> Id<T> {
    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        let mut val = [0u8; ID_LEN];
        for (i, chunk) in val.chunks_mut(8).enumerate() {
            let mut h = siphasher::sip::SipHasher24::new_with_keys(0, i as u64);
            entity.hash(&mut h);
            chunk.copy_from_slice(&h.finish().to_be_bytes());
        }
        Id {
            val,
            phantom: PhantomData,
        }
    }

    /// Only meaningful for ids from `IdGen::generate`.
    pub fn timestamp(&self) -> SystemTime {
        let micros = u64::from_be_bytes(self.val[..8].try_into().expect("eight bytes"));
        UNIX_EPOCH + Duration::from_micros(micros)
    }

    pub fn random(&self) -> u64 {
        u64::from_be_bytes(self.val[8..].try_into().expect("eight bytes"))
    }
}

impl<T> Distribution<Id<T>> for Standard {
    fn sample<R: ?Sized + rand::Rng>(&self, rng: &mut R) -> Id<T> {
        let val = rng.gen();
        Id {
            val,
            phantom: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}{}{}",
            T::PREFIX,
            DIVIDER,
            BASE64URL_NOPAD.encode(&self.val)
        )
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Id")
            .field("val", &format_args!("{}", HEXLOWER.encode(&self.val)))
            .finish()
    }
}

impl<T: Entity> std::str::FromStr for Id<T> {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let remainder = src
            .strip_prefix(T::PREFIX)
            .ok_or(IdParseError::InvalidPrefix)?;
        let b64 = remainder
            .strip_prefix(DIVIDER)
            .ok_or(IdParseError::Unparseable)?;

        let bytes = BASE64URL_NOPAD
            .decode(b64.as_bytes())
            .map_err(|_| IdParseError::Unparseable)?;
        let val: [u8; ID_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdParseError::Unparseable)?;
        Ok(Id {
            val,
            phantom: PhantomData,
        })
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        let val = Default::default();
        let phantom = PhantomData;
        Id { val, phantom }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.val.hash(state)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T: Entity> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, T: Entity> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdStrVisitor<T>(PhantomData<T>);
        impl<'vi, T: Entity> de::Visitor<'vi> for IdStrVisitor<T> {
            type Value = Id<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an Id string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Id<T>, E> {
                value.parse::<Id<T>>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdStrVisitor(PhantomData))
    }
}
