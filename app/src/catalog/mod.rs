use std::fmt;

use anyhow::Result;
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::Rejection;
use crate::services::{Queryable, Request};

pub(crate) mod resources;

/// Slug naming a canteen, eg: `food-plaza`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanteenId(String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Canteen {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub image: &'static str,
}

pub const CANTEENS: &[Canteen] = &[
    Canteen {
        id: "food-plaza",
        name: "Food Plaza",
        description: "Your favorite street food and quick bites",
        color: "bg-orange-500",
        icon: "🍔",
        image: "https://images.unsplash.com/photo-1567521464027-f127ff144326?w=800",
    },
    Canteen {
        id: "campus-cafeteria",
        name: "Campus Cafeteria",
        description: "Healthy meals and fresh beverages",
        color: "bg-green-500",
        icon: "☕",
        image: "https://images.unsplash.com/photo-1582719478250-c89cae4dc85b?w=800",
    },
    Canteen {
        id: "canteen-3",
        name: "Canteen 3",
        description: "Traditional Indian cuisine",
        color: "bg-red-500",
        icon: "🍛",
        image: "https://images.unsplash.com/photo-1590080875831-79c4f3a7e8f5?w=800",
    },
    Canteen {
        id: "canteen-4",
        name: "Canteen 4",
        description: "Pizza, pasta, and continental",
        color: "bg-yellow-500",
        icon: "🍕",
        image: "https://images.unsplash.com/photo-1555396273-367ea4eb4db5?w=800",
    },
    Canteen {
        id: "canteen-5",
        name: "Canteen 5",
        description: "Desserts and sweet treats",
        color: "bg-blue-500",
        icon: "🍩",
        image: "https://images.unsplash.com/photo-1601924582970-9238bcb495d9?w=800",
    },
];

/// The canteens are fixed reference data; nothing here touches storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

#[derive(Debug, Clone, Copy)]
pub struct ListCanteens;

#[derive(Debug, Clone)]
pub struct ShowCanteen(pub CanteenId);

impl CanteenId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CanteenId {
    fn from(id: &str) -> Self {
        CanteenId(id.to_string())
    }
}

impl From<String> for CanteenId {
    fn from(id: String) -> Self {
        CanteenId(id)
    }
}

impl fmt::Display for CanteenId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl std::str::FromStr for CanteenId {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CanteenId::from(s))
    }
}

impl Canteen {
    pub fn canteen_id(&self) -> CanteenId {
        CanteenId::from(self.id)
    }
}

pub fn find(id: &CanteenId) -> Option<&'static Canteen> {
    CANTEENS.iter().find(|c| c.id == id.as_str())
}

/// Like `find`, for callers that cannot proceed without the canteen.
pub fn require(id: &CanteenId) -> Result<&'static Canteen> {
    find(id).ok_or_else(|| Rejection::UnknownCanteen(id.clone()).into())
}

impl Request for ListCanteens {
    type Resp = Vec<Canteen>;
}

impl Request for ShowCanteen {
    type Resp = Option<Canteen>;
}

impl Queryable<ListCanteens> for Catalog {
    fn query(&self, _: ListCanteens) -> Result<Vec<Canteen>> {
        Ok(CANTEENS.to_vec())
    }
}

impl Queryable<ShowCanteen> for Catalog {
    fn query(&self, ShowCanteen(id): ShowCanteen) -> Result<Option<Canteen>> {
        let canteen = find(&id).cloned();
        debug!("Show canteen {} -> {:?}", id, canteen.as_ref().map(|c| c.name));
        Ok(canteen)
    }
}
