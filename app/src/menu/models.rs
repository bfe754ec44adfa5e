use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::catalog::CanteenId;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(flatten)]
    pub meta: DocMeta<MenuItem>,
    pub canteen_id: CanteenId,
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub available: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Snacks,
    Meals,
    Beverages,
}

/// What an admin fills in to put a new dish on the menu.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MenuItemForm {
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub image: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Fields left as `None` keep their current value.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub price: Option<u64>,
    pub category: Option<Category>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

impl MenuItem {
    pub fn new(id: Id<MenuItem>, canteen_id: CanteenId, form: MenuItemForm) -> Self {
        let MenuItemForm {
            name,
            price,
            category,
            image,
            description,
        } = form;
        MenuItem {
            meta: DocMeta::new_with_id(id),
            canteen_id,
            name,
            price,
            category,
            image,
            description,
            available: true,
        }
    }

    pub fn apply(&mut self, patch: MenuItemPatch) {
        let MenuItemPatch {
            name,
            price,
            category,
            image,
            description,
            available,
        } = patch;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(image) = image {
            self.image = image;
        }
        if description.is_some() {
            self.description = description;
        }
        if let Some(available) = available {
            self.available = available;
        }
    }
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Snacks, Category::Meals, Category::Beverages];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Snacks => "Snacks",
            Category::Meals => "Meals",
            Category::Beverages => "Beverages",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match Category::ALL
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
        {
            Some(c) => Ok(*c),
            None => bail!("unknown category {:?}; expected Snacks, Meals or Beverages", s),
        }
    }
}

impl Entity for MenuItem {
    const PREFIX: &'static str = "item";
}

impl HasMeta for MenuItem {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use infra::ids::IdGen;

    fn fries() -> MenuItem {
        MenuItem::new(
            IdGen::new().generate(),
            "food-plaza".into(),
            MenuItemForm {
                name: "French Fries".into(),
                price: 40,
                category: Category::Snacks,
                image: "fries.jpg".into(),
                description: None,
            },
        )
    }

    #[test]
    fn new_items_are_available() {
        assert!(fries().available);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut item = fries();
        item.apply(MenuItemPatch {
            price: Some(45),
            available: Some(false),
            ..Default::default()
        });

        assert_eq!(item.price, 45);
        assert!(!item.available);
        assert_eq!(item.name, "French Fries");
        assert_eq!(item.category, Category::Snacks);
    }

    #[test]
    fn categories_parse_case_insensitively() {
        assert_eq!("beverages".parse::<Category>().expect("parse"), Category::Beverages);
        assert!("Desserts".parse::<Category>().is_err());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(&fries()).expect("to_value");
        assert_eq!(json["canteenId"], serde_json::json!("food-plaza"));
        assert_eq!(json["category"], serde_json::json!("Snacks"));
        assert!(json.get("description").is_none());
    }
}
