//! One-off data management: loading the sample canteen data, and clearing
//! out canteens that have closed.
use anyhow::Result;
use log::*;
use r2d2::Pool;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use infra::documents::HasMeta;
use infra::ids::{Entity, IdGen};
use infra::persistence::{ConcurrencyError, Storage};

use crate::admin::AdminAccount;
use crate::catalog::{self, CanteenId};
use crate::menu::{Category, MenuItem, MenuItemForm};
use crate::orders::Order;
use crate::services::{Commandable, Request};

pub(crate) mod resources;

/// Every seeded admin account uses this password.
pub const SEED_PASSWORD: &str = "12345";

/// Canteens retired by the default cleanup.
pub const RETIRED_CANTEENS: [&str; 2] = ["canteen-3", "canteen-5"];

const SEED_ADMINS: &[(&str, &str)] = &[
    ("food-plaza", "foodadmin"),
    ("campus-cafeteria", "cafeadmin"),
    ("canteen-3", "admin3"),
    ("canteen-4", "admin4"),
    ("canteen-5", "admin5"),
];

struct SampleItem {
    canteen: &'static str,
    name: &'static str,
    price: u64,
    category: Category,
    image: &'static str,
    description: &'static str,
}

const SAMPLE_MENU: &[SampleItem] = &[
    SampleItem {
        canteen: "food-plaza",
        name: "Paneer Roll",
        price: 60,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1626082927389-6cd097cdc6ec?w=400",
        description: "Spicy paneer wrapped in soft paratha",
    },
    SampleItem {
        canteen: "food-plaza",
        name: "Veg Burger",
        price: 50,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400",
        description: "Classic veggie burger with cheese",
    },
    SampleItem {
        canteen: "food-plaza",
        name: "French Fries",
        price: 40,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1573080496219-bb080dd4f877?w=400",
        description: "Crispy golden fries",
    },
    SampleItem {
        canteen: "food-plaza",
        name: "Masala Dosa",
        price: 70,
        category: Category::Meals,
        image: "https://images.unsplash.com/photo-1630383249896-424e482df921?w=400",
        description: "South Indian crispy dosa",
    },
    SampleItem {
        canteen: "food-plaza",
        name: "Cold Coffee",
        price: 50,
        category: Category::Beverages,
        image: "https://images.unsplash.com/photo-1517487881594-2787fef5ebf7?w=400",
        description: "Chilled coffee with ice cream",
    },
    SampleItem {
        canteen: "campus-cafeteria",
        name: "Grilled Sandwich",
        price: 55,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1528735602780-2552fd46c7af?w=400",
        description: "Healthy grilled veggie sandwich",
    },
    SampleItem {
        canteen: "campus-cafeteria",
        name: "Caesar Salad",
        price: 80,
        category: Category::Meals,
        image: "https://images.unsplash.com/photo-1546793665-c74683f339c1?w=400",
        description: "Fresh greens with caesar dressing",
    },
    SampleItem {
        canteen: "campus-cafeteria",
        name: "Green Tea",
        price: 30,
        category: Category::Beverages,
        image: "https://images.unsplash.com/photo-1564890369478-c89ca6d9cde9?w=400",
        description: "Refreshing green tea",
    },
    SampleItem {
        canteen: "campus-cafeteria",
        name: "Fruit Bowl",
        price: 60,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1546548970-71785318a17b?w=400",
        description: "Mixed seasonal fruits",
    },
    SampleItem {
        canteen: "canteen-3",
        name: "Butter Chicken",
        price: 120,
        category: Category::Meals,
        image: "https://images.unsplash.com/photo-1603894584373-5ac82b2ae398?w=400",
        description: "Rich and creamy butter chicken",
    },
    SampleItem {
        canteen: "canteen-3",
        name: "Dal Makhani",
        price: 90,
        category: Category::Meals,
        image: "https://images.unsplash.com/photo-1546833999-b9f581a1996d?w=400",
        description: "Creamy black lentils",
    },
    SampleItem {
        canteen: "canteen-3",
        name: "Naan",
        price: 20,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1601050690597-df0568f70950?w=400",
        description: "Soft butter naan",
    },
    SampleItem {
        canteen: "canteen-3",
        name: "Lassi",
        price: 40,
        category: Category::Beverages,
        image: "https://images.unsplash.com/photo-1623065422902-30a2d299bbe4?w=400",
        description: "Sweet yogurt drink",
    },
    SampleItem {
        canteen: "canteen-4",
        name: "Margherita Pizza",
        price: 150,
        category: Category::Meals,
        image: "https://images.unsplash.com/photo-1574071318508-1cdbab80d002?w=400",
        description: "Classic cheese pizza",
    },
    SampleItem {
        canteen: "canteen-4",
        name: "Pasta Alfredo",
        price: 130,
        category: Category::Meals,
        image: "https://images.unsplash.com/photo-1621996346565-e3dbc646d9a9?w=400",
        description: "Creamy white sauce pasta",
    },
    SampleItem {
        canteen: "canteen-4",
        name: "Garlic Bread",
        price: 60,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1573140401552-3fab0b24f2b6?w=400",
        description: "Toasted garlic bread",
    },
    SampleItem {
        canteen: "canteen-4",
        name: "Mojito",
        price: 50,
        category: Category::Beverages,
        image: "https://images.unsplash.com/photo-1551538827-9c037cb4f32a?w=400",
        description: "Refreshing mint mojito",
    },
    SampleItem {
        canteen: "canteen-5",
        name: "Chocolate Brownie",
        price: 70,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1607920591413-4ec007e70023?w=400",
        description: "Warm chocolate brownie",
    },
    SampleItem {
        canteen: "canteen-5",
        name: "Ice Cream Sundae",
        price: 80,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1563805042-7684c019e1cb?w=400",
        description: "Delicious ice cream with toppings",
    },
    SampleItem {
        canteen: "canteen-5",
        name: "Gulab Jamun",
        price: 50,
        category: Category::Snacks,
        image: "https://images.unsplash.com/photo-1589119908995-c6c8f7b7c89f?w=400",
        description: "Traditional Indian sweet",
    },
    SampleItem {
        canteen: "canteen-5",
        name: "Milkshake",
        price: 60,
        category: Category::Beverages,
        image: "https://images.unsplash.com/photo-1572490122747-3968b75cc699?w=400",
        description: "Thick and creamy milkshake",
    },
];

pub struct Maintenance<M: r2d2::ManageConnection> {
    db: Pool<M>,
    idgen: IdGen,
}

/// Loads the sample admins and menu, unless some menu already exists.
#[derive(Debug, Clone, Copy)]
pub struct SeedDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SeedOutcome {
    Seeded {
        admins: usize,
        #[serde(rename = "menuItems")]
        menu_items: usize,
    },
    AlreadySeeded,
}

/// Deletes every menu item, order and admin account of the named canteens.
#[derive(Debug, Clone)]
pub struct RemoveCanteens(pub Vec<CanteenId>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub menu_items: usize,
    pub orders: usize,
    pub admins: usize,
}

impl<M> Maintenance<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn new(db: Pool<M>, idgen: IdGen) -> Self {
        Maintenance { db, idgen }
    }
}

impl<M: r2d2::ManageConnection> Clone for Maintenance<M> {
    fn clone(&self) -> Self {
        let db = self.db.clone();
        let idgen = self.idgen.clone();
        Maintenance { db, idgen }
    }
}

fn remove_where<C, D, F>(docs: &C, pred: F) -> Result<usize>
where
    C: Storage,
    D: DeserializeOwned + Entity + HasMeta,
    F: Fn(&D) -> bool,
{
    let mut removed = 0;
    for doc in docs.list::<D>()?.into_iter().filter(|d| pred(d)) {
        if docs.delete(&doc.meta().id)? {
            removed += 1;
        }
    }
    Ok(removed)
}

impl Request for SeedDatabase {
    type Resp = SeedOutcome;
}

impl<M> Commandable<SeedDatabase> for Maintenance<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, _: SeedDatabase) -> Result<SeedOutcome> {
        let docs = self.db.get()?;
        if !docs.list::<MenuItem>()?.is_empty() {
            info!("Menu already present; not seeding");
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let mut admins = 0;
        for (canteen, username) in SEED_ADMINS.iter() {
            let canteen_id = CanteenId::from(*canteen);
            let name = catalog::require(&canteen_id)?.name;
            let mut account = AdminAccount::new(canteen_id, username, SEED_PASSWORD, name);
            match docs.save(&mut account) {
                Ok(()) => admins += 1,
                Err(e) if e.is::<ConcurrencyError>() => {
                    warn!("Admin {:?} already exists; leaving it alone", username)
                }
                Err(e) => return Err(e),
            }
        }

        for sample in SAMPLE_MENU.iter() {
            let form = MenuItemForm {
                name: sample.name.to_string(),
                price: sample.price,
                category: sample.category,
                image: sample.image.to_string(),
                description: Some(sample.description.to_string()),
            };
            let mut item = MenuItem::new(self.idgen.generate(), sample.canteen.into(), form);
            docs.save(&mut item)?;
        }

        info!("Seeded {} admins and {} menu items", admins, SAMPLE_MENU.len());
        Ok(SeedOutcome::Seeded {
            admins,
            menu_items: SAMPLE_MENU.len(),
        })
    }
}

impl Request for RemoveCanteens {
    type Resp = CleanupReport;
}

impl<M> Commandable<RemoveCanteens> for Maintenance<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, RemoveCanteens(canteens): RemoveCanteens) -> Result<CleanupReport> {
        let docs = self.db.get()?;
        let docs = &*docs;
        let report = CleanupReport {
            menu_items: remove_where(docs, |i: &MenuItem| canteens.contains(&i.canteen_id))?,
            orders: remove_where(docs, |o: &Order| canteens.contains(&o.canteen_id))?,
            admins: remove_where(docs, |a: &AdminAccount| canteens.contains(&a.canteen_id))?,
        };
        info!("Removed {:?}: {:?}", canteens, report);
        Ok(report)
    }
}
