//! Guarded with `#[cfg(test)]` from `lib.rs`

use std::collections::BTreeSet;
use std::thread;

use anyhow::Result;

use infra::ids::Id;

use crate::admin::{AdminLogin, CreateAdmin};
use crate::catalog::CanteenId;
use crate::errors::Rejection;
use crate::maintenance::{CleanupReport, RemoveCanteens, SeedDatabase, SeedOutcome};
use crate::menu::{
    Category, ListMenu, ListMenuByCategory, MenuItem, MenuItemPatch, RemoveMenuItem, ShowMenuItem,
    UpdateMenuItem,
};
use crate::orders::{
    LineRequest, ListCanteenOrders, ListCustomerOrders, OrderStatus, PlaceOrder, ShowOrder,
    ShowStats, TrackOrder, UpdateOrderStatus,
};
use crate::services::{Commandable, Queryable};


use self::junk_drawer::{app, dish, unsaved_id};

fn rejection(err: anyhow::Error) -> Rejection {
    match err.downcast::<Rejection>() {
        Ok(r) => r,
        Err(e) => panic!("expected a rejection, got: {:?}", e),
    }
}

fn line(menu_item_id: Id<MenuItem>, quantity: u32) -> LineRequest {
    LineRequest {
        menu_item_id,
        quantity,
    }
}

#[test]
fn placed_orders_keep_the_price_they_were_placed_at() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("placed_orders_keep_the_price_they_were_placed_at")?;
    let roll = dish(&app, "food-plaza", "Paneer Roll", 60)?;
    let fries = dish(&app, "food-plaza", "French Fries", 40)?;

    let order = app.orders().execute(PlaceOrder {
        canteen_id: "food-plaza".into(),
        customer_name: " Asha ".into(),
        items: vec![line(roll, 2), line(fries, 1)],
    })?;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, 160);
    assert_eq!(order.customer_name, "Asha");
    assert!(order.order_number.starts_with("ORD"));

    app.menu().execute(UpdateMenuItem {
        id: roll,
        patch: MenuItemPatch {
            price: Some(75),
            ..Default::default()
        },
    })?;

    let stored = app
        .orders()
        .query(ShowOrder(order.meta.id))?
        .expect("stored order");
    assert_eq!(stored.items[0].price, 60);
    assert_eq!(stored.total_amount, 160);
    let item = app.menu().query(ShowMenuItem(roll))?.expect("menu item");
    assert_eq!(item.price, 75);
    Ok(())
}

#[test]
fn orders_are_refused_when_malformed() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("orders_are_refused_when_malformed")?;
    let naan = dish(&app, "canteen-3", "Naan", 20)?;
    let pizza = dish(&app, "canteen-4", "Margherita Pizza", 150)?;
    let lassi = dish(&app, "canteen-3", "Lassi", 40)?;
    app.menu().execute(UpdateMenuItem {
        id: lassi,
        patch: MenuItemPatch {
            available: Some(false),
            ..Default::default()
        },
    })?;
    let orders = app.orders();
    let attempt = |canteen: &str, name: &str, items: Vec<LineRequest>| {
        orders
            .execute(PlaceOrder {
                canteen_id: canteen.into(),
                customer_name: name.into(),
                items,
            })
            .map(|_| ())
            .map_err(rejection)
    };

    assert_eq!(
        attempt("nowhere", "Asha", vec![line(naan, 1)]),
        Err(Rejection::UnknownCanteen("nowhere".into()))
    );
    assert_eq!(
        attempt("canteen-3", "   ", vec![line(naan, 1)]),
        Err(Rejection::MissingCustomerName)
    );
    assert_eq!(attempt("canteen-3", "Asha", vec![]), Err(Rejection::EmptyOrder));
    assert_eq!(
        attempt("canteen-3", "Asha", vec![line(naan, 0)]),
        Err(Rejection::ZeroQuantity(naan.to_string()))
    );
    assert_eq!(
        attempt("canteen-3", "Asha", vec![line(pizza, 1)]),
        Err(Rejection::WrongCanteen(pizza.to_string(), "canteen-3".into()))
    );
    assert_eq!(
        attempt("canteen-3", "Asha", vec![line(lassi, 1)]),
        Err(Rejection::Unavailable(lassi.to_string()))
    );
    let ghost = unsaved_id();
    assert_eq!(
        attempt("canteen-3", "Asha", vec![line(ghost, 1)]),
        Err(Rejection::UnknownMenuItem(ghost.to_string()))
    );

    assert!(app.orders().query(ListCanteenOrders("canteen-3".into()))?.is_empty());
    Ok(())
}

#[test]
fn menus_list_only_available_dishes_of_one_canteen() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("menus_list_only_available_dishes_of_one_canteen")?;
    let brownie = dish(&app, "canteen-5", "Chocolate Brownie", 70)?;
    let sundae = dish(&app, "canteen-5", "Ice Cream Sundae", 80)?;
    let shake = dish(&app, "canteen-5", "Milkshake", 60)?;
    dish(&app, "canteen-4", "Garlic Bread", 60)?;
    app.menu().execute(UpdateMenuItem {
        id: shake,
        patch: MenuItemPatch {
            category: Some(Category::Beverages),
            ..Default::default()
        },
    })?;
    app.menu().execute(UpdateMenuItem {
        id: sundae,
        patch: MenuItemPatch {
            available: Some(false),
            ..Default::default()
        },
    })?;

    let names = app
        .menu()
        .query(ListMenu {
            canteen_id: "canteen-5".into(),
        })?
        .into_iter()
        .map(|i| i.name)
        .collect::<BTreeSet<_>>();
    assert_eq!(
        names,
        vec!["Chocolate Brownie".to_string(), "Milkshake".to_string()]
            .into_iter()
            .collect()
    );

    let snacks = app.menu().query(ListMenuByCategory {
        canteen_id: "canteen-5".into(),
        category: Category::Snacks,
    })?;
    assert_eq!(
        snacks.iter().map(|i| i.meta.id).collect::<Vec<_>>(),
        vec![brownie]
    );

    assert!(app
        .menu()
        .query(ShowMenuItem(sundae))?
        .map(|i| !i.available)
        .unwrap_or(false));
    Ok(())
}

#[test]
fn menu_edits_reject_bad_input() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("menu_edits_reject_bad_input")?;

    let err = dish(&app, "food-plaza", "Free Lunch", 0).expect_err("zero price");
    assert_eq!(rejection(err), Rejection::InvalidPrice);
    let err = dish(&app, "nowhere", "Mystery Meat", 10).expect_err("unknown canteen");
    assert_eq!(rejection(err), Rejection::UnknownCanteen("nowhere".into()));

    let burger = dish(&app, "food-plaza", "Veg Burger", 50)?;
    let err = app
        .menu()
        .execute(UpdateMenuItem {
            id: burger,
            patch: MenuItemPatch {
                price: Some(0),
                ..Default::default()
            },
        })
        .expect_err("zero price");
    assert_eq!(rejection(err), Rejection::InvalidPrice);

    let ghost = unsaved_id();
    let err = app
        .menu()
        .execute(UpdateMenuItem {
            id: ghost,
            patch: MenuItemPatch::default(),
        })
        .expect_err("unknown item");
    assert_eq!(rejection(err), Rejection::UnknownMenuItem(ghost.to_string()));
    Ok(())
}

#[test]
fn removed_dishes_are_gone() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("removed_dishes_are_gone")?;
    let mojito = dish(&app, "canteen-4", "Mojito", 50)?;

    app.menu().execute(RemoveMenuItem(mojito))?;

    assert_eq!(app.menu().query(ShowMenuItem(mojito))?, None);
    let err = app
        .menu()
        .execute(RemoveMenuItem(mojito))
        .expect_err("already removed");
    assert_eq!(rejection(err), Rejection::UnknownMenuItem(mojito.to_string()));
    Ok(())
}

#[test]
fn customers_see_their_own_orders_newest_first() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("customers_see_their_own_orders_newest_first")?;
    let tea = dish(&app, "campus-cafeteria", "Green Tea", 30)?;
    let place = |name: &str| {
        app.orders().execute(PlaceOrder {
            canteen_id: "campus-cafeteria".into(),
            customer_name: name.into(),
            items: vec![line(tea, 1)],
        })
    };
    let first = place("Asha")?;
    let _other = place("Ravi")?;
    let second = place("Asha")?;

    let mine = app.orders().query(ListCustomerOrders("Asha".into()))?;
    assert_eq!(
        mine.iter().map(|o| o.meta.id).collect::<BTreeSet<_>>(),
        vec![first.meta.id, second.meta.id].into_iter().collect()
    );
    assert!(mine[0].placed_at >= mine[1].placed_at);

    let all = app
        .orders()
        .query(ListCanteenOrders("campus-cafeteria".into()))?;
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].placed_at >= w[1].placed_at));
    Ok(())
}

#[test]
fn any_status_may_be_set_and_the_last_write_wins() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("any_status_may_be_set_and_the_last_write_wins")?;
    let pizza = dish(&app, "canteen-4", "Margherita Pizza", 150)?;
    let order = app.orders().execute(PlaceOrder {
        canteen_id: "canteen-4".into(),
        customer_name: "Ravi".into(),
        items: vec![line(pizza, 1)],
    })?;
    let id = order.meta.id;

    for status in [OrderStatus::Ready, OrderStatus::Preparing].iter() {
        app.orders().execute(UpdateOrderStatus {
            id,
            status: *status,
        })?;
    }

    let tracking = app.orders().query(TrackOrder(id))?.expect("tracking");
    assert_eq!(tracking.status, OrderStatus::Preparing);
    assert_eq!(tracking.current_step, 1);
    assert_eq!(tracking.progress, 33);

    let ghost = unsaved_id();
    let err = app
        .orders()
        .execute(UpdateOrderStatus {
            id: ghost,
            status: OrderStatus::Delivered,
        })
        .expect_err("unknown order");
    assert_eq!(rejection(err), Rejection::UnknownOrder(ghost.to_string()));
    assert_eq!(app.orders().query(TrackOrder(ghost))?, None);
    Ok(())
}

#[test]
fn racing_status_writers_all_land_and_one_of_them_wins() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("racing_status_writers_all_land_and_one_of_them_wins")?;
    let pizza = dish(&app, "canteen-4", "Margherita Pizza", 150)?;
    let order = app.orders().execute(PlaceOrder {
        canteen_id: "canteen-4".into(),
        customer_name: "Ravi".into(),
        items: vec![line(pizza, 1)],
    })?;
    let id = order.meta.id;

    let writers = (0..8)
        .map(|n| {
            let orders = app.orders();
            let status = OrderStatus::ALL[n % OrderStatus::ALL.len()];
            thread::spawn(move || orders.execute(UpdateOrderStatus { id, status }))
        })
        .collect::<Vec<_>>();
    for writer in writers {
        writer.join().expect("writer thread")?;
    }

    let stored = app.orders().query(ShowOrder(id))?.expect("stored order");
    assert!(OrderStatus::ALL.contains(&stored.status));
    assert_eq!(stored.total_amount, 150);
    Ok(())
}

#[test]
fn orders_whose_total_overflows_are_refused() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("orders_whose_total_overflows_are_refused")?;
    let feast = dish(&app, "food-plaza", "Royal Feast", u64::MAX / 2 + 1)?;

    let err = app
        .orders()
        .execute(PlaceOrder {
            canteen_id: "food-plaza".into(),
            customer_name: "Asha".into(),
            items: vec![line(feast, 2)],
        })
        .expect_err("overflowing total");
    assert_eq!(rejection(err), Rejection::TotalTooLarge);
    assert!(app.orders().query(ListCanteenOrders("food-plaza".into()))?.is_empty());

    let single = app.orders().execute(PlaceOrder {
        canteen_id: "food-plaza".into(),
        customer_name: "Asha".into(),
        items: vec![line(feast, 1)],
    })?;
    assert_eq!(single.total_amount, u64::MAX / 2 + 1);
    Ok(())
}

#[test]
fn stats_cover_only_the_requested_canteen() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("stats_cover_only_the_requested_canteen")?;
    let tea = dish(&app, "campus-cafeteria", "Green Tea", 30)?;
    let salad = dish(&app, "campus-cafeteria", "Caesar Salad", 80)?;
    let bread = dish(&app, "canteen-4", "Garlic Bread", 60)?;
    let orders = app.orders();
    for (canteen, items) in vec![
        ("campus-cafeteria", vec![line(tea, 3)]),
        ("campus-cafeteria", vec![line(salad, 1), line(tea, 2)]),
        ("canteen-4", vec![line(bread, 9)]),
    ] {
        orders.execute(PlaceOrder {
            canteen_id: canteen.into(),
            customer_name: "Asha".into(),
            items,
        })?;
    }

    let stats = orders.query(ShowStats("campus-cafeteria".into()))?;

    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_revenue, 90 + 80 + 60);
    let top = stats
        .top_items
        .iter()
        .map(|t| (t.name.as_str(), t.count))
        .collect::<Vec<_>>();
    assert_eq!(top, vec![("Green Tea", 5), ("Caesar Salad", 1)]);

    let empty = orders.query(ShowStats("canteen-5".into()))?;
    assert_eq!(empty.total_orders, 0);
    assert!(empty.top_items.is_empty());
    Ok(())
}

#[test]
fn login_needs_both_username_and_password_to_match() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("login_needs_both_username_and_password_to_match")?;
    app.admins().execute(CreateAdmin {
        canteen_id: "canteen-4".into(),
        username: "admin4".into(),
        password: "s3cret".into(),
        canteen_name: None,
    })?;
    let login = |username: &str, password: &str| {
        app.admins().query(AdminLogin {
            username: username.into(),
            password: password.into(),
        })
    };

    assert_eq!(login("nobody", "s3cret")?, None);
    assert_eq!(login("admin4", "wrong")?, None);
    let session = login("admin4", "s3cret")?.expect("session");
    assert_eq!(session.canteen_id, CanteenId::from("canteen-4"));
    assert_eq!(session.canteen_name, "Canteen 4");
    assert_eq!(session.username, "admin4");
    Ok(())
}

#[test]
fn usernames_are_unique() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("usernames_are_unique")?;
    let create = |canteen: &str| {
        app.admins().execute(CreateAdmin {
            canteen_id: canteen.into(),
            username: "boss".into(),
            password: "12345".into(),
            canteen_name: None,
        })
    };

    create("food-plaza")?;
    let err = create("canteen-4").expect_err("duplicate");
    assert_eq!(rejection(err), Rejection::UsernameTaken("boss".into()));

    let err = create("nowhere").expect_err("unknown canteen");
    assert_eq!(rejection(err), Rejection::UnknownCanteen("nowhere".into()));
    Ok(())
}

#[test]
fn seeding_happens_once() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("seeding_happens_once")?;

    let first = app.maintenance().execute(SeedDatabase)?;
    assert_eq!(
        first,
        SeedOutcome::Seeded {
            admins: 5,
            menu_items: 21
        }
    );
    let again = app.maintenance().execute(SeedDatabase)?;
    assert_eq!(again, SeedOutcome::AlreadySeeded);

    let menu = app.menu().query(ListMenu {
        canteen_id: "food-plaza".into(),
    })?;
    assert_eq!(menu.len(), 5);
    let session = app
        .admins()
        .query(AdminLogin {
            username: "cafeadmin".into(),
            password: "12345".into(),
        })?
        .expect("seeded admin");
    assert_eq!(session.canteen_name, "Campus Cafeteria");
    Ok(())
}

#[test]
fn cleanup_removes_only_the_named_canteens() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let app = app("cleanup_removes_only_the_named_canteens")?;
    app.maintenance().execute(SeedDatabase)?;
    let dal = app
        .menu()
        .query(ListMenu {
            canteen_id: "canteen-3".into(),
        })?
        .remove(0);
    let dosa = app
        .menu()
        .query(ListMenu {
            canteen_id: "food-plaza".into(),
        })?
        .remove(0);
    for (canteen, item) in vec![("canteen-3", dal.meta.id), ("food-plaza", dosa.meta.id)] {
        app.orders().execute(PlaceOrder {
            canteen_id: canteen.into(),
            customer_name: "Asha".into(),
            items: vec![line(item, 1)],
        })?;
    }

    let report = app.maintenance().execute(RemoveCanteens(vec![
        "canteen-3".into(),
        "canteen-5".into(),
    ]))?;

    assert_eq!(
        report,
        CleanupReport {
            menu_items: 8,
            orders: 1,
            admins: 2,
        }
    );
    for gone in ["canteen-3", "canteen-5"].iter() {
        assert!(app
            .menu()
            .query(ListMenu {
                canteen_id: (*gone).into()
            })?
            .is_empty());
    }
    assert_eq!(
        app.menu()
            .query(ListMenu {
                canteen_id: "food-plaza".into()
            })?
            .len(),
        5
    );
    assert_eq!(
        app.orders()
            .query(ListCustomerOrders("Asha".into()))?
            .iter()
            .map(|o| o.canteen_id.as_str())
            .collect::<Vec<_>>(),
        vec!["food-plaza"]
    );
    let admin3 = app.admins().query(AdminLogin {
        username: "admin3".into(),
        password: "12345".into(),
    })?;
    assert_eq!(admin3, None);
    Ok(())
}
