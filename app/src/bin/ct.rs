use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::*;
use serde::Serialize;
use structopt::StructOpt;

use canteens::admin::{AdminLogin, CreateAdmin};
use canteens::catalog::{CanteenId, ListCanteens, ShowCanteen};
use canteens::config::{Config, DbConfig};
use canteens::maintenance::{RemoveCanteens, SeedDatabase, RETIRED_CANTEENS};
use canteens::menu::{
    Category, CreateMenuItem, ListMenu, ListMenuByCategory, MenuItem, MenuItemForm, MenuItemPatch,
    RemoveMenuItem, ShowMenuItem, UpdateMenuItem,
};
use canteens::orders::{
    LineRequest, ListCanteenOrders, ListCustomerOrders, Order, OrderStatus, PlaceOrder, ShowOrder,
    ShowStats, TrackOrder, UpdateOrderStatus,
};
use canteens::services::{Commandable, Queryable};
use canteens::Canteens;
use infra::ids::Id;
use infra::persistence::Storage;

#[derive(Debug, StructOpt)]
#[structopt(name = "ct", about = "Campus canteens CLI")]
struct Opt {
    /// Config file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Initialize storage")]
    Setup,
    #[structopt(name = "canteens", about = "List canteens")]
    Canteens,
    #[structopt(name = "canteen", about = "Show one canteen")]
    Canteen { canteen: CanteenId },
    #[structopt(name = "menu", about = "Show a canteen's available dishes")]
    Menu {
        canteen: CanteenId,
        #[structopt(long)]
        category: Option<Category>,
    },
    #[structopt(name = "item", about = "Show a menu item")]
    Item { id: Id<MenuItem> },
    #[structopt(name = "add-item", about = "Add a dish to a canteen's menu")]
    AddItem {
        canteen: CanteenId,
        #[structopt(long)]
        name: String,
        #[structopt(long)]
        price: u64,
        #[structopt(long)]
        category: Category,
        #[structopt(long, default_value = "")]
        image: String,
        #[structopt(long)]
        description: Option<String>,
    },
    #[structopt(name = "update-item", about = "Change some fields of a menu item")]
    UpdateItem {
        id: Id<MenuItem>,
        #[structopt(long)]
        name: Option<String>,
        #[structopt(long)]
        price: Option<u64>,
        #[structopt(long)]
        category: Option<Category>,
        #[structopt(long)]
        image: Option<String>,
        #[structopt(long)]
        description: Option<String>,
        #[structopt(long)]
        available: Option<bool>,
    },
    #[structopt(name = "remove-item", about = "Delete a menu item")]
    RemoveItem { id: Id<MenuItem> },
    #[structopt(name = "order", about = "Place an order")]
    Order {
        canteen: CanteenId,
        #[structopt(long)]
        customer: String,
        /// Menu item ids, each optionally followed by `:QUANTITY`
        #[structopt(required = true)]
        lines: Vec<LineArg>,
    },
    #[structopt(name = "canteen-orders", about = "List a canteen's orders, newest first")]
    CanteenOrders { canteen: CanteenId },
    #[structopt(name = "customer-orders", about = "List a customer's orders, newest first")]
    CustomerOrders { customer: String },
    #[structopt(name = "show-order", about = "Show an order")]
    ShowOrder { id: Id<Order> },
    #[structopt(name = "set-status", about = "Set an order's status")]
    SetStatus { id: Id<Order>, status: OrderStatus },
    #[structopt(name = "stats", about = "Order statistics for a canteen")]
    Stats { canteen: CanteenId },
    #[structopt(name = "track", about = "Follow an order until it is delivered")]
    Track {
        id: Id<Order>,
        /// Seconds between polls
        #[structopt(long, default_value = "5")]
        interval: u64,
    },
    #[structopt(name = "login", about = "Check admin credentials")]
    Login { username: String, password: String },
    #[structopt(name = "create-admin", about = "Create an admin account")]
    CreateAdmin {
        canteen: CanteenId,
        username: String,
        password: String,
        #[structopt(long)]
        canteen_name: Option<String>,
    },
    #[structopt(name = "seed", about = "Load sample admins and menus")]
    Seed,
    #[structopt(name = "cleanup", about = "Remove all data of the given canteens")]
    Cleanup { canteens: Vec<CanteenId> },
}

#[derive(Debug, Clone, Copy)]
struct LineArg(LineRequest);

impl FromStr for LineArg {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        let (id, quantity) = match s.rfind(':') {
            Some(idx) => (&s[..idx], s[idx + 1..].parse()?),
            None => (s, 1),
        };
        let menu_item_id = id.parse().map_err(|e| anyhow!("{}: {}", id, e))?;
        Ok(LineArg(LineRequest {
            menu_item_id,
            quantity,
        }))
    }
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let config = Config::load(&opt.config)?;
    config.env_logger.builder().init();
    debug!("Options: {:?}", opt);

    match &config.db {
        DbConfig::Sled(db) => run(Canteens::new(db.build()?), opt.command),
        DbConfig::Postgres(db) => run(Canteens::new(db.build()?), opt.command),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_orders(orders: &[Order]) {
    for order in orders {
        println!(
            "{} {} {} {:?} {} {}",
            order.meta.id,
            order.order_number,
            order.placed_at.format("%Y-%m-%d %H:%M"),
            order.customer_name,
            order.status,
            order.total_amount
        );
    }
}

fn run<M>(app: Canteens<M>, command: Commands) -> Result<()>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    match command {
        Commands::Setup => app.setup()?,
        Commands::Canteens => {
            for canteen in app.catalog().query(ListCanteens)? {
                println!("{} {}: {}", canteen.icon, canteen.id, canteen.name);
            }
        }
        Commands::Canteen { canteen } => match app.catalog().query(ShowCanteen(canteen))? {
            Some(canteen) => print_json(&canteen)?,
            None => println!("No such canteen"),
        },
        Commands::Menu { canteen, category } => {
            let items = match category {
                Some(category) => app.menu().query(ListMenuByCategory {
                    canteen_id: canteen,
                    category,
                })?,
                None => app.menu().query(ListMenu {
                    canteen_id: canteen,
                })?,
            };
            for item in items {
                println!("{}: {} ({}) {}", item.meta.id, item.name, item.category, item.price);
            }
        }
        Commands::Item { id } => match app.menu().query(ShowMenuItem(id))? {
            Some(item) => print_json(&item)?,
            None => println!("No such menu item"),
        },
        Commands::AddItem {
            canteen,
            name,
            price,
            category,
            image,
            description,
        } => {
            let item = MenuItemForm {
                name,
                price,
                category,
                image,
                description,
            };
            let id = app.menu().execute(CreateMenuItem {
                canteen_id: canteen,
                item,
            })?;
            println!("{}", id);
        }
        Commands::UpdateItem {
            id,
            name,
            price,
            category,
            image,
            description,
            available,
        } => {
            let patch = MenuItemPatch {
                name,
                price,
                category,
                image,
                description,
                available,
            };
            app.menu().execute(UpdateMenuItem { id, patch })?;
        }
        Commands::RemoveItem { id } => app.menu().execute(RemoveMenuItem(id))?,
        Commands::Order {
            canteen,
            customer,
            lines,
        } => {
            let order = app.orders().execute(PlaceOrder {
                canteen_id: canteen,
                customer_name: customer,
                items: lines.into_iter().map(|LineArg(l)| l).collect(),
            })?;
            println!("{} {} total {}", order.meta.id, order.order_number, order.total_amount);
        }
        Commands::CanteenOrders { canteen } => {
            print_orders(&app.orders().query(ListCanteenOrders(canteen))?)
        }
        Commands::CustomerOrders { customer } => {
            print_orders(&app.orders().query(ListCustomerOrders(customer))?)
        }
        Commands::ShowOrder { id } => match app.orders().query(ShowOrder(id))? {
            Some(order) => print_json(&order)?,
            None => println!("No such order"),
        },
        Commands::SetStatus { id, status } => {
            app.orders().execute(UpdateOrderStatus { id, status })?;
        }
        Commands::Stats { canteen } => print_json(&app.orders().query(ShowStats(canteen))?)?,
        Commands::Track { id, interval } => track(&app, id, Duration::from_secs(interval))?,
        Commands::Login { username, password } => {
            match app.admins().query(AdminLogin { username, password })? {
                Some(session) => print_json(&session)?,
                None => println!("Invalid username or password"),
            }
        }
        Commands::CreateAdmin {
            canteen,
            username,
            password,
            canteen_name,
        } => {
            let id = app.admins().execute(CreateAdmin {
                canteen_id: canteen,
                username,
                password,
                canteen_name,
            })?;
            println!("{}", id);
        }
        Commands::Seed => print_json(&app.maintenance().execute(SeedDatabase)?)?,
        Commands::Cleanup { mut canteens } => {
            if canteens.is_empty() {
                canteens = RETIRED_CANTEENS.iter().map(|c| CanteenId::from(*c)).collect();
            }
            print_json(&app.maintenance().execute(RemoveCanteens(canteens))?)?
        }
    }

    Ok(())
}

fn track<M>(app: &Canteens<M>, id: Id<Order>, interval: Duration) -> Result<()>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let orders = app.orders();
    let mut last = None;
    loop {
        let view = match orders.query(TrackOrder(id))? {
            Some(view) => view,
            None => {
                println!("Order {} not found", id);
                return Ok(());
            }
        };
        if last != Some(view.status) {
            println!(
                "{} {}: {} ({}%)",
                view.order_number, view.customer_name, view.headline, view.progress
            );
            last = Some(view.status);
        }
        if view.is_finished() {
            return Ok(());
        }
        thread::sleep(interval);
    }
}
