use std::path::PathBuf;

use actix_web::{middleware, App, HttpServer};
use anyhow::{Context, Result};
use log::*;
use structopt::StructOpt;

use canteens::config::{Config, DbConfig, Listener};
use canteens::Canteens;
use infra::persistence::Storage;

#[derive(Debug, StructOpt)]
#[structopt(name = "serve", about = "Serve the canteen ordering API.")]
struct Opt {
    /// Config file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    let config = Config::load(&opt.config)?;
    config.env_logger.builder().init();
    debug!("Options: {:?}", opt);

    match &config.db {
        DbConfig::Sled(db) => serve(Canteens::new(db.build()?), &config.listener).await,
        DbConfig::Postgres(db) => serve(Canteens::new(db.build()?), &config.listener).await,
    }
}

async fn serve<M>(app: Canteens<M>, listener: &Listener) -> Result<()>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    app.setup()?;

    let srv = HttpServer::new(move || {
        let app = app.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .configure(move |cfg| app.configure(cfg))
    })
    .bind(listener.addr)
    .context("bind")?;
    info!("Listening on: {:?}", srv.addrs());
    srv.run().await?;
    Ok(())
}
