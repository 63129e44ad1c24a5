#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, CoreFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod model;

/// Assemble the server: routes mounted, config loaded, voting core built
/// and its tally worker spawned.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(CoreFairing)
        .attach(LoggerFairing)
}
