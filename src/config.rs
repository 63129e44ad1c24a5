use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::core::{spawn_tally_worker, Core};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
    hmac_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to verify JWTs, shared with the identity provider.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret key used to sign vote fingerprints.
    pub fn hmac_secret(&self) -> &[u8] {
        self.hmac_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that builds the voting [`Core`], spawns the tally worker that
/// drains its event channel, and places the core into managed state.
/// Must run after [`ConfigFairing`].
pub struct CoreFairing;

#[rocket::async_trait]
impl Fairing for CoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting Core",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (core, events) = match rocket.state::<Config>() {
            Some(config) => Core::new(config.hmac_secret()),
            None => {
                error!("Config must be managed before the voting core");
                return Err(rocket);
            }
        };
        spawn_tally_worker(core.clone(), events);
        info!("Voting core online");

        rocket = rocket.manage(core);
        Ok(rocket)
    }
}
