use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::voter::{Admin, Role, Voter};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An actor type that an auth token can represent.
pub trait Actor {
    const ROLE: Role;
}

impl Actor for Admin {
    const ROLE: Role = Role::Admin;
}

impl Actor for Voter {
    const ROLE: Role = Role::Voter;
}

/// An authentication token representing a specific user with a specific
/// role. Tokens are minted by the identity provider with the shared
/// `jwt_secret`; the core only verifies them.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    /// Identity-provider subject ID.
    sub: String,
    role: Role,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// The ID of the user this token represents.
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Does this token carry the given role?
    pub fn permits(&self, target: Role) -> bool {
        self.role == target
    }
}

impl<U> AuthToken<U>
where
    U: Actor,
{
    /// Create a new [`AuthToken`] for the given subject, with the role
    /// matching the actor type.
    pub fn new(subject: &str) -> Self {
        Self {
            sub: subject.to_string(),
            role: U::ROLE,
            phantom: PhantomData,
        }
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: Actor + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that it carries the
    /// correct role for this actor type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) else {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::Permission("missing auth token".to_string()),
            ));
        };

        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(err) => return Outcome::Failure((Status::Unauthorized, err)),
        };

        if !token.permits(U::ROLE) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Permission(format!(
                    "role {:?} required, token carries {:?}",
                    U::ROLE,
                    token.role
                )),
            ));
        }

        Outcome::Success(token)
    }
}
