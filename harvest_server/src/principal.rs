//! The caller of a request, as vouched for by the identity gateway in front of the server.
//!
//! The gateway authenticates users and forwards two headers with every request:
//! * `hh-principal-id`: the numeric user id
//! * `hh-principal-role`: one of `customer`, `producer` or `admin`
//!
//! Handlers take a [`Principal`] argument to require an authenticated caller. Role checks are applied per route by
//! the ACL middleware (see [`crate::middleware`]).
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use harvest_engine::db_types::{Order, Role};
use log::*;
use serde::Serialize;

use crate::errors::{AuthError, ServerError};

pub const PRINCIPAL_ID_HEADER: &str = "hh-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "hh-principal-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let id = headers.get(PRINCIPAL_ID_HEADER).ok_or(AuthError::MissingPrincipal)?;
        let role = headers.get(PRINCIPAL_ROLE_HEADER).ok_or(AuthError::MissingPrincipal)?;
        let id = id
            .to_str()
            .map_err(|e| AuthError::InvalidPrincipalId(e.to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|e| AuthError::InvalidPrincipalId(e.to_string()))?;
        let role = role
            .to_str()
            .map_err(|e| AuthError::InvalidRole(e.to_string()))?
            .parse::<Role>()
            .map_err(|e| AuthError::InvalidRole(e.to_string()))?;
        Ok(Self { id, role })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins can see every order. Customers and producers only see the orders they are a party to.
    pub fn can_see(&self, order: &Order) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => order.customer_id == self.id,
            Role::Producer => order.producer_id == self.id,
        }
    }

    /// The producer id to restrict an update to, or `None` for admins, who may update any order.
    pub fn producer_scope(&self) -> Option<i64> {
        match self.role {
            Role::Admin => None,
            _ => Some(self.id),
        }
    }
}

impl FromRequest for Principal {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = Principal::from_headers(req.headers()).map_err(|e| {
            debug!("💻️ Rejecting request to {}. {e}", req.path());
            ServerError::AuthenticationError(e)
        });
        ready(result)
    }
}
