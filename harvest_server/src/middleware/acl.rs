//! Access control list middleware for the marketplace server.
//! This middleware can be placed on any route or service.
//!
//! It reads the [`Principal`] forwarded by the identity gateway and checks its role against the roles allowed on the
//! route. Requests without a principal are rejected with 401 Unauthorized; principals with any other role get
//! 403 Forbidden.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use harvest_engine::db_types::Role;
use log::*;

use crate::{errors::ServerError, principal::Principal};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let principal = Principal::from_headers(req.headers()).map_err(|e| {
                debug!("💻️ No valid principal on request to {}. {e}", req.path());
                ServerError::AuthenticationError(e)
            })?;
            if allowed_roles.contains(&principal.role) {
                service.call(req).await
            } else {
                warn!("💻️ {} {} may not call {}", principal.role, principal.id, req.path());
                Err(ServerError::InsufficientPermissions(format!("{} accounts may not do this", principal.role)).into())
            }
        })
    }
}
