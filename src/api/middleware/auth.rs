use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error,
};
use std::{
    future::{ready, Future, Ready},
    pin::Pin,
    rc::Rc,
    sync::Mutex,
};
use tracing::{info, warn};

use crate::store::models::User;

/// Simulated sign-in: one configured profile, logged in or not.
pub struct LoginState {
    profile: User,
    current: Mutex<Option<User>>,
}

impl LoginState {
    pub fn new(profile: User) -> Self {
        Self {
            profile,
            current: Mutex::new(None),
        }
    }

    pub fn login(&self) -> Result<User, Error> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| actix_web::error::ErrorInternalServerError("login state poisoned"))?;
        let user = self.profile.clone();
        *current = Some(user.clone());
        info!("User {} signed in", user.id);
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), Error> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| actix_web::error::ErrorInternalServerError("login state poisoned"))?;
        if let Some(user) = current.take() {
            info!("User {} signed out", user.id);
        }
        Ok(())
    }

    pub fn current(&self) -> Option<User> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

/// Rejects every request except `/health` and `/login` while nobody is
/// signed in.
pub struct RequireLogin;

impl<S, B> Transform<S, ServiceRequest> for RequireLogin
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireLoginMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireLoginMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireLoginMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireLoginMiddleware<S>
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
        let srv = self.service.clone();

        if req.method() == actix_web::http::Method::OPTIONS
            || req.path() == "/health"
            || req.path() == "/login"
        {
            return Box::pin(async move { srv.call(req).await });
        }

        let signed_in = match req.app_data::<web::Data<LoginState>>() {
            Some(login) => login.current().is_some(),
            None => {
                warn!("LoginState missing in app_data");
                return Box::pin(async move {
                    Err(actix_web::error::ErrorInternalServerError("Configuration error"))
                });
            }
        };

        if !signed_in {
            return Box::pin(async move {
                Err(actix_web::error::ErrorUnauthorized("Not signed in"))
            });
        }

        Box::pin(async move { srv.call(req).await })
    }
}
