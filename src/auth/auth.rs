use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;

pub struct AuthUser {
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(Ok(AuthUser {
            user_id: claims.sub,
            display_name: claims.name,
            role: claims.role,
        }))
    }
}

impl AuthUser {
    /// Admin-only operations: capacity edits, settings, wishlist decisions.
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        match self.role.as_deref() {
            Some("admin") | Some("hr") => Ok(()),
            _ => Err(actix_web::error::ErrorForbidden("HR/Admin only")),
        }
    }
}
