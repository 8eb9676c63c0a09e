use crate::presentation::handlers::{RegistryService, health_check, list, login, register};
use actix_cors::Cors;
use actix_web::middleware::Condition;
use actix_web::web;

pub const ROUTE_SUMMARY: &str = "GET /health, POST /api/users/register, POST /api/users/Login, \
POST /api/users/login, GET /api/users, POST /register, POST /login, GET /";

/// Mounts the user registry under `/api/users` and the admin registry at the
/// root. Each scope carries its own service, so the handlers are shared.
pub fn configure(
    cfg: &mut web::ServiceConfig,
    users: web::Data<RegistryService>,
    admins: web::Data<RegistryService>,
) {
    cfg.route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/users")
                .app_data(users)
                .route("", web::get().to(list))
                .route("/register", web::post().to(register))
                .route("/Login", web::post().to(login))
                .route("/login", web::post().to(login)),
        )
        // Must stay last: an empty-prefix scope claims every remaining path.
        .service(
            web::scope("")
                .app_data(admins)
                .route("/", web::get().to(list))
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login)),
        );
}

pub fn cors_layer(allowed_origin: Option<&str>) -> Option<Cors> {
    let origin = allowed_origin?;
    let cors = if origin == "*" {
        Cors::default().allow_any_origin()
    } else {
        Cors::default().allowed_origin(origin)
    };
    Some(
        cors.allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600),
    )
}

/// The CORS layer as app middleware; a pass-through when no origin is set.
pub fn cors_middleware(allowed_origin: Option<&str>) -> Condition<Cors> {
    let cors = cors_layer(allowed_origin);
    Condition::new(cors.is_some(), cors.unwrap_or_default())
}
