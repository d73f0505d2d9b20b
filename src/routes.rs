use crate::{
    api::{attendance, leave_calendar, leave_request, statistics},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // All routes require a bearer token issued by the upstream identity
    // service; there are no public routes besides the swagger UI.
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::post().to(leave_request::create_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    )
                    // /leave/my-request
                    .service(
                        web::resource("/my-request")
                            .route(web::get().to(leave_request::my_requests)),
                    )
                    // /leave/pending-request
                    .service(
                        web::resource("/pending-request")
                            .route(web::get().to(leave_request::pending_requests)),
                    )
                    // /leave/calendar
                    .service(
                        web::resource("/calendar")
                            .route(web::get().to(leave_calendar::calendar_list)),
                    )
                    // /leave/calendar/{id}
                    .service(
                        web::resource("/calendar/{id}")
                            .route(web::get().to(leave_calendar::calendar_detail))
                            .route(web::put().to(leave_calendar::edit_max_slot)),
                    )
                    // /leave/setting
                    .service(
                        web::resource("/setting")
                            .route(web::get().to(leave_calendar::get_setting)),
                    )
                    // /leave/setting/{id}
                    .service(
                        web::resource("/setting/{id}")
                            .route(web::put().to(leave_calendar::update_setting)),
                    )
                    // /leave/statistical
                    .service(
                        web::resource("/statistical")
                            .route(web::get().to(statistics::statistical)),
                    )
                    // /leave/{id} is registered last so it cannot shadow the
                    // fixed segments above
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(leave_request::update_request)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::check_in))
                            .route(web::put().to(attendance::check_out)),
                    )
                    // /attendance/me
                    .service(
                        web::resource("/me").route(web::get().to(attendance::my_attendance)),
                    ),
            ),
    );
}
