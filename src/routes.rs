use crate::{
    api::{admin_attendance, attendance, config as attendance_config, employee, selfie},
    auth::{handlers, middleware::auth_middleware},
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};

pub type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer-IP limiter allowing `requests_per_min` with an equal burst
pub fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = (60_000 / u64::from(requests_per_min.max(1))).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {} requests per minute", requests_per_min))
}

pub struct Limiters {
    pub login: Limiter,
    pub protected: Limiter,
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limiters.login))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&limiters.login))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limiters.protected)) // rate limiting
            .service(
                web::scope("/employee")
                    // /employee/attendance
                    .service(web::resource("/attendance").route(web::post().to(attendance::clock)))
                    .service(web::resource("/attendance/today").route(web::get().to(attendance::today)))
                    .service(
                        web::resource("/attendance/history").route(web::get().to(attendance::history)),
                    )
                    .service(
                        web::resource("/config")
                            .route(web::get().to(attendance_config::get_employee_config)),
                    )
                    .service(web::resource("/details").route(web::get().to(employee::details)))
                    // /employee/selfie
                    .service(web::resource("/selfie").route(web::post().to(selfie::register)))
                    .service(web::resource("/selfie/status").route(web::get().to(selfie::status)))
                    .service(
                        web::resource("/selfie/upload-url").route(web::post().to(selfie::upload_url)),
                    )
                    .service(
                        web::resource("/selfie/{file_name}/url")
                            .route(web::get().to(selfie::download_url)),
                    ),
            )
            .service(
                web::scope("/admin")
                    // /admin/attendance
                    .service(
                        web::resource("/attendance")
                            .route(web::get().to(admin_attendance::list))
                            .route(web::patch().to(admin_attendance::decide)),
                    )
                    .service(
                        web::resource("/attendance/bulk")
                            .route(web::post().to(admin_attendance::bulk_decide)),
                    )
                    .service(
                        web::resource("/attendance/clock")
                            .route(web::post().to(admin_attendance::supervisor_clock)),
                    )
                    // /admin/config
                    .service(
                        web::resource("/config")
                            .route(web::get().to(attendance_config::get_admin_config))
                            .route(web::put().to(attendance_config::put_admin_config)),
                    )
                    // /admin/employees
                    .service(web::resource("/employees").route(web::get().to(employee::supervised)))
                    .service(
                        web::resource("/employees/{id}/config")
                            .route(web::put().to(attendance_config::put_employee_override)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_configured_rates() {
        assert!(build_limiter(60).is_ok());
        assert!(build_limiter(1000).is_ok());
    }

    #[test]
    fn zero_burst_is_refused() {
        assert!(build_limiter(0).is_err());
    }
}
