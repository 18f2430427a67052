use crate::{
    api::{
        attendance, birthday, dashboard, department, employee, exit, holiday, import, leave_balance,
        leave_request, notification, salary_slip,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Replenishes one request every `60s / requests_per_min`, bursting up to the limit.
fn limiter_config(requests_per_min: u32) -> Option<GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
}

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    // The builder only rejects a zero period or burst, which `limiter_config` never passes.
    let cfg = limiter_config(requests_per_min).unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .route("/me", web::get().to(handlers::me))
            .route("/accounts", web::post().to(handlers::register))
            .route("/dashboard", web::get().to(dashboard::summary))
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // fixed segments before /{id}
                    .service(
                        web::resource("/me")
                            .route(web::get().to(employee::my_profile))
                            .route(web::put().to(employee::update_my_profile)),
                    )
                    .service(web::resource("/import").route(web::post().to(import::import_employees)))
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(web::resource("/{id}/block").route(web::put().to(employee::block_employee)))
                    .service(web::resource("/{id}/unblock").route(web::put().to(employee::unblock_employee))),
            )
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(
                web::scope("/birthdays")
                    .service(web::resource("/upcoming").route(web::get().to(birthday::upcoming)))
                    .service(web::resource("/{id}/wish").route(web::post().to(birthday::wish))),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    .service(web::resource("/punch-in").route(web::post().to(attendance::punch_in)))
                    .service(web::resource("/punch-out").route(web::post().to(attendance::punch_out)))
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/calendar").route(web::get().to(attendance::calendar)))
                    .service(
                        web::resource("/edit-requests")
                            .route(web::get().to(attendance::list_edit_requests))
                            .route(web::post().to(attendance::create_edit_request)),
                    )
                    .service(
                        web::resource("/edit-requests/{id}/approve")
                            .route(web::put().to(attendance::approve_edit_request)),
                    )
                    .service(
                        web::resource("/edit-requests/{id}/reject")
                            .route(web::put().to(attendance::reject_edit_request)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/leave-balances")
                    .service(web::resource("/me").route(web::get().to(leave_balance::my_balance)))
                    .service(
                        web::resource("/allocation").route(web::get().to(leave_balance::allocation_status)),
                    )
                    .service(web::resource("/allocate").route(web::post().to(leave_balance::allocate)))
                    .service(web::resource("/{id}").route(web::get().to(leave_balance::employee_balance))),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(holiday::update_holiday))
                            .route(web::delete().to(holiday::delete_holiday)),
                    ),
            )
            .service(
                web::scope("/salary-slips")
                    .service(
                        web::resource("")
                            .route(web::post().to(salary_slip::generate_slip))
                            .route(web::get().to(salary_slip::list_slips)),
                    )
                    .service(web::resource("/me").route(web::get().to(salary_slip::my_slips)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(salary_slip::get_slip))
                            .route(web::put().to(salary_slip::update_slip)),
                    ),
            )
            .service(
                web::scope("/exit")
                    .service(
                        web::resource("/resignations")
                            .route(web::post().to(exit::submit_resignation))
                            .route(web::get().to(exit::list_resignations)),
                    )
                    .service(
                        web::resource("/resignations/{id}/accept")
                            .route(web::put().to(exit::accept_resignation)),
                    )
                    .service(
                        web::resource("/resignations/{id}/reject")
                            .route(web::put().to(exit::reject_resignation)),
                    )
                    .service(
                        web::resource("/resignations/{id}/withdraw")
                            .route(web::put().to(exit::withdraw_resignation)),
                    )
                    .service(
                        web::resource("/resignations/{id}/transfers")
                            .route(web::post().to(exit::create_transfer)),
                    )
                    .service(
                        web::resource("/resignations/{id}/interview")
                            .route(web::post().to(exit::schedule_interview))
                            .route(web::put().to(exit::complete_interview)),
                    )
                    .service(web::resource("/clearances/{id}").route(web::put().to(exit::update_clearance)))
                    .service(web::resource("/transfers/{id}").route(web::put().to(exit::update_transfer)))
                    .service(web::resource("/{id}/progress").route(web::get().to(exit::progress)))
                    .service(web::resource("/{id}/offboard").route(web::post().to(exit::offboard))),
            )
            .service(
                web::scope("/notifications")
                    .service(web::resource("").route(web::get().to(notification::list_notifications)))
                    .service(web::resource("/read-all").route(web::put().to(notification::mark_all_read)))
                    .service(web::resource("/{id}/read").route(web::put().to(notification::mark_read))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_config_accepts_any_rate() {
        assert!(limiter_config(0).is_some());
        assert!(limiter_config(60).is_some());
        assert!(limiter_config(1_000_000).is_some());
    }
}
