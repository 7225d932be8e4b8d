use actix_web::web;

pub mod backend_health;
pub mod live;
pub mod websocket;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    // Pull surface for clients that poll instead of subscribing
    cfg.service(
        web::scope("/api")
            .service(live::get_manager)
            .service(live::get_live_picks)
            .service(live::get_captaincy_suggestions)
            .service(live::get_tier_stats)
            .service(live::simulate_rank)
            .service(live::save_planned_transfers)
            .service(live::get_planned_transfers),
    );

    // WebSocket route for live subscriptions
    cfg.service(web::resource("/live-ws").route(web::get().to(websocket::live_ws_route)));
}
