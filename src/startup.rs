use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};

use crate::{
    routes::{default_route, enrich_route},
    services::{enricher::EnrichOptions, orchestrator::BatchOptions, CancelFlag, Enricher},
};

/// Everything a run needs, assembled once in main and shared by the routes.
pub struct RunContext {
    pub enricher: Arc<Enricher>,
    pub defaults: EnrichOptions,
    pub batch: BatchOptions,
    pub cancel: CancelFlag,
}

pub fn run(listener: TcpListener, ctx: RunContext) -> Result<Server, std::io::Error> {
    let ctx = web::Data::new(ctx);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(
                web::scope("/enrich")
                    .service(enrich_route::enrich)
                    .service(enrich_route::cancel),
            )
            .app_data(ctx.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
