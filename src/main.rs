use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use env_logger::Env;
use radar::{
    configuration::{get_configuration, SearchBackendKind},
    services::{
        CancelFlag, CompetitorSearch, DomainExclusionSet, Enricher, GoogleScraper, OllamaClient,
        PageScraper, SearchBackend, SerperClient,
    },
    startup::{run, RunContext},
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().expect("Failed to read configuration.");

    let exclusions = Arc::new(DomainExclusionSet::load(
        configuration.exclusions_file.as_deref().map(Path::new),
    ));

    let scraper = PageScraper::new(
        configuration.scraper.timeout(),
        &configuration.scraper.user_agent,
        configuration.cache.page_cache(),
    )
    .expect("Failed to build page scraper client.");

    let analyzer = OllamaClient::new(
        configuration.analyzer.base_url.clone(),
        configuration.analyzer.model.clone(),
        configuration.analyzer.temperature,
    );

    let backend = match configuration.search.backend {
        SearchBackendKind::Scraped => SearchBackend::Scraped(
            GoogleScraper::new(
                configuration.search.timeout(),
                configuration.search.rate_limiter(),
                configuration.search.retry_policy(),
            )
            .expect("Failed to build search client."),
        ),
        SearchBackendKind::Api => SearchBackend::Api(SerperClient::new(
            configuration.search.api_endpoint.clone(),
            configuration.search.api_key.clone(),
            configuration.search.retry_policy(),
        )),
    };
    let search = CompetitorSearch::new(backend, configuration.cache.search_cache());

    let enricher = Arc::new(Enricher::new(scraper, analyzer, search, exclusions));

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    let ctx = RunContext {
        enricher,
        defaults: configuration.search.default_enrich_options(),
        batch: configuration.batch.batch_options(),
        cancel: CancelFlag::new(),
    };

    run(listener, ctx)?.await
}
