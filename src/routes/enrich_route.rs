use std::path::Path;
use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::RowStatus;
use crate::services::{read_input_rows, run_batches, write_output_rows};
use crate::startup::RunContext;

#[derive(Deserialize)]
pub struct EnrichQuery {
    input_path: String,
    output_path: String,
    location: Option<String>,
    competitor_insights: Option<bool>,
    gmb_check: Option<bool>,
    pages: Option<u32>,
}

/// Run the research pipeline over a server-local CSV and write the
/// enriched table next to it. Responds with a run summary once every row
/// has an outcome; individual row failures are in the output file, never
/// in the HTTP status.
#[get("")]
async fn enrich(ctx: web::Data<RunContext>, query: web::Query<EnrichQuery>) -> HttpResponse {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();

    let rows = match read_input_rows(Path::new(&query.input_path)) {
        Ok(rows) => rows,
        Err(e) => return HttpResponse::BadRequest().body(format!("{:#}", e)),
    };
    let total = rows.len();
    log::info!("run {} starting: {} rows from {}", run_id, total, query.input_path);

    let mut options = ctx.defaults.clone();
    if let Some(location) = &query.location {
        options.location = location.clone();
    }
    if let Some(pages) = query.pages {
        options.search_pages = pages;
    }
    options.competitor_insights = query.competitor_insights.unwrap_or(false);
    options.gmb_check = query.gmb_check.unwrap_or(false);

    ctx.cancel.reset();
    let enricher = ctx.enricher.clone();
    let options = Arc::new(options);
    let outputs = run_batches(rows, &ctx.batch, &ctx.cancel, move |row| {
        let enricher = enricher.clone();
        let options = options.clone();
        async move { enricher.process_row(row, &options).await }
    })
    .await;

    if let Err(e) = write_output_rows(Path::new(&query.output_path), &outputs) {
        return HttpResponse::InternalServerError().body(format!("{:#}", e));
    }

    let count = |status: RowStatus| outputs.iter().filter(|o| o.status == status).count();
    let summary = serde_json::json!({
        "run_id": run_id,
        "total": total,
        "success": count(RowStatus::Success),
        "partial_error": count(RowStatus::PartialError),
        "error": count(RowStatus::Error),
        "skipped": count(RowStatus::Skipped),
        "output_path": query.output_path,
        "started_at": started_at,
        "finished_at": Utc::now(),
    });
    log::info!("run {} finished: {}", run_id, summary);

    HttpResponse::Ok().json(summary)
}

/// Ask the current run to stop at the next batch boundary. Batches already
/// dispatched run to completion; the remaining rows come back `skipped`.
#[post("/cancel")]
async fn cancel(ctx: web::Data<RunContext>) -> HttpResponse {
    ctx.cancel.cancel();
    HttpResponse::Ok().body("cancellation requested")
}
