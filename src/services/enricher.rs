use std::sync::Arc;

use url::Url;

use crate::domain::{
    AnalysisResult, CompetitorInsights, GmbStatus, InputRow, OutputRow, ResearchError, RowStatus,
};
use crate::services::{
    clean_url, domain_rank, CompetitorSearch, DomainExclusionSet, OllamaClient, PageScraper,
};

/// Per-run switches for the optional stages.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Fallback search location when the extraction found none.
    pub location: String,
    pub search_pages: u32,
    pub competitor_insights: bool,
    pub gmb_check: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        EnrichOptions {
            location: "United States".to_string(),
            search_pages: 1,
            competitor_insights: false,
            gmb_check: false,
        }
    }
}

/// The whole pipeline for one row. `process_row` is infallible by
/// contract: every failure is absorbed into the returned OutputRow so one
/// bad domain can never take its batch down.
pub struct Enricher {
    scraper: PageScraper,
    analyzer: OllamaClient,
    search: CompetitorSearch,
    exclusions: Arc<DomainExclusionSet>,
}

impl Enricher {
    pub fn new(
        scraper: PageScraper,
        analyzer: OllamaClient,
        search: CompetitorSearch,
        exclusions: Arc<DomainExclusionSet>,
    ) -> Self {
        Enricher {
            scraper,
            analyzer,
            search,
            exclusions,
        }
    }

    pub async fn process_row(&self, row: InputRow, options: &EnrichOptions) -> OutputRow {
        let url = match clean_url(&row.domain) {
            Ok(url) => url,
            Err(e) => return OutputRow::failed(row, RowStatus::Skipped, e.to_string()),
        };
        let origin_host = Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| row.domain.clone());

        let analysis = self.extract_attributes(&url).await;

        let insights = if options.competitor_insights {
            let seed = analysis.as_ref().ok().cloned().unwrap_or_default();
            Some(self.competitor_stage(&seed, &origin_host, options).await)
        } else {
            None
        };
        let gmb = if options.gmb_check {
            Some(self.scraper.check_gmb(&url).await)
        } else {
            None
        };

        assemble(row, analysis, insights, gmb)
    }

    async fn extract_attributes(&self, url: &str) -> Result<AnalysisResult, ResearchError> {
        let page = self.scraper.scrape(url).await?;
        self.analyzer.analyze(&page, url).await
    }

    /// Search seeded by the top keyword (order is significant in the
    /// analysis contract), falling back to the first offering and finally
    /// the bare domain. Rank comes from the unfiltered list; competitors
    /// from the filtered one.
    async fn competitor_stage(
        &self,
        analysis: &AnalysisResult,
        origin_host: &str,
        options: &EnrichOptions,
    ) -> Result<CompetitorInsights, ResearchError> {
        let query = analysis
            .keywords
            .first()
            .or_else(|| analysis.products_services.first())
            .cloned()
            .unwrap_or_else(|| origin_host.to_string());
        let location = if analysis.location.is_empty() {
            options.location.clone()
        } else {
            analysis.location.clone()
        };

        let raw = self
            .search
            .search(&query, &location, options.search_pages)
            .await?;

        let rank = domain_rank(&raw, origin_host);
        let top = self.exclusions.filter(&raw, origin_host);
        if top.is_empty() {
            return Err(ResearchError::NoValidCompetitors);
        }

        Ok(CompetitorInsights {
            top_competitors: top,
            domain_rank: rank,
            gmb_status: None,
        })
    }
}

/// Fold the stage outcomes into one fully-populated row. Extraction
/// failure substitutes a zero-value analysis rather than leaving fields
/// absent, and is always a full `Error` since every downstream column
/// rides on it; a competitor-stage failure after a good extraction is a
/// `PartialError`. The GMB probe result is advisory and lands in the row
/// whatever the competitor stage did.
fn assemble(
    input: InputRow,
    analysis: Result<AnalysisResult, ResearchError>,
    insights: Option<Result<CompetitorInsights, ResearchError>>,
    gmb: Option<GmbStatus>,
) -> OutputRow {
    let mut failures = 0;
    let mut errors: Vec<String> = vec![];

    let extraction_failed = analysis.is_err();
    let analysis = match analysis {
        Ok(a) => a,
        Err(e) => {
            failures += 1;
            errors.push(format!("extraction: {}", e));
            AnalysisResult::default()
        }
    };

    let insights = match insights {
        None => None,
        Some(Ok(i)) => Some(i),
        Some(Err(e)) => {
            failures += 1;
            errors.push(format!("competitors: {}", e));
            None
        }
    };
    let insights = match (insights, gmb) {
        (Some(mut insights), gmb @ Some(_)) => {
            insights.gmb_status = gmb;
            Some(insights)
        }
        (None, Some(gmb)) => Some(CompetitorInsights {
            gmb_status: Some(gmb),
            ..CompetitorInsights::default()
        }),
        (insights, None) => insights,
    };

    let status = if failures == 0 {
        RowStatus::Success
    } else if !extraction_failed {
        RowStatus::PartialError
    } else {
        RowStatus::Error
    };

    OutputRow {
        input,
        analysis,
        insights,
        status,
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResultItem;

    fn stub_analysis() -> AnalysisResult {
        AnalysisResult {
            keywords: vec!["a".to_string(), "b".to_string()],
            business_name: "X".to_string(),
            products_services: vec!["p".to_string()],
            target_audience: vec![],
            location: "US".to_string(),
        }
    }

    #[test]
    fn stubbed_extraction_yields_fixed_width_success_row() {
        let row = assemble(InputRow::new("example.com"), Ok(stub_analysis()), None, None);

        assert_eq!(row.status, RowStatus::Success);
        assert!(row.error.is_none());

        let record = row.enrichment_record();
        assert_eq!(record[0], "X"); // Business Name
        assert_eq!(record[1], "US"); // Business Location
        assert_eq!(&record[2..7], ["a", "b", "", "", ""]); // Keyword 1..5
        assert_eq!(&record[7..10], ["p", "", ""]); // Product/Service 1..3
        assert_eq!(&record[10..13], ["", "", ""]); // Target Audience 1..3
        assert_eq!(record[record.len() - 2], "success");
    }

    #[test]
    fn extraction_failure_substitutes_zero_value_analysis() {
        let row = assemble(
            InputRow::new("example.com"),
            Err(ResearchError::EmptyContent("https://example.com".to_string())),
            None,
            None,
        );

        assert_eq!(row.status, RowStatus::Error);
        assert!(row.error.as_deref().unwrap().contains("no readable content"));
        assert_eq!(row.analysis, AnalysisResult::default());
        // Record stays indexable at full width.
        assert_eq!(
            row.enrichment_record().len(),
            OutputRow::enrichment_headers().len()
        );
    }

    #[test]
    fn competitor_failure_after_good_extraction_is_partial() {
        let row = assemble(
            InputRow::new("example.com"),
            Ok(stub_analysis()),
            Some(Err(ResearchError::NoValidCompetitors)),
            None,
        );

        assert_eq!(row.status, RowStatus::PartialError);
        assert!(row.error.as_deref().unwrap().contains("competitors"));
    }

    #[test]
    fn both_stages_failing_is_a_full_error() {
        let row = assemble(
            InputRow::new("example.com"),
            Err(ResearchError::Http(503)),
            Some(Err(ResearchError::NoResults)),
            None,
        );

        assert_eq!(row.status, RowStatus::Error);
    }

    #[test]
    fn extraction_failure_is_a_full_error_even_with_good_competitors() {
        let row = assemble(
            InputRow::new("example.com"),
            Err(ResearchError::EmptyContent("https://example.com".to_string())),
            Some(Ok(CompetitorInsights::default())),
            None,
        );

        assert_eq!(row.status, RowStatus::Error);
    }

    #[test]
    fn gmb_status_survives_a_failed_competitor_stage() {
        let row = assemble(
            InputRow::new("example.com"),
            Ok(stub_analysis()),
            Some(Err(ResearchError::NoResults)),
            Some(GmbStatus::Unknown),
        );

        assert_eq!(row.status, RowStatus::PartialError);
        let record = row.enrichment_record();
        assert_eq!(record[20], "N/A"); // GMB Status
    }

    #[test]
    fn successful_insights_land_in_the_record() {
        let insights = CompetitorInsights {
            top_competitors: vec![
                SearchResultItem {
                    link: "https://organicindia.com".to_string(),
                    position: Some(2),
                },
                SearchResultItem {
                    link: "https://teasource.com".to_string(),
                    position: Some(5),
                },
            ],
            domain_rank: Some(7),
            gmb_status: Some(crate::domain::GmbStatus::Yes),
        };
        let row = assemble(
            InputRow::new("example.com"),
            Ok(stub_analysis()),
            Some(Ok(insights)),
            None,
        );

        assert_eq!(row.status, RowStatus::Success);
        let record = row.enrichment_record();
        // Top Competitor 1..3 directly after the audience block.
        assert_eq!(&record[13..16], ["https://organicindia.com", "https://teasource.com", ""]);
        assert_eq!(&record[16..19], ["2", "5", ""]);
        assert_eq!(record[19], "7"); // Domain Rank
        assert_eq!(record[20], "Yes"); // GMB Status
    }
}
