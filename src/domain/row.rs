use crate::domain::analysis::AnalysisResult;
use crate::domain::search_result::SearchResultItem;

pub const KEYWORD_WIDTH: usize = 5;
pub const PRODUCT_WIDTH: usize = 3;
pub const AUDIENCE_WIDTH: usize = 3;
pub const COMPETITOR_WIDTH: usize = 3;

/// One unit of work, immutable once read from the input file. Columns the
/// pipeline does not understand ride along untouched in `extra_columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    pub domain: String,
    pub email: Option<String>,
    pub extra_columns: Vec<(String, String)>,
}

impl InputRow {
    pub fn new(domain: impl Into<String>) -> Self {
        InputRow {
            domain: domain.into(),
            email: None,
            extra_columns: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowStatus {
    Success,
    PartialError,
    Error,
    Skipped,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Success => "success",
            RowStatus::PartialError => "partial_error",
            RowStatus::Error => "error",
            RowStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GmbStatus {
    Yes,
    No,
    Unknown,
}

impl GmbStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GmbStatus::Yes => "Yes",
            GmbStatus::No => "No",
            GmbStatus::Unknown => "N/A",
        }
    }
}

/// Competitive-intelligence signals for one row. `top_competitors` is the
/// filtered list, at most three entries, still in backend rank order.
#[derive(Debug, Clone, Default)]
pub struct CompetitorInsights {
    pub top_competitors: Vec<SearchResultItem>,
    pub domain_rank: Option<u32>,
    pub gmb_status: Option<GmbStatus>,
}

/// One output row per input row, always fully populated: a failed row keeps
/// its zero-value analysis and carries the error text instead of vanishing.
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub input: InputRow,
    pub analysis: AnalysisResult,
    pub insights: Option<CompetitorInsights>,
    pub status: RowStatus,
    pub error: Option<String>,
}

impl OutputRow {
    pub fn failed(input: InputRow, status: RowStatus, error: impl Into<String>) -> Self {
        OutputRow {
            input,
            analysis: AnalysisResult::default(),
            insights: None,
            status,
            error: Some(error.into()),
        }
    }

    /// Header names for the enrichment columns, in record order.
    pub fn enrichment_headers() -> Vec<String> {
        let mut headers = vec![
            "Business Name".to_string(),
            "Business Location".to_string(),
        ];
        for i in 1..=KEYWORD_WIDTH {
            headers.push(format!("Keyword {}", i));
        }
        for i in 1..=PRODUCT_WIDTH {
            headers.push(format!("Product/Service {}", i));
        }
        for i in 1..=AUDIENCE_WIDTH {
            headers.push(format!("Target Audience {}", i));
        }
        for i in 1..=COMPETITOR_WIDTH {
            headers.push(format!("Top Competitor {}", i));
        }
        for i in 1..=COMPETITOR_WIDTH {
            headers.push(format!("Serp Rank {}", i));
        }
        headers.push("Domain Rank".to_string());
        headers.push("GMB Status".to_string());
        headers.push("Status".to_string());
        headers.push("Error".to_string());
        headers
    }

    /// Flatten the enrichment fields to fixed-width columns. Downstream
    /// consumers index these by position, so the width never varies with
    /// how many entries the extraction service actually returned.
    pub fn enrichment_record(&self) -> Vec<String> {
        let mut record = vec![
            self.analysis.business_name.clone(),
            self.analysis.location.clone(),
        ];
        record.extend(pad(&self.analysis.keywords, KEYWORD_WIDTH));
        record.extend(pad(&self.analysis.products_services, PRODUCT_WIDTH));
        record.extend(pad(&self.analysis.target_audience, AUDIENCE_WIDTH));

        let insights = self.insights.clone().unwrap_or_default();
        let competitors: Vec<String> = insights
            .top_competitors
            .iter()
            .map(|c| c.link.clone())
            .collect();
        record.extend(pad(&competitors, COMPETITOR_WIDTH));
        let ranks: Vec<String> = insights
            .top_competitors
            .iter()
            .map(|c| c.position.map(|p| p.to_string()).unwrap_or_default())
            .collect();
        record.extend(pad(&ranks, COMPETITOR_WIDTH));
        record.push(
            insights
                .domain_rank
                .map(|r| r.to_string())
                .unwrap_or_default(),
        );
        record.push(
            insights
                .gmb_status
                .map(|g| g.as_str().to_string())
                .unwrap_or_default(),
        );
        record.push(self.status.as_str().to_string());
        record.push(self.error.clone().unwrap_or_default());
        record
    }
}

fn pad(values: &[String], width: usize) -> Vec<String> {
    let mut out: Vec<String> = values.iter().take(width).cloned().collect();
    out.resize(width, String::new());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(keywords: &[&str], products: &[&str], audience: &[&str]) -> AnalysisResult {
        AnalysisResult {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            business_name: "X".to_string(),
            products_services: products.iter().map(|s| s.to_string()).collect(),
            target_audience: audience.iter().map(|s| s.to_string()).collect(),
            location: "US".to_string(),
        }
    }

    #[test]
    fn record_width_is_fixed_regardless_of_list_lengths() {
        let widths = [
            (vec![], vec![], vec![]),
            (vec!["a", "b"], vec!["p"], vec!["t1", "t2"]),
            (
                vec!["a", "b", "c", "d", "e", "f", "g", "h"],
                vec!["p1", "p2", "p3", "p4"],
                vec!["t1", "t2", "t3", "t4"],
            ),
        ];

        let expected_len = OutputRow::enrichment_headers().len();
        for (keywords, products, audience) in widths {
            let row = OutputRow {
                input: InputRow::new("example.com"),
                analysis: analysis(&keywords, &products, &audience),
                insights: None,
                status: RowStatus::Success,
                error: None,
            };
            assert_eq!(row.enrichment_record().len(), expected_len);
        }
    }

    #[test]
    fn lists_pad_and_truncate_to_fixed_widths() {
        let row = OutputRow {
            input: InputRow::new("example.com"),
            analysis: analysis(&["a", "b"], &["p"], &[]),
            insights: None,
            status: RowStatus::Success,
            error: None,
        };
        let record = row.enrichment_record();

        // Business Name, Business Location, then Keyword 1..5
        assert_eq!(record[0], "X");
        assert_eq!(record[1], "US");
        assert_eq!(&record[2..7], ["a", "b", "", "", ""]);
        assert_eq!(&record[7..10], ["p", "", ""]);
        assert_eq!(&record[10..13], ["", "", ""]);
        assert_eq!(record[record.len() - 2], "success");
    }

    #[test]
    fn truncation_keeps_leading_entries() {
        let row = OutputRow {
            input: InputRow::new("example.com"),
            analysis: analysis(&["k1", "k2", "k3", "k4", "k5", "k6", "k7", "k8"], &[], &[]),
            insights: None,
            status: RowStatus::Success,
            error: None,
        };
        let record = row.enrichment_record();

        assert_eq!(&record[2..7], ["k1", "k2", "k3", "k4", "k5"]);
    }

    #[test]
    fn failed_row_keeps_zero_value_analysis() {
        let row = OutputRow::failed(
            InputRow::new("bad domain"),
            RowStatus::Error,
            "no readable content",
        );
        let record = row.enrichment_record();

        assert_eq!(record.len(), OutputRow::enrichment_headers().len());
        assert_eq!(record[record.len() - 2], "error");
        assert_eq!(record[record.len() - 1], "no readable content");
    }
}
