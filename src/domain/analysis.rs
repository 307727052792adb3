use serde::{Deserialize, Serialize};

/// Structured marketing attributes for one domain. List fields are ordered
/// and significant: index 0 is the top keyword and seeds the competitor
/// search query. "None found" is the empty vector; fixed output widths are
/// applied only when the row is flattened to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub keywords: Vec<String>,
    pub business_name: String,
    pub products_services: Vec<String>,
    pub target_audience: Vec<String>,
    pub location: String,
}

/// The extraction service's JSON as it actually arrives: keys go missing,
/// and list fields come back either as JSON lists or as one comma-joined
/// string depending on the model's mood. Parse leniently, then fill.
#[derive(Debug, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    keywords: Option<ListOrString>,
    #[serde(default)]
    business_name: Option<String>,
    #[serde(default)]
    products_services: Option<ListOrString>,
    #[serde(default)]
    target_audience: Option<ListOrString>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListOrString {
    List(Vec<String>),
    Joined(String),
}

impl ListOrString {
    fn into_vec(self) -> Vec<String> {
        match self {
            ListOrString::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            ListOrString::Joined(s) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

impl From<RawAnalysis> for AnalysisResult {
    fn from(raw: RawAnalysis) -> Self {
        AnalysisResult {
            keywords: raw.keywords.map(ListOrString::into_vec).unwrap_or_default(),
            business_name: raw.business_name.unwrap_or_default().trim().to_string(),
            products_services: raw
                .products_services
                .map(ListOrString::into_vec)
                .unwrap_or_default(),
            target_audience: raw
                .target_audience
                .map(ListOrString::into_vec)
                .unwrap_or_default(),
            location: raw.location.unwrap_or_default().trim().to_string(),
        }
    }
}
