use serde::Serialize;

use crate::domain::{AnalysisResult, RawAnalysis, ResearchError};
use crate::services::page_scraper::ScrapedPage;

/// Characters of page text handed to the model. Anything past this adds
/// latency without improving the extraction.
const CONTENT_LIMIT: usize = 4000;

const ANALYSIS_PROMPT: &str = r#"Analyze the website content as a marketing expert and extract detailed information in JSON format.
Only respond with the JSON, no other text.

Required format:
{
    "keywords": ["keyword one", "keyword two", "keyword three", "keyword four", "keyword five"],
    "business_name": "string",
    "products_services": ["offering one", "offering two", "offering three"],
    "target_audience": ["audience segment one", "audience segment two"],
    "location": "string"
}

Focus on long-tail, specific product/service keywords (3-4 words each), the
exact business name, and a concrete audience description. Use the city or
region the business serves for "location", or an empty string if unknown.
"#;

/// Client for the attribute-extraction service. The service itself is a
/// black box reachable over HTTP; this client only shapes the request and
/// makes the streamed response safe to consume.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    format: &'a str,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, temperature: f32) -> Self {
        OllamaClient {
            client: reqwest::Client::new(),
            base_url,
            model,
            temperature,
        }
    }

    /// Send page text through the model and parse the structured result.
    /// Missing keys come back as empty defaults; a response with no JSON
    /// object at all is a `Parse` error for the caller to absorb.
    pub async fn analyze(
        &self,
        page: &ScrapedPage,
        url: &str,
    ) -> Result<AnalysisResult, ResearchError> {
        let content: String = page.content.chars().take(CONTENT_LIMIT).collect();
        let prompt = format!(
            "{}\nWebsite URL: {}\nTitle: {}\nDescription: {}\nContent to analyze:\n{}",
            ANALYSIS_PROMPT, url, page.title, page.meta_description, content
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            temperature: self.temperature,
            format: "json",
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let full_response = concat_stream_chunks(&body);
        let object = extract_json_object(&full_response).ok_or_else(|| {
            ResearchError::Parse("no JSON object in extraction response".to_string())
        })?;

        let raw: RawAnalysis = serde_json::from_str(object)
            .map_err(|e| ResearchError::Parse(format!("extraction JSON: {}", e)))?;
        Ok(AnalysisResult::from(raw))
    }
}

/// The service streams newline-delimited JSON chunks; the model text lives
/// in each chunk's "response" field. Unparseable lines are skipped rather
/// than failing the whole response.
fn concat_stream_chunks(body: &str) -> String {
    let mut full = String::new();
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(chunk) => {
                if let Some(text) = chunk.get("response").and_then(|r| r.as_str()) {
                    full.push_str(text);
                }
            }
            Err(e) => log::debug!("skipping malformed stream chunk: {}", e),
        }
    }
    full
}

/// First balanced `{...}` substring, string-literal aware so braces inside
/// quoted values do not unbalance the scan.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_response_fields_across_chunks() {
        let body = concat_stream_chunks(
            "{\"response\": \"{\\\"business\"}\n{\"response\": \"_name\\\": \\\"Acme\\\"}\"}\n{\"done\": true}",
        );
        assert_eq!(body, "{\"business_name\": \"Acme\"}");
    }

    #[test]
    fn malformed_chunks_are_skipped() {
        let body = concat_stream_chunks("not json\n{\"response\": \"ok\"}\n");
        assert_eq!(body, "ok");
    }

    #[test]
    fn extracts_first_balanced_object() {
        let text = "Here you go: {\"a\": {\"b\": 1}} trailing {\"c\": 2}";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn braces_inside_strings_do_not_unbalance() {
        let text = r#"{"note": "curly } inside", "n": 1}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn unterminated_object_yields_none() {
        assert_eq!(extract_json_object("{\"a\": 1"), None);
        assert_eq!(extract_json_object("no object here"), None);
    }

    #[test]
    fn parsed_object_round_trips_into_analysis() {
        let text = r#"{"keywords": ["a", "b"], "business_name": "X", "products_services": ["p"], "target_audience": [], "location": "US"}"#;
        let object = extract_json_object(text).unwrap();
        let raw: RawAnalysis = serde_json::from_str(object).unwrap();
        let analysis = AnalysisResult::from(raw);

        assert_eq!(analysis.keywords, vec!["a", "b"]);
        assert_eq!(analysis.business_name, "X");
        assert_eq!(analysis.products_services, vec!["p"]);
        assert!(analysis.target_audience.is_empty());
        assert_eq!(analysis.location, "US");
    }
}
