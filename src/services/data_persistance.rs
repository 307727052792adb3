use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::{InputRow, OutputRow};

/// Read the input table. `Domain` is required (case-insensitive header
/// match), `Email ID` is recognized when present, and every other column
/// rides along untouched so the output mirrors the input.
pub fn read_input_rows(path: &Path) -> Result<Vec<InputRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    let headers = reader.headers().context("failed to read CSV headers")?.clone();

    let domain_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("domain"))
        .context("input file must have a 'Domain' column")?;
    let email_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("email id"));

    let mut rows = vec![];
    for record in reader.records() {
        let record = record.context("failed to read CSV record")?;
        let domain = record.get(domain_idx).unwrap_or("").trim().to_string();
        let email = email_idx
            .and_then(|i| record.get(i))
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let extra_columns = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != domain_idx && Some(*i) != email_idx)
            .map(|(i, name)| {
                (
                    name.trim().to_string(),
                    record.get(i).unwrap_or("").to_string(),
                )
            })
            .collect();

        rows.push(InputRow {
            domain,
            email,
            extra_columns,
        });
    }
    Ok(rows)
}

/// Write the output table: input columns first, then the fixed-width
/// enrichment columns. Also used for intermediate snapshots, so it always
/// produces a complete, readable file for whatever rows it is given.
pub fn write_output_rows(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;

    let extra_names: Vec<String> = rows
        .first()
        .map(|r| {
            r.input
                .extra_columns
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default();

    let mut header = vec!["Domain".to_string(), "Email ID".to_string()];
    header.extend(extra_names.clone());
    header.extend(OutputRow::enrichment_headers());
    writer.write_record(&header).context("failed to write header")?;

    for row in rows {
        let mut record = vec![
            row.input.domain.clone(),
            row.input.email.clone().unwrap_or_default(),
        ];
        for name in &extra_names {
            let value = row
                .input
                .extra_columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            record.push(value);
        }
        record.extend(row.enrichment_record());
        writer.write_record(&record).context("failed to write record")?;
    }

    writer.flush().context("failed to flush output file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisResult, RowStatus};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_domain_email_and_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(
            &path,
            "Domain,Email ID,Keyword 1\nacmetea.com,owner@acmetea.com,green tea\nteasource.com,,\n",
        )
        .unwrap();

        let rows = read_input_rows(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].domain, "acmetea.com");
        assert_eq!(rows[0].email.as_deref(), Some("owner@acmetea.com"));
        assert_eq!(
            rows[0].extra_columns,
            vec![("Keyword 1".to_string(), "green tea".to_string())]
        );
        assert_eq!(rows[1].email, None);
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "domain\nacmetea.com\n").unwrap();

        let rows = read_input_rows(&path).unwrap();
        assert_eq!(rows[0].domain, "acmetea.com");
    }

    #[test]
    fn missing_domain_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "Website,Email ID\nacmetea.com,\n").unwrap();

        assert!(read_input_rows(&path).is_err());
    }

    #[test]
    fn output_mirrors_input_and_appends_fixed_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let row = OutputRow {
            input: InputRow {
                domain: "acmetea.com".to_string(),
                email: Some("owner@acmetea.com".to_string()),
                extra_columns: vec![("Notes".to_string(), "priority lead".to_string())],
            },
            analysis: AnalysisResult {
                keywords: vec!["organic green tea".to_string()],
                business_name: "Acme Tea".to_string(),
                products_services: vec![],
                target_audience: vec![],
                location: "Portland".to_string(),
            },
            insights: None,
            status: RowStatus::Success,
            error: None,
        };
        write_output_rows(&path, &[row]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        let record = lines.next().unwrap();

        assert!(header.starts_with("Domain,Email ID,Notes,Business Name,Business Location,Keyword 1"));
        assert!(header.ends_with("Domain Rank,GMB Status,Status,Error"));
        assert!(record.starts_with("acmetea.com,owner@acmetea.com,priority lead,Acme Tea,Portland,organic green tea"));
        assert!(record.contains("success"));
    }

    #[test]
    fn round_trip_preserves_row_count_and_order() {
        let dir = TempDir::new().unwrap();
        let input_path = dir.path().join("in.csv");
        let output_path = dir.path().join("out.csv");
        fs::write(&input_path, "Domain\nfirst.com\nsecond.com\nthird.com\n").unwrap();

        let rows = read_input_rows(&input_path).unwrap();
        let outputs: Vec<OutputRow> = rows
            .into_iter()
            .map(|r| OutputRow::failed(r, RowStatus::Skipped, "not processed"))
            .collect();
        write_output_rows(&output_path, &outputs).unwrap();

        let reread = fs::read_to_string(&output_path).unwrap();
        let domains: Vec<&str> = reread
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(domains, vec!["first.com", "second.com", "third.com"]);
    }
}
