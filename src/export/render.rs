use super::errors::ExportResult;
use crate::models::{ExportFormat, ExportRow, FeatureValue};
use serde_json::{Map, Value};

/// Incremental renderer shared by the sync path and the job runner.
///
/// Emits a header, one chunk per row, and a footer; callers append chunks to
/// a buffer or an artifact file. CSV quotes fields containing separators;
/// JSON renders an array of column-keyed objects.
pub struct Renderer {
    format: ExportFormat,
    columns: Vec<String>,
    rows_emitted: u64,
}

impl Renderer {
    pub fn new(format: ExportFormat, columns: Vec<String>) -> Self {
        Self {
            format,
            columns,
            rows_emitted: 0,
        }
    }

    pub fn header(&self) -> String {
        match self.format {
            ExportFormat::Csv => {
                let mut line = self
                    .columns
                    .iter()
                    .map(|c| csv_escape(c))
                    .collect::<Vec<_>>()
                    .join(",");
                line.push('\n');
                line
            }
            ExportFormat::Json => "[".to_string(),
        }
    }

    pub fn row(&mut self, row: &ExportRow) -> ExportResult<String> {
        let chunk = match self.format {
            ExportFormat::Csv => {
                let mut line = row
                    .values
                    .iter()
                    .map(csv_field)
                    .collect::<Vec<_>>()
                    .join(",");
                line.push('\n');
                line
            }
            ExportFormat::Json => {
                let mut object = Map::with_capacity(self.columns.len());
                for (column, value) in self.columns.iter().zip(row.values.iter()) {
                    object.insert(column.clone(), value.to_json());
                }
                let rendered = serde_json::to_string(&Value::Object(object))?;
                if self.rows_emitted == 0 {
                    format!("\n{rendered}")
                } else {
                    format!(",\n{rendered}")
                }
            }
        };
        self.rows_emitted += 1;
        Ok(chunk)
    }

    pub fn footer(&self) -> String {
        match self.format {
            ExportFormat::Csv => String::new(),
            ExportFormat::Json => "\n]".to_string(),
        }
    }
}

fn csv_field(value: &FeatureValue) -> String {
    match value {
        FeatureValue::String(s) => csv_escape(s),
        other => other.to_string(),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<FeatureValue>) -> ExportRow {
        ExportRow::new(values)
    }

    #[test]
    fn test_csv_rendering_escapes_separators() {
        let mut renderer = Renderer::new(
            ExportFormat::Csv,
            vec!["repo".into(), "msg".into(), "score".into()],
        );
        assert_eq!(renderer.header(), "repo,msg,score\n");

        let chunk = renderer
            .row(&row(vec![
                FeatureValue::String("acme/widgets".into()),
                FeatureValue::String("fix \"flaky\" test, again".into()),
                FeatureValue::Number(0.75),
            ]))
            .unwrap();
        assert_eq!(chunk, "acme/widgets,\"fix \"\"flaky\"\" test, again\",0.75\n");
        assert_eq!(renderer.footer(), "");
    }

    #[test]
    fn test_json_rendering_produces_valid_array() {
        let mut renderer = Renderer::new(ExportFormat::Json, vec!["ok".into(), "n".into()]);
        let mut out = renderer.header();
        out.push_str(
            &renderer
                .row(&row(vec![FeatureValue::Bool(true), FeatureValue::Number(1.0)]))
                .unwrap(),
        );
        out.push_str(
            &renderer
                .row(&row(vec![FeatureValue::Bool(false), FeatureValue::Null]))
                .unwrap(),
        );
        out.push_str(&renderer.footer());

        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["ok"], serde_json::json!(true));
        assert_eq!(parsed[1]["n"], serde_json::Value::Null);
    }

    #[test]
    fn test_empty_json_export_is_valid() {
        let renderer = Renderer::new(ExportFormat::Json, vec!["a".into()]);
        let out = format!("{}{}", renderer.header(), renderer.footer());
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_null_renders_as_empty_csv_field() {
        let mut renderer = Renderer::new(ExportFormat::Csv, vec!["a".into(), "b".into()]);
        let chunk = renderer
            .row(&row(vec![FeatureValue::Null, FeatureValue::Number(2.0)]))
            .unwrap();
        assert_eq!(chunk, ",2\n");
    }
}
