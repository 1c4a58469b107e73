//! Catalog of message templates
//!
//! Each record describes one closing scenario. Records flagged `externo`
//! additionally carry the labels the handoff workflow needs. Only the
//! fields the workflow reads are modelled; anything else in the source
//! document is ignored.

use std::cmp::Ordering;
use std::path::Path;

use action_flow::WorkflowParameters;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no catalog record with id '{0}'")]
    UnknownId(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Numeric or textual id; blank ids are treated as absent
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub titulo: String,
    #[serde(default)]
    pub etiqueta: Option<String>,
    /// Service label to select
    #[serde(default)]
    pub servico: Option<String>,
    /// Problem label to select
    #[serde(default)]
    pub etiqueta_externo: Option<String>,
    /// Record forces the wait-for-return switch on
    #[serde(default, deserialize_with = "lenient_flag")]
    pub aguardar: bool,
    /// Record routes to external support
    #[serde(default, deserialize_with = "lenient_flag")]
    pub externo: bool,
}

impl CatalogRecord {
    /// Map the record onto workflow inputs.
    ///
    /// Missing labels become empty strings so the executor reports them as a
    /// precondition failure. The operator can turn waiting on but never off
    /// when the record asks for it.
    pub fn parameters(&self, wait_override: bool) -> WorkflowParameters {
        WorkflowParameters::new(
            self.servico.clone().unwrap_or_default(),
            self.etiqueta_externo.clone().unwrap_or_default(),
            self.aguardar || wait_override,
        )
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(id)) if id.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(id)) => Ok(Some(id)),
        Some(serde_json::Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "catalog id must be a string or number, got {other}"
        ))),
    }
}

/// Flags are truthy rather than strictly boolean. Blank strings, `"0"`,
/// `"false"`, `"nao"`/`"não"`, zero and null read as false.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(flag)) => flag,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(serde_json::Value::String(text)) => !matches!(
            text.trim().to_lowercase().as_str(),
            "" | "0" | "false" | "nao" | "não"
        ),
        Some(_) => true,
    };
    Ok(flag)
}

/// Ordered catalog: records with an id first, in natural id order, then
/// records without one in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        let (mut with_id, without_id): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|record| record.id.is_some());
        with_id.sort_by(|a, b| {
            natural_cmp(
                a.id.as_deref().unwrap_or_default(),
                b.id.as_deref().unwrap_or_default(),
            )
        });
        with_id.extend(without_id);
        Self { records: with_id }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let records: Vec<CatalogRecord> = serde_json::from_str(raw)?;
        Ok(Self::new(records))
    }

    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json_str(&raw)
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Result<&CatalogRecord, CatalogError> {
        let wanted = id.trim();
        self.records
            .iter()
            .find(|record| record.id.as_deref() == Some(wanted))
            .ok_or_else(|| CatalogError::UnknownId(wanted.to_string()))
    }
}

/// Compare ids so that digit runs order by value ("2" < "10").
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let l_num = l_run.trim_start_matches('0');
                let r_num = r_run.trim_start_matches('0');
                let ordering = l_num
                    .len()
                    .cmp(&r_num.len())
                    .then_with(|| l_num.cmp(r_num));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = l.to_lowercase().cmp(r.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": "10", "titulo": "Sem sinal", "etiqueta": "SUPORTE", "servico": "Reparo",
         "etiqueta_externo": "Sem sinal", "aguardar": true, "externo": true},
        {"titulo": "Sem id", "externo": false},
        {"id": 2, "titulo": "Instalação", "servico": "Instalação",
         "etiqueta_externo": "Cliente novo", "externo": true},
        {"id": "", "titulo": "Id vazio"},
        {"id": "1", "titulo": "Dúvida"}
    ]"#;

    #[test]
    fn records_with_id_sort_naturally_before_the_rest() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        let titles: Vec<_> = catalog.records().iter().map(|r| r.titulo.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Dúvida", "Instalação", "Sem sinal", "Sem id", "Id vazio"]
        );
    }

    #[test]
    fn numeric_ids_are_found_as_text() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        let record = catalog.find("2").unwrap();
        assert_eq!(record.servico.as_deref(), Some("Instalação"));
        assert!(matches!(
            catalog.find("99"),
            Err(CatalogError::UnknownId(id)) if id == "99"
        ));
    }

    #[test]
    fn record_wait_flag_cannot_be_turned_off() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        let forced = catalog.find("10").unwrap();
        assert!(forced.parameters(false).wait_for_return);

        let optional = catalog.find("2").unwrap();
        assert!(!optional.parameters(false).wait_for_return);
        assert!(optional.parameters(true).wait_for_return);
    }

    #[test]
    fn missing_labels_map_to_empty_parameters() {
        let record = CatalogRecord {
            id: Some("7".into()),
            servico: Some("Instalação".into()),
            externo: true,
            ..Default::default()
        };
        let params = record.parameters(false);
        assert_eq!(params.problem_label, "");
        assert!(params.validate().is_err());
    }

    #[test]
    fn flags_accept_truthy_values() {
        let catalog = Catalog::from_json_str(
            r#"[
                {"id": 1, "aguardar": "sim", "externo": 1},
                {"id": 2, "aguardar": "false", "externo": "true"},
                {"id": 3, "aguardar": 0, "externo": null},
                {"id": 4, "aguardar": "", "externo": "Não"}
            ]"#,
        )
        .unwrap();
        let flags: Vec<_> = catalog
            .records()
            .iter()
            .map(|r| (r.aguardar, r.externo))
            .collect();
        assert_eq!(
            flags,
            vec![(true, true), (false, true), (false, false), (false, false)]
        );
        assert!(catalog.find("1").unwrap().parameters(false).wait_for_return);
    }

    #[test]
    fn natural_order_handles_mixed_ids() {
        let mut ids = vec!["10", "2", "1b", "1a", "002"];
        ids.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(ids, vec!["1a", "1b", "2", "002", "10"]);
    }
}
