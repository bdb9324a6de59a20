use serde::{Deserialize, Deserializer, Serialize};

/// Label attached to a posting by the external evaluation step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Evaluation {
    #[default]
    Unrated,
    Perfect,
    Good,
    Maybe,
    Skip,
    Unknown(String),
}

impl Evaluation {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "" => Evaluation::Unrated,
            "perfect" => Evaluation::Perfect,
            "good" => Evaluation::Good,
            "maybe" => Evaluation::Maybe,
            "skip" => Evaluation::Skip,
            _ => Evaluation::Unknown(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Evaluation::Unrated => "",
            Evaluation::Perfect => "perfect",
            Evaluation::Good => "good",
            Evaluation::Maybe => "maybe",
            Evaluation::Skip => "skip",
            Evaluation::Unknown(label) => label.as_str(),
        }
    }
}

impl From<Option<String>> for Evaluation {
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .map(Evaluation::from_label)
            .unwrap_or(Evaluation::Unrated)
    }
}

impl From<Evaluation> for String {
    fn from(value: Evaluation) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub link: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub company: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default)]
    pub evaluation: Evaluation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub created_at: String,
}

impl JobRecord {
    pub fn has_link(&self) -> bool {
        !self.link.is_empty()
    }

    pub fn identifier(&self) -> &str {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(self.link.as_str())
    }

    /// The evaluator's annotation, ignoring the literal `"None"` placeholder.
    pub fn note(&self) -> Option<&str> {
        self.skip_reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty() && *reason != "None")
    }

    pub fn note_label(&self) -> &'static str {
        if self.evaluation == Evaluation::Skip {
            "Skip Reason"
        } else {
            "Note"
        }
    }
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
pub(crate) fn job(link: &str, title: &str, company: &str) -> JobRecord {
    JobRecord {
        id: None,
        link: link.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        description: String::new(),
        evaluation: Evaluation::Unrated,
        skip_reason: None,
        created_at: String::new(),
    }
}
