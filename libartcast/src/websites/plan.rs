//! Post plans: pure-data request sequences built by adapters
//!
//! Instead of fetching and posting inline, an adapter describes what must
//! happen as an ordered list of steps. A `Fetch` step scrapes named values
//! (anti-CSRF tokens, dynamic field names) out of a page; a `Submit` step
//! sends the actual payload, with fields that may reference earlier
//! captures or the submission's files. The orchestrator executes, logs,
//! and retries the whole plan as one unit.

/// The request sequence for one post attempt.
#[derive(Debug, Clone, Default)]
pub struct PostPlan {
    pub steps: Vec<PlanStep>,
}

impl PostPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prerequisite page fetch whose body is scraped for
    /// `captures`.
    pub fn fetch(mut self, url: impl Into<String>, captures: Vec<FormCapture>) -> Self {
        self.steps.push(PlanStep::Fetch {
            url: url.into(),
            captures,
        });
        self
    }

    /// Append the payload submission.
    pub fn submit(
        mut self,
        url: impl Into<String>,
        encoding: PayloadEncoding,
        fields: Vec<PlanField>,
    ) -> Self {
        self.steps.push(PlanStep::Submit {
            url: url.into(),
            encoding,
            fields,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub enum PlanStep {
    Fetch {
        url: String,
        captures: Vec<FormCapture>,
    },
    Submit {
        url: String,
        encoding: PayloadEncoding,
        fields: Vec<PlanField>,
    },
}

/// How a `Submit` step's fields are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    UrlEncodedForm,
    MultipartForm,
    Json,
}

/// A named value scraped from a fetched page. `pattern` is a regex whose
/// first capture group is the value; it is compiled by the executor, so
/// the plan itself stays plain data.
#[derive(Debug, Clone)]
pub struct FormCapture {
    pub name: String,
    pub pattern: String,
}

impl FormCapture {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    /// Capture the value of a hidden `<input>` by its name attribute,
    /// the common anti-CSRF shape.
    pub fn hidden_input(name: &str) -> Self {
        Self::new(
            name,
            format!(
                r#"<input[^>]*name="{}"[^>]*value="([^"]*)""#,
                regex::escape(name)
            ),
        )
    }
}

/// One field of a `Submit` step.
#[derive(Debug, Clone)]
pub struct PlanField {
    pub name: String,
    pub value: FieldValue,
}

impl PlanField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    /// A value captured by an earlier `Fetch` step, referenced by capture
    /// name.
    pub fn captured(name: impl Into<String>, capture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Captured(capture.into()),
        }
    }

    pub fn primary_file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File(FileRef::Primary),
        }
    }

    pub fn additional_file(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File(FileRef::Additional(index)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    /// Resolved from the capture map at execution time
    Captured(String),
    /// Resolved from the submission's files at execution time
    File(FileRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRef {
    Primary,
    Additional(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_builder_orders_steps() {
        let plan = PostPlan::new()
            .fetch(
                "https://example.com/new",
                vec![FormCapture::hidden_input("token")],
            )
            .submit(
                "https://example.com/create",
                PayloadEncoding::MultipartForm,
                vec![PlanField::captured("token", "token")],
            );

        assert_eq!(plan.steps.len(), 2);
        assert!(matches!(plan.steps[0], PlanStep::Fetch { .. }));
        assert!(matches!(plan.steps[1], PlanStep::Submit { .. }));
    }

    #[test]
    fn test_hidden_input_pattern_matches_markup() {
        let capture = FormCapture::hidden_input("authenticity_token");
        let re = Regex::new(&capture.pattern).unwrap();
        let page = r#"<form><input type="hidden" name="authenticity_token" value="tok123"></form>"#;

        let value = re.captures(page).unwrap().get(1).unwrap().as_str();
        assert_eq!(value, "tok123");
    }

    #[test]
    fn test_hidden_input_pattern_escapes_name() {
        let capture = FormCapture::hidden_input("image[token]");
        let re = Regex::new(&capture.pattern).unwrap();
        let page = r#"<input name="image[token]" value="v">"#;
        assert_eq!(re.captures(page).unwrap().get(1).unwrap().as_str(), "v");
    }
}
