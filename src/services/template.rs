//! Naming templates for destination paths.
//!
//! Templates use `{variable}` placeholders with optional printf-like
//! zero-padding, e.g. `{season:02d}`. Formatting is pure; filesystem
//! sanitization lives here too so every produced segment is safe on both
//! POSIX and Windows.

use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;
use thiserror::Error;

static VARIABLE_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

const VALID_VARIABLES: &[&str] = &[
    "title",
    "original_title",
    "year",
    "season",
    "episode",
    "episode_title",
    "air_date",
    "tmdb_id",
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template cannot be empty")]
    Empty,

    #[error("Invalid variables: {0}")]
    UnknownVariables(String),

    #[error("Invalid format spec '{spec}' for variable '{variable}'")]
    BadFormatSpec { variable: String, spec: String },
}

/// Values available to naming templates. Absent optionals interpolate as
/// empty strings; the artifacts that leaves behind (` ()`, ` [tmdbid-]`)
/// are removed by [`strip_empty_artifacts`].
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub season: i32,
    pub episode: i32,
    pub episode_title: Option<String>,
    pub air_date: Option<String>,
    pub tmdb_id: Option<i64>,
}

impl TemplateValues {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "title" => Some(self.title.clone()),
            "original_title" => Some(
                self.original_title
                    .clone()
                    .unwrap_or_else(|| self.title.clone()),
            ),
            "year" => Some(self.year.map(|y| y.to_string()).unwrap_or_default()),
            "season" => Some(self.season.to_string()),
            "episode" => Some(self.episode.to_string()),
            "episode_title" => Some(self.episode_title.clone().unwrap_or_default()),
            "air_date" => Some(self.air_date.clone().unwrap_or_default()),
            "tmdb_id" => Some(self.tmdb_id.map(|id| id.to_string()).unwrap_or_default()),
            _ => None,
        }
    }

    fn lookup_numeric(&self, name: &str) -> Option<i64> {
        match name {
            "season" => Some(i64::from(self.season)),
            "episode" => Some(i64::from(self.episode)),
            "year" => self.year.map(i64::from),
            "tmdb_id" => self.tmdb_id,
            _ => None,
        }
    }
}

fn variable_re() -> &'static Regex {
    get(&VARIABLE_RE, r"\{(\w+)(?::([^}]+))?\}")
}

fn get(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Lists the distinct variables referenced by a template, in order.
#[must_use]
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in variable_re().captures_iter(template) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

pub fn validate_template(template: &str) -> Result<Vec<String>, TemplateError> {
    if template.trim().is_empty() {
        return Err(TemplateError::Empty);
    }

    let variables = extract_variables(template);
    let unknown: Vec<&String> = variables
        .iter()
        .filter(|v| !VALID_VARIABLES.contains(&v.as_str()))
        .collect();

    if unknown.is_empty() {
        Ok(variables)
    } else {
        let names = unknown
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(TemplateError::UnknownVariables(names))
    }
}

/// Formats a template with the given values. Format specs are the
/// printf-like subset the naming defaults use: `{season:02d}` zero-pads to
/// the requested width.
pub fn format_template(template: &str, values: &TemplateValues) -> Result<String, TemplateError> {
    validate_template(template)?;

    let mut output = String::with_capacity(template.len());
    let mut last_end = 0;

    for caps in variable_re().captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        output.push_str(&template[last_end..whole.start()]);
        last_end = whole.end();

        let name = &caps[1];
        match caps.get(2) {
            None => {
                // Unknown names were rejected by validation above.
                output.push_str(&values.lookup(name).unwrap_or_default());
            }
            Some(spec) => {
                let rendered = format_with_spec(name, spec.as_str(), values)?;
                output.push_str(&rendered);
            }
        }
    }

    output.push_str(&template[last_end..]);
    Ok(output)
}

fn format_with_spec(
    name: &str,
    spec: &str,
    values: &TemplateValues,
) -> Result<String, TemplateError> {
    let bad = || TemplateError::BadFormatSpec {
        variable: name.to_string(),
        spec: spec.to_string(),
    };

    let digits = spec.strip_suffix('d').ok_or_else(bad)?;
    let zero_pad = digits.starts_with('0');
    let width: usize = digits.trim_start_matches('0').parse().or_else(|_| {
        if digits.chars().all(|c| c == '0') && !digits.is_empty() {
            Ok(digits.len())
        } else {
            Err(bad())
        }
    })?;

    let value = values.lookup_numeric(name).unwrap_or_default();

    let mut out = String::new();
    if zero_pad {
        let _ = write!(out, "{value:0width$}");
    } else {
        let _ = write!(out, "{value:width$}");
    }
    Ok(out)
}

/// Removes characters that are invalid in filenames, collapses whitespace
/// and trims leading/trailing spaces and dots. Idempotent.
#[must_use]
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();

    let collapsed = get(&WHITESPACE_RE, r"\s+").replace_all(&cleaned, " ");
    collapsed.trim_matches([' ', '.']).to_string()
}

/// Drops the literal artifacts empty interpolation leaves in folder names:
/// ` ()` when the year is absent and ` [tmdbid-]` when the id is absent.
#[must_use]
pub fn strip_empty_artifacts(segment: &str) -> String {
    segment.replace(" ()", "").replace(" [tmdbid-]", "")
}
