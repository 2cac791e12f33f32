//! Placeholder templates: `{name}` and `{name:format_spec}` substitution.
//!
//! Rendering is a single textual pass in the style of Python's `str.format`;
//! `{{` and `}}` produce literal braces. There are no conditionals or loops.

use gs_types::{ConfigurationError, FormatSpec, JobError, TemplateError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::space::{AuxiliaryValues, GridPoint};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field {
        name: String,
        raw_spec: Option<String>,
        spec: Option<FormatSpec>,
    },
}

/// A parsed template. Parsing happens once, before any grid point is rendered,
/// so syntax errors surface as setup errors rather than per-job failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    label: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text. `label` names the template in error messages.
    pub fn parse(label: impl Into<String>, text: &str) -> Result<Self, TemplateError> {
        let label = label.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(syntax(&label, pos, "single '}' encountered")),
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for (inner_pos, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(syntax(
                                    &label,
                                    inner_pos,
                                    "nested placeholders are not supported",
                                ))
                            }
                            _ => field.push(inner),
                        }
                    }
                    if !closed {
                        return Err(syntax(&label, pos, "expected '}' before end of string"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_field(&label, pos, &field)?);
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { label, segments })
    }

    /// Load and parse a template file. A missing or unreadable file is fatal
    /// for the whole sweep.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::MissingFile {
                role: "template".to_string(),
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(format!("template '{}'", path.display()), &text)?)
    }

    /// Placeholder names in order of appearance (may repeat).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder from `point`, falling back to `aux`.
    pub fn render(&self, point: &GridPoint, aux: &AuxiliaryValues) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    name,
                    raw_spec,
                    spec,
                } => {
                    let value =
                        aux.lookup(point, name)
                            .ok_or_else(|| TemplateError::MissingParameter {
                                name: name.clone(),
                                source_label: self.label.clone(),
                            })?;
                    match spec {
                        None => out.push_str(&value.to_string()),
                        Some(spec) => {
                            let formatted = spec.apply(value).map_err(|e| {
                                TemplateError::IncompatibleFormat {
                                    name: name.clone(),
                                    spec: raw_spec.clone().unwrap_or_default(),
                                    value: value.to_string(),
                                    message: e.to_string(),
                                }
                            })?;
                            out.push_str(&formatted);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Render to `path`. The file is written in full or not at all: rendering
    /// completes in memory first, then a temporary file in the target
    /// directory is persisted over `path`.
    pub fn render_to_file(
        &self,
        point: &GridPoint,
        aux: &AuxiliaryValues,
        path: &Path,
    ) -> Result<(), JobError> {
        let text = self.render(point, aux).map_err(JobError::Render)?;
        write_atomically(path, &text).map_err(|source| JobError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_field(label: &str, pos: usize, field: &str) -> Result<Segment, TemplateError> {
    let (name, raw_spec) = match field.split_once(':') {
        Some((name, spec)) => (name, Some(spec)),
        None => (field, None),
    };

    if name.is_empty() {
        return Err(syntax(label, pos, "positional placeholders are not supported"));
    }
    if name.contains('!') {
        return Err(syntax(label, pos, "conversion flags are not supported"));
    }

    let spec = match raw_spec {
        Some(raw) if !raw.is_empty() => {
            Some(
                FormatSpec::parse(raw).map_err(|e| TemplateError::InvalidFormatSpec {
                    name: name.to_string(),
                    spec: raw.to_string(),
                    message: e.to_string(),
                })?,
            )
        }
        _ => None,
    };

    Ok(Segment::Field {
        name: name.to_string(),
        raw_spec: raw_spec.map(str::to_string),
        spec,
    })
}

fn syntax(label: &str, position: usize, message: &str) -> TemplateError {
    TemplateError::Syntax {
        source_label: label.to_string(),
        position,
        message: message.to_string(),
    }
}

fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir: PathBuf = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
