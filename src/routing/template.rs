//! Path templates such as `/v1/users/{user_id}/keys/{key_id}`.
//!
//! Templates are compiled once when the route table is built. Matching walks
//! the request path segment by segment without allocating unless a variable
//! needs percent-decoding.

use std::borrow::Cow;
use std::fmt;

use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template {0:?} must start with '/'")]
    NotAbsolute(String),
    #[error("template {template:?} has an empty segment")]
    EmptySegment { template: String },
    #[error("template {template:?} has a malformed variable segment {segment:?}")]
    MalformedVariable { template: String, segment: String },
    #[error("template {template:?} declares variable '{name}' twice")]
    DuplicateVariable { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Box<str>),
    Variable(Box<str>),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: Box<str>,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Compile `template`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the template is relative, has an empty
    /// segment, a variable segment that is not exactly `{name}`, or declares
    /// the same variable twice.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(TemplateError::NotAbsolute(template.to_string()));
        };

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for segment in rest.split('/') {
                segments.push(parse_segment(template, segment)?);
            }
        }

        {
            let mut seen: SmallVec<[&str; 4]> = SmallVec::new();
            for segment in &segments {
                if let Segment::Variable(name) = segment {
                    if seen.contains(&name.as_ref()) {
                        return Err(TemplateError::DuplicateVariable {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    seen.push(name);
                }
            }
        }

        Ok(Self {
            raw: template.into(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of the declared variables, in path order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `path` against this template.
    ///
    /// Each variable binds exactly one non-empty segment, percent-decoded.
    /// A segment that does not decode to UTF-8 fails the match.
    #[must_use]
    pub fn matches<'a>(&'a self, path: &'a str, query: Option<&'a str>) -> Option<RouteMatch<'a>> {
        let rest = path.strip_prefix('/')?;
        let mut vars = SmallVec::new();

        if self.segments.is_empty() {
            return rest.is_empty().then_some(RouteMatch {
                vars,
                query,
            });
        }

        let mut parts = rest.split('/');
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if part != literal.as_ref() {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    let value = urlencoding::decode(part).ok()?;
                    vars.push((name.as_ref(), value));
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }

        Some(RouteMatch {
            vars,
            query,
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(template: &str, segment: &str) -> Result<Segment, TemplateError> {
    if segment.is_empty() {
        return Err(TemplateError::EmptySegment {
            template: template.to_string(),
        });
    }
    if let Some(inner) = segment.strip_prefix('{') {
        return match inner.strip_suffix('}') {
            Some(name) if is_variable_name(name) => Ok(Segment::Variable(name.into())),
            _ => Err(TemplateError::MalformedVariable {
                template: template.to_string(),
                segment: segment.to_string(),
            }),
        };
    }
    if segment.contains(['{', '}']) {
        return Err(TemplateError::MalformedVariable {
            template: template.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(Segment::Literal(segment.into()))
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Variables bound by a successful template match, plus the query string.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    vars: SmallVec<[(&'a str, Cow<'a, str>); 4]>,
    query: Option<&'a str>,
}

impl<'a> RouteMatch<'a> {
    /// Value bound to the template variable `name`.
    ///
    /// `None` when `name` is not declared by the matched template.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(declared, _)| *declared == name)
            .map(|(_, value)| value.as_ref())
    }

    /// First form-decoded value of query parameter `name`.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<Cow<'a, str>> {
        let query = self.query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}
