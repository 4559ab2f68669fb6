//! Output path templates.
//!
//! A template such as `{proto_path}/{proto_name}_pb2.py` names a file a
//! generator writes for each compiled `.proto` file. Templates are parsed when
//! the configuration is resolved, so a typo in a placeholder is reported
//! before protoc runs instead of turning into a bogus artifact path.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::path::normalize;

/// A template that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid output template {template:?}: {kind}")]
pub struct TemplateError {
    pub template: String,
    pub kind: TemplateErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateErrorKind {
    /// `{name}` where `name` is not a known placeholder.
    UnknownPlaceholder(String),
    /// A `{` with no matching `}`.
    Unclosed,
    /// A `}` with no preceding `{`.
    UnmatchedClose,
    /// The template is empty.
    Empty,
}

impl fmt::Display for TemplateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPlaceholder(name) => write!(
                f,
                "unknown placeholder {{{name}}} (expected {{proto_name}} or {{proto_path}})"
            ),
            Self::Unclosed => write!(f, "unclosed '{{'"),
            Self::UnmatchedClose => write!(f, "unmatched '}}'"),
            Self::Empty => write!(f, "template is empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `{proto_name}`: file name of the proto without its extension.
    ProtoName,
    /// `{proto_path}`: directory of the proto relative to its proto root.
    ProtoPath,
}

/// A parsed output template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl OutputTemplate {
    /// Parse a template, accepting only `{proto_name}` and `{proto_path}`.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let error = |kind| TemplateError {
            template: template.to_string(),
            kind,
        };

        if template.is_empty() {
            return Err(error(TemplateErrorKind::Empty));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(idx) = rest.find(['{', '}']) {
            let (before, after) = rest.split_at(idx);
            literal.push_str(before);

            if after.starts_with('}') {
                return Err(error(TemplateErrorKind::UnmatchedClose));
            }

            let close = after.find('}').ok_or_else(|| error(TemplateErrorKind::Unclosed))?;
            let name = &after[1..close];
            let segment = match name {
                "proto_name" => Segment::ProtoName,
                "proto_path" => Segment::ProtoPath,
                // `{a{b}` lands here too: the name contains the stray brace.
                other => {
                    if other.contains('{') {
                        return Err(error(TemplateErrorKind::Unclosed));
                    }
                    return Err(error(TemplateErrorKind::UnknownPlaceholder(
                        other.to_string(),
                    )));
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The template as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Expand the template for one proto file.
    ///
    /// `proto_path` is the directory of the proto relative to its root; an
    /// empty directory expands to `.` and the result is normalized, so a proto
    /// at the root of its search path yields `greeter_pb2.py` rather than
    /// `./greeter_pb2.py` or `/greeter_pb2.py`.
    pub fn expand(&self, proto_path: &Path, proto_name: &str) -> PathBuf {
        let proto_path = if proto_path.as_os_str().is_empty() {
            ".".into()
        } else {
            proto_path.to_string_lossy()
        };

        let mut expanded = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => expanded.push_str(text),
                Segment::ProtoName => expanded.push_str(proto_name),
                Segment::ProtoPath => expanded.push_str(&proto_path),
            }
        }
        normalize(Path::new(&expanded))
    }
}

impl fmt::Display for OutputTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::property_test;

    #[test]
    fn test_expand_nested_proto_path() {
        let template = OutputTemplate::parse("{proto_path}/{proto_name}_pb2.py").unwrap();
        assert_eq!(
            template.expand(Path::new("foo/bar"), "test"),
            PathBuf::from("foo/bar/test_pb2.py")
        );
    }

    #[test]
    fn test_expand_at_root() {
        let template = OutputTemplate::parse("{proto_path}/{proto_name}_pb2.pyi").unwrap();
        assert_eq!(
            template.expand(Path::new(""), "greeter"),
            PathBuf::from("greeter_pb2.pyi")
        );
        assert_eq!(
            template.expand(Path::new("."), "greeter"),
            PathBuf::from("greeter_pb2.pyi")
        );
    }

    #[test]
    fn test_placeholders_may_repeat() {
        let template = OutputTemplate::parse("docs/{proto_name}/{proto_name}.md").unwrap();
        assert_eq!(
            template.expand(Path::new("pkg"), "api"),
            PathBuf::from("docs/api/api.md")
        );
    }

    #[test]
    fn test_parse_errors() {
        #[track_caller]
        fn test_case(template: &str, kind: TemplateErrorKind) {
            let err = OutputTemplate::parse(template).unwrap_err();
            assert_eq!(err.kind, kind);
            assert_eq!(err.template, template);
        }

        test_case(
            "{proto_dir}/{proto_name}.py",
            TemplateErrorKind::UnknownPlaceholder("proto_dir".to_string()),
        );
        test_case("{}_pb2.py", TemplateErrorKind::UnknownPlaceholder(String::new()));
        test_case("{proto_name", TemplateErrorKind::Unclosed);
        test_case("{proto{proto_name}", TemplateErrorKind::Unclosed);
        test_case("proto_name}.py", TemplateErrorKind::UnmatchedClose);
        test_case("", TemplateErrorKind::Empty);
    }

    #[test]
    fn test_error_message_names_template() {
        let err = OutputTemplate::parse("{name}.py").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid output template \"{name}.py\": unknown placeholder {name} \
             (expected {proto_name} or {proto_path})"
        );
    }

    #[property_test]
    fn proptest_literal_templates_expand_to_themselves(name: String) {
        let literal = format!("out_{}", name.replace(['{', '}', '/', '\\', '.'], "x"));
        prop_assume!(!literal.contains('\0'));
        let template = OutputTemplate::parse(&literal).unwrap();
        prop_assert_eq!(template.expand(Path::new("ignored"), "ignored"), PathBuf::from(&literal));
    }
}
