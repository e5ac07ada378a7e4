//! Type-checker diagnostics and the patterns that turn them into work.
//!
//! The patcher depends on the exact wording the Go compiler uses for two
//! errors. Both patterns live here so an upstream wording change is a
//! one-place fix:
//!
//! - `not enough arguments in call to x.Foo` names a call site that lost an
//!   argument when `Foo` gained the marker parameter.
//! - `*T does not implement I (wrong type for method Foo) ... want
//!   Foo(context.Context, ...)` names a method on `T` that no longer
//!   satisfies an interface that gained the marker parameter.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::config::MarkerConfig;

lazy_static! {
    /// `not enough arguments in call to <selector>.<Name>`
    static ref NOT_ENOUGH_ARGUMENTS: Regex =
        Regex::new(r"not enough arguments in call to [\w.]+\b\.(\w+)").unwrap();

    /// `path/to/file.go:12:4: message`, optionally prefixed by `vet: `.
    static ref LOCATED_LINE: Regex =
        Regex::new(r"^(?:vet: )?(\S+?\.go):(\d+)(?::(\d+))?: (.*)$").unwrap();
}

/// Where a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

/// One message from the type-checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Full message, continuation lines joined with `\n`.
    pub message: String,
    pub position: Option<Position>,
}

impl Diagnostic {
    /// A diagnostic without a position.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }
}

/// Parse compiler output into diagnostics.
///
/// `# pkg` headers are dropped, tab-indented lines continue the previous
/// diagnostic, and relative file paths are resolved against `base`.
pub fn parse_output(output: &str, base: &Path) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() || line.starts_with("# ") {
            continue;
        }

        if line.starts_with('\t') || line.starts_with("    ") {
            if let Some(last) = diagnostics.last_mut() {
                last.message.push('\n');
                last.message.push_str(line.trim());
                continue;
            }
        }

        match LOCATED_LINE.captures(line) {
            Some(caps) => {
                let file = PathBuf::from(&caps[1]);
                let file = if file.is_absolute() {
                    file
                } else {
                    base.join(file)
                };
                diagnostics.push(Diagnostic {
                    message: caps[4].to_string(),
                    position: Some(Position {
                        file,
                        line: caps[2].parse().unwrap_or(0),
                        column: caps
                            .get(3)
                            .and_then(|c| c.as_str().parse().ok())
                            .unwrap_or(0),
                    }),
                });
            }
            None => diagnostics.push(Diagnostic::message(line.trim())),
        }
    }

    diagnostics
}

/// A name recovered from a diagnostic, tagged with what broke.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Extracted {
    /// A call to `Name` is missing the marker argument.
    MissingArgument(String),
    /// The method `name` on `receiver` is missing the marker parameter.
    MissingParameter { receiver: String, name: String },
}

/// Extracts names from diagnostic messages.
#[derive(Debug, Clone)]
pub struct Extractor {
    implementer: Regex,
}

impl Extractor {
    /// Build an extractor for the given marker type.
    pub fn new(marker: &MarkerConfig) -> Self {
        // Receiver types print as `*T`, `pkg.T` or `T[K, V]`; only the base
        // name is kept. Older toolchains say `wrong type for Foo method`.
        let pattern = format!(
            r"\*?(?:[\w/.-]+\.)?(\w+)(?:\[[^\]]*\])? does not implement \S+ \(wrong type for (?:method (\w+)|(\w+) method)\)\s+have [^\n]*\s+want (\w+)\({}[,)]",
            regex::escape(&marker.type_expr())
        );
        Self {
            // The escaped marker cannot produce an invalid pattern.
            implementer: Regex::new(&pattern).unwrap(),
        }
    }

    /// All names a message yields, in order of appearance.
    ///
    /// A message matching neither pattern yields nothing; that is not an
    /// error.
    pub fn extract(&self, message: &str) -> Vec<Extracted> {
        let mut names: Vec<Extracted> = NOT_ENOUGH_ARGUMENTS
            .captures_iter(message)
            .map(|c| Extracted::MissingArgument(c[1].to_string()))
            .collect();
        names.extend(self.implementer.captures_iter(message).filter_map(|c| {
            let method = c.get(2).or_else(|| c.get(3))?.as_str();
            (method == &c[4]).then(|| Extracted::MissingParameter {
                receiver: c[1].to_string(),
                name: method.to_string(),
            })
        }));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(&MarkerConfig::default())
    }

    #[test]
    fn test_not_enough_arguments_shapes() {
        let cases = [
            ("not enough arguments in call to x.Foo", Some("Foo")),
            ("not enough arguments in call to i.Foo\n\thave (number)\n\twant (context.Context, int)", Some("Foo")),
            ("not enough arguments in call to s.repo.FindByID", Some("FindByID")),
            ("not enough arguments in call to examples.BarCtx", Some("BarCtx")),
            // Plain function calls carry no selector
            ("not enough arguments in call to Foo", None),
            ("too many arguments in call to x.Foo", None),
        ];
        for (message, want) in cases {
            let got = extractor().extract(message);
            let want: Vec<_> = want
                .into_iter()
                .map(|n| Extracted::MissingArgument(n.to_string()))
                .collect();
            assert_eq!(got, want, "message: {:?}", message);
        }
    }

    fn missing_parameter(receiver: &str, name: &str) -> Extracted {
        Extracted::MissingParameter {
            receiver: receiver.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_missing_parameter_shape() {
        let message = "cannot use &impl{} (value of type *impl) as Interface value in return statement: *impl does not implement Interface (wrong type for method Foo)\n\
                       have Foo(int)\n\
                       want Foo(context.Context, int)";
        assert_eq!(extractor().extract(message), vec![missing_parameter("impl", "Foo")]);

        let cases = [
            (
                "mem does not implement io.Closer (wrong type for method Close)\nhave Close() error\nwant Close(context.Context) error",
                "mem",
                "Close",
            ),
            (
                "*store.Cache[K, V] does not implement Store (wrong type for method Get)\nhave Get(K) V\nwant Get(context.Context, K) V",
                "Cache",
                "Get",
            ),
            (
                "*impl does not implement Interface (wrong type for Foo method)\nhave Foo(int)\nwant Foo(context.Context, int)",
                "impl",
                "Foo",
            ),
        ];
        for (message, receiver, name) in cases {
            assert_eq!(
                extractor().extract(message),
                vec![missing_parameter(receiver, name)],
                "message: {:?}",
                message
            );
        }
    }

    #[test]
    fn test_missing_parameter_needs_receiver() {
        // Without the receiver there is no way to tell which type to fix
        assert!(extractor()
            .extract("have Close() error\nwant Close(context.Context) error")
            .is_empty());
        // The wanted signature must belong to the reported method
        assert!(extractor()
            .extract("*impl does not implement I (wrong type for method Foo)\nhave Foo(int)\nwant Bar(context.Context, int)")
            .is_empty());
    }

    #[test]
    fn test_unrelated_message_yields_nothing() {
        assert!(extractor().extract("undefined: foo").is_empty());
    }

    #[test]
    fn test_parse_output() {
        let output = "# example.com/app\n\
./main.go:13:8: not enough arguments in call to i.Foo\n\
\thave (number)\n\
\twant (context.Context, int)\n\
pkg/bar.go:4:2: undefined: baz\n\
too many errors\n";
        let diags = parse_output(output, Path::new("/work"));
        assert_eq!(diags.len(), 3);

        let first = &diags[0];
        assert_eq!(
            first.message,
            "not enough arguments in call to i.Foo\nhave (number)\nwant (context.Context, int)"
        );
        let pos = first.position.as_ref().unwrap();
        assert_eq!(pos.file, Path::new("/work").join("./main.go"));
        assert_eq!((pos.line, pos.column), (13, 8));

        assert_eq!(diags[1].position.as_ref().unwrap().line, 4);
        assert_eq!(diags[2], Diagnostic::message("too many errors"));
    }

    #[test]
    fn test_parse_vet_prefix() {
        let diags = parse_output(
            "vet: ./a.go:3:9: not enough arguments in call to c.Do",
            Path::new("/w"),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "not enough arguments in call to c.Do");
    }
}
