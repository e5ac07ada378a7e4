//! Eligibility rules for declarations and files.
//!
//! A [`Policy`] is built once from the loaded [`Config`] and is read-only for
//! the rest of the run. Every name rule is substring containment: an ignore
//! entry of `"Pre"` suppresses `PreInsert` and `Prepare` alike.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::{Config, MarkerConfig};

/// The declaration shape a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category<'a> {
    FreeFunction,
    Method,
    /// A method listed in an interface type; carries the interface name.
    InterfaceMethod { interface: &'a str },
}

/// Immutable eligibility policy for one invocation.
#[derive(Debug, Clone)]
pub struct Policy {
    ignore_funcs: Vec<String>,
    allow_interfaces: Vec<String>,
    skip_method: bool,
    skip_interface: bool,
    ignore_files: Vec<String>,
    excluded_paths: GlobSet,
    skip_generated: bool,
    marker: MarkerConfig,
}

impl Policy {
    /// Build a policy from a validated config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.excluded_paths {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_funcs: config.ignore_funcs.clone(),
            allow_interfaces: config.allow_interfaces.clone(),
            skip_method: config.skip_method,
            skip_interface: config.skip_interface,
            ignore_files: config.ignore_files.clone(),
            excluded_paths: builder.build()?,
            skip_generated: config.skip_generated,
            marker: config.marker.clone(),
        })
    }

    /// The marker parameter description.
    pub fn marker(&self) -> &MarkerConfig {
        &self.marker
    }

    pub fn skip_generated(&self) -> bool {
        self.skip_generated
    }

    /// Whether a declaration named `name` of the given category may be acted on.
    pub fn is_eligible(&self, category: Category<'_>, name: &str) -> bool {
        if self.is_ignored_name(name) {
            return false;
        }

        match category {
            Category::FreeFunction => true,
            Category::Method => !self.skip_method,
            Category::InterfaceMethod { interface } => {
                !self.skip_interface && self.is_interface_allowed(interface)
            }
        }
    }

    /// Whether `name` contains one of the ignore substrings.
    pub fn is_ignored_name(&self, name: &str) -> bool {
        contains_any(&self.ignore_funcs, name)
    }

    /// Whether methods of the named interface may be acted on.
    ///
    /// An empty allow list admits every interface.
    pub fn is_interface_allowed(&self, interface: &str) -> bool {
        self.allow_interfaces.is_empty() || contains_any(&self.allow_interfaces, interface)
    }

    /// Whether a file is excluded by name or path rules.
    pub fn is_file_excluded(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if contains_any(&self.ignore_files, &file_name) {
            return true;
        }

        self.excluded_paths.is_match(path)
    }
}

/// Whether any of `needles` occurs in `haystack`.
pub fn contains_any(needles: &[String], haystack: &str) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(config: Config) -> Policy {
        Policy::from_config(&config).unwrap()
    }

    #[test]
    fn test_contains_any() {
        let cases: &[(&[&str], &str, bool)] = &[
            (&["a", "b", "c"], "a", true),
            (&["a", "b", "c"], "d", false),
            (&["a", "b", "c"], "ab", true),
            (&["Repository", "Service"], "FooRepository", true),
        ];
        for (needles, haystack, want) in cases {
            let needles: Vec<String> = needles.iter().map(|s| s.to_string()).collect();
            assert_eq!(
                contains_any(&needles, haystack),
                *want,
                "case: {:?} in {:?}",
                needles,
                haystack
            );
        }
    }

    #[test]
    fn test_ignore_applies_to_every_category() {
        let p = policy(Config {
            ignore_funcs: vec!["Pre".to_string()],
            ..Default::default()
        });
        assert!(!p.is_eligible(Category::Method, "PreInsert"));
        assert!(!p.is_eligible(Category::FreeFunction, "PreInsert"));
        assert!(!p.is_eligible(Category::InterfaceMethod { interface: "Store" }, "PreInsert"));
        assert!(p.is_eligible(Category::Method, "Insert"));
    }

    #[test]
    fn test_allow_list_scopes_interfaces_only() {
        let p = policy(Config {
            allow_interfaces: vec!["Repository".to_string()],
            ..Default::default()
        });
        assert!(p.is_eligible(Category::InterfaceMethod { interface: "UserRepository" }, "Find"));
        assert!(!p.is_eligible(Category::InterfaceMethod { interface: "Clock" }, "Now"));
        // Methods are untouched by the allow list
        assert!(p.is_eligible(Category::Method, "Now"));
    }

    #[test]
    fn test_skip_flags() {
        let p = policy(Config {
            skip_method: true,
            ..Default::default()
        });
        assert!(!p.is_eligible(Category::Method, "Foo"));
        assert!(p.is_eligible(Category::InterfaceMethod { interface: "I" }, "Foo"));

        let p = policy(Config {
            skip_interface: true,
            ..Default::default()
        });
        assert!(p.is_eligible(Category::Method, "Foo"));
        assert!(!p.is_eligible(Category::InterfaceMethod { interface: "I" }, "Foo"));
    }

    #[test]
    fn test_adding_ignore_never_grows_eligibility() {
        let names = ["Insert", "PreInsert", "Update", "Prepare"];
        let base = policy(Config::default());
        let narrowed = policy(Config {
            ignore_funcs: vec!["Pre".to_string()],
            ..Default::default()
        });
        for name in names {
            if narrowed.is_eligible(Category::Method, name) {
                assert!(base.is_eligible(Category::Method, name));
            }
        }
    }

    #[test]
    fn test_file_exclusion() {
        let p = policy(Config {
            excluded_paths: vec!["**/gen/**".to_string()],
            ..Default::default()
        });
        assert!(p.is_file_excluded(Path::new("pkg/mock_repo.go")));
        assert!(p.is_file_excluded(Path::new("pkg/gen/types.go")));
        assert!(!p.is_file_excluded(Path::new("pkg/repo.go")));
    }
}
