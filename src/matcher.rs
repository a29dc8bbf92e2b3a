use crate::{
    descriptor::{DescriptorError, NormalizedDescriptors, ObjectDescriptor, Rule},
    vfs::{path_key, FileSet},
};
use globset::{GlobBuilder, GlobMatcher};

const GLOB_META: [char; 5] = ['*', '?', '[', ']', '{'];

#[derive(Debug, Clone)]
enum PatternMatcher {
    /// A pattern without glob syntax names exactly one path.
    Literal(String),
    Glob(GlobMatcher),
}
impl PatternMatcher {
    fn build(pattern: &str) -> Result<Self, DescriptorError> {
        if !pattern.contains(GLOB_META) {
            return Ok(Self::Literal(path_key(pattern)));
        }

        let glob = GlobBuilder::new(relative(pattern))
            .literal_separator(true)
            .build()
            .map_err(|error| DescriptorError::InvalidPattern {
                pattern: pattern.to_string(),
                source: error,
            })?;

        Ok(Self::Glob(glob.compile_matcher()))
    }

    fn is_match(&self, path: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == path,
            Self::Glob(glob) => glob.is_match(path),
        }
    }
}

/// Drops leading `./` and `/` so globs are matched against relative paths, like literals.
fn relative(mut pattern: &str) -> &str {
    loop {
        if let Some(rest) = pattern.strip_prefix("./") {
            pattern = rest;
        } else if let Some(rest) = pattern.strip_prefix('/') {
            pattern = rest;
        } else {
            return pattern;
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    matcher: PatternMatcher,
}

/// The canonical rule list with every pattern compiled, ready to resolve paths.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}
impl RuleSet {
    pub fn compile(rules: NormalizedDescriptors) -> Result<Self, DescriptorError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let matcher = PatternMatcher::build(&rule.pattern)?;

                Ok(CompiledRule { rule, matcher })
            })
            .collect::<Result<Vec<_>, DescriptorError>>()?;

        Ok(Self { rules })
    }
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }
    pub fn is_match(&self, path: &str) -> bool {
        self.rules.iter().any(|compiled| compiled.matcher.is_match(path))
    }
    /// Layers the descriptors of every rule matching `path`, in rule order.
    ///
    /// Returns `None` when no rule matches or when the last matching rule ignores the file.
    pub fn resolve(&self, path: &str) -> Option<ObjectDescriptor> {
        let mut resolved: Option<ObjectDescriptor> = None;

        for compiled in &self.rules {
            if !compiled.matcher.is_match(path) {
                continue;
            }

            log::trace!("{} matched by '{}'", path, compiled.rule.pattern);

            resolved
                .get_or_insert_with(ObjectDescriptor::new)
                .merge(&compiled.rule.descriptor);
        }

        resolved.filter(|descriptor| !descriptor.is_ignored())
    }
    /// Paths the pipeline has to look at: every source path some rule matches, in
    /// enumeration order, then literal patterns naming files absent from `source`.
    /// A literal naming a directory of `source` is not a missing file.
    pub fn candidates(&self, source: &FileSet) -> Vec<String> {
        let mut candidates: Vec<String> = source
            .paths()
            .filter(|path| self.is_match(path))
            .map(str::to_string)
            .collect();

        for compiled in &self.rules {
            if let PatternMatcher::Literal(literal) = &compiled.matcher {
                if literal.is_empty() || source.contains(literal) || candidates.contains(literal) {
                    continue;
                }

                let directory = format!("{literal}/");
                if source.paths().any(|path| path.starts_with(&directory)) {
                    log::debug!("'{}' names a directory, not a file", literal);
                    continue;
                }

                candidates.push(literal.clone());
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{normalize, Descriptor, FileDescriptors, ObjectDescriptor};

    fn rule_set(files: FileDescriptors) -> RuleSet {
        RuleSet::compile(normalize(&files)).unwrap()
    }

    fn source(paths: &[&str]) -> FileSet {
        let mut set = FileSet::new();
        for path in paths {
            set.write(*path, "");
        }
        set
    }

    #[test]
    fn unmatched_path_is_excluded() {
        let rules = rule_set(FileDescriptors::array(["src/**"]));

        assert!(rules.resolve("src/index.ts").is_some());
        assert!(rules.resolve("package.json").is_none());
    }

    #[test]
    fn double_star_suffix_glob_matches_nested_and_top_level() {
        let rules = rule_set(FileDescriptors::array(["**/*.ts"]));

        assert!(rules.is_match("index.ts"));
        assert!(rules.is_match("src/deep/index.ts"));
        assert!(!rules.is_match("src/index.tsx"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let rules = rule_set(FileDescriptors::array(["*.md"]));

        assert!(rules.is_match("README.md"));
        assert!(!rules.is_match("docs/guide.md"));
    }

    #[test]
    fn literal_pattern_matches_exact_path_only() {
        let rules = rule_set(FileDescriptors::array(["./src/index.ts"]));

        assert!(rules.is_match("src/index.ts"));
        assert!(!rules.is_match("src/index.ts.map"));
    }

    #[test]
    fn leading_dot_slash_is_ignored_in_globs_too() {
        let rules = rule_set(FileDescriptors::array(["./**/*.ts", "/docs/*.md"]));

        assert!(rules.is_match("src/index.ts"));
        assert!(rules.is_match("index.ts"));
        assert!(rules.is_match("docs/guide.md"));
        assert!(!rules.is_match("package.json"));
    }

    #[test]
    fn later_rules_win_and_can_reinclude() {
        let rules = rule_set(FileDescriptors::map([
            ("**", Descriptor::from(true)),
            ("secret/**", Descriptor::from(false)),
            (
                "secret/keep.txt",
                ObjectDescriptor::new().with_rename("kept.txt").into(),
            ),
        ]));

        assert!(rules.resolve("secret/drop.txt").is_none());

        let kept = rules.resolve("secret/keep.txt").unwrap();
        assert_eq!(kept.rename.unwrap().apply("secret/keep.txt"), "kept.txt");
    }

    #[test]
    fn fields_from_all_matching_rules_are_merged() {
        let rules = rule_set(FileDescriptors::map([
            ("**", Descriptor::from(ObjectDescriptor::new().skip_if_not_exists(true))),
            ("a.txt", Descriptor::from(ObjectDescriptor::new().with_rename("b.txt"))),
        ]));

        let resolved = rules.resolve("a.txt").unwrap();
        assert_eq!(resolved.skip_if_not_exists, Some(true));
        assert!(resolved.rename.is_some());
    }

    #[test]
    fn candidates_follow_enumeration_then_missing_literals() {
        let rules = rule_set(FileDescriptors::map([
            ("**/*.ts", Descriptor::from(true)),
            ("LICENSE", Descriptor::from("MIT")),
            ("src/index.ts", Descriptor::from(true)),
        ]));
        let set = source(&["package.json", "src/bin.ts", "src/index.ts"]);

        assert_eq!(
            rules.candidates(&set),
            vec!["src/bin.ts", "src/index.ts", "LICENSE"]
        );
    }

    #[test]
    fn literal_naming_a_directory_is_not_a_missing_file() {
        let rules = rule_set(FileDescriptors::array(["**", "src", "./src/"]));
        let set = source(&["package.json", "src/bin.ts", "src/index.ts"]);

        assert_eq!(
            rules.candidates(&set),
            vec!["package.json", "src/bin.ts", "src/index.ts"]
        );
    }

    #[test]
    fn malformed_glob_is_rejected() {
        let result = RuleSet::compile(normalize(&FileDescriptors::array(["src/[a-"])));

        assert!(matches!(
            result,
            Err(DescriptorError::InvalidPattern { .. })
        ));
    }
}
