//! Failure classification
//!
//! Maps the tool outputs of one attempt to the [`ActionCategory`] that scopes
//! the next repair. The default [`KeywordClassifier`] is a case-insensitive
//! substring heuristic over diagnostic text; other strategies plug in through
//! [`FailureClassifier`].

use rtlloop_spec::ActionCategory;
use rtlloop_tools::ToolOutput;

/// Strategy turning an attempt's tool outputs into a repair category
pub trait FailureClassifier: Send + Sync {
    fn classify(
        &self,
        lint: Option<&ToolOutput>,
        compile: &ToolOutput,
        run: Option<&ToolOutput>,
    ) -> ActionCategory;
}

type KeywordClass = (&'static [&'static str], ActionCategory);

/// Lint keyword classes, highest priority first
const LINT_CLASSES: &[KeywordClass] = &[
    (&["port", "connection", "module"], ActionCategory::FixPorts),
    (&["width", "bit", "size"], ActionCategory::FixWidth),
    (&["syntax", "parse", "unexpected"], ActionCategory::FixParse),
    (&["type", "incompatible"], ActionCategory::FixType),
];

/// Compiler keyword classes, highest priority first
const COMPILE_CLASSES: &[KeywordClass] = &[
    (&["port", "connection"], ActionCategory::FixPorts),
    (&["width", "bit", "sized"], ActionCategory::FixWidth),
    (&["syntax", "parse", "unexpected"], ActionCategory::FixParse),
    (&["type", "incompatible"], ActionCategory::FixType),
];

/// First class with a keyword in `diagnostics`, or `FIX_PARSE`
fn match_classes(diagnostics: &str, classes: &[KeywordClass]) -> ActionCategory {
    let text = diagnostics.to_lowercase();
    classes
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, action)| *action)
        .unwrap_or(ActionCategory::FixParse)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl FailureClassifier for KeywordClassifier {
    fn classify(
        &self,
        lint: Option<&ToolOutput>,
        compile: &ToolOutput,
        run: Option<&ToolOutput>,
    ) -> ActionCategory {
        classify(lint, compile, run)
    }
}

/// Keyword classification; lint diagnostics win over compiler diagnostics
///
/// Only stderr is inspected.
pub fn classify(
    lint: Option<&ToolOutput>,
    compile: &ToolOutput,
    run: Option<&ToolOutput>,
) -> ActionCategory {
    if let Some(lint) = lint.filter(|l| !l.success()) {
        return match_classes(&lint.stderr, LINT_CLASSES);
    }

    if !compile.success() {
        return match_classes(&compile.stderr, COMPILE_CLASSES);
    }

    match run {
        Some(run) if !run.success() => ActionCategory::FixFunction,
        // Passed structurally; anything left is behavioural
        _ => ActionCategory::FixFunction,
    }
}
