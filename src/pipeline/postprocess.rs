//! Post-processing of model output.
//!
//! Two independent concerns live here:
//!
//! * [`render_ready`]: the display-time delimiter strip. It removes literal
//!   `\[` and `\]` and nothing else; `$`, `\(` and `\)` pass through.
//! * [`lint_latex`]: detects output that ignored the instructions. It never
//!   changes the text. Results are attached to the output as warnings and,
//!   in strict mode, turn the extraction into an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Strip `\[` and `\]` so the text can go straight into a math renderer.
pub fn render_ready(latex: &str) -> String {
    latex.replace(r"\[", "").replace(r"\]", "")
}

/// A way in which model output deviates from bare LaTeX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputWarning {
    /// The completion was empty or whitespace.
    Empty,
    /// Wrapped in a Markdown code fence.
    MarkdownFence,
    /// Wrapped in `$…$` or `$$…$$`.
    DollarDelimiters,
    /// Contains `\[ … \]` display delimiters.
    DisplayDelimiters,
    /// Contains `\( … \)` inline delimiters.
    InlineDelimiters,
    /// Contains `\documentclass`, `\usepackage` or `\begin{document}`.
    DocumentScaffolding,
    /// Contains a run of plain English words outside `\text{…}`.
    ProseText,
}

impl OutputWarning {
    pub fn describe(self) -> &'static str {
        match self {
            OutputWarning::Empty => "empty output",
            OutputWarning::MarkdownFence => "markdown code fence",
            OutputWarning::DollarDelimiters => "dollar delimiters",
            OutputWarning::DisplayDelimiters => "display delimiters",
            OutputWarning::InlineDelimiters => "inline delimiters",
            OutputWarning::DocumentScaffolding => "document scaffolding",
            OutputWarning::ProseText => "explanatory prose",
        }
    }
}

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*```").unwrap());

static RE_DOLLARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\s*\$.*\$\s*$").unwrap());

/// `\[` or `\]` whose backslash is not itself escaped, so the line break
/// `\\[4pt]` does not count.
static RE_DISPLAY_DELIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\\])(?:\\\\)*\\[\[\]]").unwrap());

/// `\(` or `\)` with an unescaped backslash.
static RE_INLINE_DELIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\\])(?:\\\\)*\\[()]").unwrap());

static RE_SCAFFOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:documentclass|usepackage|begin\{document\}|end\{document\})").unwrap()
});

/// `\text{…}`-style arguments; their words are legitimate.
static RE_TEXT_ARGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:text|textrm|textit|textbf|mathrm|mathit|mathbf|operatorname|mbox)\{[^}]*\}")
        .unwrap()
});

/// Commands are removed before the prose scan so `\frac \alpha \beta` is not
/// mistaken for words.
static RE_COMMANDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[A-Za-z]+").unwrap());

/// Five or more alphabetic words of 2+ letters separated by single spaces.
static RE_PROSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z]{2,}(?:[ ,:;]+[A-Za-z]{2,}\b){4,}").unwrap());

/// Collect every [`OutputWarning`] that applies to `latex`, in enum order.
pub fn lint_latex(latex: &str) -> Vec<OutputWarning> {
    let mut warnings = Vec::new();

    if latex.trim().is_empty() {
        warnings.push(OutputWarning::Empty);
        return warnings;
    }
    if RE_FENCE.is_match(latex) {
        warnings.push(OutputWarning::MarkdownFence);
    }
    if RE_DOLLARS.is_match(latex) {
        warnings.push(OutputWarning::DollarDelimiters);
    }
    if RE_DISPLAY_DELIM.is_match(latex) {
        warnings.push(OutputWarning::DisplayDelimiters);
    }
    if RE_INLINE_DELIM.is_match(latex) {
        warnings.push(OutputWarning::InlineDelimiters);
    }
    if RE_SCAFFOLD.is_match(latex) {
        warnings.push(OutputWarning::DocumentScaffolding);
    }

    let without_text = RE_TEXT_ARGS.replace_all(latex, " ");
    let bare = RE_COMMANDS.replace_all(&without_text, " ");
    if RE_PROSE.is_match(&bare) {
        warnings.push(OutputWarning::ProseText);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_ready_strips_display_delimiters() {
        assert_eq!(render_ready("\\[x=1\\]"), "x=1");
        assert_eq!(render_ready(r"\[ \frac{a}{b} \]"), r" \frac{a}{b} ");
    }

    #[test]
    fn render_ready_leaves_other_delimiters() {
        assert_eq!(render_ready("$x$"), "$x$");
        assert_eq!(render_ready(r"\(x\)"), r"\(x\)");
        assert_eq!(render_ready("x^2+y^2=z^2"), "x^2+y^2=z^2");
    }

    #[test]
    fn clean_latex_has_no_warnings() {
        assert!(lint_latex("x^2+y^2=z^2").is_empty());
        assert!(lint_latex(r"\int_{-\infty}^{\infty} e^{-x^2}\,dx = \sqrt{\pi}").is_empty());
        assert!(lint_latex(r"\begin{aligned} a &= b \\ c &= d \end{aligned}").is_empty());
    }

    #[test]
    fn text_arguments_are_not_prose() {
        let latex = r"v = \frac{d}{t} \quad \text{where d is the distance travelled}";
        assert!(lint_latex(latex).is_empty(), "{:?}", lint_latex(latex));
    }

    #[test]
    fn explanations_are_prose() {
        let out = "Here is the LaTeX code for the equation: E = mc^2";
        assert_eq!(lint_latex(out), vec![OutputWarning::ProseText]);
    }

    #[test]
    fn delimiters_and_fences_detected() {
        assert_eq!(lint_latex("$$x=1$$"), vec![OutputWarning::DollarDelimiters]);
        assert_eq!(lint_latex("\\[x=1\\]"), vec![OutputWarning::DisplayDelimiters]);
        assert_eq!(lint_latex(r"\(x\)"), vec![OutputWarning::InlineDelimiters]);
        assert_eq!(
            lint_latex("```latex\nx=1\n```"),
            vec![OutputWarning::MarkdownFence]
        );
    }

    #[test]
    fn line_break_spacing_is_not_a_delimiter() {
        let aligned = r"\begin{aligned} a &= b \\[4pt] c &= d \end{aligned}";
        assert!(lint_latex(aligned).is_empty(), "{:?}", lint_latex(aligned));

        let cases = r"f(x) = \begin{cases} a \\(c+d) & x > 0 \end{cases}";
        assert!(lint_latex(cases).is_empty(), "{:?}", lint_latex(cases));
    }

    #[test]
    fn delimiter_after_line_break_still_detected() {
        assert_eq!(
            lint_latex(r"a \\ \[x=1\]"),
            vec![OutputWarning::DisplayDelimiters]
        );
        assert_eq!(
            lint_latex(r"a \\\(x\)"),
            vec![OutputWarning::InlineDelimiters]
        );
    }

    #[test]
    fn scaffolding_detected() {
        let doc = "\\documentclass{article}\n\\begin{document}\nx=1\n\\end{document}";
        assert!(lint_latex(doc).contains(&OutputWarning::DocumentScaffolding));
    }

    #[test]
    fn empty_output_only_reports_empty() {
        assert_eq!(lint_latex("  \n"), vec![OutputWarning::Empty]);
    }
}
