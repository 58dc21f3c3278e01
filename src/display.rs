//! Result display: raw code block plus a render-ready variant.
//!
//! The stored text is always shown verbatim as a `latex` code block. The
//! text handed to a math renderer goes through
//! [`crate::pipeline::postprocess::render_ready`] first, which removes `\[`
//! and `\]` and nothing else.
//!
//! Three renderings are provided: plain terminal text, Markdown, and a
//! self-contained HTML page that typesets the formula with MathJax.

use crate::error::Img2LatexError;
use crate::pipeline::postprocess::render_ready;
use crate::session::Session;
use std::io::Write;
use std::path::Path;

/// MathJax bundle used by [`render_html`].
pub const MATHJAX_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-svg.js";

/// Both views of one stored result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    /// Verbatim model output.
    pub code: String,
    /// `code` with `\[` / `\]` removed, for the math renderer.
    pub render: String,
}

impl ResultView {
    pub fn new(latex: &str) -> Self {
        Self {
            code: latex.to_string(),
            render: render_ready(latex),
        }
    }
}

/// The view of the session's stored result, if there is one.
pub fn view(session: &Session) -> Option<ResultView> {
    session.latex().map(ResultView::new)
}

/// Fenced Markdown code block labelled `latex`.
pub fn code_block(latex: &str) -> String {
    let fence = fence_for(latex);
    format!("{fence}latex\n{}\n{fence}", latex.trim_end_matches('\n'))
}

/// Markdown document with a "LaTeX Code" and a "LaTeX Rendered" section.
///
/// Returns an empty string when the session holds no result.
pub fn render_markdown(session: &Session) -> String {
    let Some(view) = view(session) else {
        return String::new();
    };
    format!(
        "### LaTeX Code\n\n{}\n\n### LaTeX Rendered\n\n$$\n{}\n$$\n",
        code_block(&view.code),
        view.render.trim()
    )
}

/// Standalone HTML page showing the code block and the typeset formula.
///
/// The code is HTML-escaped; the render variant is escaped for text content
/// and placed inside `\[ … \]` for MathJax to pick up.
pub fn render_html(session: &Session) -> String {
    let body = match view(session) {
        Some(view) => {
            let meta = session
                .latest()
                .map(|out| {
                    format!(
                        "<p class=\"meta\">{} · {}×{} · {} via {} · {} ms</p>\n",
                        html_escape::encode_text(&out.image.name),
                        out.image.width,
                        out.image.height,
                        html_escape::encode_text(&out.model),
                        html_escape::encode_text(&out.provider),
                        out.duration_ms,
                    )
                })
                .unwrap_or_default();
            format!(
                "{meta}<h3>LaTeX Code</h3>\n<pre><code class=\"language-latex\">{}</code></pre>\n\
                 <h3>LaTeX Rendered</h3>\n<div class=\"math\">\\[{}\\]</div>\n",
                html_escape::encode_text(&view.code),
                html_escape::encode_text(&view.render),
            )
        }
        None => "<p>No LaTeX has been extracted yet.</p>\n".to_string(),
    };

    let notice = session
        .notice()
        .map(|e| {
            format!(
                "<div class=\"error\">Error processing image: {}</div>\n",
                html_escape::encode_text(&e.to_string())
            )
        })
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>LaTeX OCR</title>\n<script defer src=\"{MATHJAX_URL}\"></script>\n\
         <style>body{{font-family:sans-serif;max-width:50rem;margin:2rem auto}}\
         pre{{background:#f4f4f4;padding:1rem;overflow-x:auto}}\
         .error{{background:#fde8e8;color:#9b1c1c;padding:.75rem}}\
         .meta{{color:#666;font-size:.85rem}}</style>\n</head>\n<body>\n\
         <h1>LaTeX OCR</h1>\n{notice}{body}</body>\n</html>\n"
    )
}

/// Write `contents` to `path` atomically (temp file in the same directory,
/// then rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), Img2LatexError> {
    let write_err = |source: std::io::Error| Img2LatexError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// A fence longer than any backtick run inside `latex`.
fn fence_for(latex: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in latex.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}
