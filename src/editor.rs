//! Editor-mode markers.
//!
//! When a request runs in editor mode, templates wrap each translatable
//! text output in a `<span>` carrying the source text and context for the
//! client-side editing overlay. Only explicit call sites are wrapped; the
//! visible text is never changed.

use crate::i18n::detector::query_param;
use crate::templates::escape_html;

/// Query flag that turns editor mode on for a request.
pub const EDITOR_QUERY_PARAM: &str = "gst_editor";

/// Whether the query string asks for editor mode (`gst_editor=1`).
pub fn editor_requested(query: Option<&str>) -> bool {
    query
        .and_then(|query| query_param(query, EDITOR_QUERY_PARAM))
        .is_some_and(|value| matches!(value.as_str(), "1" | "true"))
}

/// Wrap already-rendered `html` with an authoring marker.
///
/// `source` is the untranslated text and is attribute-escaped.
pub fn mark(enabled: bool, html: &str, source: &str, context: &str) -> String {
    if !enabled {
        return html.to_string();
    }
    format!(
        r#"<span class="gst-translatable" data-gst-source="{}" data-gst-context="{}">{}</span>"#,
        escape_html(source),
        escape_html(context),
        html
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_requested() {
        assert!(editor_requested(Some("gst_editor=1")));
        assert!(editor_requested(Some("lang=es&gst_editor=true")));
        assert!(!editor_requested(Some("gst_editor=0")));
        assert!(!editor_requested(Some("gst_editor")));
        assert!(!editor_requested(None));
        assert!(editor_requested(Some("gst%5Feditor=%31")));
    }

    #[test]
    fn test_mark_disabled_is_passthrough() {
        assert_eq!(mark(false, "Hola", "Hello", "title"), "Hola");
    }

    #[test]
    fn test_mark_wraps_and_escapes_source() {
        let marked = mark(true, "Hola", r#"Say "hi" <now>"#, "title");
        assert_eq!(
            marked,
            r#"<span class="gst-translatable" data-gst-source="Say &quot;hi&quot; &lt;now&gt;" data-gst-context="title">Hola</span>"#
        );
    }

    #[test]
    fn test_mark_keeps_visible_text() {
        let html = "<em>Sobre</em> nosotros";
        let marked = mark(true, html, "About us", "content");
        assert!(marked.contains(html));
    }
}
