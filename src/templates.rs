//! HTML rendering for content pages.
//!
//! Every outgoing link goes through the request's `localize`, so the
//! active language sticks while navigating.

use crate::pipeline::RequestContext;

/// A navigation entry, label already translated (and marked in editor mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub current: bool,
}

/// Rendered pieces of a page.
#[derive(Debug, Clone)]
pub struct PageView {
    /// Bare page path, e.g. "/about/"
    pub path: String,
    /// Translated title as plain text, for `<title>`
    pub plain_title: String,
    /// Title markup for the heading
    pub title: String,
    /// Body markup
    pub body: String,
    pub nav: Vec<NavLink>,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Decode the entities `escape_html` produces, so a text node and the
/// same text given as plain text share a store key.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

pub fn render_page(context: &RequestContext, view: &PageView) -> String {
    let nav: String = view
        .nav
        .iter()
        .map(|link| {
            let class = if link.current { r#" class="current""# } else { "" };
            format!(
                r#"<li{}><a href="{}">{}</a></li>"#,
                class,
                escape_html(&link.href),
                link.label
            )
        })
        .collect();

    layout(
        context,
        &escape_html(&view.plain_title),
        &head_links(context, &view.path),
        &format!(
            r#"<header><nav class="site-nav"><ul>{}</ul></nav>{}</header>
<main><h1>{}</h1>{}</main>"#,
            nav,
            language_switcher(context, &view.path),
            view.title,
            view.body
        ),
    )
}

pub fn render_not_found(context: &RequestContext) -> String {
    let home = context.localize("/");
    layout(
        context,
        "Not found",
        "",
        &format!(
            r#"<main><h1>Not found</h1><p><a href="{}">Home</a></p></main>"#,
            escape_html(&home)
        ),
    )
}

fn layout(context: &RequestContext, title: &str, head: &str, body: &str) -> String {
    let lang = match context.current_language() {
        "" => String::new(),
        code => format!(r#" lang="{}""#, escape_html(code)),
    };
    format!(
        r#"<!DOCTYPE html>
<html{}>
<head>
<meta charset="utf-8">
<title>{}</title>
{}
</head>
<body>
{}
</body>
</html>
"#,
        lang, title, head, body
    )
}

/// Canonical link plus hreflang alternates for every active language.
pub fn head_links(context: &RequestContext, path: &str) -> String {
    let mut links = vec![format!(
        r#"<link rel="canonical" href="{}">"#,
        escape_html(&context.absolute_url(&context.localize(path)))
    )];

    let languages = context.languages();
    if languages.active().count() > 1 {
        for language in languages.active() {
            links.push(format!(
                r#"<link rel="alternate" hreflang="{}" href="{}">"#,
                escape_html(&language.code),
                escape_html(&context.absolute_url(&context.localize_to(path, &language.code)))
            ));
        }
        links.push(format!(
            r#"<link rel="alternate" hreflang="x-default" href="{}">"#,
            escape_html(&context.absolute_url(path))
        ));
    }

    links.join("\n")
}

/// Switcher listing active languages, current one marked. Empty when
/// disabled or when there is nothing to switch to.
pub fn language_switcher(context: &RequestContext, path: &str) -> String {
    let languages = context.languages();
    if !context.switcher_enabled() || languages.active().count() < 2 {
        return String::new();
    }

    let items: String = languages
        .active()
        .map(|language| {
            let class = if language.code == context.current_language() {
                r#" class="current""#
            } else {
                ""
            };
            // Flags are admin-provided markup (emoji or SVG)
            let flag = if language.flag.is_empty() {
                String::new()
            } else {
                format!(r#"<span class="flag">{}</span> "#, language.flag)
            };
            format!(
                r#"<li{}><a href="{}" hreflang="{}" lang="{}">{}{}</a></li>"#,
                class,
                escape_html(&context.localize_to(path, &language.code)),
                escape_html(&language.code),
                escape_html(&language.code),
                flag,
                escape_html(&language.name)
            )
        })
        .collect();

    format!(r#"<nav class="gst-language-switcher"><ul>{}</ul></nav>"#, items)
}
