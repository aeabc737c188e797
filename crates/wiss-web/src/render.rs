/// Server-side HTML for the search pages.
///
/// Every interpolated value goes through [`escape_html`]; values placed in query strings
/// are percent-encoded first.
use std::fmt::Write;

use axum::http::StatusCode;
use urlencoding::encode;
use wiss_common::model::{SearchResultItem, SearchResults};

const STYLE: &str = "body{font-family:sans-serif;max-width:60em;margin:2em auto;padding:0 1em}\
.item{border-bottom:1px solid #ddd;padding:1em 0;overflow:hidden}\
.item img{float:right;max-width:12em;margin-left:1em}\
.meta{color:#555;font-size:.9em}";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, query: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <header><a href=\"/\">WISS</a>\n{form}</header>\n<main>\n{body}</main>\n</body>\n</html>\n",
        title = escape_html(title),
        form = search_form(query),
    )
}

fn search_form(query: &str) -> String {
    format!(
        "<form action=\"/search\" method=\"get\">\
         <input type=\"text\" name=\"q\" value=\"{}\" placeholder=\"subject, keyword or http:// URI\">\
         <label><input type=\"checkbox\" name=\"langs\" value=\"all\"> all languages</label>\
         <button type=\"submit\">Search</button></form>\n",
        escape_html(query)
    )
}

pub fn home_page() -> String {
    layout(
        "WISS",
        "",
        "<p>Search Europeana's cultural heritage collections by subject, by author, \
         or by a DBpedia/GEMET URI.</p>\n",
    )
}

pub fn results_page(query: &str, results: &SearchResults) -> String {
    let mut body = format!(
        "<h1>{} results for &ldquo;{}&rdquo;</h1>\n",
        results.count,
        escape_html(query)
    );
    for item in &results.items {
        body.push_str(&render_item(item));
    }
    layout(&format!("{query} - WISS"), query, &body)
}

fn render_item(item: &SearchResultItem) -> String {
    let mut html = format!("<article class=\"item\" id=\"item-{}\">\n", item.index);
    if let Some(picture) = &item.picture {
        let _ = writeln!(
            html,
            "<img src=\"{}\" alt=\"{}\">",
            escape_html(picture),
            escape_html(&item.title)
        );
    }
    let _ = writeln!(
        html,
        "<h2><a href=\"{}\">{}</a></h2>",
        escape_html(&item.content_link),
        escape_html(&item.title)
    );
    if !item.authors.is_empty() {
        let authors: Vec<String> = item
            .authors
            .iter()
            .map(|author| {
                format!(
                    "<a href=\"/search/author?q={}\" data-author-info=\"/a?author={}\">{}</a>",
                    escape_html(&encode(author)),
                    escape_html(&encode(author)),
                    escape_html(author)
                )
            })
            .collect();
        let _ = writeln!(html, "<p class=\"authors\">{}</p>", authors.join(", "));
    }
    let _ = writeln!(html, "<p>{}</p>", escape_html(&item.description));
    let _ = writeln!(
        html,
        "<p class=\"meta\">{} &middot; {} &middot; <a href=\"/s?obj={}\">subjects</a></p>",
        escape_html(&item.content_type),
        escape_html(&item.content_provider),
        escape_html(&encode(&item.object))
    );
    html.push_str("</article>\n");
    html
}

pub fn not_found_page(query: &str) -> String {
    let body = format!(
        "<h1>No results</h1>\n<p>Nothing matched &ldquo;{}&rdquo;.</p>\n",
        escape_html(query)
    );
    layout("Not found - WISS", query, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n",
        status.as_u16(),
        escape_html(message)
    );
    layout("Error - WISS", "", &body)
}
