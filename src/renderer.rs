use bytesize::ByteSize;
use chrono::{DateTime, Local, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::listing::{Entry, Listing};

/// Characters escaped in hrefs; `/` stays literal so links keep their structure.
const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:60em;padding:0 1em}\
table{border-collapse:collapse;width:100%}\
th,td{padding:.35em .6em;text-align:left;border-bottom:1px solid #ddd}\
td.size,td.date{white-space:nowrap;color:#555}\
h1 a{text-decoration:none}\
form{margin-top:1.5em}";

/// Renders the HTML page for a directory listing.
pub fn page(listing: &Listing) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Index of " (listing.current_path) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { (breadcrumbs(&listing.current_path)) }
                table {
                    thead {
                        tr {
                            th { "Name" }
                            th { "Size" }
                            th { "Last modified" }
                        }
                    }
                    tbody {
                        @if !listing.parent_path.is_empty() {
                            tr {
                                td colspan="3" {
                                    a href=(dir_href(&listing.parent_path)) { "../" }
                                }
                            }
                        }
                        @for entry in &listing.entries {
                            (entry_row(entry))
                        }
                    }
                }
                form method="post" action=(dir_href(&listing.current_path)) enctype="multipart/form-data" {
                    input type="file" name="file" required;
                    " "
                    button type="submit" { "Upload" }
                }
            }
        }
    }
}

fn entry_row(entry: &Entry) -> Markup {
    let href = if entry.is_directory {
        dir_href(&entry.relative_path)
    } else {
        encode_href(&entry.relative_path)
    };

    html! {
        tr {
            td {
                a href=(href) {
                    (entry.name)
                    @if entry.is_directory { "/" }
                }
            }
            td.size {
                @if entry.is_directory { "-" } @else { (ByteSize::b(entry.size_bytes).to_string()) }
            }
            td.date { (format_date(&entry.modified_at)) }
        }
    }
}

/// Clickable path components, each linking to its directory.
fn breadcrumbs(current_path: &str) -> Markup {
    let segments: Vec<&str> = current_path.split('/').filter(|s| !s.is_empty()).collect();

    html! {
        a href="/" { "/" }
        @for (i, segment) in segments.iter().enumerate() {
            @let link = format!("/{}", segments[..=i].join("/"));
            a href=(dir_href(&link)) { (segment) }
            @if i + 1 < segments.len() { "/" }
        }
    }
}

fn encode_href(path: &str) -> String {
    utf8_percent_encode(path, HREF_ESCAPE).to_string()
}

fn dir_href(path: &str) -> String {
    let encoded = encode_href(path);
    if encoded.ends_with('/') {
        encoded
    } else {
        format!("{encoded}/")
    }
}

fn format_date(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, relative_path: &str, is_directory: bool) -> Entry {
        Entry {
            name: name.to_string(),
            relative_path: relative_path.to_string(),
            size_bytes: 2048,
            modified_at: DateTime::<Utc>::UNIX_EPOCH,
            is_directory,
        }
    }

    #[test]
    fn renders_entries_with_encoded_links() {
        let listing = Listing {
            current_path: "/docs".to_string(),
            parent_path: "/".to_string(),
            entries: vec![
                entry("sub dir", "/docs/sub dir", true),
                entry("a#b.txt", "/docs/a#b.txt", false),
            ],
        };
        let html = page(&listing).into_string();

        assert!(html.contains("href=\"/docs/sub%20dir/\""));
        assert!(html.contains("href=\"/docs/a%23b.txt\""));
        assert!(html.contains(&ByteSize::b(2048).to_string()));
        assert!(html.contains("action=\"/docs/\""));
        assert!(html.contains("name=\"file\""));
        assert!(html.contains("../"));
    }

    #[test]
    fn root_has_no_parent_link() {
        let listing = Listing {
            current_path: "/".to_string(),
            parent_path: String::new(),
            entries: vec![],
        };
        let html = page(&listing).into_string();

        assert!(!html.contains("../"));
        assert!(html.contains("action=\"/\""));
    }

    #[test]
    fn names_are_escaped() {
        let listing = Listing {
            current_path: "/".to_string(),
            parent_path: String::new(),
            entries: vec![entry("<script>", "/<script>", false)],
        };
        let html = page(&listing).into_string();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
