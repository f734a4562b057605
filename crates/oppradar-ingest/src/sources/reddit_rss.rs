//! Reddit public Atom feed transport.
//!
//! Uses `/r/{subreddit}/new.rss` instead of the OAuth API, so no client
//! registration is needed. The feed carries roughly 25 entries and no
//! vote or comment counts; those columns are stored as zero.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use oppradar_core::Classification;
use oppradar_db::NewRawPost;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::error::IngestError;
use crate::signal::{forum_signals, has_signal};
use crate::sources::{cap_chars, strip_html};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

const BODY_CHAR_CAP: usize = 5000;

/// Fetch the newest posts of a subreddit and normalize them.
///
/// # Errors
///
/// Returns [`IngestError::Http`] if the request fails or returns a
/// non-success status, or [`IngestError::Xml`] if the feed is malformed.
pub async fn fetch_subreddit_posts(
    client: &reqwest::Client,
    base_url: &str,
    subreddit: &str,
) -> Result<Vec<NewRawPost>, IngestError> {
    let url = format!("{base_url}/r/{subreddit}/new.rss");
    let xml = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    parse_atom_feed(&xml)
}

#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    content: String,
    author: String,
    link: String,
    updated: String,
}

/// Parse a Reddit Atom feed into normalized posts.
///
/// Extracts `<entry>` elements, pulling id, title, content (escaped HTML,
/// stripped and capped), author name, alternate link, and the updated
/// timestamp. Entries without a title are dropped.
fn parse_atom_feed(xml: &str) -> Result<Vec<NewRawPost>, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut posts = Vec::new();
    let mut in_entry = false;
    let mut current_tag = String::new();
    let mut entry = EntryFields::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("").to_string();
                if name == "entry" {
                    in_entry = true;
                    entry = EntryFields::default();
                } else if name == "link" && in_entry && entry.link.is_empty() {
                    entry.link = href_attribute(&e);
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("");
                if name == "link" && in_entry && entry.link.is_empty() {
                    entry.link = href_attribute(&e);
                }
            }
            Ok(Event::End(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("");
                if name == "entry" && in_entry {
                    in_entry = false;
                    if !entry.title.is_empty() {
                        posts.push(to_raw_post(&entry));
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_entry {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    match current_tag.as_str() {
                        "id" => entry.id = text,
                        "title" => entry.title = text,
                        "content" => entry.content = text,
                        "name" => entry.author = text,
                        "updated" => entry.updated = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_entry && current_tag == "content" {
                    entry.content = String::from_utf8_lossy(e.as_ref()).into_owned();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::Xml(e)),
            _ => {}
        }
    }

    Ok(posts)
}

fn href_attribute(e: &quick_xml::events::BytesStart<'_>) -> String {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == b"href")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
        .unwrap_or_default()
}

/// Pull the `t3_` post fragment out of the entry id; the whole id is kept
/// when the fragment is absent.
fn extract_external_id(id: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)t3_([a-z0-9]+)")
            .unwrap_or_else(|e| panic!("static post-id pattern failed to compile: {e}"))
    });
    re.captures(id)
        .and_then(|c| c.get(1))
        .map_or_else(|| id.to_string(), |m| m.as_str().to_string())
}

fn to_raw_post(entry: &EntryFields) -> NewRawPost {
    let body = cap_chars(&strip_html(&entry.content), BODY_CHAR_CAP);
    let author = entry.author.trim_start_matches("/u/").to_string();
    let posted_at = DateTime::parse_from_rfc3339(&entry.updated)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));

    let classification = if has_signal(&format!("{} {body}", entry.title), forum_signals()) {
        Classification::Pending
    } else {
        Classification::Rejected
    };

    NewRawPost {
        external_id: extract_external_id(&entry.id),
        title: Some(entry.title.clone()),
        body: Some(body),
        author: Some(author),
        url: Some(entry.link.clone()),
        // Atom feeds expose no vote or comment counts.
        score: 0,
        comment_count: 0,
        posted_at,
        classification,
    }
}
