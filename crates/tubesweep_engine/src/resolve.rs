//! Reads one feed container into a [`Record`] according to its layout.

use engine_logging::{engine_debug, engine_error, engine_trace, engine_warn, trace_enabled};
use tubesweep_core::{full_url, Layout, Record};

use crate::dom::{DomElement, DomError};

const VIEW_FULL_PLAYLIST: &str = "View full playlist";
const LOCKUP_TEXT_CONTAINER: &str = ".yt-lockup-metadata-view-model__text-container";
/// Metadata fragments that describe view counts or scheduling, not recency.
const SKIPPED_FRAGMENTS: [&str; 3] = ["views", "watch", "scheduled"];

/// Extracts the record of `element`. Only fatal errors are returned; any
/// other failure yields an unrecognised record and a log entry with the
/// element's markup.
pub async fn resolve(layout: Layout, element: &dyn DomElement) -> Result<Record, DomError> {
    let result = match layout {
        Layout::HistorySection => history_section(element).await,
        Layout::HistoryEntry => history_entry(element).await,
        Layout::Playlist => playlist(element).await,
        Layout::PlaylistVideo => playlist_video(element).await,
        Layout::SubChannel => sub_channel(element).await,
        Layout::SubVideo => sub_video(element).await,
    };

    match result {
        Ok(Some(record)) => {
            if trace_enabled() {
                engine_trace!("{} {}", layout.name(), record);
            }
            Ok(record)
        }
        Ok(None) => {
            engine_error!(
                "Unrecognised {} container: {}",
                layout.name(),
                markup(element).await
            );
            Ok(Record::unrecognized())
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            engine_warn!(
                "Failed to read {} container ({}): {}",
                layout.name(),
                err,
                markup(element).await
            );
            Ok(Record::unrecognized())
        }
    }
}

async fn markup(element: &dyn DomElement) -> String {
    element
        .html()
        .await
        .unwrap_or_else(|err| format!("<markup unavailable: {err}>"))
}

async fn text_of(element: &dyn DomElement, selector: &str) -> Result<Option<String>, DomError> {
    match element.query(selector).await? {
        Some(found) => Ok(Some(found.text().await?.trim().to_string())),
        None => Ok(None),
    }
}

async fn href_of(element: &dyn DomElement) -> Result<String, DomError> {
    Ok(element.attribute("href").await?.unwrap_or_default())
}

fn recognized(title: String) -> Record {
    Record {
        title,
        recognized: true,
        ..Record::default()
    }
}

async fn history_section(element: &dyn DomElement) -> Result<Option<Record>, DomError> {
    let mut titles = Vec::new();
    for header in element.query_all("#title").await? {
        titles.push(header.text().await?.trim().to_string());
    }
    // Sections without a header are spinners or leftovers; they stay
    // recognised but become placeholders through their empty title.
    let mut record = recognized(titles.first().cloned().unwrap_or_default());
    record.titles = titles;
    Ok(Some(record))
}

async fn history_entry(element: &dyn DomElement) -> Result<Option<Record>, DomError> {
    if let Some(anchor) = element.query("#video-title").await? {
        let mut record = recognized(anchor.text().await?.trim().to_string());
        record.url = full_url(&href_of(anchor.as_ref()).await?);
        record.text = text_of(element, "#description-text").await?.unwrap_or_default();
        if let Some(channel) = element.query("#metadata a").await? {
            record.channel_name = channel.text().await?.trim().to_string();
            record.set_channel_href(&href_of(channel.as_ref()).await?);
        }
        return Ok(Some(record));
    }

    let Some(container) = element.query(LOCKUP_TEXT_CONTAINER).await? else {
        return Ok(None);
    };
    let Some(anchor) = container.query("a").await? else {
        return Ok(None);
    };
    let mut record = recognized(anchor.text().await?.trim().to_string());
    record.url = full_url(&href_of(anchor.as_ref()).await?);

    let mut fragments = Vec::new();
    for fragment in container.query_all("[role='text']").await? {
        fragments.push(fragment.text().await?.trim().to_string());
    }
    // Fragments: title, channel, [badge,] views-or-progress.
    if let Some(channel) = fragments.get(1) {
        record.channel_name = channel.clone();
    }
    if let Some(link) = container.query("[role='text'] a").await? {
        record.set_channel_href(&href_of(link.as_ref()).await?);
    }
    match fragments.len() {
        3 => record.text = fragments[2].clone(),
        4 => record.text = fragments[3].clone(),
        count => engine_warn!(
            "History entry '{}' has {} metadata fragments, expected 3 or 4",
            record.title,
            count
        ),
    }
    Ok(Some(record))
}

async fn playlist(element: &dyn DomElement) -> Result<Option<Record>, DomError> {
    let Some(heading) = element.query("h3").await? else {
        return Ok(None);
    };
    let title = heading.attribute("title").await?.unwrap_or_default();
    let mut record = recognized(title.trim().to_string());
    for anchor in element.query_all("a").await? {
        if anchor.text().await?.trim() == VIEW_FULL_PLAYLIST {
            record.url = full_url(&href_of(anchor.as_ref()).await?);
            break;
        }
    }
    if record.url.is_empty() {
        engine_debug!("Playlist '{}' has no '{}' link", record.title, VIEW_FULL_PLAYLIST);
    }
    Ok(Some(record))
}

async fn playlist_video(element: &dyn DomElement) -> Result<Option<Record>, DomError> {
    let Some(anchor) = element.query("#video-title").await? else {
        return Ok(None);
    };
    let mut record = recognized(anchor.text().await?.trim().to_string());
    record.url = full_url(&href_of(anchor.as_ref()).await?);
    Ok(Some(record))
}

async fn sub_channel(element: &dyn DomElement) -> Result<Option<Record>, DomError> {
    let Some(name) = text_of(element, "#text").await? else {
        return Ok(None);
    };
    let mut record = recognized(name);
    if let Some(link) = element.query("#main-link").await? {
        record.url = full_url(&href_of(link.as_ref()).await?);
    }
    Ok(Some(record))
}

async fn sub_video(element: &dyn DomElement) -> Result<Option<Record>, DomError> {
    let Some(heading) = element.query("h3").await? else {
        return Ok(None);
    };
    let mut record = recognized(heading.text().await?.trim().to_string());
    if let Some(anchor) = heading.query("a").await? {
        record.url = full_url(&href_of(anchor.as_ref()).await?);
    }

    let Some(meta) = element.query("yt-content-metadata-view-model").await? else {
        record.text = "Short".to_string();
        return Ok(Some(record));
    };
    if let Some(channel) = meta.query("a").await? {
        record.channel_name = channel.text().await?.trim().to_string();
        record.set_channel_href(&href_of(channel.as_ref()).await?);
    }
    for fragment in meta.query_all("[role='text']").await? {
        let text = fragment.text().await?.trim().to_string();
        let lower = text.to_lowercase();
        if text.is_empty() || SKIPPED_FRAGMENTS.iter().any(|word| lower.contains(word)) {
            continue;
        }
        if text != record.channel_name {
            record.text = text;
        }
    }
    Ok(Some(record))
}
