use hermes_protocol::{Breadcrumb, Event, Value};

/// Keys of breadcrumb data that hold URLs.
const BREADCRUMB_URL_KEYS: &[&str] = &["to", "from", "url"];

/// Header of the request metadata that holds a URL.
const REFERER_HEADER: &str = "Referer";

/// Truncates the string to at most `max_chars` characters.
///
/// A limit of `0` means unlimited. Strings within the limit are left untouched, which makes
/// truncation idempotent.
pub fn truncate(value: &mut String, max_chars: usize) {
    if max_chars == 0 {
        return;
    }

    if let Some((index, _)) = value.char_indices().nth(max_chars) {
        value.truncate(index);
    }
}

fn truncate_opt(value: &mut Option<String>, max_chars: usize) {
    if let Some(value) = value {
        truncate(value, max_chars);
    }
}

/// Truncates URL-shaped values in the data of a breadcrumb.
fn trim_breadcrumb(crumb: &mut Breadcrumb, max_url_length: usize) {
    let Some(data) = &mut crumb.data else {
        return;
    };

    for key in BREADCRUMB_URL_KEYS {
        if let Some(Value::String(url)) = data.get_mut(*key) {
            truncate(url, max_url_length);
        }
    }
}

/// Bounds the length of the variable-size strings of an event.
///
/// - The message and the value of the first exception are cut to `max_message_length`.
/// - The request URL, the `Referer` header, and the URL fields of breadcrumb data are cut to
///   `max_url_length`.
///
/// A limit of `0` disables the respective truncation.
pub fn trim_event(event: &mut Event, max_message_length: usize, max_url_length: usize) {
    truncate_opt(&mut event.message, max_message_length);

    if let Some(exception) = event.exception.as_mut().and_then(|e| e.first_mut()) {
        truncate_opt(&mut exception.value, max_message_length);
    }

    if let Some(request) = &mut event.request {
        truncate_opt(&mut request.url, max_url_length);
        if let Some(referer) = request.headers.get_mut(REFERER_HEADER) {
            truncate(referer, max_url_length);
        }
    }

    if let Some(breadcrumbs) = &mut event.breadcrumbs {
        for crumb in &mut breadcrumbs.values {
            trim_breadcrumb(crumb, max_url_length);
        }
    }
}
