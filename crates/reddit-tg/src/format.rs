//! Rendering of the bot replies. The output is Telegram's MarkdownV2.

use crate::activity::UserActivity;
use crate::prelude::*;
use crate::reddit::{RecordKind, RedditRecord, Removal};
use crate::util::display::human_duration;
use itertools::Itertools;
use strum::IntoEnumIterator;
use teloxide::utils::markdown;

/// Telegram doesn't accept messages longer than this many UTF-16 code units
pub(crate) const MESSAGE_BUDGET: usize = 4096;

const TITLE_MAX_CHARS: usize = 200;
const COMMENT_BODY_MAX_CHARS: usize = 150;

const SEPARATOR: &str = "\n\n";

/// Renders the numbered list of records under a bold header. Records that
/// don't fit into `budget` UTF-16 code units are dropped from the end and replaced with
/// a `+N more` line. The budget must leave room for the header.
pub(crate) fn render_listing(header: &str, records: &[RedditRecord], budget: usize) -> String {
    let head = markdown::bold(&markdown::escape(header));

    if records.is_empty() {
        return format!("{head}{SEPARATOR}{}", markdown::escape("No results 🤷"));
    }

    fit_entries(head, render_records(records), budget)
}

pub(crate) fn render_user_activity(activity: &UserActivity, budget: usize) -> String {
    let profile = &activity.profile;
    let name = markdown::bold(&markdown::escape(&format!("u/{}", profile.name)));

    if profile.is_suspended {
        return format!("{name} {}", markdown::escape("is suspended 🚫"));
    }

    let mut lines = vec![format!(
        "{name}{}",
        markdown::escape(&format!(" · last {} days", activity.days.get()))
    )];

    let mut push = |line: String| lines.push(markdown::escape(&line));

    if let Some(created) = profile.created {
        let age = (activity.now - created).to_std().unwrap_or_default();
        push(format!("Account age: {}", human_duration(age)));
    }

    push(format!(
        "Karma: {} post · {} comment",
        profile.link_karma, profile.comment_karma
    ));
    push(format!(
        "Posts: {} · Comments: {}",
        activity.posts_submitted, activity.comments_written
    ));
    push(format!(
        "Received: ⬆️ {} · 💬 {}",
        activity.upvotes_received, activity.comments_received
    ));

    let removed_by = Removal::iter()
        .map(|removal| format!("{}: {}", removal.label(), activity.removed_count(removal)))
        .join(", ");

    push(format!(
        "🚫 Removed posts: {} ({removed_by})",
        activity.removed_posts.len()
    ));

    let mut head = lines.join("\n");

    if !activity.top_posts.is_empty() {
        head.push_str(SEPARATOR);
        head.push_str(&markdown::bold("Top posts"));
        for entry in render_records(&activity.top_posts) {
            head.push_str(SEPARATOR);
            head.push_str(&entry);
        }
    }

    if activity.removed_posts.is_empty() {
        return head;
    }

    head.push_str(SEPARATOR);
    head.push_str(&markdown::bold("Removed posts"));

    fit_entries(head, render_records(&activity.removed_posts), budget)
}

fn render_records(records: &[RedditRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| render_record(i + 1, record))
        .collect()
}

fn render_record(position: usize, record: &RedditRecord) -> String {
    let url = format!("https://www.reddit.com{}", record.permalink);

    let (text, max_chars) = match record.kind {
        RecordKind::Comment => (&record.body, COMMENT_BODY_MAX_CHARS),
        RecordKind::Submission | RecordKind::ListingEntry => (&record.title, TITLE_MAX_CHARS),
    };

    let text = text.split_whitespace().join(" ");
    let text = if text.is_empty() {
        "(no text)".to_owned()
    } else {
        text.truncate_chars(max_chars)
    };

    let mut details = vec![format!("⬆️ {}", record.score)];

    if let Some(num_comments) = record.num_comments {
        details.push(format!("💬 {num_comments}"));
    }

    details.push(format!("r/{}", record.subreddit));

    if let Some(removal) = record.removal {
        details.push(format!("🚫 removed ({})", removal.label()));
    }

    if record.kind == RecordKind::Comment {
        details.push(format!("on “{}”", record.title.truncate_chars(TITLE_MAX_CHARS)));
    }

    format!(
        "{position}\\. {}\n{}",
        markdown::link(&url, &markdown::escape(&text)),
        markdown::escape(&details.join(" · "))
    )
}

/// Appends as many entries as fit into the budget, always keeping room for
/// the `+N more` line that counts the dropped ones.
fn fit_entries(head: String, entries: Vec<String>, budget: usize) -> String {
    let total = entries.len();

    let mut text = head;
    let mut len = text_len(&text);
    let mut shown = 0;

    for entry in &entries {
        let entry_len = SEPARATOR.len() + text_len(entry);
        let dropped_after = total - shown - 1;

        if len + entry_len + more_len(dropped_after) > budget {
            break;
        }

        text.push_str(SEPARATOR);
        text.push_str(entry);
        len += entry_len;
        shown += 1;
    }

    let dropped = total - shown;
    if dropped > 0 {
        text.push_str(SEPARATOR);
        text.push_str(&more(dropped));
    }

    text
}

fn more(dropped: usize) -> String {
    markdown::escape(&format!("+{dropped} more"))
}

fn more_len(dropped: usize) -> usize {
    if dropped == 0 {
        return 0;
    }
    SEPARATOR.len() + text_len(&more(dropped))
}

/// Telegram measures messages in UTF-16 code units. The markup only shrinks
/// when parsed, so measuring the raw text is an upper bound.
fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}
