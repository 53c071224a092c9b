//! Formatting utilities (Telegram HTML for announcements and code listings).

use reqwest::Url;

use crate::domain::CodeEntry;

/// Marker appended to any text cut at the message limit.
pub const TRUNCATION_MARKER: &str = "\n...";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape `text` and cut the escaped form to at most `max_chars` characters,
/// appending [`TRUNCATION_MARKER`] when cut. Never splits an entity like `&amp;`.
pub fn truncate_escaped(text: &str, max_chars: usize) -> String {
    let escaped = escape_html(text);
    if escaped.chars().count() <= max_chars {
        return escaped;
    }
    let mut out = escaped.chars().take(max_chars).collect::<String>();
    if let Some(amp) = out.rfind('&') {
        if !out[amp..].contains(';') {
            out.truncate(amp);
        }
    }
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Join HTML lines, keeping whole lines only so tags are never split.
///
/// The result, including a trailing [`TRUNCATION_MARKER`] when lines were
/// dropped, is at most `max_chars` characters.
pub fn join_lines_within(lines: &[String], max_chars: usize) -> String {
    let total = lines.iter().map(|l| l.chars().count()).sum::<usize>()
        + lines.len().saturating_sub(1);
    if total <= max_chars {
        return lines.join("\n");
    }

    let budget = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut out = String::new();
    let mut used = 0usize;
    for (idx, line) in lines.iter().enumerate() {
        let sep = usize::from(idx > 0);
        let len = line.chars().count();
        if used + sep + len > budget {
            break;
        }
        if sep == 1 {
            out.push('\n');
        }
        out.push_str(line);
        used += sep + len;
    }
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Redemption link for a code: `base` with `code=<code>` appended to its query.
pub fn redeem_link(base: &Url, code: &str) -> String {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("code", code);
    url.to_string()
}

/// The one message sent to the channel for a never-before-seen code.
///
/// `max_chars` bounds the HTML source; only the rewards text is shortened.
pub fn format_announcement(entry: &CodeEntry, redeem_base: &Url, max_chars: usize) -> String {
    let code = escape_html(&entry.code);
    let link = escape_html(&redeem_link(redeem_base, &entry.code));
    let head = format!("🎁 <b>New Genshin Impact Code!</b>\n<b>Code:</b> <code>{code}</code>\n");
    let tail = format!("\n🔗 {link}");

    let label = "<b>Rewards:</b> ";
    let fixed = head.chars().count() + label.chars().count() + tail.chars().count();
    let budget = max_chars.saturating_sub(fixed + TRUNCATION_MARKER.len());
    let rewards = truncate_escaped(&entry.rewards, budget);

    format!("{head}{label}{rewards}{tail}")
}

/// One line of the on-demand listing.
pub fn format_code_line(entry: &CodeEntry) -> String {
    format!(
        "<code>{}</code> — {}",
        escape_html(&entry.code),
        escape_html(&entry.rewards)
    )
}

/// Like [`format_code_line`], shortening the rewards so the line fits `max_chars`.
fn format_code_line_within(entry: &CodeEntry, max_chars: usize) -> String {
    let prefix = format!("<code>{}</code> — ", escape_html(&entry.code));
    let budget = max_chars.saturating_sub(prefix.chars().count() + TRUNCATION_MARKER.len());
    format!("{prefix}{}", truncate_escaped(&entry.rewards, budget))
}

/// Full response for the on-demand query: header plus one line per code.
///
/// The whole reply stays within `max_chars`. When even the first line does
/// not fit, that line is shown with its rewards cut instead of being dropped.
pub fn format_code_list(entries: &[CodeEntry], max_chars: usize) -> String {
    let header = "🎁 <b>Available Genshin Impact Codes</b>";
    let Some(first) = entries.first() else {
        return format!("{header}\nNo codes are currently listed.");
    };

    let body_budget = max_chars.saturating_sub(header.chars().count() + 1);
    let lines = entries.iter().map(format_code_line).collect::<Vec<_>>();

    let reserve = if lines.len() > 1 { TRUNCATION_MARKER.len() } else { 0 };
    if lines[0].chars().count() + reserve > body_budget {
        return format!("{header}\n{}", format_code_line_within(first, body_budget));
    }

    format!("{header}\n{}", join_lines_within(&lines, body_budget))
}
