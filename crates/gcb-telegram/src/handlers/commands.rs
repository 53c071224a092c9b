use std::sync::Arc;

use teloxide::{prelude::*, types::ChatAction};

use gcb_core::{domain::ChatId, formatting::escape_html, pipeline::CycleOutcome};

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn help_html(poll_minutes: u64) -> String {
    format!(
        "🎁 <b>Genshin Impact Code Watcher</b>\n\n\
New redemption codes are posted to the channel automatically \
(checked every {poll_minutes} min).\n\n\
<b>📋 Commands:</b>\n\
/codes - Show all available codes\n\
/status - Show watcher status\n\
/check - Check the feed for new codes now\n\
/help - Show this help message"
    )
}

fn check_reply_html(outcome: &CycleOutcome, summary: &str, delivered: &[String]) -> String {
    let icon = match outcome {
        CycleOutcome::Completed => "✅",
        CycleOutcome::FetchFailed(_) | CycleOutcome::StoreUnavailable(_) => "⚠️",
    };
    let mut out = format!("{icon} Check finished: {}", escape_html(summary));
    if !delivered.is_empty() {
        let codes = delivered
            .iter()
            .map(|c| format!("<code>{}</code>", escape_html(c)))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("\nPosted: {codes}"));
    }
    out
}

async fn show_typing(bot: &Bot, chat: teloxide::types::ChatId) {
    if let Err(e) = bot.send_chat_action(chat, ChatAction::Typing).await {
        tracing::debug!(chat_id = chat.0, error = %e, "failed to send typing action");
    }
}

async fn reply(state: &AppState, chat_id: i64, html: &str) {
    if let Err(e) = state.messenger.send_html(ChatId(chat_id), html).await {
        tracing::warn!(chat_id, error = %e, "failed to send command reply");
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;
    let (cmd, _arg) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => {
            let minutes = state.cfg.poll_interval.as_secs() / 60;
            reply(&state, chat_id, &help_html(minutes.max(1))).await;
        }

        "codes" | "genshin_codes" => {
            // Feed requests can take a few seconds; show activity meanwhile.
            show_typing(&bot, msg.chat.id).await;
            let body = state.query.respond().await;
            reply(&state, chat_id, &body).await;
        }

        "status" => {
            let body = state.poller.status_html().await;
            reply(&state, chat_id, &body).await;
        }

        "check" => {
            show_typing(&bot, msg.chat.id).await;
            let report = state.poller.run_once().await;
            let body = check_reply_html(&report.outcome, &report.summary(), &report.delivered);
            reply(&state, chat_id, &body).await;
        }

        other => {
            tracing::debug!(command = other, "ignoring unknown command");
        }
    }

    Ok(())
}
