//! Chat command parsing and handling.
//!
//! The messaging layer forwards raw message text here; this module decides
//! whether it is a command, runs it against the registry/store, and renders
//! the reply the messaging layer should post back. Delivery itself is not
//! this module's problem.

use chrono::Duration;
use chrono_tz::Tz;
use focusbot_core::clock::{format_wall_time, Clock};
use focusbot_core::{Error, Participant, SessionRegistry, StatsStore};
use std::sync::Arc;
use tracing::error;

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartFocus { minutes: i64 },
    JoinFocus,
    LeaveFocus,
    Status,
    EndFocus,
    MyStats,
    Leaderboard,
}

/// Outcome of scanning one message for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A well-formed command.
    Command(Command),
    /// A known command with unusable arguments; reply with the hint.
    Usage(String),
    /// Not a command, or not one of ours. Unknown commands stay silent.
    Ignored,
}

/// Scan `text` for a command behind `prefix`.
pub fn parse(prefix: &str, text: &str) -> Parsed {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(prefix) else {
        return Parsed::Ignored;
    };

    let mut parts = rest.split_whitespace();
    let Some(name) = parts.next() else {
        return Parsed::Ignored;
    };

    match name {
        "startfocus" => match parts.next() {
            None => Parsed::Usage(format!(
                "⚠️ Missing argument. Use `{prefix}startfocus <minutes>` (example: `{prefix}startfocus 25`)."
            )),
            Some(raw) => match raw.parse::<i64>() {
                Ok(minutes) => Parsed::Command(Command::StartFocus { minutes }),
                Err(_) => Parsed::Usage("⚠️ Please provide a valid number of minutes.".to_string()),
            },
        },
        "joinfocus" => Parsed::Command(Command::JoinFocus),
        "leavefocus" => Parsed::Command(Command::LeaveFocus),
        "status" => Parsed::Command(Command::Status),
        "endfocus" => Parsed::Command(Command::EndFocus),
        "mystats" => Parsed::Command(Command::MyStats),
        "leaderboard" => Parsed::Command(Command::Leaderboard),
        _ => Parsed::Ignored,
    }
}

/// Who issued a command, and where.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub room_id: i64,
    pub user: Participant,
    /// Room-management capability, supplied by the messaging layer.
    pub privileged: bool,
}

/// Runs commands against the session engine and renders replies.
pub struct CommandHandler {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn StatsStore>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    prefix: String,
}

impl CommandHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn StatsStore>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
            timezone,
            prefix: prefix.into(),
        }
    }

    /// Handle one inbound message. Returns the reply to post, or None when
    /// the message is not a command for us.
    pub async fn dispatch(&self, ctx: &CommandContext, text: &str) -> Option<String> {
        match parse(&self.prefix, text) {
            Parsed::Ignored => None,
            Parsed::Usage(hint) => Some(hint),
            Parsed::Command(cmd) => Some(self.handle(ctx, cmd).await),
        }
    }

    async fn handle(&self, ctx: &CommandContext, cmd: Command) -> String {
        match cmd {
            Command::StartFocus { minutes } => self.start_focus(ctx, minutes).await,
            Command::JoinFocus => self.join_focus(ctx),
            Command::LeaveFocus => self.leave_focus(ctx).await,
            Command::Status => self.status(ctx),
            Command::EndFocus => self.end_focus(ctx).await,
            Command::MyStats => self.my_stats(ctx).await,
            Command::Leaderboard => self.leaderboard().await,
        }
    }

    async fn start_focus(&self, ctx: &CommandContext, minutes: i64) -> String {
        let now = self.clock.now();
        match self
            .registry
            .create(ctx.room_id, ctx.user.clone(), minutes, now)
            .await
        {
            Ok(view) => format!(
                "🧠 Focus session started for {} minutes by {}! \
                 Join with `{}joinfocus`. Ends at {} 🕒",
                minutes,
                ctx.user.display_name,
                self.prefix,
                format_wall_time(view.end_time, self.timezone)
            ),
            Err(e) => self.render_error(ctx, e),
        }
    }

    fn join_focus(&self, ctx: &CommandContext) -> String {
        let now = self.clock.now();
        match self.registry.join(ctx.room_id, ctx.user.clone(), now) {
            Ok(outcome) => format!(
                "✅ {} joined the focus session! ({} participants) Ends at {}.",
                ctx.user.display_name,
                outcome.member_count,
                format_wall_time(outcome.end_time, self.timezone)
            ),
            Err(e) => self.render_error(ctx, e),
        }
    }

    async fn leave_focus(&self, ctx: &CommandContext) -> String {
        let now = self.clock.now();
        match self.registry.leave(ctx.room_id, ctx.user.user_id, now).await {
            Ok(outcome) => {
                let mut reply = format!(
                    "👋 {} left the focus session. ({} participants remaining)",
                    ctx.user.display_name, outcome.remaining
                );
                if outcome.session_ended {
                    reply.push_str("\n📪 Focus session over - no participants left.");
                }
                reply
            }
            Err(e) => self.render_error(ctx, e),
        }
    }

    fn status(&self, ctx: &CommandContext) -> String {
        let now = self.clock.now();
        match self.registry.status(ctx.room_id, now) {
            Ok(None) => "💤 No focus session is running in this room.".to_string(),
            Ok(Some(view)) => {
                let names: Vec<&str> = view
                    .members
                    .iter()
                    .map(|m| m.display_name.as_str())
                    .collect();
                format!(
                    "🧠 Focus Session In Progress\n\
                     ⏰ Remaining: {}\n\
                     👥 Participants: {} — {}\n\
                     🚀 Creator: {}\n\
                     🏁 Ends at {}",
                    format_remaining(view.remaining_seconds),
                    view.member_count,
                    names.join(", "),
                    view.creator.display_name,
                    format_wall_time(view.end_time, self.timezone)
                )
            }
            Err(e) => self.render_error(ctx, e),
        }
    }

    async fn end_focus(&self, ctx: &CommandContext) -> String {
        let now = self.clock.now();
        match self
            .registry
            .end(ctx.room_id, ctx.user.user_id, now, ctx.privileged)
            .await
        {
            Ok(outcome) => format!(
                "❌ {} ended the focus session. ({} participants) Rest well! 💤",
                ctx.user.display_name, outcome.participant_count
            ),
            Err(e) => self.render_error(ctx, e),
        }
    }

    async fn my_stats(&self, ctx: &CommandContext) -> String {
        let now = self.clock.now();
        let stats = match self.store.user_stats(ctx.user.user_id).await {
            Ok(stats) => stats,
            Err(e) => return self.render_error(ctx, e),
        };
        let Some(stats) = stats else {
            return format!(
                "📊 {}, you have no focus statistics yet. \
                 Start your first session with `{}startfocus <minutes>`!",
                ctx.user.display_name, self.prefix
            );
        };

        let week_start = now - Duration::days(7);
        let weekly_minutes: i64 = match self
            .store
            .completed_sessions_since(ctx.user.user_id, week_start)
            .await
        {
            Ok(sessions) => sessions.iter().map(|s| s.duration_minutes).sum(),
            Err(e) => return self.render_error(ctx, e),
        };

        let mut reply = format!(
            "📊 Your Focus Statistics\n\
             🧠 Total focus: **{}**\n\
             🔥 Completed sessions: **{}**\n\
             📅 This week: **{}**",
            format_hours_minutes(stats.total_minutes),
            stats.sessions_completed,
            format_hours_minutes(weekly_minutes)
        );

        if stats.total_minutes >= 600 {
            reply.push_str("\n💪 More than 10 hours in focus mode — keep it up, boss 👊");
        } else if weekly_minutes >= 300 {
            reply.push_str("\n🚀 Excellent focus week! Keep going 🔥");
        }
        reply
    }

    async fn leaderboard(&self) -> String {
        let top = match self.store.top_users(10).await {
            Ok(top) => top,
            Err(e) => {
                error!(error = %e, "leaderboard query failed");
                return GENERIC_FAILURE.to_string();
            }
        };
        if top.is_empty() {
            return format!(
                "📉 No focus scores recorded yet. \
                 Start your first session with `{}startfocus <minutes>`!",
                self.prefix
            );
        }

        let medals = ["🥇", "🥈", "🥉"];
        let mut reply = "🏆 Focus Leaderboard — Who's the most focused?\n".to_string();
        for (i, user) in top.iter().enumerate() {
            let rank = medals
                .get(i)
                .map(|m| (*m).to_string())
                .unwrap_or_else(|| format!("**{}.**", i + 1));
            reply.push_str(&format!(
                "{} {} — {} ({} sessions)\n",
                rank,
                user.username,
                format_hours_minutes(user.total_minutes),
                user.sessions_completed
            ));
        }

        let total_minutes: i64 = top.iter().map(|u| u.total_minutes).sum();
        reply.push_str(&format!(
            "📈 Server stats: **{}** active users · **{}h** of total focus",
            top.len(),
            total_minutes / 60
        ));
        reply
    }

    /// Map an operation error to a reply. User-level outcomes become
    /// informational messages; anything else is logged and degraded.
    fn render_error(&self, ctx: &CommandContext, err: Error) -> String {
        match err {
            Error::InvalidDuration { .. } => {
                "⚠️ Duration must be between 1 and 480 minutes (8 hours maximum).".to_string()
            }
            Error::SessionAlreadyActive { minutes_remaining } => format!(
                "⚠️ A focus session is already running! {minutes_remaining} minutes remaining."
            ),
            Error::NoActiveSession => format!(
                "⚠️ No focus session is running. Start one with `{}startfocus <minutes>`.",
                self.prefix
            ),
            Error::SessionJustExpired => format!(
                "⚠️ The focus session just ended. Start a new one with `{}startfocus <minutes>`.",
                self.prefix
            ),
            Error::AlreadyMember => format!(
                "✅ {}, you are already part of this focus session!",
                ctx.user.display_name
            ),
            Error::NotMember => "⚠️ You are not part of the current focus session.".to_string(),
            Error::NotAuthorized => {
                "⚠️ Only the session creator or a moderator can end the session.".to_string()
            }
            other => {
                error!(room_id = ctx.room_id, error = %other, "command failed");
                GENERIC_FAILURE.to_string()
            }
        }
    }
}

const GENERIC_FAILURE: &str = "⚠️ Something went wrong, please try again later.";

fn format_hours_minutes(total_minutes: i64) -> String {
    format!("{}h {}min", total_minutes / 60, total_minutes % 60)
}

fn format_remaining(seconds: i64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use focusbot_core::types::{FinalizedSession, SessionStatus};
    use focusbot_core::SqliteStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn handler() -> (CommandHandler, Arc<SqliteStore>) {
        handler_at(t0())
    }

    fn handler_at(now: DateTime<Utc>) -> (CommandHandler, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let registry = Arc::new(SessionRegistry::new(store.clone()));
        let handler = CommandHandler::new(
            registry,
            store.clone(),
            Arc::new(FrozenClock(now)),
            chrono_tz::UTC,
            "/",
        );
        (handler, store)
    }

    fn ctx(user_id: i64, name: &str) -> CommandContext {
        CommandContext {
            room_id: 1,
            user: Participant::new(user_id, name),
            privileged: false,
        }
    }

    // ── parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse("/", "/startfocus 25"),
            Parsed::Command(Command::StartFocus { minutes: 25 })
        );
        assert_eq!(parse("/", "/joinfocus"), Parsed::Command(Command::JoinFocus));
        assert_eq!(parse("/", "  /leavefocus  "), Parsed::Command(Command::LeaveFocus));
        assert_eq!(parse("/", "/status"), Parsed::Command(Command::Status));
        assert_eq!(parse("/", "/endfocus"), Parsed::Command(Command::EndFocus));
        assert_eq!(parse("/", "/mystats"), Parsed::Command(Command::MyStats));
        assert_eq!(parse("/", "/leaderboard"), Parsed::Command(Command::Leaderboard));
    }

    #[test]
    fn test_parse_respects_prefix() {
        assert_eq!(parse("!", "!status"), Parsed::Command(Command::Status));
        assert_eq!(parse("!", "/status"), Parsed::Ignored);
        assert_eq!(parse("/", "status"), Parsed::Ignored);
    }

    #[test]
    fn test_parse_ignores_chatter_and_unknown_commands() {
        assert_eq!(parse("/", "good morning"), Parsed::Ignored);
        assert_eq!(parse("/", "/frobnicate"), Parsed::Ignored);
        assert_eq!(parse("/", ""), Parsed::Ignored);
        assert_eq!(parse("/", "/"), Parsed::Ignored);
    }

    #[test]
    fn test_parse_startfocus_argument_errors() {
        match parse("/", "/startfocus") {
            Parsed::Usage(hint) => assert!(hint.contains("/startfocus <minutes>")),
            other => panic!("expected usage hint, got {other:?}"),
        }
        match parse("/", "/startfocus soon") {
            Parsed::Usage(hint) => assert!(hint.contains("valid number")),
            other => panic!("expected usage hint, got {other:?}"),
        }
    }

    // ── handling ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_and_duplicate_start() {
        let (handler, _) = handler();
        let reply = handler
            .dispatch(&ctx(10, "ada"), "/startfocus 25")
            .await
            .unwrap();
        assert!(reply.contains("25 minutes"));
        assert!(reply.contains("ada"));
        assert!(reply.contains("12:25 (UTC)"));

        let reply = handler
            .dispatch(&ctx(11, "grace"), "/startfocus 30")
            .await
            .unwrap();
        assert!(reply.contains("already running"));
        assert!(reply.contains("25 minutes remaining"));
    }

    #[tokio::test]
    async fn test_start_rejects_out_of_range_duration() {
        let (handler, _) = handler();
        for text in ["/startfocus 0", "/startfocus 481"] {
            let reply = handler.dispatch(&ctx(10, "ada"), text).await.unwrap();
            assert!(reply.contains("between 1 and 480"), "got: {reply}");
        }
    }

    #[tokio::test]
    async fn test_join_leave_flow() {
        let (handler, _) = handler();
        handler
            .dispatch(&ctx(10, "ada"), "/startfocus 25")
            .await
            .unwrap();

        let reply = handler.dispatch(&ctx(11, "grace"), "/joinfocus").await.unwrap();
        assert!(reply.contains("grace joined"));
        assert!(reply.contains("(2 participants)"));

        let reply = handler.dispatch(&ctx(11, "grace"), "/joinfocus").await.unwrap();
        assert!(reply.contains("already part"));

        let reply = handler.dispatch(&ctx(11, "grace"), "/leavefocus").await.unwrap();
        assert!(reply.contains("grace left"));
        assert!(!reply.contains("no participants left"));

        let reply = handler.dispatch(&ctx(10, "ada"), "/leavefocus").await.unwrap();
        assert!(reply.contains("no participants left"));
    }

    #[tokio::test]
    async fn test_join_without_session_points_at_startfocus() {
        let (handler, _) = handler();
        let reply = handler.dispatch(&ctx(11, "grace"), "/joinfocus").await.unwrap();
        assert!(reply.contains("/startfocus <minutes>"));
    }

    #[tokio::test]
    async fn test_status_rendering() {
        let (handler, _) = handler();
        let reply = handler.dispatch(&ctx(10, "ada"), "/status").await.unwrap();
        assert!(reply.contains("No focus session"));

        handler
            .dispatch(&ctx(10, "ada"), "/startfocus 25")
            .await
            .unwrap();
        handler.dispatch(&ctx(11, "grace"), "/joinfocus").await.unwrap();

        let reply = handler.dispatch(&ctx(10, "ada"), "/status").await.unwrap();
        assert!(reply.contains("25m 0s"));
        assert!(reply.contains("Participants: 2"));
        assert!(reply.contains("ada, grace"));
        assert!(reply.contains("Creator: ada"));
    }

    #[tokio::test]
    async fn test_end_authorization() {
        let (handler, _) = handler();
        handler
            .dispatch(&ctx(10, "ada"), "/startfocus 25")
            .await
            .unwrap();

        let reply = handler.dispatch(&ctx(11, "grace"), "/endfocus").await.unwrap();
        assert!(reply.contains("Only the session creator or a moderator"));

        let mut moderator = ctx(11, "grace");
        moderator.privileged = true;
        let reply = handler.dispatch(&moderator, "/endfocus").await.unwrap();
        assert!(reply.contains("grace ended the focus session"));
    }

    #[tokio::test]
    async fn test_mystats_empty_and_populated() {
        let (handler, store) = handler();
        let reply = handler.dispatch(&ctx(10, "ada"), "/mystats").await.unwrap();
        assert!(reply.contains("no focus statistics yet"));

        store
            .finalize_session(&FinalizedSession {
                room_id: 1,
                record_id: None,
                status: SessionStatus::Completed,
                ended_at: t0() - Duration::days(1),
                duration_minutes: 90,
                members: vec![Participant::new(10, "ada")],
            })
            .await
            .unwrap();

        let reply = handler.dispatch(&ctx(10, "ada"), "/mystats").await.unwrap();
        assert!(reply.contains("1h 30min"));
        assert!(reply.contains("**1**"));
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_with_medals() {
        let (handler, store) = handler();
        let reply = handler.dispatch(&ctx(10, "ada"), "/leaderboard").await.unwrap();
        assert!(reply.contains("No focus scores"));

        for (user_id, name, minutes) in [(10, "ada", 120), (11, "grace", 60), (12, "joan", 30)] {
            store
                .finalize_session(&FinalizedSession {
                    room_id: 1,
                    record_id: None,
                    status: SessionStatus::Completed,
                    ended_at: t0(),
                    duration_minutes: minutes,
                    members: vec![Participant::new(user_id, name)],
                })
                .await
                .unwrap();
        }

        let reply = handler.dispatch(&ctx(10, "ada"), "/leaderboard").await.unwrap();
        assert!(reply.contains("🥇 ada — 2h 0min"));
        assert!(reply.contains("🥈 grace — 1h 0min"));
        assert!(reply.contains("🥉 joan — 0h 30min"));
        assert!(reply.contains("**3** active users"));
        assert!(reply.contains("**3h** of total focus"));
    }

    #[tokio::test]
    async fn test_non_commands_get_no_reply() {
        let (handler, _) = handler();
        assert!(handler.dispatch(&ctx(10, "ada"), "hello").await.is_none());
        assert!(handler.dispatch(&ctx(10, "ada"), "/unknown").await.is_none());
    }
}
