mod common;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use activity_board_bot::activity::{
    ActivityContext, ActivityState, CommandActivity, InboundEvent, Response, RouteOutcome,
    StartOutcome, Transition, TriggerContext, EXPIRED_NOTICE, FAILURE_NOTICE, MAX_HISTORY_DEPTH,
};
use activity_board_bot::error::ActivityError;
use activity_board_bot::gateway::{button, HostKey, MessageContent, MessagingGateway};
use common::{eventually, setup, setup_with_operators, tokens, CHAT, OPERATORS, USER};
use uuid::Uuid;

#[derive(Default)]
struct Counter {
    count: u32,
}

impl Counter {
    async fn render(&self, ctx: &mut ActivityContext<'_>) -> Result<(), ActivityError> {
        let content = MessageContent::text(format!("count {}", self.count)).with_buttons(vec![
            vec![button("+1", "inc")],
            vec![button("Child", "child"), button("Done", "done")],
        ]);
        ctx.update_host(content).await
    }
}

#[async_trait]
impl ActivityState for Counter {
    fn name(&self) -> &'static str {
        "counter"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        self.render(ctx).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        match response.token() {
            Some("inc") => {
                self.count += 1;
                self.render(ctx).await?;
                Ok(Transition::Stay)
            }
            Some("child") => Ok(Transition::push(Child { depth: 1 })),
            Some("done") => Ok(Transition::Done),
            Some("fail") => Err(ActivityError::Unexpected("counter exploded".to_string())),
            _ => Ok(Transition::Stay),
        }
    }
}

struct Child {
    depth: usize,
}

#[async_trait]
impl ActivityState for Child {
    fn name(&self) -> &'static str {
        "child"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        let content = MessageContent::text(format!("child {}", self.depth)).with_buttons(vec![vec![
            button("Back", "back"),
            button("Deeper", "deeper"),
            button("Root", "root"),
        ]]);
        ctx.update_host(content).await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        _ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        Ok(match response.token() {
            Some("back") => Transition::Back,
            Some("root") => Transition::Root,
            Some("deeper") => Transition::push(Child {
                depth: self.depth + 1,
            }),
            _ => Transition::Stay,
        })
    }
}

struct Ticker {
    delay: Duration,
}

#[async_trait]
impl ActivityState for Ticker {
    fn name(&self) -> &'static str {
        "ticker"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        ctx.schedule_timer("tick", self.delay);
        ctx.update_host(
            MessageContent::text("waiting").with_buttons(vec![vec![button("Stop", "stop")]]),
        )
        .await?;
        Ok(Transition::Stay)
    }

    async fn handle_response(
        &mut self,
        ctx: &mut ActivityContext<'_>,
        response: &Response,
    ) -> Result<Transition, ActivityError> {
        if response.timer() == Some("tick") {
            ctx.update_host(
                MessageContent::text("fired").with_buttons(vec![vec![button("Stop", "stop")]]),
            )
            .await?;
            return Ok(Transition::Stay);
        }
        if response.token() == Some("stop") {
            ctx.cancel_timer("tick");
            ctx.update_host(
                MessageContent::text("stopped").with_buttons(vec![vec![button("Stop", "stop")]]),
            )
            .await?;
        }
        Ok(Transition::Stay)
    }
}

/// Never renders anything.
struct Silent;

#[async_trait]
impl ActivityState for Silent {
    fn name(&self) -> &'static str {
        "silent"
    }

    async fn execute(&mut self, _ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        Ok(Transition::Stay)
    }
}

/// Renders a final message and finishes immediately.
struct OneShot;

#[async_trait]
impl ActivityState for OneShot {
    fn name(&self) -> &'static str {
        "one_shot"
    }

    async fn execute(&mut self, ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        ctx.update_host(MessageContent::text("all done")).await?;
        Ok(Transition::Done)
    }
}

/// Replaces itself forever.
struct Looper;

#[async_trait]
impl ActivityState for Looper {
    fn name(&self) -> &'static str {
        "looper"
    }

    async fn execute(&mut self, _ctx: &mut ActivityContext<'_>) -> Result<Transition, ActivityError> {
        Ok(Transition::replace(Looper))
    }
}

#[tokio::test]
async fn test_start_registers_activity_under_host_message() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    assert!(bot.registry.contains(key));
    assert_eq!(bot.text(key), "count 0");
    assert_eq!(tokens(&bot.content(key)), vec!["inc", "child", "done"]);

    let stats = bot.registry.stats();
    assert_eq!(stats.live, 1);
    assert_eq!(stats.started, 1);
    assert_eq!(stats.finished, 0);
    Ok(())
}

#[tokio::test]
async fn test_button_press_edits_host_message_in_place() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    assert_eq!(bot.press(key, "inc").await?, RouteOutcome::Handled);
    assert_eq!(bot.press(key, "inc").await?, RouteOutcome::Handled);

    assert_eq!(bot.text(key), "count 2");
    assert_eq!(bot.gateway.edit_count(key), 2);
    // still one physical message in the chat
    let (last, _) = bot.gateway.last_message_in(CHAT).unwrap();
    assert_eq!(last, key);
    Ok(())
}

#[tokio::test]
async fn test_unknown_token_is_ignored() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    assert_eq!(bot.press(key, "no-such-button").await?, RouteOutcome::Handled);

    assert_eq!(bot.text(key), "count 0");
    assert_eq!(bot.gateway.edit_count(key), 0);
    assert!(bot.registry.contains(key));
    Ok(())
}

#[tokio::test]
async fn test_press_on_untracked_message_is_expired() -> Result<()> {
    let bot = setup().await?;
    let stale = MessageContent::text("old menu").with_buttons(vec![vec![button("Go", "go")]]);
    let message_id = bot.gateway.send_message(CHAT, &stale).await?;
    let key = HostKey::new(CHAT, message_id);

    assert_eq!(bot.press(key, "go").await?, RouteOutcome::Expired);

    let content = bot.content(key);
    assert_eq!(content.text, EXPIRED_NOTICE);
    assert!(!content.has_buttons());
    assert!(bot.registry.is_empty());
    assert_eq!(bot.registry.stats().expired_interactions, 1);
    Ok(())
}

#[tokio::test]
async fn test_reply_to_untracked_message_is_unmatched() -> Result<()> {
    let bot = setup().await?;
    let message_id = bot
        .gateway
        .send_message(CHAT, &MessageContent::text("just chatting"))
        .await?;
    let key = HostKey::new(CHAT, message_id);

    assert_eq!(bot.reply(key, "hello").await?, RouteOutcome::Unmatched);

    assert_eq!(bot.text(key), "just chatting");
    assert_eq!(bot.gateway.edit_count(key), 0);
    assert_eq!(bot.registry.stats().expired_interactions, 0);
    Ok(())
}

#[tokio::test]
async fn test_done_strips_buttons_and_unregisters() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    assert_eq!(bot.press(key, "done").await?, RouteOutcome::Handled);

    let content = bot.content(key);
    assert_eq!(content.text, "count 0");
    assert!(!content.has_buttons());
    assert!(!bot.registry.contains(key));
    assert_eq!(bot.registry.stats().finished, 1);

    // the old keyboard is gone, but a client could still send the press
    assert_eq!(bot.press(key, "inc").await?, RouteOutcome::Expired);
    assert_eq!(bot.text(key), EXPIRED_NOTICE);
    Ok(())
}

#[tokio::test]
async fn test_push_and_back_restore_previous_screen() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;
    bot.press(key, "inc").await?;
    let before = bot.content(key);

    bot.press(key, "child").await?;
    assert_eq!(bot.text(key), "child 1");
    bot.press(key, "deeper").await?;
    assert_eq!(bot.text(key), "child 2");

    bot.press(key, "back").await?;
    assert_eq!(bot.text(key), "child 1");
    bot.press(key, "back").await?;
    assert_eq!(bot.content(key), before);
    Ok(())
}

#[tokio::test]
async fn test_root_returns_to_first_state() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    bot.press(key, "child").await?;
    bot.press(key, "deeper").await?;
    bot.press(key, "deeper").await?;
    assert_eq!(bot.text(key), "child 3");

    bot.press(key, "root").await?;
    assert_eq!(bot.text(key), "count 0");
    Ok(())
}

#[tokio::test]
async fn test_history_depth_is_bounded() -> Result<()> {
    let bot = setup().await?;
    let trigger = TriggerContext::in_chat(CHAT);
    let mut activity = CommandActivity::new(trigger, bot.registry.env().clone());
    activity.start(Box::new(Counter::default())).await?;

    let press = |token: &str| Response::Button {
        token: token.to_string(),
        user_id: USER,
    };
    activity.delegate_response(press("child")).await?;
    for _ in 0..(MAX_HISTORY_DEPTH * 2) {
        activity.delegate_response(press("deeper")).await?;
    }

    assert_eq!(activity.history_depth(), MAX_HISTORY_DEPTH);
    assert_eq!(activity.current_state(), Some("child"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_presses_are_serialized() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let registry = bot.registry.clone();
        tasks.push(tokio::spawn(async move {
            registry
                .route(InboundEvent::ButtonPressed {
                    chat_id: key.chat_id,
                    message_id: key.message_id,
                    token: "inc".to_string(),
                    user_id: USER,
                })
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await??, RouteOutcome::Handled);
    }

    assert_eq!(bot.text(key), "count 20");
    assert_eq!(bot.gateway.edit_count(key), 20);
    Ok(())
}

#[tokio::test]
async fn test_unrelated_activities_do_not_interfere() -> Result<()> {
    let bot = setup().await?;
    let first = bot.start(Counter::default()).await?;
    let second = bot.start(Counter::default()).await?;
    assert_ne!(first, second);

    bot.press(first, "inc").await?;
    bot.press(second, "done").await?;

    assert_eq!(bot.text(first), "count 1");
    assert!(bot.registry.contains(first));
    assert!(!bot.registry.contains(second));
    Ok(())
}

#[tokio::test]
async fn test_deleted_host_message_drops_activity() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;
    bot.gateway.forget(key);

    assert_eq!(bot.press(key, "inc").await?, RouteOutcome::Dropped);
    assert!(!bot.registry.contains(key));
    assert_eq!(bot.registry.stats().finished, 1);
    Ok(())
}

#[tokio::test]
async fn test_unexpected_error_shows_failure_notice() -> Result<()> {
    let bot = setup().await?;
    let key = bot.start(Counter::default()).await?;

    let result = bot.press(key, "fail").await;
    assert!(result.is_err());

    let content = bot.content(key);
    assert_eq!(content.text, FAILURE_NOTICE);
    assert!(!content.has_buttons());
    assert!(!bot.registry.contains(key));
    Ok(())
}

#[tokio::test]
async fn test_activity_without_host_message_is_not_registered() -> Result<()> {
    let bot = setup_with_operators(Some(OPERATORS)).await?;

    let outcome = bot
        .registry
        .start_activity(TriggerContext::in_chat(CHAT), Box::new(Silent))
        .await?;

    assert_eq!(outcome, StartOutcome::NoHostMessage);
    assert!(bot.registry.is_empty());
    assert!(bot.gateway.last_message_in(CHAT).is_none());
    let (_, warning) = bot.gateway.last_message_in(OPERATORS).unwrap();
    assert!(warning.text.contains("silent"));

    let stats = bot.registry.stats();
    assert_eq!((stats.live, stats.started, stats.finished), (0, 1, 1));
    Ok(())
}

#[tokio::test]
async fn test_activity_finishing_on_first_render_is_not_registered() -> Result<()> {
    let bot = setup().await?;

    let outcome = bot
        .registry
        .start_activity(TriggerContext::in_chat(CHAT), Box::new(OneShot))
        .await?;

    assert_eq!(outcome, StartOutcome::Finished);
    assert!(bot.registry.is_empty());
    let (_, message) = bot.gateway.last_message_in(CHAT).unwrap();
    assert_eq!(message.text, "all done");

    let stats = bot.registry.stats();
    assert_eq!((stats.live, stats.started, stats.finished), (0, 1, 1));
    Ok(())
}

#[tokio::test]
async fn test_endless_transitions_are_stopped() -> Result<()> {
    let bot = setup().await?;

    let result = bot
        .registry
        .start_activity(TriggerContext::in_chat(CHAT), Box::new(Looper))
        .await;

    assert!(matches!(result, Err(ActivityError::TransitionLoop { .. })));
    assert!(bot.registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_register_requires_live_host_message() -> Result<()> {
    let bot = setup().await?;
    let activity = CommandActivity::new(TriggerContext::in_chat(CHAT), bot.registry.env().clone());

    let result = bot.registry.register(activity).await;
    assert!(matches!(result, Err(ActivityError::Unexpected(_))));
    Ok(())
}

#[tokio::test]
async fn test_unregister_is_idempotent() -> Result<()> {
    let bot = setup().await?;
    let mut activity =
        CommandActivity::new(TriggerContext::in_chat(CHAT), bot.registry.env().clone());
    activity.start(Box::new(Counter::default())).await?;
    let id = activity.id();
    let key = bot.registry.register(activity).await?;

    assert!(!bot.registry.unregister(key, Uuid::new_v4()));
    assert!(bot.registry.contains(key));

    assert!(bot.registry.unregister(key, id));
    assert!(!bot.registry.unregister(key, id));
    assert_eq!(bot.registry.stats().finished, 1);
    Ok(())
}

#[tokio::test]
async fn test_evict_idle_tears_down_quiet_activities() -> Result<()> {
    let bot = setup().await?;
    let first = bot.start(Counter::default()).await?;
    let second = bot.start(Counter::default()).await?;

    assert_eq!(bot.registry.evict_idle(Duration::from_secs(3600)).await, 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bot.registry.evict_idle(Duration::from_millis(20)).await, 2);

    assert!(bot.registry.is_empty());
    assert!(!bot.content(first).has_buttons());
    assert!(!bot.content(second).has_buttons());
    Ok(())
}

#[tokio::test]
async fn test_timer_is_delivered_to_current_state() -> Result<()> {
    let bot = setup().await?;
    let key = bot
        .start(Ticker {
            delay: Duration::from_millis(30),
        })
        .await?;
    assert_eq!(bot.text(key), "waiting");

    assert!(eventually(Duration::from_secs(2), || bot.text(key) == "fired").await);
    assert!(bot.registry.contains(key));
    Ok(())
}

#[tokio::test]
async fn test_cancelled_timer_never_fires() -> Result<()> {
    let bot = setup().await?;
    let key = bot
        .start(Ticker {
            delay: Duration::from_millis(150),
        })
        .await?;

    bot.press(key, "stop").await?;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(bot.text(key), "stopped");
    Ok(())
}

#[tokio::test]
async fn test_timer_does_not_fire_after_teardown() -> Result<()> {
    let bot = setup().await?;
    let key = bot
        .start(Ticker {
            delay: Duration::from_millis(100),
        })
        .await?;

    let evicted = bot.registry.evict_idle(Duration::ZERO).await;
    assert_eq!(evicted, 1);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let content = bot.content(key);
    assert_eq!(content.text, "waiting");
    assert!(!content.has_buttons());
    assert_eq!(bot.registry.stats().finished, 1);
    Ok(())
}
