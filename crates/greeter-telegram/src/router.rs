use std::{future::Future, sync::Arc};

use anyhow::Context;
use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
    types::UserId,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use greeter_core::{config::Config, messaging::port::MessagingPort, responder::AutoResponder};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<AutoResponder>,
    /// The bot's own user id, used to recognise self-sent messages.
    pub me: UserId,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    info!("🚀 starting bot...");
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot
        .get_me()
        .await
        .context("Telegram authentication failed, check TELEGRAM_BOT_TOKEN")?;

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    check_welcome_length(&cfg, messenger.as_ref());

    let responder = Arc::new(AutoResponder::from_config(&cfg, messenger)?);

    info!(
        bot = %me.username(),
        restaurant = %responder.restaurant_name(),
        cooldown_hours = cfg.cooldown.as_secs() / 3600,
        audit_log = ?cfg.audit_log_path,
        "✅ bot connected"
    );
    info!("📞 waiting for messages...");

    let state = Arc::new(AppState {
        responder,
        me: me.id,
    });

    let handler = Update::filter_message().endpoint(handlers::handle_message);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();
    shutdown_on_sigterm(dispatcher.shutdown_token());
    dispatcher.dispatch().await;

    info!("🛑 bot stopped");
    Ok(())
}

/// Container runtimes and service managers stop the bot with SIGTERM rather
/// than Ctrl-C; treat it the same way.
fn shutdown_on_sigterm(token: ShutdownToken) {
    #[cfg(unix)]
    {
        let stop = async move {
            info!("🛑 SIGTERM received, shutting down...");
            match token.shutdown() {
                Ok(done) => done.await,
                Err(_) => warn!("dispatcher was not running at SIGTERM"),
            }
        };
        if let Err(e) = on_sigterm(stop) {
            error!(error = %e, "cannot install SIGTERM handler");
        }
    }
    #[cfg(not(unix))]
    let _ = token;
}

/// Run `action` once the process receives SIGTERM.
#[cfg(unix)]
fn on_sigterm<F>(action: F) -> std::io::Result<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(tokio::spawn(async move {
        if sigterm.recv().await.is_some() {
            action.await;
        }
    }))
}

fn check_welcome_length(cfg: &Config, messenger: &dyn MessagingPort) {
    let len = welcome_len(cfg);
    let max = messenger.capabilities().max_message_len;
    if len > max {
        warn!(
            len,
            max, "welcome message exceeds the messenger limit; replies will fail"
        );
    }
}

fn welcome_len(cfg: &Config) -> usize {
    cfg.welcome_text().encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(restaurant: &str) -> Config {
        Config::from_lookup(|k| match k {
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
            "MENU_URL" => Some("https://x.test/m".to_string()),
            "RESTAURANT_NAME" => Some(restaurant.to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn default_welcome_fits_in_one_message() {
        assert!(welcome_len(&cfg("Casa Test")) <= crate::TELEGRAM_MESSAGE_LIMIT);
    }

    #[test]
    fn welcome_length_counts_utf16_units() {
        let short = welcome_len(&cfg("a"));
        let emoji = welcome_len(&cfg("🍕"));
        // Two occurrences of the name, each a surrogate pair.
        assert_eq!(emoji, short + 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_triggers_shutdown_action() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        on_sigterm(async move {
            let _ = tx.send(());
        })
        .unwrap();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(std::time::Duration::from_secs(5), rx)
            .await
            .expect("shutdown action ran")
            .unwrap();
    }
}
