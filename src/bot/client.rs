//! Client construction - framework options, error hook, prefix resolution and shutdown.

use crate::{
    bot::{BotData, commands, handlers::events},
    config::AppConfig,
    core::settings::DEFAULT_PREFIX,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            warn!("Error in command `{}`: {error}", ctx.command().name);
            if let Err(e) = ctx.say(error.user_message()).await {
                error!("Failed to send error message: {e}");
            }
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let reply = poise::CreateReply::default()
                .content(format!(
                    "⏳ Slow down! Try again in {:.1}s.",
                    remaining_cooldown.as_secs_f64()
                ))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send cooldown message: {e}");
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!("Error handling {}: {error}", event.snake_case_name());
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Prefix for text commands: the guild's configured one, or the default in DMs.
async fn dynamic_prefix(
    ctx: poise::PartialContext<'_, BotData, Error>,
) -> Result<Option<String>> {
    let prefix = match ctx.guild_id {
        Some(guild_id) => {
            ctx.data
                .prefix
                .cache()
                .get_or_default(guild_id.get())
                .await
                .prefix
        }
        None => DEFAULT_PREFIX.to_string(),
    };
    Ok(Some(prefix))
}

/// Every registered command.
fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        commands::ping(),
        commands::help(),
        commands::prefix(),
        commands::filter(),
        commands::units(),
        commands::settings(),
        commands::reactionrole(),
        commands::calc(),
        commands::calc_vars(),
        commands::calc_clear(),
        commands::temperature(),
        commands::speed(),
        commands::tictactoe(),
    ]
}

/// Runs the bot until the gateway connection ends or Ctrl-C is pressed.
///
/// After the shards stop, every settings loop performs its final flush.
#[instrument(skip_all)]
pub async fn run_bot(token: String, config: AppConfig, db: DatabaseConnection) -> Result<()> {
    let data = BotData::new(&db, &config);
    let setup_data = data.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                dynamic_prefix: Some(|ctx| Box::pin(dynamic_prefix(ctx))),
                mention_as_prefix: true,
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Registered {} commands globally", framework.options().commands.len());

                let guild_ids: Vec<u64> = ready.guilds.iter().map(|g| g.id.get()).collect();
                setup_data.start(&guild_ids).await?;
                Ok(setup_data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {e}");
            return;
        }
        info!("Shutdown requested, stopping shards");
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot client...");
    let result = client.start().await;
    if let Err(why) = &result {
        error!("Client error: {why:?}");
    }

    data.shutdown().await;
    info!("Shutdown complete");
    result.map_err(Error::from)
}
