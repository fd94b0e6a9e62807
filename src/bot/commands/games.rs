//! Tic-tac-toe - a 3x3 button grid played by two members.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::tictactoe::{Game, GameStatus, Mark},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::time::Duration;
    use tracing::debug;

    /// How long a player may think before the game is abandoned.
    const MOVE_TIMEOUT: Duration = Duration::from_secs(120);

    fn status_line(game: &Game) -> String {
        let header = format!(
            "{} <@{}> vs {} <@{}>",
            Mark::X,
            game.player(Mark::X),
            Mark::O,
            game.player(Mark::O)
        );
        match game.status() {
            GameStatus::InProgress { next } => {
                format!("{header}\n{next} <@{}> to move", game.player(next))
            }
            GameStatus::Won { winner, .. } => {
                format!("{header}\n🏆 <@{}> wins!", game.player(winner))
            }
            GameStatus::Draw => format!("{header}\n🤝 It's a draw!"),
        }
    }

    fn board_rows(game: &Game, id_prefix: &str, locked: bool) -> Vec<serenity::CreateActionRow> {
        let winning_line = match game.status() {
            GameStatus::Won { line, .. } => Some(line),
            _ => None,
        };

        (0..3)
            .map(|row| {
                let buttons = (0..3)
                    .map(|col| {
                        let cell = row * 3 + col;
                        let mark = game.board().get(cell);
                        let style = if winning_line.is_some_and(|line| line.contains(&cell)) {
                            serenity::ButtonStyle::Success
                        } else {
                            serenity::ButtonStyle::Secondary
                        };
                        let label = mark.map_or_else(|| "·".to_string(), |m| m.to_string());
                        serenity::CreateButton::new(format!("{id_prefix}{cell}"))
                            .label(label)
                            .style(style)
                            .disabled(locked || mark.is_some())
                    })
                    .collect();
                serenity::CreateActionRow::Buttons(buttons)
            })
            .collect()
    }

    /// Challenges another member to tic-tac-toe. You play ❌ and move first.
    #[poise::command(slash_command, guild_only)]
    pub async fn tictactoe(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Who to challenge"] opponent: serenity::User,
    ) -> Result<()> {
        if opponent.bot || opponent.id == ctx.author().id {
            ctx.send(
                poise::CreateReply::default()
                    .content("❌ Challenge another member, not yourself or a bot.")
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }

        let mut game = Game::new(ctx.author().id.get(), opponent.id.get());
        let id_prefix = format!("{}-ttt-", ctx.id());

        let handle = ctx
            .send(
                poise::CreateReply::default()
                    .content(status_line(&game))
                    .components(board_rows(&game, &id_prefix, false)),
            )
            .await?;
        let message_id = handle.message().await?.id;

        loop {
            let filter_prefix = id_prefix.clone();
            let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
                .message_id(message_id)
                .filter(move |press| press.data.custom_id.starts_with(&filter_prefix))
                .timeout(MOVE_TIMEOUT)
                .await
            else {
                handle
                    .edit(
                        ctx,
                        poise::CreateReply::default()
                            .content(format!("{}\n⌛ Game abandoned.", status_line(&game)))
                            .components(board_rows(&game, &id_prefix, true)),
                    )
                    .await?;
                return Ok(());
            };

            let cell = press
                .data
                .custom_id
                .strip_prefix(&id_prefix)
                .and_then(|c| c.parse::<usize>().ok())
                .unwrap_or(usize::MAX);

            match game.play(press.user.id.get(), cell) {
                Err(e) => {
                    debug!("Rejected move from {}: {e}", press.user.id);
                    press
                        .create_response(
                            ctx.serenity_context(),
                            serenity::CreateInteractionResponse::Message(
                                serenity::CreateInteractionResponseMessage::new()
                                    .content(format!("❌ {e}"))
                                    .ephemeral(true),
                            ),
                        )
                        .await?;
                }
                Ok(status) => {
                    let finished = !matches!(status, GameStatus::InProgress { .. });
                    press
                        .create_response(
                            ctx.serenity_context(),
                            serenity::CreateInteractionResponse::UpdateMessage(
                                serenity::CreateInteractionResponseMessage::new()
                                    .content(status_line(&game))
                                    .components(board_rows(&game, &id_prefix, finished)),
                            ),
                        )
                        .await?;
                    if finished {
                        return Ok(());
                    }
                }
            }
        }
    }
}

// Re-export all commands
pub use inner::*;
