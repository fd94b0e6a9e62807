//! Calculator commands - evaluate expressions with per-user variables.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::calculator::format_number,
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Evaluates a math expression. Assign with `name = expression`; `ans` is the last result.
    #[poise::command(slash_command, prefix_command, user_cooldown = 2)]
    pub async fn calc(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Expression, e.g. `2 * (3 + 4)` or `x = sqrt(16)`"]
        #[rest]
        expression: String,
    ) -> Result<()> {
        let evaluation = ctx
            .data()
            .calculator
            .evaluate(ctx.author().id.get(), &expression)
            .await?;

        let value = format_number(evaluation.value);
        let reply = match evaluation.assigned {
            Some(name) => format!("🧮 `{name} = {value}`"),
            None => format!("🧮 `{}` = **{value}**", expression.trim()),
        };
        ctx.say(reply).await?;
        Ok(())
    }

    /// Lists your calculator variables.
    #[poise::command(slash_command, prefix_command)]
    pub async fn calc_vars(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let vars = ctx
            .data()
            .calculator
            .variables(ctx.author().id.get())
            .await;

        if vars.is_empty() {
            ctx.say("📭 You have no variables yet. Try `/calc x = 42`.")
                .await?;
            return Ok(());
        }

        let mut response = String::from("**Your variables**\n");
        for (name, value) in vars {
            writeln!(response, "• `{name}` = {}", format_number(value))?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Forgets all of your calculator variables.
    #[poise::command(slash_command, prefix_command)]
    pub async fn calc_clear(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let cleared = ctx.data().calculator.clear(ctx.author().id.get()).await;
        ctx.say(format!("🧹 Cleared {cleared} variable(s).")).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
