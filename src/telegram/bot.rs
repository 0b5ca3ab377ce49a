//! Bot initialization and command definitions

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::telegram::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "начать регистрацию или открыть меню")]
    Start,
    #[command(description = "главное меню с актуальной афишей")]
    Menu,
    #[command(description = "панель управления (только для администратора)")]
    Admin,
    #[command(description = "показать ваш Telegram ID")]
    Id,
}

/// Creates a Bot instance with a bounded request timeout
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the underlying HTTP client
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set"));
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(config::BOT_TOKEN.as_str(), client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "начать регистрацию или открыть меню"),
        BotCommand::new("menu", "главное меню с актуальной афишей"),
        BotCommand::new("id", "показать ваш Telegram ID"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let commands = Command::descriptions();
        let command_list = format!("{}", commands);

        assert!(command_list.contains("Я умею"));
        assert!(command_list.contains("start"));
        assert!(command_list.contains("menu"));
        assert!(command_list.contains("admin"));
    }
}
