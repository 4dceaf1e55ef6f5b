use activity_board_bot::bot::commands::Command;
use teloxide::utils::command::BotCommands;

#[cfg(test)]
mod command_parsing_tests {
    use super::*;

    #[test]
    fn test_simple_commands_parsing() {
        let cases = vec![
            ("/help", Command::Help),
            ("/start", Command::Start),
            ("/kausi", Command::Kausi),
            ("/kaudet", Command::Kaudet),
            ("/asetukset", Command::Asetukset),
        ];

        for (input, expected) in cases {
            let result = Command::parse(input, "testbot");
            assert_eq!(result.ok(), Some(expected), "Should parse: {}", input);
        }
    }

    #[test]
    fn test_announcement_takes_whole_text() {
        let result = Command::parse("/ilmoitus Pizzaa keittiössä klo 12", "testbot");
        assert_eq!(
            result.ok(),
            Some(Command::Ilmoitus("Pizzaa keittiössä klo 12".to_string()))
        );
    }

    #[test]
    fn test_board_command_arguments() {
        assert_eq!(
            Command::parse("/ilmoitustaulu", "testbot").ok(),
            Some(Command::Ilmoitustaulu(String::new()))
        );
        assert_eq!(
            Command::parse("/ilmoitustaulu pois", "testbot").ok(),
            Some(Command::Ilmoitustaulu("pois".to_string()))
        );
    }

    #[test]
    fn test_command_with_bot_name() {
        assert_eq!(Command::parse("/kausi@testbot", "testbot").ok(), Some(Command::Kausi));
        assert!(Command::parse("/kausi@otherbot", "testbot").is_err());
    }

    #[test]
    fn test_unknown_commands_rejected() {
        for input in ["/unknown", "/settings", "/KAUSI", "kausi"] {
            assert!(Command::parse(input, "testbot").is_err(), "Should reject: {}", input);
        }
    }

    #[test]
    fn test_command_names_for_logging() {
        assert_eq!(Command::Kausi.name(), "kausi");
        assert_eq!(Command::Ilmoitus(String::new()).name(), "ilmoitus");
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = Command::descriptions().to_string();
        for command in ["/help", "/kausi", "/kaudet", "/asetukset", "/ilmoitustaulu", "/ilmoitus"] {
            assert!(help.contains(command), "Help should mention {}", command);
        }
    }
}
