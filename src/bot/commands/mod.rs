use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Käytettävissä olevat komennot:")]
pub enum Command {
    #[command(description = "näytä tämä ohje")]
    Help,
    #[command(description = "aloita botin käyttö")]
    Start,
    #[command(description = "aloita uusi kausi")]
    Kausi,
    #[command(description = "listaa chatin kaudet")]
    Kaudet,
    #[command(description = "muuta chatin asetuksia")]
    Asetukset,
    #[command(description = "luo ilmoitustaulu, tai poista se: /ilmoitustaulu pois")]
    Ilmoitustaulu(String),
    #[command(description = "lisää tunnin mittainen ilmoitus ilmoitustaululle")]
    Ilmoitus(String),
}

impl Command {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Start => "start",
            Command::Kausi => "kausi",
            Command::Kaudet => "kaudet",
            Command::Asetukset => "asetukset",
            Command::Ilmoitustaulu(_) => "ilmoitustaulu",
            Command::Ilmoitus(_) => "ilmoitus",
        }
    }
}
