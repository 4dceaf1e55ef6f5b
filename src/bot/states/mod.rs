//! Concrete activity states behind the bot's interactive commands.

pub mod error_share;
pub mod pagination;
pub mod season;
pub mod settings;

pub use error_share::ErrorShareConfirmation;
pub use pagination::PaginatedList;
pub use season::NewSeasonWizard;
pub use settings::{GraphWidthSetting, SettingsMenu};
