pub mod chat_setting;
pub mod season;

pub use chat_setting::*;
pub use season::*;
