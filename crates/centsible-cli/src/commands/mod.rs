//! Command implementations

mod call;
mod chat;
mod parse;
mod prompts;
mod status;

pub use call::cmd_call;
pub use chat::{cmd_chat, cmd_insights};
pub use parse::{cmd_parse_receipt, cmd_parse_text};
pub use prompts::{cmd_prompts_list, cmd_prompts_path, cmd_prompts_show};
pub use status::cmd_status;
