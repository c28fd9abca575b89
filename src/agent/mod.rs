//! Department agents backed by the language model

pub mod department;
pub mod extract;
pub mod relay;
pub mod reply;

pub use department::Department;
pub use extract::{extract_json_object, ExtractError};
pub use relay::{build_prompt, parse_reply, AgentRelay, HistoryMessage, RelayError, HISTORY_LIMIT};
pub use reply::{ActionType, AgentReply, ArtReply, Delegation, PmReply, TextReply};
