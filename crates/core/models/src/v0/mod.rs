mod guilds;
mod tokens;

pub use guilds::*;
pub use tokens::*;
