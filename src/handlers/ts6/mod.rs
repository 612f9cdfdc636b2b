//! TS6 inbound commands.

mod channel;
mod link;
mod user;

use super::core::{DispatchTable, SourceKinds};
use crate::error::DispatchError;

use channel::{
    BmaskHandler, JoinHandler, KickHandler, ModeHandler, PartHandler, SjoinHandler, TbHandler,
    TmodeHandler, TopicHandler,
};
use link::{
    CapabHandler, ErrorHandler, PassHandler, PingHandler, PongHandler, ServerHandler, SidHandler,
    SquitHandler,
};
use user::{ChghostHandler, EuidHandler, KillHandler, NickHandler, QuitHandler, UidHandler};

/// Register every TS6 token.
pub fn register(table: &mut DispatchTable) -> Result<(), DispatchError> {
    const U: SourceKinds = SourceKinds::USER;
    const S: SourceKinds = SourceKinds::SERVER;
    const LINK: SourceKinds = SourceKinds::UNREGISTERED;

    // Link management
    table.register("PASS", PassHandler, 1, LINK)?;
    table.register("CAPAB", CapabHandler, 1, LINK)?;
    table.register("SERVER", ServerHandler, 3, LINK | S)?;
    table.register("SID", SidHandler, 4, S)?;
    table.register("SQUIT", SquitHandler, 1, U | S)?;
    table.register("PING", PingHandler, 1, U | S)?;
    table.register("PONG", PongHandler, 1, S)?;
    table.register("ERROR", ErrorHandler, 1, LINK | S)?;

    // Users
    table.register("UID", UidHandler, 9, S)?;
    table.register("EUID", EuidHandler, 11, S)?;
    table.register("NICK", NickHandler, 2, U | S)?;
    table.register("QUIT", QuitHandler, 1, U)?;
    table.register("KILL", KillHandler, 1, U | S)?;
    table.register("CHGHOST", ChghostHandler, 2, U | S)?;

    // Channels
    table.register("MODE", ModeHandler, 2, U | S)?;
    table.register("TMODE", TmodeHandler, 3, U | S)?;
    table.register("BMASK", BmaskHandler, 4, S)?;
    table.register("SJOIN", SjoinHandler, 4, S)?;
    table.register("JOIN", JoinHandler, 1, U)?;
    table.register("PART", PartHandler, 1, U)?;
    table.register("KICK", KickHandler, 2, U | S)?;
    table.register("TOPIC", TopicHandler, 2, U)?;
    table.register("TB", TbHandler, 3, S)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_tokens_once() {
        let mut table = DispatchTable::new();
        register(&mut table).unwrap();
        assert_eq!(table.len(), 23);
        assert!(table.contains("euid"));
        assert!(register(&mut table).is_err());
    }
}
