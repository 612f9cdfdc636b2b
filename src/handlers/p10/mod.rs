//! P10 inbound commands.
//!
//! Tokens are the short P10 forms; `SERVER`, `ERROR` and `PASS` keep their
//! long names because they arrive before registration.

mod channel;
mod link;
mod user;

use super::core::{DispatchTable, SourceKinds};
use crate::error::DispatchError;

use channel::{
    BurstHandler, CreateHandler, JoinHandler, KickHandler, ModeHandler, PartHandler, TopicHandler,
};
use link::{
    EndOfBurstHandler, ErrorHandler, PassHandler, PingHandler, PongHandler, ServerHandler,
    SquitHandler,
};
use user::{KillHandler, NickHandler, QuitHandler};

/// Register every P10 token.
pub fn register(table: &mut DispatchTable) -> Result<(), DispatchError> {
    const U: SourceKinds = SourceKinds::USER;
    const S: SourceKinds = SourceKinds::SERVER;
    const LINK: SourceKinds = SourceKinds::UNREGISTERED;

    // Link management
    table.register("PASS", PassHandler, 1, LINK)?;
    table.register("SERVER", ServerHandler, 8, LINK)?;
    table.register("S", ServerHandler, 8, S)?;
    table.register("SQ", SquitHandler, 1, U | S)?;
    table.register("G", PingHandler, 1, U | S)?;
    table.register("Z", PongHandler, 1, S)?;
    table.register("EB", EndOfBurstHandler, 0, S)?;
    table.register("Y", ErrorHandler, 1, LINK | S)?;
    table.register("ERROR", ErrorHandler, 1, LINK | S)?;

    // Users
    table.register("N", NickHandler, 2, U | S)?;
    table.register("Q", QuitHandler, 1, U)?;
    table.register("D", KillHandler, 1, U | S)?;

    // Channels
    table.register("B", BurstHandler, 2, S)?;
    table.register("C", CreateHandler, 2, U)?;
    table.register("J", JoinHandler, 1, U)?;
    table.register("L", PartHandler, 1, U)?;
    table.register("M", ModeHandler, 2, U | S)?;
    table.register("OM", ModeHandler, 2, U)?;
    table.register("K", KickHandler, 2, U | S)?;
    table.register("OK", KickHandler, 2, U)?;
    table.register("T", TopicHandler, 2, U | S)?;
    Ok(())
}
