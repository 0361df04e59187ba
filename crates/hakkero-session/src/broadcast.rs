//! Fan one message out to a group of actors.

use futures_util::future::join_all;
use hakkero_protocol::ServerMessage;

use crate::ConnectionActor;

/// Delivers `message` to every actor in `audience` concurrently and returns
/// once every attempt has finished.
///
/// A slow or dead peer never blocks the others, but the caller does wait for
/// the slowest one. Returns how many deliveries failed.
pub async fn broadcast<'a, In, I>(audience: I, message: &ServerMessage) -> usize
where
    In: 'a,
    I: IntoIterator<Item = &'a ConnectionActor<In>>,
{
    let attempts = audience
        .into_iter()
        .map(|actor| actor.deliver(message.clone()));
    join_all(attempts)
        .await
        .into_iter()
        .filter(Result::is_err)
        .count()
}
