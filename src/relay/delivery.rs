//! Ordered delivery of reply chunks

use crate::Error;
use crate::channels::{Channel, MAX_MESSAGES_PER_REQUEST};

/// A delivery that stopped partway
#[derive(Debug)]
pub struct Undelivered {
    /// Chunks accepted before the failure; zero means the reply token is unused
    pub sent: usize,
    pub error: Error,
}

/// Send `chunks` in order.
///
/// The first batch goes through the single-use reply token; any further
/// batches are pushed to `push_to`. Chunks beyond the first batch are
/// dropped with a warning when there is no push target.
///
/// # Errors
///
/// Stops at the first channel error and reports how many chunks went out.
pub async fn deliver(
    channel: &dyn Channel,
    reply_token: &str,
    push_to: Option<&str>,
    chunks: &[String],
) -> Result<(), Undelivered> {
    let mut batches = chunks.chunks(MAX_MESSAGES_PER_REQUEST);

    let Some(first) = batches.next() else {
        return Ok(());
    };
    channel
        .reply(reply_token, first)
        .await
        .map_err(|error| Undelivered { sent: 0, error })?;
    let mut sent = first.len();

    let rest: Vec<&[String]> = batches.collect();
    if rest.is_empty() {
        return Ok(());
    }

    let Some(to) = push_to else {
        let dropped: usize = rest.iter().map(|b| b.len()).sum();
        tracing::warn!(dropped, "no push target, remaining chunks not delivered");
        return Ok(());
    };

    for batch in rest {
        channel
            .push(to, batch)
            .await
            .map_err(|error| Undelivered { sent, error })?;
        sent += batch.len();
    }

    Ok(())
}
