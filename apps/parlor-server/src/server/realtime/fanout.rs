use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OfferOutcome {
    Delivered,
    Full,
    Closed,
}

/// Non-blocking offer of one frame to one connection's outbound queue.
/// The caller decides what a `Full` or `Closed` queue means; the offer
/// itself never waits.
pub(crate) fn offer_frame(sender: &mpsc::Sender<String>, frame: &str) -> OfferOutcome {
    match sender.try_send(frame.to_owned()) {
        Ok(()) => OfferOutcome::Delivered,
        Err(mpsc::error::TrySendError::Full(_)) => OfferOutcome::Full,
        Err(mpsc::error::TrySendError::Closed(_)) => OfferOutcome::Closed,
    }
}
