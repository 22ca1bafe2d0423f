use crate::records::PushSubscription;

pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    /// Hands `payload` (a serialized notification JSON object) to the push
    /// service behind `subscription`. Fire-and-forget from the origin's
    /// perspective; success means the push service accepted the message.
    fn send<'a>(&'a self, subscription: &'a PushSubscription, payload: &'a str) -> Self::Fut<'a>;
}
