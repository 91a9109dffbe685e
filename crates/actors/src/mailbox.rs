use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{actor::ActorError, handler::MessageHandler, Actor};

type Envelope<A> = Box<dyn MessageHandler<A>>;

pub struct BoundedMailbox<A>(mpsc::Sender<Envelope<A>>);

impl<A> Clone for BoundedMailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A> BoundedMailbox<A>
where
    A: Actor,
{
    pub async fn send<M>(&self, message: M) -> Result<(), ActorError>
    where
        M: MessageHandler<A> + 'static,
    {
        self.0
            .send(Box::new(message))
            .await
            .map_err(|_| ActorError::Stopped)
    }

    pub fn try_send<M>(&self, message: M) -> Result<(), ActorError>
    where
        M: MessageHandler<A> + 'static,
    {
        self.0.try_send(Box::new(message)).map_err(|why| match why {
            TrySendError::Full(_) => ActorError::MailboxFull,
            TrySendError::Closed(_) => ActorError::Stopped,
        })
    }

    pub fn downgrade(&self) -> WeakMailbox<A> {
        WeakMailbox(self.0.downgrade())
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub struct WeakMailbox<A>(mpsc::WeakSender<Envelope<A>>);

impl<A> Clone for WeakMailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A> WeakMailbox<A> {
    pub fn upgrade(&self) -> Option<BoundedMailbox<A>> {
        self.0.upgrade().map(BoundedMailbox)
    }
}

pub struct BoundedMailboxReceiver<A>(mpsc::Receiver<Envelope<A>>);

impl<A> BoundedMailboxReceiver<A>
where
    A: Actor,
{
    pub async fn recv(&mut self) -> Option<Envelope<A>> {
        self.0.recv().await
    }

    /// Stops accepting messages. Already queued ones can still be received.
    pub fn close(&mut self) {
        self.0.close()
    }
}

pub fn bounded_mailbox<A>(buffer: usize) -> (BoundedMailbox<A>, BoundedMailboxReceiver<A>)
where
    A: Actor,
{
    let (tx, rx) = mpsc::channel(buffer);
    (BoundedMailbox(tx), BoundedMailboxReceiver(rx))
}
