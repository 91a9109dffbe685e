use std::any::Any;

use thiserror::Error;

use crate::actor_ref::WeakActorRef;

#[derive(Debug, Clone)]
pub enum SupervisionStrategy {
    Restart,
    Resume,
    Stop,
}

pub trait Actor: Send + Sync + Sized + 'static {
    /// Called once the actor is ready to receive messages, and again after
    /// every restart. `myself` does not keep the actor alive.
    #[allow(unused_variables)]
    fn started(&mut self, myself: WeakActorRef<Self>) {}

    /// Called when the last `ActorRef` was dropped or the actor was stopped by
    /// its supervisor. Release timers and other resources here.
    fn stopped(&mut self) {}

    /// Called when a handler on the actor panics. The return value represents the
    /// supervision strategy used to handle the panic.
    /// NOTE: If this method panics, the actor can not recover from the panic.
    #[allow(unused_variables)]
    fn on_fail(&mut self, error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

#[derive(Debug, Error)]
pub enum ActorError {
    #[error("the actor is no longer running")]
    Stopped,
    #[error("the mailbox of the actor is full")]
    MailboxFull,
    #[error("the actor did not answer")]
    NoAnswer,
}
