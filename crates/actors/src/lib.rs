use std::panic::AssertUnwindSafe;

use actor::{Actor, SupervisionStrategy};
use actor_ref::ActorRef;
use futures::FutureExt;
use mailbox::bounded_mailbox;

pub mod actor;
pub mod actor_ref;
pub mod handler;
pub mod mailbox;
pub mod timer;

const DEFAULT_MAILBOX_SIZE: usize = 32;

/// Creates and runs an actor. If the actor panics, it is either restared, resumed
/// or stoped acording to the behavior specified by `Actor::on_fail()`.
pub fn run<A, F>(actor_factory: F) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    let (tx, mut rx) = bounded_mailbox(DEFAULT_MAILBOX_SIZE);
    let actor_ref = ActorRef::new(tx);
    let myself = actor_ref.downgrade();

    // run actor
    tokio::spawn(async move {
        let mut actor = actor_factory();
        actor.started(myself.clone());

        while let Some(mut message) = rx.recv().await {
            // handle message
            let result = AssertUnwindSafe(message.handle(&mut actor))
                .catch_unwind()
                .await;
            // handler paniced?
            if let Err(why) = result {
                log::error!("actor paniced: {:?}", why);
                match actor.on_fail(why) {
                    SupervisionStrategy::Restart => {
                        actor.stopped();
                        actor = actor_factory();
                        actor.started(myself.clone());
                    }
                    SupervisionStrategy::Resume => {}
                    SupervisionStrategy::Stop => {
                        rx.close();
                        break;
                    }
                };
            }
        }

        actor.stopped();
    });

    actor_ref
}
