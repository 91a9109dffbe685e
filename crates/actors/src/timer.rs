//! Delayed and periodic messages to actors.

use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};

use crate::{
    actor::Actor,
    actor_ref::WeakActorRef,
    handler::{Handler, Message},
};

/// A scheduled message. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TimerHandle(JoinHandle<()>);

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Delivers `message` to the actor once `delay` has passed, unless the actor
/// stopped in the meantime.
pub fn schedule_once<A, M>(target: WeakActorRef<A>, delay: Duration, message: M) -> TimerHandle
where
    A: Handler<M>,
    M: Message,
{
    TimerHandle(tokio::spawn(async move {
        time::sleep(delay).await;
        if let Some(target) = target.upgrade() {
            if let Err(why) = target.tell(message).await {
                log::debug!("timer could not deliver its message: {}", why);
            }
        }
    }))
}

/// Delivers a fresh message every `period`, the first one after one full
/// period. Ticks are skipped while the mailbox is full and the timer ends
/// once the actor stopped.
pub fn schedule_interval<A, M, F>(
    target: WeakActorRef<A>,
    period: Duration,
    make_message: F,
) -> TimerHandle
where
    A: Actor + Handler<M>,
    M: Message,
    F: Fn() -> M + Send + 'static,
{
    TimerHandle(tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(target) = target.upgrade() else {
                break;
            };
            if let Err(why) = target.try_tell(make_message()) {
                if target.is_stopped() {
                    break;
                }
                log::debug!("skipping tick: {}", why);
            }
        }
    }))
}
