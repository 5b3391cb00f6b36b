//! Very simple examples — a oneshot and a self-limiting repeat timer
//! sharing one scheduler.

use std::cell::Cell;
use std::rc::Rc;

use timesched::Scheduler;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut s = Scheduler::new();

    // Run once in five seconds.
    s.oneshot(5u32, 0, |_| {
        println!("oneshot fired at {}", chrono::Local::now().time());
        Ok(())
    })?;

    // Run every two seconds; cancel itself after the third firing so the
    // demo terminates.
    let fires = Rc::new(Cell::new(0u32));
    let me = Rc::new(Cell::new(None));
    let f = fires.clone();
    let m = me.clone();
    let id = s.repeat(2u32, 0, move |sched| {
        f.set(f.get() + 1);
        println!("repeat #{} fired at {}", f.get(), chrono::Local::now().time());
        if f.get() == 3 {
            sched.cancel(m.get().expect("own id"))?;
        }
        Ok(())
    })?;
    me.set(Some(id));

    // Blocks until no timers are left.
    s.run(true)?;
    Ok(())
}
