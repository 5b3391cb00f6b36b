//! Day-of-week scheduling — a 10:30 reminder on work days only.

use chrono::NaiveTime;
use timesched::{Scheduler, parse_days};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let days = parse_days("MTWTFss")?;
    println!("scheduling on: {days}");

    let mut s = Scheduler::new();
    let id = s.repeat_on_days(days, NaiveTime::from_hms_opt(10, 30, 0).unwrap(), 0, |_| {
        println!("standup time!");
        Ok(())
    })?;

    println!("next firing due at {}", s.next_due().unwrap());

    // A real application would now call s.run(true); cancel instead so the
    // demo exits.
    s.cancel(id)?;
    Ok(())
}
