use crate::resources::{SimClock, SimMetrics};
use bevy::prelude::*;

/// System that advances the simulation by one month
pub fn advance_clock_system(
    mut clock: ResMut<SimClock>,
    mut metrics: ResMut<SimMetrics>,
    query: Query<Entity>,
) {
    let start_time = std::time::Instant::now();

    clock.tick();
    metrics.entities_count = query.iter().count() as u32;

    let elapsed = start_time.elapsed().as_secs_f32() * 1000.0;
    metrics.tick_time = elapsed;

    if clock.month % 12 == 0 {
        log::debug!(
            "Year {}, entities: {}, clock pass: {:.2}ms",
            clock.year(),
            metrics.entities_count,
            elapsed
        );
    }
}
