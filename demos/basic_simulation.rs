use verlet_particles::*;

fn main() -> Result<()> {
    let config = SimulationConfig::new()
        .with_particle_size(0.5)
        .with_circle(6.0)
        .with_sub_steps(8);

    let mut engine = ParticleEngine::new(config)?;
    engine.world_mut().set_frame_budget(Some(16.6));
    let block = BlockSpawner::new(Vec2::new(-2.0, 0.0), 6, 8).with_density(1.2);
    for position in block.layout(engine.world().config().particle_size) {
        engine.world_mut().queue_add(position, Vec2::ZERO)?;
    }
    engine.world_mut().set_spawner(
        IntervalEmitter::new(Vec2::new(0.0, 4.0), Vec2::new(3.0, 0.0), 10).with_limit(50),
    );

    for _ in 0..600 {
        engine.advance(1.0 / 60.0)?;
    }

    let world = engine.world();
    world.profile().report();
    println!("particles: {}", world.len());
    println!(
        "last step: {:.2} ms, {} corrected pairs",
        world.profile().total_frame_time.as_secs_f32() * 1000.0,
        world.profile().corrected_pairs
    );
    if let Some(lowest) = engine
        .positions()
        .into_iter()
        .min_by(|a, b| a.y.total_cmp(&b.y))
    {
        println!("lowest particle at {lowest}");
    }
    Ok(())
}
