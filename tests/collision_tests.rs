use approx::assert_relative_eq;
use verlet_particles::*;

/// Deterministic scatter with plenty of overlaps and some coincident points.
fn scatter(count: usize, extent: f32) -> Vec<Particle> {
    (0..count)
        .map(|i| {
            let hx = ((i * 7919 + 13) % 1009) as f32 / 1009.0;
            let hy = ((i * 104_729 + 7) % 997) as f32 / 997.0;
            Particle::at_rest(Vec2::new(hx - 0.5, hy - 0.5) * extent)
        })
        .collect()
}

fn grid_for(particles: &[Particle], cell_size: f32) -> SpatialGrid {
    let mut grid = SpatialGrid::new(cell_size);
    grid.build(particles);
    grid
}

#[test]
fn two_particle_overlap_is_split_symmetrically() {
    let strategies: Vec<Box<dyn CollisionStrategy>> = vec![
        Box::new(NaiveStrategy),
        Box::new(GridStrategy),
        Box::new(ParallelStrategy::default()),
    ];

    for strategy in strategies {
        let mut particles = vec![
            Particle::at_rest(Vec2::new(0.0, 0.0)),
            Particle::at_rest(Vec2::new(0.5, 0.0)),
        ];
        let grid = grid_for(&particles, 1.0);

        strategy
            .resolve(&mut particles, &grid, 1.0)
            .expect("pass should succeed");

        let (a, b) = (particles[0].position, particles[1].position);
        assert_relative_eq!(a.distance(b), 1.0, epsilon = 1e-6);
        assert_relative_eq!(a.x + b.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(a.y, 0.0);
        assert_relative_eq!(b.y, 0.0);
    }
}

#[test]
fn wall_penetration_is_pushed_back_inside_rectangle() {
    let container = RectangleBoundary {
        center: Vec2::ZERO,
        half_extents: Vec2::new(5.0, 5.0),
    };
    let mut particle = Particle::at_rest(Vec2::new(4.9, 0.0));

    assert!(container.resolve(&mut particle, 0.5));
    assert_relative_eq!(particle.position.x, 4.5, epsilon = 1e-5);
    assert!(particle.collision);
    // Constraints never touch the previous position.
    assert_eq!(particle.previous_position, Vec2::new(4.9, 0.0));
}

#[test]
fn strategies_detect_the_same_pairs() {
    let particles = scatter(400, 12.0);
    let grid = grid_for(&particles, 0.5);

    let naive = NaiveStrategy
        .detect_pairs(&particles, &grid, 0.5)
        .expect("naive detection");
    let gridded = GridStrategy
        .detect_pairs(&particles, &grid, 0.5)
        .expect("grid detection");
    let parallel = ParallelStrategy::default()
        .detect_pairs(&particles, &grid, 0.5)
        .expect("parallel detection");

    assert!(!naive.is_empty(), "scatter should contain overlaps");
    assert_eq!(naive, gridded);
    assert_eq!(naive, parallel);
}

#[test]
fn first_pass_corrects_exactly_the_detected_pairs_when_isolated() {
    // Pairs far apart from each other: resolution order cannot change the outcome.
    let mut naive_particles = Vec::new();
    for k in 0..10 {
        let base = Vec2::new(k as f32 * 4.0, (k % 3) as f32 * 4.0);
        naive_particles.push(Particle::at_rest(base));
        naive_particles.push(Particle::at_rest(base + Vec2::new(0.3, 0.4)));
    }
    let mut grid_particles = naive_particles.clone();
    let grid = grid_for(&grid_particles, 1.0);

    let naive = NaiveStrategy
        .resolve(&mut naive_particles, &grid, 1.0)
        .expect("naive pass");
    let gridded = GridStrategy
        .resolve(&mut grid_particles, &grid, 1.0)
        .expect("grid pass");

    let mut grid_pairs = gridded.pairs.clone();
    grid_pairs.sort_unstable();
    assert_eq!(naive.pairs, grid_pairs);
    assert_eq!(naive.pairs.len(), 10);
    for (a, b) in naive_particles.iter().zip(&grid_particles) {
        assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-6);
        assert_relative_eq!(a.position.y, b.position.y, epsilon = 1e-6);
    }
}

#[test]
fn repeated_passes_converge_toward_separation() {
    let mut particles = scatter(60, 4.0);
    let min_distance = 0.5;

    for _ in 0..200 {
        let grid = grid_for(&particles, min_distance);
        GridStrategy
            .resolve(&mut particles, &grid, min_distance)
            .expect("grid pass");
    }

    let grid = grid_for(&particles, min_distance);
    let remaining = NaiveStrategy
        .detect_pairs(&particles, &grid, min_distance - 1e-3)
        .expect("naive detection");
    assert!(remaining.is_empty(), "unresolved overlaps: {remaining:?}");
}

#[test]
fn grid_neighbors_cover_every_true_overlap() {
    let particles = scatter(300, 8.0);
    let grid = grid_for(&particles, 0.5);

    for (i, a) in particles.iter().enumerate() {
        let neighbors = grid.neighbors(i);
        for (j, b) in particles.iter().enumerate() {
            if i != j && a.position.distance(b.position) < 0.5 {
                assert!(
                    neighbors.contains(&(j as u32)),
                    "overlap {i}-{j} missed by the grid"
                );
            }
        }
    }
}

#[test]
fn rebucket_restores_cell_membership() {
    let mut particles = scatter(50, 6.0);
    let mut grid = grid_for(&particles, 0.5);

    for (k, particle) in particles.iter_mut().enumerate() {
        particle.position += Vec2::new(0.37 * k as f32, -0.21 * k as f32);
    }
    for (index, particle) in particles.iter().enumerate() {
        grid.rebucket(index, particle.position);
        let expected = (
            (particle.position.x / 0.5).floor() as i32,
            (particle.position.y / 0.5).floor() as i32,
        );
        assert_eq!(grid.cell_of(index), Some(expected));
    }
    assert!(grid.is_consistent_with(&particles));
}
