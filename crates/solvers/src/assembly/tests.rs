use approx::assert_relative_eq;
use impulse_core::{
    Matrix,
    model::{
        DynamicalSystem, Interaction, InteractionId, Levels, Model, NonSmoothLaw, Relation,
        SystemId,
    },
    topology::Topology,
};
use ndarray::{Array2, array, s};
use proptest::prelude::*;

use crate::complementarity::{ProjectedGaussSeidel, SolverOptions};

use super::*;

// --- Test fixtures ---

const VELOCITY_LEVELS: Levels = Levels {
    lower_output: 0,
    upper_output: 1,
    lower_input: 1,
    upper_input: 1,
};

/// `W = m` for one-coordinate particles, with an optional reaction scale.
struct ScalarOperators {
    w: Vec<f64>,
    scale: f64,
}

impl IterationMatrix for ScalarOperators {
    fn w_solve(&self, system: SystemId, rhs: &Matrix) -> Result<Matrix, AssemblyError> {
        let w = self
            .w
            .get(system.index())
            .ok_or(AssemblyError::MissingOperator(system))?;
        Ok(rhs / *w)
    }

    fn reaction_scale(&self, _system: SystemId) -> f64 {
        self.scale
    }
}

fn particle(model: &mut Model, mass: f64, q: f64) -> SystemId {
    model.add_system(
        DynamicalSystem::lagrangian(array![[mass]], array![0.0], array![q], array![0.0])
            .expect("valid particle"),
    )
}

fn contact(
    model: &mut Model,
    systems: Vec<SystemId>,
    h: Matrix,
    law: NonSmoothLaw,
) -> InteractionId {
    let mut interaction =
        Interaction::new(systems, Relation::lagrangian(h), law).expect("valid interaction");
    interaction.set_levels(VELOCITY_LEVELS);
    model.add_interaction(interaction).expect("should add interaction")
}

/// Ground contact on particle 0 and a contact between particles 0 and 1.
fn chain() -> (Model, [InteractionId; 2], [SystemId; 2]) {
    let mut model = Model::new(0.0, 1.0).expect("valid horizon");
    let p0 = particle(&mut model, 1.0, 0.0);
    let p1 = particle(&mut model, 2.0, 0.0);
    let law = || NonSmoothLaw::newton_impact(0.0).expect("valid law");
    let ground = contact(&mut model, vec![p0], array![[1.0]], law());
    let between = contact(&mut model, vec![p0, p1], array![[-1.0, 1.0]], law());
    (model, [ground, between], [p0, p1])
}

fn block(matrix: &Matrix, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Matrix {
    matrix.slice(s![rows, cols]).to_owned()
}

// --- Tests ---

#[test]
fn fill_copies_blocks_exactly() {
    let (_, [a, b], _) = chain();
    let mut osns = OsnsMatrix::new();
    let dim = osns.update_size_and_positions([(a, 1), (b, 2)]);
    assert_eq!(dim, 3);

    let diag_a = array![[4.0]];
    let diag_b = array![[1.0, 2.0], [3.0, 4.0]];
    let forward = array![[0.5, -0.5]];
    let backward = array![[0.25], [-0.75]];
    let blocks = Blocks {
        diagonal: vec![(a, diag_a.clone()), (b, diag_b.clone())],
        couplings: vec![Coupling {
            source: a,
            target: b,
            forward: forward.clone(),
            backward: backward.clone(),
        }],
    };

    osns.fill(&blocks, true).expect("should fill");

    let m = osns.matrix();
    assert_eq!(block(m, 0..1, 0..1), diag_a);
    assert_eq!(block(m, 1..3, 1..3), diag_b);
    assert_eq!(block(m, 0..1, 1..3), forward);
    assert_eq!(block(m, 1..3, 0..1), backward);
}

#[test]
fn fill_rejects_mismatched_blocks() {
    let (_, [a, b], _) = chain();
    let mut osns = OsnsMatrix::new();
    osns.update_size_and_positions([(a, 1), (b, 1)]);

    let blocks = Blocks {
        diagonal: vec![(a, Array2::zeros((2, 2)))],
        couplings: Vec::new(),
    };
    assert_eq!(
        osns.fill(&blocks, false),
        Err(AssemblyError::DimensionMismatch {
            block: Block::Diagonal(a),
            expected: (1, 1),
            found: (2, 2),
        })
    );

    osns.update_size_and_positions([(a, 1)]);
    let blocks = Blocks {
        diagonal: Vec::new(),
        couplings: vec![Coupling {
            source: a,
            target: b,
            forward: array![[1.0]],
            backward: array![[1.0]],
        }],
    };
    assert_eq!(osns.fill(&blocks, false), Err(AssemblyError::Unpositioned(b)));
}

#[test]
fn refresh_reuses_storage_until_rebuild() {
    let (_, [a, b], _) = chain();
    let mut osns = OsnsMatrix::new();
    osns.update_size_and_positions([(a, 1), (b, 1)]);
    let blocks = Blocks {
        diagonal: vec![(a, array![[1.0]]), (b, array![[2.0]])],
        couplings: Vec::new(),
    };

    osns.fill(&blocks, false).expect("should fill");
    osns.fill(&blocks, false).expect("should refresh");
    assert_eq!(osns.allocations(), 1);

    osns.fill(&blocks, true).expect("should rebuild");
    assert_eq!(osns.allocations(), 2);

    osns.update_size_and_positions([(b, 1)]);
    let blocks = Blocks {
        diagonal: vec![(b, array![[2.0]])],
        couplings: Vec::new(),
    };
    osns.fill(&blocks, false).expect("should reallocate on resize");
    assert_eq!(osns.allocations(), 3);
    assert_eq!(osns.position(a), None);
    assert_eq!(osns.position(b), Some(0));
}

#[test]
fn assembles_delassus_operator_of_a_chain() {
    let (mut model, [ground, between], [p0, p1]) = chain();
    let mut topology = Topology::new(model.interactions(), 2);
    topology.insert(1, ground).expect("should insert");
    topology.insert(1, between).expect("should insert");

    // Free velocities: particle 0 falls, particle 1 rests.
    model.systems_mut()[p0].free_state_mut().velocity[0] = -1.0;
    model.systems_mut()[p1].free_state_mut().velocity[0] = 0.0;

    let operators = ScalarOperators {
        w: vec![1.0, 2.0],
        scale: 1.0,
    };
    let options = SolverOptions::default();
    let mut osns = LinearOsns::new(1);

    let (systems, interactions) = model.parts_mut();
    let assembly = Assembly {
        topology: &topology,
        systems,
        interactions,
        operators: &operators,
    };
    let size = osns
        .pre_compute(&assembly, &options, topology.has_changed())
        .expect("should assemble");

    assert_eq!(size, 2);
    assert_eq!(osns.absolute_position(ground), Some(0));
    assert_eq!(osns.absolute_position(between), Some(1));

    let m = osns.matrix().matrix();
    assert_relative_eq!(m[[0, 0]], 1.0);
    assert_relative_eq!(m[[1, 1]], 1.5);
    assert_relative_eq!(m[[0, 1]], -1.0);
    assert_relative_eq!(m[[1, 0]], -1.0);
    assert_relative_eq!(osns.q()[0], -1.0);
    assert_relative_eq!(osns.q()[1], 1.0);

    let report = osns
        .compute(0.0, &ProjectedGaussSeidel, &options)
        .expect("should solve");
    assert!(matches!(report, SolveReport::Solved { size: 2, status } if status.is_success()));

    osns.post_compute(interactions);
    for id in [ground, between] {
        let interaction = &interactions[id.index()];
        assert!(interaction.lambda(1)[0] >= 0.0);
        assert!(interaction.y(1)[0] >= -1e-10);
    }
}

#[test]
fn newton_impact_shift_is_removed_from_output() {
    let mut model = Model::new(0.0, 1.0).expect("valid horizon");
    let ball = particle(&mut model, 1.0, 0.0);
    let law = NonSmoothLaw::newton_impact(0.5).expect("valid law");
    let id = contact(&mut model, vec![ball], array![[1.0]], law);

    let interaction = &mut model.interactions_mut()[id.index()];
    interaction.y_mut(1)[0] = -2.0;
    interaction.record_pre_impact();
    interaction.y_mut(1)[0] = 0.0;
    interaction.swap_in_memory();
    model.systems_mut()[ball].free_state_mut().velocity[0] = -2.0;

    let mut topology = Topology::new(model.interactions(), 2);
    topology.insert(1, id).expect("should insert");
    let operators = ScalarOperators {
        w: vec![1.0],
        scale: 1.0,
    };
    let options = SolverOptions::new(100, 1e-14, false).expect("valid options");
    let mut osns = LinearOsns::new(1);

    let (systems, interactions) = model.parts_mut();
    let assembly = Assembly {
        topology: &topology,
        systems,
        interactions,
        operators: &operators,
    };
    osns.pre_compute(&assembly, &options, true).expect("should assemble");
    assert_relative_eq!(osns.q()[0], -3.0);

    osns.compute(0.0, &ProjectedGaussSeidel, &options)
        .expect("should solve");
    osns.post_compute(interactions);

    assert_relative_eq!(interactions[id.index()].lambda(1)[0], 3.0);
    assert_relative_eq!(interactions[id.index()].y(1)[0], 1.0);
}

#[test]
fn first_order_blocks_include_feedthrough_and_step() {
    let mut model = Model::new(0.0, 1.0).expect("valid horizon");
    let circuit = model.add_system(
        DynamicalSystem::first_order_linear(array![[0.0]], array![0.0], array![2.0])
            .expect("valid system"),
    );
    let relation =
        Relation::first_order_linear(array![[3.0]], array![[0.5]], array![[1.0]], array![1.0])
            .expect("valid relation");
    let mut interaction = Interaction::new(
        vec![circuit],
        relation,
        NonSmoothLaw::symmetric_relay(1, 1.0).expect("valid law"),
    )
    .expect("valid interaction");
    interaction.set_levels(Levels::default());
    let id = model.add_interaction(interaction).expect("should add interaction");

    let topology = Topology::new(model.interactions(), 1);
    let operators = ScalarOperators {
        w: vec![1.0],
        scale: 0.1,
    };
    let mut osns = LinearOsns::new(0);
    let (systems, interactions) = model.parts_mut();
    let assembly = Assembly {
        topology: &topology,
        systems,
        interactions,
        operators: &operators,
    };

    osns.pre_compute(&assembly, &SolverOptions::default(), false)
        .expect("should assemble");

    assert_eq!(osns.absolute_position(id), Some(0));
    // D + h C W⁻¹ B = 0.5 + 0.1 * 3
    assert_relative_eq!(osns.matrix().matrix()[[0, 0]], 0.8);
    // C x_free + e = 3 * 2 + 1
    assert_relative_eq!(osns.q()[0], 7.0);
}

#[test]
fn empty_index_set_skips_the_solve() {
    let (mut model, [ground, _], _) = chain();
    let topology = Topology::new(model.interactions(), 2);
    let operators = ScalarOperators {
        w: vec![1.0, 2.0],
        scale: 1.0,
    };
    let options = SolverOptions::default();
    let mut osns = LinearOsns::new(1);

    let (systems, interactions) = model.parts_mut();
    interactions[ground.index()].lambda_mut(1)[0] = 7.0;
    let assembly = Assembly {
        topology: &topology,
        systems,
        interactions,
        operators: &operators,
    };
    assert_eq!(osns.pre_compute(&assembly, &options, false), Ok(0));
    assert_eq!(
        osns.compute(0.0, &ProjectedGaussSeidel, &options),
        Ok(SolveReport::Skipped)
    );

    osns.post_compute(interactions);
    assert_relative_eq!(interactions[ground.index()].lambda(1)[0], 7.0);
}

proptest! {
    #[test]
    fn positions_are_prefix_sums_of_sizes(sizes in prop::collection::vec(1usize..4, 1..10)) {
        let mut model = Model::new(0.0, 1.0).expect("valid horizon");
        let ids: Vec<InteractionId> = sizes
            .iter()
            .map(|&size| {
                let system = particle(&mut model, 1.0, 0.0);
                let law = NonSmoothLaw::complementarity(size).expect("valid law");
                contact(&mut model, vec![system], Array2::ones((size, 1)), law)
            })
            .collect();

        let mut osns = OsnsMatrix::new();
        let dim = osns.update_size_and_positions(ids.iter().copied().zip(sizes.iter().copied()));

        prop_assert_eq!(dim, sizes.iter().sum::<usize>());
        prop_assert_eq!(osns.position(ids[0]), Some(0));
        for k in 1..ids.len() {
            let previous = osns.position(ids[k - 1]).expect("positioned");
            let current = osns.position(ids[k]).expect("positioned");
            prop_assert_eq!(current, previous + sizes[k - 1]);
        }
    }
}
